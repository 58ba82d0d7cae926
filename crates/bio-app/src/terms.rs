//! Term selection: shortcut vocabularies and validity partitioning.

use std::str::FromStr;

use bio_core::keys::{DEFAULT_TERMS, RANS_TERMS};
use bio_core::{KeyRegistry, TermKey};

/// Which budget terms a request refers to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TermSelector {
    /// Canonical mean, stress and pressure terms.
    #[default]
    Default,
    /// Everything the backend reports as existing.
    All,
    Rans,
    /// Whatever is already cached.
    Current,
    Names(Vec<String>),
    Keys(Vec<TermKey>),
}

impl TermSelector {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TermSelector::Names(names.into_iter().map(Into::into).collect())
    }

    /// Names this selector asks for before availability is known; `None` for [`TermSelector::All`].
    pub fn requested_names(&self, current: &[String]) -> Option<Vec<String>> {
        let to_owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        match self {
            TermSelector::Default => Some(to_owned(DEFAULT_TERMS)),
            TermSelector::Rans => Some(to_owned(RANS_TERMS)),
            TermSelector::All => None,
            TermSelector::Current => Some(current.to_vec()),
            TermSelector::Names(names) => Some(names.clone()),
            TermSelector::Keys(keys) => {
                let registry = KeyRegistry::global();
                Some(
                    keys.iter()
                        .map(|k| match registry.resolve_inverse(*k) {
                            Ok(name) => name.to_string(),
                            Err(_) => k.to_string(),
                        })
                        .collect(),
                )
            }
        }
    }
}

impl FromStr for TermSelector {
    type Err = std::convert::Infallible;

    /// Shortcut words map to their vocabularies; anything else is a comma-separated name list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "default" => TermSelector::Default,
            "all" => TermSelector::All,
            "RANS" | "rans" => TermSelector::Rans,
            "current" => TermSelector::Current,
            other => TermSelector::names(
                other
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty()),
            ),
        })
    }
}

/// Requested names split by availability. Each list keeps request order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Present in the backend.
    pub valid: Vec<String>,
    /// Registered but not present.
    pub missing: Vec<String>,
    /// Unknown to the registry.
    pub invalid: Vec<String>,
}

/// Partitions `requested` against the names the backend reports as existing.
pub fn partition(requested: &[String], existing: &[String]) -> Resolution {
    let registry = KeyRegistry::global();
    let mut out = Resolution::default();
    for name in requested {
        let bucket = if existing.contains(name) {
            &mut out.valid
        } else if registry.contains_name(name) {
            &mut out.missing
        } else {
            &mut out.invalid
        };
        if !bucket.contains(name) {
            bucket.push(name.clone());
        }
    }
    out
}
