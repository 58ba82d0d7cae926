//! Advisory outcomes of cache-mutating calls.

use std::fmt;

/// One recoverable or advisory condition met while serving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The name is not a registered term.
    TermNotFound(String),
    /// A registered term with no data at this time index or in this backend.
    TermNotAvailable(String),
    /// A dump exists for the term but could not be read, e.g. truncated or the wrong size.
    TermUnreadable(String),
    TimeIndexSubstituted { requested: u32, used: u32 },
    NoTermsSelected,
    /// Terms skipped because they are already cached at this time index.
    AlreadyLoaded(Vec<String>),
    WakeAlreadyComputed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::TermNotFound(name) => write!(f, "unknown term {name:?}"),
            Notice::TermNotAvailable(name) => write!(f, "term {name:?} is not available"),
            Notice::TermUnreadable(name) => write!(f, "term {name:?} could not be read"),
            Notice::TimeIndexSubstituted { requested, used } => {
                write!(f, "time index {requested} not found, using {used}")
            }
            Notice::NoTermsSelected => write!(f, "no terms selected"),
            Notice::AlreadyLoaded(names) => write!(f, "already loaded: {}", names.join(", ")),
            Notice::WakeAlreadyComputed => write!(f, "wake terms already computed"),
        }
    }
}

/// What a read did: the terms it loaded and every notice raised on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadReport {
    pub loaded: Vec<String>,
    pub notices: Vec<Notice>,
}

impl ReadReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `notice` and logs it.
    pub fn push(&mut self, notice: Notice) {
        match &notice {
            Notice::AlreadyLoaded(_) | Notice::WakeAlreadyComputed => {
                tracing::debug!(%notice, "read notice")
            }
            _ => tracing::warn!(%notice, "read notice"),
        }
        self.notices.push(notice);
    }

    pub fn merge(&mut self, other: ReadReport) {
        self.loaded.extend(other.loaded);
        self.notices.extend(other.notices);
    }

    /// Registered terms that could not be served.
    pub fn missing(&self) -> Vec<&str> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::TermNotAvailable(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Terms whose stored dump exists but failed to read.
    pub fn unreadable(&self) -> Vec<&str> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::TermUnreadable(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Names unknown to the registry.
    pub fn invalid(&self) -> Vec<&str> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::TermNotFound(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn substitution(&self) -> Option<(u32, u32)> {
        self.notices.iter().find_map(|n| match n {
            Notice::TimeIndexSubstituted { requested, used } => Some((*requested, *used)),
            _ => None,
        })
    }

    pub fn contains(&self, notice: &Notice) -> bool {
        self.notices.contains(notice)
    }
}
