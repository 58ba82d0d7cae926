//! Bidirectional registry between symbolic term names and `(budget, term)` pairs.
//!
//! The table mirrors the solver's budget numbering:
//! - budget 0: mean statistics and Reynolds stresses
//! - budget 1: momentum budget
//! - budget 2: mean kinetic energy budget
//! - budget 3: turbulent kinetic energy budget
//! - budget 5: wake deficit, synthesized from budget 0 and never dumped by the solver

use core::fmt;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{CoreError, CoreResult};

/// Budget numbers used by the solver's output files.
pub mod budget {
    pub const MEAN: u8 = 0;
    pub const MOMENTUM: u8 = 1;
    pub const MKE: u8 = 2;
    pub const TKE: u8 = 3;
    pub const WAKE: u8 = 5;
}

/// Immutable `(budget_id, term_id)` pair identifying one dumped statistic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermKey {
    pub budget: u8,
    pub term: u8,
}

impl TermKey {
    pub const fn new(budget: u8, term: u8) -> Self {
        Self { budget, term }
    }
}

impl fmt::Display for TermKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.budget, self.term)
    }
}

const TABLE: &[(&str, u8, u8)] = &[
    // budget 0: first and second order averages
    ("ubar", 0, 1),
    ("vbar", 0, 2),
    ("wbar", 0, 3),
    ("uu", 0, 4),
    ("uv", 0, 5),
    ("uw", 0, 6),
    ("vv", 0, 7),
    ("vw", 0, 8),
    ("ww", 0, 9),
    ("pbar", 0, 10),
    ("tau11", 0, 11),
    ("tau12", 0, 12),
    ("tau13", 0, 13),
    ("tau22", 0, 14),
    ("tau23", 0, 15),
    ("tau33", 0, 16),
    ("pu", 0, 17),
    ("pv", 0, 18),
    ("pw", 0, 19),
    ("uk", 0, 20),
    ("vk", 0, 21),
    ("wk", 0, 22),
    ("ujtau1j", 0, 23),
    ("ujtau2j", 0, 24),
    ("ujtau3j", 0, 25),
    ("Tbar", 0, 26),
    ("uT", 0, 27),
    ("vT", 0, 28),
    ("wT", 0, 29),
    ("TT", 0, 30),
    // budget 1: momentum
    ("DuDt", 1, 1),
    ("dpdx", 1, 2),
    ("xSGS", 1, 3),
    ("xAD", 1, 4),
    ("DvDt", 1, 5),
    ("dpdy", 1, 6),
    ("ySGS", 1, 7),
    ("DwDt", 1, 8),
    ("dpdz", 1, 9),
    ("zSGS", 1, 10),
    ("xCor", 1, 11),
    ("xGeo", 1, 12),
    ("yCor", 1, 13),
    ("yGeo", 1, 14),
    ("yAD", 1, 15),
    ("zBuoy", 1, 16),
    // budget 2: mean kinetic energy
    ("MKE_TKE_loss", 2, 1),
    ("MKE_adv", 2, 2),
    ("MKE_turb_tp", 2, 3),
    ("MKE_press_tp", 2, 4),
    ("MKE_visc_tp", 2, 5),
    ("MKE_SGS_tp", 2, 6),
    ("MKE_AD", 2, 7),
    ("MKE_visc_dsp", 2, 8),
    ("MKE_SGS_dsp", 2, 9),
    ("MKE_Coriolis", 2, 10),
    ("MKE_geostrophic", 2, 11),
    ("MKE_buoyancy", 2, 12),
    // budget 3: turbulent kinetic energy
    ("TKE_shear_production", 3, 1),
    ("TKE_turb_transport", 3, 2),
    ("TKE_p_strain", 3, 3),
    ("TKE_p_transport", 3, 4),
    ("TKE_SGS_transport", 3, 5),
    ("TKE_dissipation", 3, 6),
    ("TKE_AD", 3, 7),
    ("TKE_adv", 3, 8),
    ("TKE_buoyancy", 3, 9),
    ("TKE_Coriolis", 3, 10),
    // budget 5: wake deficit, term ids follow ubar/vbar/wbar
    ("uwake", 5, 1),
    ("vwake", 5, 2),
    ("wwake", 5, 3),
];

/// Canonical mean, stress and pressure terms.
pub const DEFAULT_TERMS: &[&str] = &[
    "ubar", "vbar", "wbar", "tau11", "tau12", "tau13", "tau22", "tau23", "tau33", "pbar",
];

/// Terms needed to close the Reynolds-averaged momentum equations.
pub const RANS_TERMS: &[&str] = &[
    "ubar", "vbar", "wbar", "pbar", "Tbar", "uu", "uv", "uw", "vv", "vw", "ww", "dpdx", "dpdy",
    "dpdz", "tau11", "tau12", "tau13", "tau22", "tau23", "tau33",
];

/// Derived terms computed from budget 0 means and an inflow profile.
pub const WAKE_TERMS: &[&str] = &["uwake", "vwake", "wwake"];

/// Read-only bijection between term names and [`TermKey`]s.
#[derive(Debug)]
pub struct KeyRegistry {
    by_name: HashMap<&'static str, TermKey>,
    by_key: HashMap<TermKey, &'static str>,
}

impl KeyRegistry {
    fn build() -> Self {
        let mut by_name = HashMap::with_capacity(TABLE.len());
        let mut by_key = HashMap::with_capacity(TABLE.len());
        for &(name, b, t) in TABLE {
            let key = TermKey::new(b, t);
            let dup_name = by_name.insert(name, key);
            let dup_key = by_key.insert(key, name);
            debug_assert!(dup_name.is_none(), "duplicate term name {name}");
            debug_assert!(dup_key.is_none(), "duplicate term key {key}");
        }
        Self { by_name, by_key }
    }

    /// Process-wide registry, built on first use.
    pub fn global() -> &'static KeyRegistry {
        static REGISTRY: OnceLock<KeyRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::build)
    }

    pub fn resolve(&self, name: &str) -> CoreResult<TermKey> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::UnknownTerm {
                name: name.to_string(),
            })
    }

    pub fn resolve_inverse(&self, key: TermKey) -> CoreResult<&'static str> {
        self.by_key
            .get(&key)
            .copied()
            .ok_or(CoreError::UnknownKey { key })
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn contains_key(&self, key: TermKey) -> bool {
        self.by_key.contains_key(&key)
    }

    /// All registered names, in table order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        TABLE.iter().map(|(name, _, _)| *name)
    }

    /// All registered `(name, key)` pairs of one budget, in table order.
    pub fn budget_terms(&self, budget: u8) -> Vec<(&'static str, TermKey)> {
        TABLE
            .iter()
            .filter(|(_, b, _)| *b == budget)
            .map(|&(name, b, t)| (name, TermKey::new(b, t)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

pub fn is_wake_term(name: &str) -> bool {
    WAKE_TERMS.contains(&name)
}
