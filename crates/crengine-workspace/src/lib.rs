//! CR State Record and on-disk artifact layout (`spec.md` §3, §6, §8 C8).
//!
//! This crate owns the single mutable record a run's Phase Driver advances
//! through the four phases, plus the directory layout its artifacts live
//! under. It does not itself drive phase transitions (that is
//! `crengine-phase`'s job) — it only tracks where things are and whether
//! they currently exist.

mod paths;
mod state;

pub use paths::{leading_stem, CrPaths};
pub use state::{CrState, PhaseExists};
