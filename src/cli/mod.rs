//! Command-line interface (`spec.md` §6, `SPEC_FULL.md` §6): a thin
//! `clap`-derived CLI delegating straight to the phase driver.
//!
//! Argument parsing and process plumbing are explicitly out of this
//! engine's specified scope (`spec.md` §1's "command-line argument
//! layer"); this module exists so the engine is runnable end to end, not
//! to elaborate CLI behavior beyond what `spec.md` §6 names.
//!
//! ## Module structure
//!
//! - `args`: the `clap::Parser`/`Subcommand` definitions
//! - `run`: entry point, dispatch, and all diagnostic output

pub mod args;
mod run;

pub use args::{ApiCommand, Cli};
pub use run::run;
