//! crengine - an offline, deterministic change-request refactoring engine.
//!
//! The pipeline itself (header grammar, source loading, anchor resolution,
//! the multi-pass applier, the phase driver) lives one level down in the
//! `crengine-*` crates this crate composes; this crate is the thin outer
//! shell `spec.md` §1 calls an "external collaborator" — a real but
//! unelaborated CLI, config loader, and oracle wiring. All logic is in the
//! library; `main.rs` only maps `cli::run()`'s result to a process exit
//! code.

pub mod cli;
pub mod context;

pub use context::Context;
