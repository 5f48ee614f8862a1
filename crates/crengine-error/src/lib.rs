//! The engine-wide error taxonomy (`spec.md` §7).
//!
//! Every fallible operation in `crengine-*` returns (or converts into)
//! [`CrError`]. Variants map 1:1 onto the taxonomy table in the
//! specification; which ones are fatal vs. recoverable is a property of
//! *where* they are raised (the header/anchor resolvers turn most of these
//! into warnings before they ever reach a caller), not of the type itself.

use std::path::PathBuf;
use thiserror::Error;

pub mod exit_codes;

#[derive(Debug, Error)]
pub enum CrError {
    #[error("parse error in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("bad header `{header}`: {reason}")]
    BadHeader { header: String, reason: String },

    #[error("anchor not found: {anchor} ({kind})")]
    AnchorNotFound { anchor: String, kind: &'static str },

    #[error("phase {phase} failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },

    #[error("text repair exhausted for {shape}")]
    RepairFailed { shape: &'static str },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CrError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn bad_header(header: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadHeader {
            header: header.into(),
            reason: reason.into(),
        }
    }
}

pub type CrResult<T> = Result<T, CrError>;
