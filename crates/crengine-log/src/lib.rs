//! Logger/Reporter (`spec.md` §4 C11): a structured status dictionary
//! describing the applied operations and final disposition of one change
//! request, plus the `tracing` initialization shared by the whole binary.
//!
//! This component has no control-flow role — it only observes. The report
//! is written to the CR's `log_path` as YAML on every phase transition
//! (`spec.md` §3 Lifecycle, §5 "state-record log is written after every
//! phase transition"), and mirrored as a single `tracing::info!` event per
//! run for anyone tailing stderr.

use crengine_error::{CrError, CrResult};
use crengine_types::{Phase, TimeStamp};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The disposition of one applied (or attempted) unit op, keyed by its
/// marker anchor so the report reads the same as the diff it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpOutcome {
    pub anchor: String,
    pub op: String,
    pub kind: String,
    pub applied: bool,
}

/// The structured record written once per change request. Field names
/// mirror `spec.md`'s vocabulary (`cr_id`, phases, warnings) so the YAML
/// file reads like the spec rather than like an internal data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub cr_id: TimeStamp,
    pub pg_name: String,
    pub work_file_name: String,
    pub entry_phase: Phase,
    pub current_phase: Phase,
    pub ops: Vec<OpOutcome>,
    pub warnings: Vec<String>,
    pub success: bool,
}

impl RunReport {
    pub fn new(cr_id: TimeStamp, pg_name: impl Into<String>, work_file_name: impl Into<String>, entry_phase: Phase) -> Self {
        RunReport {
            cr_id,
            pg_name: pg_name.into(),
            work_file_name: work_file_name.into(),
            entry_phase,
            current_phase: entry_phase,
            ops: Vec::new(),
            warnings: Vec::new(),
            success: false,
        }
    }

    pub fn record_op(&mut self, anchor: impl Into<String>, op: impl Into<String>, kind: impl Into<String>, applied: bool) {
        self.ops.push(OpOutcome { anchor: anchor.into(), op: op.into(), kind: kind.into(), applied });
    }

    pub fn record_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn advance_to(&mut self, phase: Phase) {
        self.current_phase = phase;
    }

    /// Writes the report as YAML to `log_path` and emits a matching
    /// `tracing::info!` event.
    pub fn write(&self, log_path: &Path) -> CrResult<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| CrError::parse(log_path, format!("failed to serialize run report: {e}")))?;
        std::fs::write(log_path, yaml).map_err(|e| CrError::io(log_path, e))?;
        tracing::info!(
            cr_id = %self.cr_id,
            pg_name = %self.pg_name,
            work_file_name = %self.work_file_name,
            phase = self.current_phase.as_str(),
            applied_ops = self.ops.iter().filter(|o| o.applied).count(),
            unresolved_ops = self.ops.iter().filter(|o| !o.applied).count(),
            warnings = self.warnings.len(),
            success = self.success,
            "change request run complete"
        );
        Ok(())
    }

    pub fn read(log_path: &Path) -> CrResult<RunReport> {
        let text = std::fs::read_to_string(log_path).map_err(|e| CrError::io(log_path, e))?;
        serde_yaml::from_str(&text).map_err(|e| CrError::parse(log_path, format!("invalid run report: {e}")))
    }
}

/// Initializes the process-wide `tracing` subscriber from the CLI's
/// `-v/--verbose` level (0-2): 0 is warnings-only, 1 is info, 2 is debug
/// with target/line info, matching the teacher's compact-vs-verbose split.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 2)
        .compact();

    // Re-initializing is a no-op error in repeated test runs; only the CLI
    // entry point cares whether this actually took effect.
    let _ = subscriber.try_init();
}
