//! Serializer/Writer (`spec.md` §4.9 C10): emits the processing-phase
//! output to disk, performs the hot-overwrite + restore-copy dance, and
//! optionally pipes the code through an external formatter.
//!
//! Grounded in `original_source/codeon/engine.py`'s `RefactorEngine._write_output`
//! and `Validator_Formatter` / `creator.py`'s `Formatter.format_with_black`:
//! a missing formatter executable or a non-zero exit both fall back to the
//! unformatted code with a warning, never a hard failure — formatting is an
//! optional post-pass, not part of the engine's correctness contract.

use crengine_error::{CrError, CrResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Result of one processing-phase write.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub processing_path: PathBuf,
    pub hot_written: bool,
    pub restore_path: Option<PathBuf>,
    pub tombstoned_restore_path: Option<PathBuf>,
    pub formatter_warning: Option<String>,
}

/// How hard the writer should push the result back into the project.
pub struct WriteRequest<'a> {
    pub code: &'a str,
    pub processing_path: &'a Path,
    /// `Some(source_path)` when `hot: bool` is set and the source already
    /// exists on disk (`spec.md` §4.9); `None` for dry/create runs.
    pub hot_source: Option<&'a Path>,
    pub restore_path: Option<&'a Path>,
    /// External formatter to invoke over stdin/stdout (e.g. `black -q -`),
    /// or `None` to skip formatting entirely.
    pub formatter: Option<&'a Formatter>,
}

/// An external code-formatting subprocess, invoked with the code on stdin
/// and the formatted code read back from stdout.
pub struct Formatter {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Formatter {
    pub fn black() -> Self {
        Formatter { program: "black".to_string(), args: vec!["-q".to_string(), "-".to_string()], timeout: Duration::from_secs(10) }
    }

    /// Runs the formatter on `code`, returning the formatted text on
    /// success or `None` (with a human-readable reason) on any failure:
    /// executable not found, non-zero exit, or timeout.
    fn run(&self, code: &str) -> (Option<String>, Option<String>) {
        if which(&self.program).is_none() {
            return (None, Some(format!("'{}' is not in the system's PATH", self.program)));
        }

        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(c) => c,
            Err(e) => return (None, Some(format!("failed to spawn '{}': {e}", self.program))),
        };

        {
            use std::io::Write;
            let stdin = child.stdin.take().expect("stdin piped above");
            let code = code.to_string();
            let mut stdin = stdin;
            if let Err(e) = stdin.write_all(code.as_bytes()) {
                return (None, Some(format!("failed writing to formatter stdin: {e}")));
            }
        }

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let output = child.wait_with_output();
            let _ = tx.send(output);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(output)) => {
                let _ = handle.join();
                if output.status.success() {
                    (Some(String::from_utf8_lossy(&output.stdout).into_owned()), None)
                } else {
                    (None, Some(format!("formatter exited with {}", output.status)))
                }
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                (None, Some(format!("failed to wait for formatter: {e}")))
            }
            Err(_) => (None, Some(format!("formatter timed out after {:?}", self.timeout))),
        }
    }
}

fn which(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).map(|dir| dir.join(program)).find(|candidate| candidate.is_file())
}

/// Writes the processing-phase code to `processing_path`, then performs the
/// hot-overwrite + restore-copy dance if requested (`spec.md` §4.9 steps
/// 1-3): copy source to restore, overwrite source, tombstone the restore
/// copy by prepending `#` once the overwrite completes.
pub fn write(request: WriteRequest<'_>) -> CrResult<WriteOutcome> {
    let (formatted, formatter_warning) = match request.formatter {
        Some(formatter) => {
            let (formatted, warning) = formatter.run(request.code);
            if let Some(w) = &warning {
                tracing::warn!(warning = %w, "formatter pass skipped, writing unformatted code");
            }
            (formatted.unwrap_or_else(|| request.code.to_string()), warning)
        }
        None => (request.code.to_string(), None),
    };

    std::fs::write(request.processing_path, &formatted).map_err(|e| CrError::io(request.processing_path, e))?;

    let mut outcome = WriteOutcome {
        processing_path: request.processing_path.to_path_buf(),
        hot_written: false,
        restore_path: None,
        tombstoned_restore_path: None,
        formatter_warning,
    };

    if let (Some(source_path), Some(restore_path)) = (request.hot_source, request.restore_path) {
        std::fs::copy(source_path, restore_path).map_err(|e| CrError::io(restore_path, e))?;
        std::fs::write(source_path, &formatted).map_err(|e| CrError::io(source_path, e))?;

        let tombstoned = tombstone_path(restore_path);
        std::fs::rename(restore_path, &tombstoned).map_err(|e| CrError::io(&tombstoned, e))?;

        outcome.hot_written = true;
        outcome.restore_path = Some(restore_path.to_path_buf());
        outcome.tombstoned_restore_path = Some(tombstoned);
    }

    Ok(outcome)
}

/// Prepends `#` to a path's file name, e.g. `cr_x_a.py` -> `#cr_x_a.py`.
fn tombstone_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().map(|n| format!("#{}", n.to_string_lossy())).unwrap_or_else(|| "#restored".to_string());
    path.with_file_name(file_name)
}
