//! Phase Driver (`spec.md` §4.8 C9): sequences a [`CrState`] through
//! `prompt -> json -> integration -> processing`, generating each phase's
//! artifact from the previous one and persisting it before moving on.
//!
//! Each phase follows the same three-way rule (`spec.md` §3 Invariant 2,
//! §4.8):
//! 1. If the phase's artifact already exists on disk, it is loaded
//!    verbatim and never regenerated — re-running a CR is idempotent.
//! 2. Otherwise, if the caller has already set this phase's content on the
//!    [`CrState`] directly (an explicit override, e.g. a CLI flag handing
//!    in already-finished JSON or integration text), that content is
//!    written straight through as this phase's artifact.
//! 3. Otherwise, this phase's content is derived from the previous phase's
//!    content by this phase's own transformation, then written.
//!
//! Only `processing` has no single "transformation" — it is the full
//! integration-parse + anchor-resolve + apply + write + report pipeline
//! (C3 + C5 + C6 + C7 + C10 + C11).

use crengine_error::{CrError, CrResult};
use crengine_header::emit_package_header;
use crengine_integration::{raw_body_after_package_header, IntegrationFile};
use crengine_log::RunReport;
use crengine_oracle::Oracle;
use crengine_source::SourceTree;
use crengine_types::{Api, Phase, PackageDirective, PHASE_ORDER};
use crengine_workspace::CrState;
use crengine_write::{Formatter, WriteRequest};
use std::path::Path;

fn load(path: &Path) -> CrResult<String> {
    std::fs::read_to_string(path).map_err(|e| CrError::io(path, e))
}

fn persist(path: &Path, content: &str) -> CrResult<()> {
    std::fs::write(path, content).map_err(|e| CrError::io(path, e))
}

/// Runs every phase in `[entry_phase, up_to_phase]`, writing each one's
/// artifact and a final [`RunReport`] to the CR's log path.
pub fn run(state: &mut CrState, oracle: &dyn Oracle, formatter: Option<&Formatter>) -> CrResult<RunReport> {
    let entry = state.entry_phase.unwrap_or(Phase::Prompt);
    let mut report = RunReport::new(state.cr_id.clone(), state.pg_name.clone(), state.work_file_name.clone(), entry);

    for &phase in &PHASE_ORDER {
        if !state.phase_in_range(phase) {
            continue;
        }
        match phase {
            Phase::Prompt => run_prompt(state, oracle)?,
            Phase::Json => run_json(state)?,
            Phase::Integration => run_integration(state)?,
            Phase::Processing => run_processing(state, formatter, &mut report)?,
        }
        state.advance_to(phase);
        report.advance_to(phase);
    }

    report.success = true;
    report.write(&state.paths.log_path)?;
    Ok(report)
}

/// *prompt*: hands whatever raw text the caller supplied to the oracle and
/// persists the completion. There is no upstream phase to carry forward
/// from, so an absent override is treated as an empty prompt rather than a
/// hard error — the oracle is a pass-through collaborator, not a validator
/// (`spec.md` §1).
fn run_prompt(state: &mut CrState, oracle: &dyn Oracle) -> CrResult<()> {
    let path = state.paths.for_phase(Phase::Prompt).to_path_buf();
    if state.phase_exists(Phase::Prompt) {
        state.set_phase_string(Phase::Prompt, load(&path)?);
        return Ok(());
    }
    let content = match state.phase_string(Phase::Prompt) {
        Some(explicit) => explicit.to_string(),
        None => {
            let input = String::new();
            oracle.complete(&input).map_err(|e| CrError::PhaseFailed { phase: "prompt", reason: e.to_string() })?
        }
    };
    persist(&path, &content)?;
    state.set_phase_string(Phase::Prompt, content);
    Ok(())
}

/// *json*: recovers the `{target, code}` shape out of the prompt phase's
/// raw text (C4) and persists it as canonical JSON.
fn run_json(state: &mut CrState) -> CrResult<()> {
    let path = state.paths.for_phase(Phase::Json).to_path_buf();
    if state.phase_exists(Phase::Json) {
        state.set_phase_string(Phase::Json, load(&path)?);
        return Ok(());
    }
    if let Some(explicit) = state.phase_string(Phase::Json).map(str::to_string) {
        persist(&path, &explicit)?;
        state.set_phase_string(Phase::Json, explicit);
        return Ok(());
    }
    let input = state.phase_string(Phase::Prompt).unwrap_or_default().to_string();
    let shape = crengine_repair::recover_json_shape(&input)?;
    let content = serde_json::to_string_pretty(&serde_json::json!({ "target": shape.target, "code": shape.code }))
        .map_err(|e| CrError::parse(&path, format!("failed to serialize json phase shape: {e}")))?;
    persist(&path, &content)?;
    state.set_phase_string(Phase::Json, content);
    Ok(())
}

/// *integration*: pulls the `code` field back out of the json phase's
/// shape and recovers it as a fenced/prose-wrapped package-header-leading
/// blob (C4's markdown shape).
fn run_integration(state: &mut CrState) -> CrResult<()> {
    let path = state.paths.for_phase(Phase::Integration).to_path_buf();
    if state.phase_exists(Phase::Integration) {
        state.set_phase_string(Phase::Integration, load(&path)?);
        return Ok(());
    }
    if let Some(explicit) = state.phase_string(Phase::Integration).map(str::to_string) {
        persist(&path, &explicit)?;
        state.set_phase_string(Phase::Integration, explicit);
        return Ok(());
    }
    let input = state.phase_string(Phase::Json).unwrap_or_default().to_string();
    let shape = crengine_repair::recover_json_shape(&input)?;
    let recovered = crengine_repair::recover_markdown_shape(&shape.code)?;
    persist(&path, &recovered)?;
    state.set_phase_string(Phase::Integration, recovered);
    Ok(())
}

/// Stamps `directive`'s provenance marker with a fresh `cr_id`, mirroring
/// `crengine_header::emit_marker`'s treatment of unit headers.
fn stamp_package_marker(directive: &PackageDirective, state: &CrState) -> String {
    let stamped = PackageDirective { cr_id: Some(state.cr_id.clone()), ..directive.clone() };
    emit_package_header(&stamped)
}

/// Builds the initial source tree a batch of unit ops is applied against:
/// the file already on disk for `update`, or — for `create` — the
/// integration text's own body (everything after the package header),
/// since there is no prior file to load (`spec.md` §9 Open Question c).
fn initial_tree(state: &CrState, integration_text: &str) -> CrResult<SourceTree> {
    match (&state.source_path, state.api) {
        (Some(path), _) => SourceTree::parse(&load(path)?),
        (None, Api::Create) => SourceTree::parse(&raw_body_after_package_header(integration_text)?),
        (None, Api::Update) => {
            Err(CrError::PhaseFailed { phase: "processing", reason: "update run has no source file to load".into() })
        }
    }
}

/// *processing*: parses the integration text (C3), applies every unit op
/// to the appropriate source tree (C7), writes the result (C10), and
/// records what happened (C11).
fn run_processing(state: &mut CrState, formatter: Option<&Formatter>, report: &mut RunReport) -> CrResult<()> {
    let path = state.paths.for_phase(Phase::Processing).to_path_buf();
    if state.phase_exists(Phase::Processing) {
        state.set_phase_string(Phase::Processing, load(&path)?);
        return Ok(());
    }

    let integration_text = state.phase_string(Phase::Integration).unwrap_or_default().to_string();
    let IntegrationFile { package, units, warnings } = crengine_integration::parse(&integration_text, state.api)?;
    for warning in &warnings {
        report.record_warning(warning.clone());
    }

    if units.is_empty() && state.api == Api::Update {
        // spec.md §8 boundary: a no-op integration file on an update run
        // exits cleanly without touching anything on disk.
        report.record_warning("integration file contains no operations; no changes applied");
        state.set_phase_string(Phase::Processing, String::new());
        return Ok(());
    }

    let tree = initial_tree(state, &integration_text)?;
    let output = crengine_driver::apply_all(tree, &units, &state.cr_id);

    for unit in &units {
        let anchor = unit.op.marker_anchor();
        let applied = !output.warnings.iter().any(|w| w.contains(&format!("{anchor} ({})", unit.op.op.as_str())));
        report.record_op(anchor, unit.op.op.as_str(), unit.op.kind.as_str(), applied);
    }
    for warning in &output.warnings {
        report.record_warning(warning.clone());
    }

    let mut code = output.tree.emit();
    if units.is_empty() && state.api == Api::Create {
        // spec.md §8 boundary: a zero-op create run produces the body
        // verbatim plus a re-stamped package marker as creation provenance.
        code = format!("{}\n{}", stamp_package_marker(&package, state), code);
    }

    let hot_source = if state.hot { state.source_path.as_deref() } else { None };
    let restore_path = hot_source.map(|_| state.paths.restore_path.as_path());
    let outcome = crengine_write::write(WriteRequest {
        code: &code,
        processing_path: &path,
        hot_source,
        restore_path,
        formatter,
    })?;
    if let Some(warning) = &outcome.formatter_warning {
        report.record_warning(warning.clone());
    }

    state.set_phase_string(Phase::Processing, code);
    Ok(())
}
