//! CLI entry point and dispatch (`spec.md` §6).
//!
//! This function handles all of its own diagnostic output; `main.rs` only
//! maps the returned `ExitCode` to `std::process::exit`.

use super::args::{ApiCommand, Cli, InfoArgs, RunArgs};
use crate::Context;
use chrono::Local;
use clap::Parser;
use crengine_config::Settings;
use crengine_error::exit_codes::ExitCode;
use crengine_error::{CrError, CrResult};
use crengine_log::RunReport;
use crengine_oracle::{HttpOracle, Oracle, StubOracle};
use crengine_types::{Api, Phase, TimeStamp};
use crengine_workspace::{leading_stem, CrState};
use crengine_write::Formatter;

/// Parses argv, initializes tracing from `-v`, and dispatches to the
/// subcommand. Every error path is logged and mapped to an `ExitCode`
/// before returning (`spec.md` §6: "exit code 0 on success, 1 on fatal
/// validation failure, non-zero otherwise").
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    crengine_log::init_tracing(cli.verbose);

    if let ApiCommand::Server(_) = &cli.api {
        let reason = "the server subcommand is an external collaborator, out of scope for this engine";
        tracing::error!(reason, "run failed");
        eprintln!("error: {reason}");
        return Err(ExitCode::INTERNAL);
    }

    execute(&cli).map_err(|err| {
        tracing::error!(error = %err, "run failed");
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn execute(cli: &Cli) -> CrResult<()> {
    match &cli.api {
        ApiCommand::Prompt(args) => run_pipeline(args, Api::Update, Phase::Prompt, cli.verbose),
        ApiCommand::Create(args) => run_pipeline(args, Api::Create, Phase::Processing, cli.verbose),
        ApiCommand::Update(args) => run_pipeline(args, Api::Update, Phase::Processing, cli.verbose),
        ApiCommand::Info(args) => run_info(args),
        ApiCommand::Server(_) => unreachable!("handled in run() before dispatch"),
    }
}

/// The work file's basename, required to derive every on-disk artifact
/// path (`spec.md` §6's `cr_<id>_<name>.<ext>` layout).
fn work_file_name(args: &RunArgs) -> CrResult<String> {
    args.source_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CrError::bad_header("<cli>", "a --source_path is required to name the work file"))
}

fn run_pipeline(args: &RunArgs, api: Api, up_to_phase: Phase, verbose: u8) -> CrResult<()> {
    let settings = Settings::load("crengine")?;
    let resources_dir = settings.resources_dir()?;
    let project_dir = std::env::current_dir().map_err(|e| CrError::io(".", e))?;

    let cr_id = match &args.cr_id {
        Some(raw) => TimeStamp::parse(raw).map_err(|e| CrError::bad_header(raw.clone(), e.to_string()))?,
        None => TimeStamp::now(Local::now().naive_local()),
    };
    let work_file_name = work_file_name(args)?;

    let context = Context {
        cr_id: cr_id.clone(),
        pg_name: settings.package_name.clone(),
        work_file_name: work_file_name.clone(),
        verbose,
        resources_dir,
        project_dir,
    };

    let mut state = CrState::new(
        &context.resources_dir,
        context.pg_name.clone(),
        context.work_file_name.clone(),
        context.cr_id.clone(),
        api,
        up_to_phase,
        args.hard,
        context.project_dir.clone(),
        args.source_path.clone(),
    )?;

    // Seed an already-prepared artifact straight onto disk at its phase
    // path, then re-derive `entry_phase` from what now exists there
    // (`CrState::new` only sees the artifacts present before this point).
    if let Some(path) = &args.cr_integration_path {
        let text = std::fs::read_to_string(path).map_err(|e| CrError::io(path, e))?;
        let dest = state.paths.for_phase(Phase::Integration).to_path_buf();
        std::fs::write(&dest, &text).map_err(|e| CrError::io(&dest, e))?;
    }
    if let Some(json) = &args.json_string {
        let dest = state.paths.for_phase(Phase::Json).to_path_buf();
        std::fs::write(&dest, json).map_err(|e| CrError::io(&dest, e))?;
    }
    state.refresh_exists();

    let endpoint = match args.port {
        Some(port) => format!("http://{}:{port}", settings.model_ip),
        None => settings.oracle_endpoint(),
    };
    let stub;
    let http;
    let oracle: &dyn Oracle = if args.testing {
        stub = StubOracle::echo();
        &stub
    } else {
        http = HttpOracle::new(endpoint);
        &http
    };

    let formatter = if args.black { Some(Formatter::black()) } else { None };
    let report = crengine_phase::run(&mut state, oracle, formatter.as_ref())?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("cr_id: {}", report.cr_id);
    println!("phase: {}", report.current_phase.as_str());
    for op in &report.ops {
        println!("  {} {} -> {}", op.op, op.anchor, if op.applied { "applied" } else { "unresolved" });
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
}

/// `info` has no work file to derive `leading_stem` from ahead of time, so
/// it scans every log under the package directory for one whose file name
/// contains the requested `cr_id` (`original_source/codeon/cr_info.py`
/// does the equivalent lookup by id rather than by full artifact path).
fn run_info(args: &InfoArgs) -> CrResult<()> {
    let settings = Settings::load("crengine")?;
    let resources_dir = settings.resources_dir()?;
    let logs_dir = resources_dir.join(&settings.package_name).join("logs");
    let entries = match std::fs::read_dir(&logs_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CrError::PhaseFailed {
                phase: "info",
                reason: format!("no run report found for cr_id {}", args.cr_id),
            })
        }
        Err(e) => return Err(CrError::io(&logs_dir, e)),
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains(args.cr_id.as_str()) {
            continue;
        }
        let report = RunReport::read(&entry.path())?;

        if args.prompt_info {
            let stem = leading_stem(&report.work_file_name);
            let prompt_path = resources_dir
                .join(&settings.package_name)
                .join("prompts")
                .join(format!("cr_{}_{stem}.md", report.cr_id));
            let prompt = std::fs::read_to_string(&prompt_path).map_err(|e| CrError::io(&prompt_path, e))?;
            println!("{prompt}");
            return Ok(());
        }

        if args.infos {
            let yaml = serde_yaml::to_string(&report)
                .map_err(|e| CrError::parse(&entry.path(), format!("failed to render run report: {e}")))?;
            println!("{yaml}");
        } else {
            println!(
                "{} [{}] applied={} warnings={}",
                report.cr_id,
                report.current_phase.as_str(),
                report.ops.iter().filter(|o| o.applied).count(),
                report.warnings.len()
            );
        }
        return Ok(());
    }

    Err(CrError::PhaseFailed {
        phase: "info",
        reason: format!("no run report found for cr_id {}", args.cr_id),
    })
}
