//! Subcommand implementations

use crate::cli::global_flag;
use crate::settings::Settings;
use anyhow::{bail, Context};
use casegen_core::{
    DocumentText, Orchestrator, RequirementInput, RunRequest, RunSummary, StreamEvent, TaskPlanner,
    TestCase,
};
use casegen_llm::{ChatCompletionsClient, SharedClient};
use clap::ArgMatches;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Run the selected subcommand
///
/// # Errors
/// Any setup failure: unreadable input, bad settings, missing credentials.
pub async fn dispatch(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let Some((name, args)) = matches.subcommand() else {
        bail!("no subcommand given");
    };
    let config_path = args
        .get_one::<PathBuf>("config")
        .or_else(|| matches.get_one::<PathBuf>("config"));
    let settings = Settings::load(config_path.map(PathBuf::as_path))?;
    tracing::debug!(command = name, json_logs = global_flag(matches, "log-json"), "dispatching");

    let mut stdout = std::io::stdout();
    match name {
        "run" => {
            let input = required_path(args, "input")?;
            let requirement = read_requirement(input)?;
            let client = ChatCompletionsClient::new(settings.llm.clone())
                .context("generation client setup failed")?;
            let client: SharedClient = Arc::new(client);
            let orchestrator = Orchestrator::new(client, settings.pipeline)?;

            let mut request = RunRequest::new(requirement);
            request.focus = args.get_one::<String>("focus").cloned();
            request.user_requirement = args.get_one::<String>("requirement").cloned();

            match run_pipeline(&orchestrator, request, &mut stdout).await {
                Ok(summary) => {
                    if let Some(path) = args.get_one::<PathBuf>("output") {
                        write_cases(path, &summary.cases)?;
                        tracing::info!(path = %path.display(), cases = summary.cases.len(), "cases written");
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    tracing::error!(error = %format!("{e:#}"), "run failed");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        "plan" => {
            let input = required_path(args, "input")?;
            let requirement = read_requirement(input)?;
            let planner = TaskPlanner::new().with_separators(settings.pipeline.focus_separators);
            print_plan(
                &planner,
                &requirement,
                args.get_one::<String>("focus").map(String::as_str),
                &mut stdout,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        "check-config" => {
            check_config(&settings, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        other => bail!("unknown subcommand {other}"),
    }
}

fn required_path<'a>(args: &'a ArgMatches, id: &str) -> anyhow::Result<&'a Path> {
    args.get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing --{id}"))
}

/// Read a plain-text requirement document
///
/// # Errors
/// Returns an error if the file is unreadable or blank.
pub fn read_requirement(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading requirement document {}", path.display()))?;
    let text = DocumentText::new(text)
        .requirement_text()
        .with_context(|| format!("requirement document {} is empty", path.display()))?;
    Ok(text)
}

/// Stream a run's events to `out` as JSON lines; heartbeats are logged, not printed
///
/// # Errors
/// Returns the run's error, or an I/O error writing `out`.
pub async fn run_pipeline<W: Write>(
    orchestrator: &Orchestrator,
    request: RunRequest,
    out: &mut W,
) -> anyhow::Result<RunSummary> {
    let mut handle = orchestrator.run(request);
    while let Some(event) = handle.events.next_event().await {
        if event == StreamEvent::Heartbeat {
            tracing::debug!(run_id = %handle.run_id, "waiting on generator");
            continue;
        }
        writeln!(out, "{}", serde_json::to_string(&event)?)?;
        out.flush()?;
    }
    let summary = handle.outcome.await.context("pipeline task failed")??;
    Ok(summary)
}

/// Write cases as JSON lines, one record per case, fields verbatim
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_cases(path: &Path, cases: &[TestCase]) -> anyhow::Result<()> {
    let mut file = std::io::BufWriter::new(
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    for case in cases {
        writeln!(file, "{}", serde_json::to_string(case)?)?;
    }
    file.flush()?;
    Ok(())
}

/// Print planner output for a plain-text requirement as pretty JSON
///
/// # Errors
/// Returns an error if `out` cannot be written.
pub fn print_plan<W: Write>(
    planner: &TaskPlanner,
    requirement: &str,
    focus: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let input = RequirementInput::Text(requirement.to_string());
    let report = serde_json::json!({
        "plans": planner.make_plan(&input, focus),
        "mandatory_items": planner.mandatory_items(&input, focus),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

/// Validate settings and print a one-line summary
///
/// # Errors
/// Returns an error naming the missing or invalid setting.
pub fn check_config<W: Write>(settings: &Settings, out: &mut W) -> anyhow::Result<()> {
    settings.llm.validate().context("llm settings invalid")?;
    settings.pipeline.validate().context("pipeline settings invalid")?;
    writeln!(
        out,
        "configuration ok: model {} at {} (cases timeout {}s)",
        settings.llm.model.as_deref().unwrap_or_default(),
        settings.llm.endpoint(),
        settings.pipeline.cases_timeout_secs
    )?;
    Ok(())
}
