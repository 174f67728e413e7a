// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use runtime::FileRuntime;
use std::env;
use std::path::{Path, PathBuf};
use storyline_app::{AppState, PathReport, Workspace, WorkspaceCommand};
use tracing::{info, warn};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `storyline --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    for path in options.import_path.iter().chain(options.export_path.iter()) {
        storyline_files::validate_document_path(&path.to_string_lossy())?;
    }

    let log_file = config.log_file()?;
    let _logging = logging::init(&log_file, config.log_level())
        .with_context(|| format!("start logging to {} -- set [log].file", log_file.display()))?;

    let export_path = match options.export_path.clone() {
        Some(path) => path,
        None => config.export_path()?,
    };
    let import_path = options.import_path.clone().or_else(|| config.import_path());
    let mut standard_sources = options.standard_sources.clone();
    if standard_sources.is_empty()
        && let Some(dir) = config.standards_dir()
    {
        standard_sources.push(dir);
    }

    let mut runtime = FileRuntime::new(export_path.clone(), import_path.clone(), standard_sources);
    let mut workspace = Workspace::new();

    if options.demo {
        for standard in storyline_files::demo_standards() {
            workspace.dispatch(WorkspaceCommand::LoadStandard {
                name: standard.name,
                paths: standard.paths,
            });
        }
        workspace.dispatch(WorkspaceCommand::ImportDocument(
            storyline_files::demo_document(),
        ));
    }

    let standards = runtime.load_standards()?;
    for failed in &standards.failed {
        eprintln!("skipped standards file {}: {}", failed.path.display(), failed.reason);
    }
    for standard in standards.loaded {
        workspace.dispatch(WorkspaceCommand::LoadStandard {
            name: standard.name,
            paths: standard.paths,
        });
    }

    if !options.demo
        && let Some(path) = &import_path
    {
        if path.exists() {
            let imported = storyline_files::read_document(path).with_context(|| {
                format!(
                    "import {} -- fix the JSON or pass a different --import path",
                    path.display()
                )
            })?;
            workspace.dispatch(WorkspaceCommand::ImportDocument(imported));
        } else {
            warn!(path = %path.display(), "import path does not exist yet; starting empty");
        }
    }

    if options.check_only {
        for line in check_report(&workspace, &export_path) {
            println!("{line}");
        }
        return Ok(());
    }

    let mut state = AppState {
        active_pane: config.start_pane(),
        show_story_json: config.show_story_json(),
        show_timeline_json: config.show_timeline_json(),
        ..AppState::default()
    };
    info!(
        standards = workspace.standards().len(),
        rows = workspace.timeline().len(),
        "starting interface"
    );
    storyline_tui::run_app(&mut state, &mut workspace, &mut runtime)
}

/// Summary line followed by one line per timeline row with path findings.
fn check_report(workspace: &Workspace, export_path: &Path) -> Vec<String> {
    let reports = workspace.path_reports();
    let mut lines = vec![format!(
        "ok: {} standards, {} timeline rows, {} rows with path findings, export to {}",
        workspace.standards().len(),
        workspace.timeline().len(),
        reports.len(),
        export_path.display()
    )];
    lines.extend(
        reports
            .iter()
            .map(|(id, report)| format!("row {id}: {}", describe_findings(report))),
    );
    lines
}

fn describe_findings(report: &PathReport) -> String {
    let mut parts = Vec::new();
    if report.unresolved > 0 {
        parts.push(format!("{} unresolved", report.unresolved));
    }
    if !report.unknown.is_empty() {
        parts.push(format!("unknown: {}", report.unknown.join(", ")));
    }
    if !report.duplicates.is_empty() {
        parts.push(format!("duplicate: {}", report.duplicates.join(", ")));
    }
    parts.join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    import_path: Option<PathBuf>,
    export_path: Option<PathBuf>,
    standard_sources: Vec<PathBuf>,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        import_path: None,
        export_path: None,
        standard_sources: Vec::new(),
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--import" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--import requires a document path"))?;
                options.import_path = Some(PathBuf::from(value.as_ref()));
            }
            "--export" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--export requires a document path"))?;
                options.export_path = Some(PathBuf::from(value.as_ref()));
            }
            "--standards" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--standards requires a standards file or directory")
                })?;
                options.standard_sources.push(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("storyline");
    println!("  --config <path>           Use a specific config path");
    println!("  --import <path>           Load a story document at startup (and on ctrl+r)");
    println!("  --export <path>           Write exports here instead of the configured path");
    println!("  --standards <file|dir>    Load a standards file or every *.json in a directory");
    println!("  --print-config-path       Print resolved config path");
    println!("  --print-example-config    Print a config template");
    println!("  --demo                    Launch with a seeded demo story");
    println!("  --check                   Validate config and inputs without starting the UI");
    println!("  --help                    Show this help");
}
