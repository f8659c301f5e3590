use std::{fs, path::Path, process::ExitCode};

use anyhow::{Context, Result};
use botgrid_engine::{AttemptError, AttemptReport, Engine, SandboxConfig};
use botgrid_sim::LevelCatalog;

mod cli;
use cli::{CatalogArgs, CheckArgs, Command, RunArgs};

fn main() -> Result<ExitCode> {
    env_logger::init();

    match cli::parse()? {
        Command::ListLevels(args) => list_levels(&args),
        Command::Check(args) => check_script(&args),
        Command::Run(args) => run_script(args),
    }
}

fn load_catalog(args: &CatalogArgs) -> Result<LevelCatalog> {
    match args.catalog.as_deref() {
        Some(path) => LevelCatalog::from_json_file(path),
        None => LevelCatalog::builtin(),
    }
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))
}

fn list_levels(args: &CatalogArgs) -> Result<ExitCode> {
    let catalog = load_catalog(args).context("loading level catalog")?;
    for info in catalog.list() {
        println!(
            "{:>2}. {:<24} {:<7} par {:>2}  {}",
            info.number, info.name, info.difficulty, info.par, info.size
        );
        if !info.description.is_empty() {
            println!("    {}", info.description);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn check_script(args: &CheckArgs) -> Result<ExitCode> {
    let script = read_script(&args.script)?;
    let engine = Engine::new(LevelCatalog::builtin()?, SandboxConfig::default())?;
    let check = engine.check(&script);
    println!("Command cost: {}", check.command_cost);
    match check.rejection {
        None => {
            println!("Script passed the safety check");
            Ok(ExitCode::SUCCESS)
        }
        Some(reason) => {
            log::debug!("rejected {}: {reason}", args.script.display());
            println!("Error: Code contains potentially unsafe operations");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_script(args: RunArgs) -> Result<ExitCode> {
    let script = read_script(&args.script)?;
    let catalog = load_catalog(&args.catalog).context("loading level catalog")?;

    let mut config =
        SandboxConfig::from_json_file(args.config.as_deref()).context("loading sandbox config")?;
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(move_limit) = args.move_limit {
        config.move_limit = move_limit;
    }
    config.record_trace |= args.trace;

    let engine = Engine::new(catalog, config)?;
    let report = match engine.run_attempt(args.level, &script) {
        Ok(report) => report,
        Err(AttemptError::Rejected(reason)) => {
            log::debug!("rejected {}: {reason}", args.script.display());
            println!("Error: Code contains potentially unsafe operations");
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("running level {}", args.level));
        }
    };

    print_summary(&report);

    if let Some(path) = args.report_json.as_ref() {
        let json =
            serde_json::to_string_pretty(&report).context("serializing attempt report to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing attempt report to {}", path.display()))?;
        println!("Saved attempt report to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(report: &AttemptReport) {
    println!("Level {}: {}", report.level, report.level_name);
    println!("Outcome: {:?}", report.outcome);
    println!(
        "Bot at ({}, {}) facing {} after {} calls",
        report.state.row, report.state.col, report.state.facing, report.state.moves
    );
    println!("Commands used: {} (par {})", report.command_cost, report.par);
    if let Some(detail) = report.detail.as_deref() {
        println!("Error: {detail}");
    }
    println!("{}", report.message);
}
