use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Run player scripts against bot grid puzzle levels", version)]
pub struct Args {
    /// Lua script that drives the bot
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Level number to attempt (1-based)
    #[arg(long)]
    pub level: Option<usize>,

    /// Path to write the attempt report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Record a replay snapshot after every bot call (included in --report-json)
    #[arg(long)]
    pub trace: bool,

    /// Validate and cost the script without running it (requires --script)
    #[arg(long)]
    pub check: bool,

    /// Print the level catalog and exit
    #[arg(long)]
    pub list_levels: bool,

    /// JSON level catalog to use instead of the built-in levels
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// JSON sandbox configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the wall-clock budget per attempt
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Override the bot call limit per attempt
    #[arg(long)]
    pub move_limit: Option<u32>,
}

#[derive(Debug)]
pub enum Command {
    Run(RunArgs),
    Check(CheckArgs),
    ListLevels(CatalogArgs),
}

#[derive(Debug)]
pub struct CatalogArgs {
    pub catalog: Option<PathBuf>,
}

#[derive(Debug)]
pub struct CheckArgs {
    pub script: PathBuf,
}

#[derive(Debug)]
pub struct RunArgs {
    pub script: PathBuf,
    pub level: usize,
    pub report_json: Option<PathBuf>,
    pub trace: bool,
    pub catalog: CatalogArgs,
    pub config: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub move_limit: Option<u32>,
}

pub fn parse() -> Result<Command> {
    let args = Args::parse();
    args.into_command()
}

impl Args {
    fn into_command(self) -> Result<Command> {
        if self.list_levels {
            if self.check || self.script.is_some() {
                bail!("--list-levels cannot be combined with --script or --check");
            }
            return Ok(Command::ListLevels(CatalogArgs {
                catalog: self.catalog,
            }));
        }

        let Some(script) = self.script else {
            bail!("--script is required unless --list-levels is given");
        };

        if self.check {
            if self.level.is_some() || self.report_json.is_some() || self.trace {
                bail!("--check does not run the script; drop --level, --report-json and --trace");
            }
            if self.catalog.is_some()
                || self.config.is_some()
                || self.timeout_ms.is_some()
                || self.move_limit.is_some()
            {
                bail!("--check only inspects the script; drop --catalog, --config, --timeout-ms and --move-limit");
            }
            return Ok(Command::Check(CheckArgs { script }));
        }

        let Some(level) = self.level else {
            bail!("--level is required to run a script");
        };
        if self.trace && self.report_json.is_none() {
            bail!("--trace requires --report-json");
        }

        Ok(Command::Run(RunArgs {
            script,
            level,
            report_json: self.report_json,
            trace: self.trace,
            catalog: CatalogArgs {
                catalog: self.catalog,
            },
            config: self.config,
            timeout_ms: self.timeout_ms,
            move_limit: self.move_limit,
        }))
    }
}
