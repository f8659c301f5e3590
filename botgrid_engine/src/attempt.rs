use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

use anyhow::Result;
use botgrid_sim::{count_commands, ActuatorState, Layout, LevelCatalog, LevelError, Snapshot};
use crossbeam_channel::RecvTimeoutError;
use serde::Serialize;
use thiserror::Error;

use crate::config::SandboxConfig;
use crate::sandbox::{self, Execution, Outcome};
use crate::validate::{ValidationError, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Reached the goal within par.
    Star,
    Cleared,
    Failed,
}

impl Verdict {
    pub fn grade(outcome: Outcome, command_cost: usize, par: u32) -> Self {
        match outcome {
            Outcome::Goal if command_cost <= par as usize => Verdict::Star,
            Outcome::Goal => Verdict::Cleared,
            _ => Verdict::Failed,
        }
    }

    /// Player-facing summary line for an attempt.
    pub fn message(self, outcome: Outcome) -> &'static str {
        match (self, outcome) {
            (Verdict::Star, _) => "STAR! You completed the level efficiently!",
            (Verdict::Cleared, _) => "Success! But try to use fewer commands for a star.",
            (Verdict::Failed, Outcome::HazardDeath) => "Bot died! Try a different approach.",
            (Verdict::Failed, outcome) if outcome.is_resource_violation() => {
                "Too many moves or too much time. Check for infinite loops!"
            }
            (Verdict::Failed, Outcome::RuntimeError) => "Execution error in your code.",
            (Verdict::Failed, _) => "Code executed but bot did not reach the goal.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptReport {
    pub level: usize,
    pub level_name: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub state: ActuatorState,
    pub board: Vec<Vec<u8>>,
    pub command_cost: usize,
    pub par: u32,
    pub verdict: Verdict,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<Snapshot>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    UnknownLevel(#[from] LevelError),
    #[error("code contains potentially unsafe operations")]
    Rejected(#[source] ValidationError),
    #[error("attempt worker failed: {0}")]
    Worker(String),
}

/// Static verdict on a script without running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCheck {
    pub command_cost: usize,
    pub rejection: Option<ValidationError>,
}

impl ScriptCheck {
    pub fn is_safe(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Runs player scripts against catalog levels. Holds no per-attempt state, so
/// one engine serves any number of sequential attempts.
pub struct Engine {
    catalog: LevelCatalog,
    config: SandboxConfig,
    validator: Validator,
}

impl Engine {
    pub fn new(catalog: LevelCatalog, config: SandboxConfig) -> Result<Self> {
        Ok(Self {
            catalog,
            config,
            validator: Validator::new()?,
        })
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn check(&self, script: &str) -> ScriptCheck {
        ScriptCheck {
            command_cost: count_commands(script),
            rejection: self.validator.validate(script).err(),
        }
    }

    pub fn run_attempt(&self, level_id: usize, script: &str) -> Result<AttemptReport, AttemptError> {
        let spec = self.catalog.get(level_id)?;
        let layout = Arc::new(spec.layout()?);
        let command_cost = count_commands(script);

        if let Err(reason) = self.validator.validate(script) {
            log::debug!("level {level_id}: rejected script: {reason}");
            return Err(AttemptError::Rejected(reason));
        }

        let started = Instant::now();
        let execution = run_on_worker(layout.clone(), script, &self.config)?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let verdict = Verdict::grade(execution.outcome, command_cost, layout.par());
        log::info!(
            "level {level_id} ({}): {:?} in {elapsed_ms}ms, cost {command_cost}/{} -> {:?}",
            spec.name,
            execution.outcome,
            layout.par(),
            verdict
        );

        Ok(AttemptReport {
            level: level_id,
            level_name: spec.name.clone(),
            outcome: execution.outcome,
            detail: execution.detail,
            state: execution.state,
            board: execution.board,
            command_cost,
            par: layout.par(),
            verdict,
            message: verdict.message(execution.outcome),
            trace: execution.trace,
            elapsed_ms,
        })
    }
}

fn run_on_worker(
    layout: Arc<Layout>,
    script: &str,
    config: &SandboxConfig,
) -> Result<Execution, AttemptError> {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let cancel = Arc::new(AtomicBool::new(false));

    let worker_layout = layout.clone();
    let worker_script = script.to_string();
    let worker_config = config.clone();
    let worker_cancel = cancel.clone();
    thread::Builder::new()
        .name("botgrid-attempt".to_string())
        .spawn(move || {
            let result =
                sandbox::execute(worker_layout, &worker_script, &worker_config, worker_cancel)
                    .map_err(|err| format!("{err:#}"));
            // The receiver is gone once the caller has given up on us.
            let _ = sender.send(result);
        })
        .map_err(|err| AttemptError::Worker(format!("spawning attempt thread: {err}")))?;

    match receiver.recv_timeout(config.timeout()) {
        Ok(Ok(execution)) => Ok(execution),
        Ok(Err(message)) => Err(AttemptError::Worker(message)),
        Err(RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            log::warn!(
                "attempt missed its {}ms deadline; abandoning worker",
                config.timeout_ms
            );
            Ok(Execution::timed_out(layout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(AttemptError::Worker(
            "attempt thread exited without a result".to_string(),
        )),
    }
}
