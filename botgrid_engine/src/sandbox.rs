//! Embedded Lua host for player scripts.
//!
//! Each execution gets a fresh Lua state with no standard libraries and a
//! chunk environment holding only `bot`. Actuator signals are recorded on
//! the binding before they unwind the script as Lua errors, so the outcome
//! is read from the recorded signal and never parsed back out of an error
//! message.

use std::cell::{Cell as FlagCell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use botgrid_sim::{Actuator, ActuatorState, Grid, Halt, Layout, Snapshot};
use mlua::{
    Error as LuaError, HookTriggers, IntoLuaMulti, Lua, LuaOptions, Result as LuaResult,
    StdLib, Table, Value, Variadic, VmState,
};
use serde::Serialize;

use crate::config::SandboxConfig;

/// How an attempt ended. Exactly one applies per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Goal,
    HazardDeath,
    MoveLimitExceeded,
    Timeout,
    RuntimeError,
    Exhausted,
}

impl Outcome {
    /// Runaway scripts: the caller should suggest checking for infinite loops.
    pub fn is_resource_violation(self) -> bool {
        matches!(self, Outcome::MoveLimitExceeded | Outcome::Timeout)
    }
}

impl From<Halt> for Outcome {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Goal => Outcome::Goal,
            Halt::HazardDeath => Outcome::HazardDeath,
            Halt::MoveLimitExceeded { .. } => Outcome::MoveLimitExceeded,
        }
    }
}

/// Result of running one script to completion or to its first signal.
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: Outcome,
    pub detail: Option<String>,
    pub state: ActuatorState,
    pub board: Vec<Vec<u8>>,
    pub trace: Vec<Snapshot>,
}

impl Execution {
    /// Every timed-out attempt reports the bot at its starting pose, whether
    /// the in-VM hook or the caller's deadline fired first.
    pub(crate) fn timed_out(layout: Arc<Layout>) -> Self {
        let actuator = Actuator::new(Grid::new(layout));
        Self {
            outcome: Outcome::Timeout,
            detail: None,
            state: actuator.state(),
            board: actuator.grid().to_codes(),
            trace: Vec::new(),
        }
    }
}

struct BotBinding {
    actuator: Actuator,
    halt: Option<Halt>,
}

impl BotBinding {
    fn dispatch<T>(&mut self, op: impl FnOnce(&mut Actuator) -> Result<T, Halt>) -> LuaResult<T> {
        if let Some(halt) = self.halt {
            return Err(LuaError::external(halt));
        }
        op(&mut self.actuator).map_err(|halt| {
            self.halt = Some(halt);
            LuaError::external(halt)
        })
    }
}

/// Runs `source` against a fresh actuator on the current thread. The caller
/// is expected to have validated the script already.
pub fn execute(
    layout: Arc<Layout>,
    source: &str,
    config: &SandboxConfig,
    cancel: Arc<AtomicBool>,
) -> Result<Execution> {
    let mut actuator = Actuator::new(Grid::new(layout.clone())).with_move_limit(config.move_limit);
    if config.record_trace {
        actuator = actuator.recording();
    }
    let binding = Rc::new(RefCell::new(BotBinding {
        actuator,
        halt: None,
    }));

    let lua = Lua::new_with(StdLib::NONE, LuaOptions::default())
        .map_err(|err| anyhow!("initialising sandbox Lua state: {err}"))?;
    if let Err(err) = lua.set_memory_limit(config.memory_limit_bytes) {
        log::debug!("sandbox memory limit unavailable: {err}");
    }

    let env = lua
        .create_table()
        .map_err(|err| anyhow!("creating script environment: {err}"))?;
    let bot = install_bot(&lua, binding.clone())
        .map_err(|err| anyhow!("installing bot bindings: {err}"))?;
    env.set("bot", bot)
        .map_err(|err| anyhow!("exposing bot to the script: {err}"))?;

    let started = Instant::now();
    let budget = config.timeout();
    let expired = Rc::new(FlagCell::new(false));
    let hook_expired = expired.clone();
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(config.hook_interval.max(1)),
        move |_lua, _debug| {
            if cancel.load(Ordering::Relaxed) || started.elapsed() >= budget {
                hook_expired.set(true);
                return Err(LuaError::RuntimeError(format!(
                    "script exceeded its {}ms budget",
                    budget.as_millis()
                )));
            }
            Ok(VmState::Continue)
        },
    );
    let result = lua
        .load(source)
        .set_name("player_script")
        .set_environment(env)
        .exec();
    lua.remove_hook();

    let mut binding = binding.borrow_mut();
    let (outcome, detail) = match (result, binding.halt) {
        (_, Some(halt)) => (Outcome::from(halt), None),
        (Ok(()), None) => (Outcome::Exhausted, None),
        (Err(_), None) if expired.get() => return Ok(Execution::timed_out(layout)),
        (Err(err), None) => {
            log::debug!("player script raised: {err}");
            (Outcome::RuntimeError, Some(err.to_string()))
        }
    };

    Ok(Execution {
        outcome,
        detail,
        state: binding.actuator.state(),
        board: binding.actuator.grid().to_codes(),
        trace: binding.actuator.take_trace(),
    })
}

fn install_bot(lua: &Lua, binding: Rc<RefCell<BotBinding>>) -> LuaResult<Table> {
    let bot = lua.create_table()?;
    bind(lua, &bot, "move_forward", binding.clone(), Actuator::move_forward)?;
    bind(lua, &bot, "move_backward", binding.clone(), Actuator::move_backward)?;
    bind(lua, &bot, "turn_left", binding.clone(), Actuator::turn_left)?;
    bind(lua, &bot, "turn_right", binding.clone(), Actuator::turn_right)?;
    bind(lua, &bot, "can_move", binding.clone(), Actuator::can_move)?;
    bind(lua, &bot, "can_move_back", binding, Actuator::can_move_back)?;
    Ok(bot)
}

// Arguments are ignored so both `bot.f()` and `bot:f()` work.
fn bind<T, F>(
    lua: &Lua,
    bot: &Table,
    name: &str,
    binding: Rc<RefCell<BotBinding>>,
    op: F,
) -> LuaResult<()>
where
    T: IntoLuaMulti + 'static,
    F: Fn(&mut Actuator) -> Result<T, Halt> + 'static,
{
    let function = lua.create_function(move |_, _: Variadic<Value>| {
        binding.borrow_mut().dispatch(&op)
    })?;
    bot.set(name, function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use botgrid_sim::LevelCatalog;

    fn run(level: usize, source: &str) -> Execution {
        let layout = LevelCatalog::builtin()
            .expect("catalog")
            .layout(level)
            .expect("layout");
        execute(
            layout,
            source,
            &SandboxConfig::default(),
            Arc::new(AtomicBool::new(false)),
        )
        .expect("execution")
    }

    #[test]
    fn method_and_field_call_forms_both_drive_the_bot() {
        let execution = run(1, "bot.move_forward()\nbot:move_forward()\nbot.turn_right()");
        assert_eq!(execution.outcome, Outcome::Exhausted);
        assert_eq!((execution.state.row, execution.state.col), (2, 1));
        assert_eq!(execution.state.moves, 3);
    }

    #[test]
    fn statements_after_the_goal_never_run() {
        let script = "for i = 1, 3 do bot.move_forward() end\n\
                      bot.turn_right()\n\
                      bot.move_forward()\n\
                      bot.move_forward()\n\
                      bot.turn_left()\n\
                      bot.turn_left()";
        let execution = run(1, script);
        assert_eq!(execution.outcome, Outcome::Goal);
        assert!(execution.state.won);
        assert_eq!(execution.state.moves, 6);
    }

    #[test]
    fn standard_libraries_are_not_reachable() {
        let execution = run(1, "print('hello')");
        assert_eq!(execution.outcome, Outcome::RuntimeError);
        assert!(execution.detail.is_some());

        let execution = run(1, "local s = ('x'):rep(3)");
        assert_eq!(execution.outcome, Outcome::RuntimeError);
    }

    #[test]
    fn cancellation_stops_a_spinning_script() {
        let layout = LevelCatalog::builtin()
            .expect("catalog")
            .layout(1)
            .expect("layout");
        let execution = execute(
            layout,
            "while true do end",
            &SandboxConfig::default(),
            Arc::new(AtomicBool::new(true)),
        )
        .expect("execution");
        assert_eq!(execution.outcome, Outcome::Timeout);
    }

    #[test]
    fn timeouts_report_the_starting_pose() {
        let layout = LevelCatalog::builtin()
            .expect("catalog")
            .layout(1)
            .expect("layout");
        let config = SandboxConfig {
            timeout_ms: 100,
            record_trace: true,
            ..SandboxConfig::default()
        };
        let execution = execute(
            layout,
            "bot.move_forward()\nwhile true do end",
            &config,
            Arc::new(AtomicBool::new(false)),
        )
        .expect("execution");
        assert_eq!(execution.outcome, Outcome::Timeout);
        assert_eq!((execution.state.row, execution.state.col), (4, 1));
        assert_eq!(execution.state.moves, 0);
        assert!(execution.trace.is_empty());
    }

    #[test]
    fn recorded_trace_starts_at_the_initial_pose() {
        let layout = LevelCatalog::builtin()
            .expect("catalog")
            .layout(1)
            .expect("layout");
        let config = SandboxConfig {
            record_trace: true,
            ..SandboxConfig::default()
        };
        let execution = execute(
            layout,
            "bot.turn_left()",
            &config,
            Arc::new(AtomicBool::new(false)),
        )
        .expect("execution");
        assert_eq!(execution.trace.len(), 2);
        assert_eq!((execution.trace[0].row, execution.trace[0].col), (4, 1));
    }
}
