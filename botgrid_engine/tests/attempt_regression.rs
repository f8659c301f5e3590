use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use botgrid_engine::{AttemptError, Engine, Outcome, SandboxConfig, ValidationError, Verdict};
use botgrid_sim::{Facing, LevelCatalog};

fn fixture(name: &str) -> Result<String> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).with_context(|| format!("reading fixture {}", path.display()))
}

fn engine(config: SandboxConfig) -> Result<Engine> {
    Engine::new(LevelCatalog::builtin()?, config)
}

fn default_engine() -> Result<Engine> {
    engine(SandboxConfig::default())
}

#[test]
fn tutorial_goal_reaches_finish() -> Result<()> {
    let report = default_engine()?.run_attempt(1, &fixture("tutorial_goal.lua")?)?;

    assert_eq!(report.outcome, Outcome::Goal);
    assert_eq!((report.state.row, report.state.col), (1, 3));
    assert!(report.state.won);
    assert_eq!(report.command_cost, 6);
    assert_eq!(report.par, 3);
    assert_eq!(report.verdict, Verdict::Cleared);
    assert!(report.detail.is_none());
    Ok(())
}

#[test]
fn one_forward_short_stops_beside_the_finish() -> Result<()> {
    let script = "bot.move_forward(); bot.move_forward(); bot.move_forward(); \
                  bot.turn_right(); bot.move_forward()";
    let report = default_engine()?.run_attempt(1, script)?;

    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!((report.state.row, report.state.col), (1, 2));
    assert_eq!(report.state.facing, Facing::Right);
    assert_eq!(report.command_cost, 5);
    assert_eq!(report.verdict, Verdict::Failed);
    assert_eq!(report.message, "Code executed but bot did not reach the goal.");
    Ok(())
}

#[test]
fn loops_earn_a_star_under_par() -> Result<()> {
    let script = "for i = 1, 3 do bot.move_forward() end\n\
                  bot:turn_right()\n\
                  for i = 1, 2 do bot.move_forward() end\n";
    let report = default_engine()?.run_attempt(1, script)?;

    assert_eq!(report.outcome, Outcome::Goal);
    assert_eq!(report.command_cost, 3);
    assert_eq!(report.state.moves, 6);
    assert_eq!(report.verdict, Verdict::Star);
    Ok(())
}

#[test]
fn hazard_restores_bot_and_board() -> Result<()> {
    let catalog = LevelCatalog::builtin()?;
    let pristine: Vec<Vec<u8>> = catalog
        .get(8)?
        .data
        .iter()
        .map(|row| row.iter().map(|tile| tile.code()).collect())
        .collect();

    let script = "bot.turn_left()\nbot.turn_right()\nbot.move_forward()\nbot.turn_left()";
    let report = default_engine()?.run_attempt(8, script)?;

    assert_eq!(report.outcome, Outcome::HazardDeath);
    assert_eq!((report.state.row, report.state.col), (6, 3));
    assert_eq!(report.state.facing, Facing::Up);
    assert_eq!(report.state.moves, 0);
    assert!(report.state.alive);
    assert!(!report.state.won);
    assert_eq!(report.board, pristine);
    assert_eq!(report.message, "Bot died! Try a different approach.");
    Ok(())
}

#[test]
fn key_hunt_opens_the_gates() -> Result<()> {
    let report = default_engine()?.run_attempt(9, &fixture("key_hunt.lua")?)?;

    assert_eq!(report.outcome, Outcome::Goal);
    assert_eq!((report.state.row, report.state.col), (7, 1));
    // key cell and both yellow gates are blank now
    assert_eq!(report.board[1][7], 0);
    assert_eq!(report.board[6][1], 0);
    assert_eq!(report.board[7][2], 0);
    Ok(())
}

#[test]
fn spinning_script_hits_the_move_limit() -> Result<()> {
    let config = SandboxConfig {
        move_limit: 500,
        ..SandboxConfig::default()
    };
    let report = engine(config)?.run_attempt(1, &fixture("spin.lua")?)?;

    assert_eq!(report.outcome, Outcome::MoveLimitExceeded);
    assert_eq!((report.state.row, report.state.col), (4, 1));
    assert_eq!(
        report.message,
        "Too many moves or too much time. Check for infinite loops!"
    );
    Ok(())
}

#[test]
fn busy_loop_times_out_at_the_starting_pose() -> Result<()> {
    let config = SandboxConfig {
        timeout_ms: 300,
        ..SandboxConfig::default()
    };
    let report = engine(config)?.run_attempt(1, "bot.move_forward() while true do end")?;

    assert_eq!(report.outcome, Outcome::Timeout);
    assert_eq!(report.verdict, Verdict::Failed);
    assert_eq!((report.state.row, report.state.col), (4, 1));
    assert_eq!(report.state.moves, 0);
    assert!(report.elapsed_ms < 5_000, "took {}ms", report.elapsed_ms);
    Ok(())
}

#[test]
fn runtime_errors_keep_their_detail() -> Result<()> {
    let script = "bot.move_forward()\nlocal x = nil\nx.y = 1";
    let report = default_engine()?.run_attempt(1, script)?;

    assert_eq!(report.outcome, Outcome::RuntimeError);
    assert_eq!((report.state.row, report.state.col), (3, 1));
    let detail = report.detail.context("runtime error detail")?;
    assert!(!detail.is_empty());
    assert_eq!(report.message, "Execution error in your code.");
    Ok(())
}

#[test]
fn unsafe_scripts_never_run() -> Result<()> {
    let err = default_engine()?
        .run_attempt(1, &fixture("escape.lua")?)
        .expect_err("script should be rejected");

    match err {
        AttemptError::Rejected(reason) => {
            assert_eq!(reason, ValidationError::DisallowedModule("os".into()));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    Ok(())
}

#[test]
fn unknown_levels_are_errors() -> Result<()> {
    let err = default_engine()?
        .run_attempt(42, "bot.move_forward()")
        .expect_err("level 42 does not exist");
    assert!(matches!(err, AttemptError::UnknownLevel(_)));
    assert!(err.to_string().contains("1-15"));
    Ok(())
}

#[test]
fn attempts_do_not_share_state() -> Result<()> {
    let engine = default_engine()?;
    let first = engine.run_attempt(9, &fixture("key_hunt.lua")?)?;
    assert_eq!(first.outcome, Outcome::Goal);

    let second = engine.run_attempt(9, "bot.turn_left()")?;
    assert_eq!(second.outcome, Outcome::Exhausted);
    assert_eq!((second.state.row, second.state.col), (1, 1));
    assert_eq!(second.board[1][7], 4);
    assert_eq!(second.board[6][1], 5);
    Ok(())
}

#[test]
fn trace_is_recorded_on_request() -> Result<()> {
    let config = SandboxConfig {
        record_trace: true,
        ..SandboxConfig::default()
    };
    let report = engine(config)?.run_attempt(1, &fixture("tutorial_goal.lua")?)?;

    assert_eq!(report.trace.len(), 7);
    let last = report.trace.last().context("final frame")?;
    assert!(last.won);
    assert_eq!((last.row, last.col), (1, 3));

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["outcome"], "goal");
    assert_eq!(json["verdict"], "cleared");
    assert_eq!(json["trace"][0]["action"], "start");
    Ok(())
}
