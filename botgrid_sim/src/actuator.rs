//! The bot: a single actuator stepping across one attempt's [`Grid`].
//!
//! Every operation bills one move against the hard move limit before doing
//! anything else. Movement can end the attempt early by returning a [`Halt`]
//! signal: reaching the goal, or stepping onto a zappy wall. Callers running a
//! script treat a `Halt` as "stop executing now" rather than as a fault.

use serde::Serialize;
use thiserror::Error;

use crate::grid::{Cell, Facing, Grid};

pub const DEFAULT_MOVE_LIMIT: u32 = 10_000;

/// Signals that unwind the running script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Halt {
    #[error("the bot reached the finish tile")]
    Goal,
    #[error("the bot stepped onto a zappy wall")]
    HazardDeath,
    #[error("too many moves taken (limit {limit})")]
    MoveLimitExceeded { limit: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Won,
    /// Only observable between a hazard hit and the reset that follows it.
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Start,
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    CanMove,
    CanMoveBack,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::MoveForward => "move_forward",
            Action::MoveBackward => "move_backward",
            Action::TurnLeft => "turn_left",
            Action::TurnRight => "turn_right",
            Action::CanMove => "can_move",
            Action::CanMoveBack => "can_move_back",
        }
    }
}

/// Externally visible actuator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActuatorState {
    pub row: usize,
    pub col: usize,
    pub facing: Facing,
    pub alive: bool,
    pub won: bool,
    pub moves: u32,
}

/// Replay frame captured after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub step: usize,
    pub action: Action,
    pub row: usize,
    pub col: usize,
    pub facing: Facing,
    pub alive: bool,
    pub won: bool,
}

#[derive(Debug)]
pub struct Actuator {
    grid: Grid,
    cell: Cell,
    facing: Facing,
    alive: bool,
    won: bool,
    moves: u32,
    move_limit: u32,
    trace: Option<Vec<Snapshot>>,
}

impl Actuator {
    /// Binds a new actuator at the layout's start pose. The grid is reset so
    /// the attempt never starts from a dirty overlay.
    pub fn new(mut grid: Grid) -> Self {
        grid.reset();
        let cell = grid.layout().start();
        let facing = grid.layout().start_facing();
        Self {
            grid,
            cell,
            facing,
            alive: true,
            won: false,
            moves: 0,
            move_limit: DEFAULT_MOVE_LIMIT,
            trace: None,
        }
    }

    pub fn with_move_limit(mut self, move_limit: u32) -> Self {
        self.move_limit = move_limit;
        self
    }

    /// Enables replay capture, starting with a frame of the initial pose.
    pub fn recording(mut self) -> Self {
        self.trace = Some(Vec::new());
        self.capture(Action::Start);
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn position(&self) -> Cell {
        self.cell
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn has_won(&self) -> bool {
        self.won
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn move_limit(&self) -> u32 {
        self.move_limit
    }

    pub fn status(&self) -> Status {
        if self.won {
            Status::Won
        } else if !self.alive {
            Status::Dead
        } else {
            Status::Active
        }
    }

    pub fn state(&self) -> ActuatorState {
        ActuatorState {
            row: self.cell.row,
            col: self.cell.col,
            facing: self.facing,
            alive: self.alive,
            won: self.won,
            moves: self.moves,
        }
    }

    pub fn trace(&self) -> &[Snapshot] {
        self.trace.as_deref().unwrap_or(&[])
    }

    pub fn take_trace(&mut self) -> Vec<Snapshot> {
        self.trace.take().unwrap_or_default()
    }

    pub fn move_forward(&mut self) -> Result<(), Halt> {
        self.bill()?;
        let result = self.advance(self.facing);
        self.capture(Action::MoveForward);
        result
    }

    pub fn move_backward(&mut self) -> Result<(), Halt> {
        self.bill()?;
        let result = self.advance(self.facing.reversed());
        self.capture(Action::MoveBackward);
        result
    }

    pub fn turn_left(&mut self) -> Result<(), Halt> {
        self.bill()?;
        self.facing = self.facing.turned_left();
        self.capture(Action::TurnLeft);
        Ok(())
    }

    pub fn turn_right(&mut self) -> Result<(), Halt> {
        self.bill()?;
        self.facing = self.facing.turned_right();
        self.capture(Action::TurnRight);
        Ok(())
    }

    /// True when the cell ahead is on the board and neither blocking nor a
    /// hazard. Movement itself does not refuse hazards.
    pub fn can_move(&mut self) -> Result<bool, Halt> {
        self.bill()?;
        let open = self.is_safe(self.facing);
        self.capture(Action::CanMove);
        Ok(open)
    }

    pub fn can_move_back(&mut self) -> Result<bool, Halt> {
        self.bill()?;
        let open = self.is_safe(self.facing.reversed());
        self.capture(Action::CanMoveBack);
        Ok(open)
    }

    fn bill(&mut self) -> Result<(), Halt> {
        self.moves = self.moves.saturating_add(1);
        if self.moves > self.move_limit {
            return Err(Halt::MoveLimitExceeded {
                limit: self.move_limit,
            });
        }
        Ok(())
    }

    fn is_safe(&self, direction: Facing) -> bool {
        self.cell
            .step(direction)
            .and_then(|target| self.grid.try_get(target))
            .map(|tile| !tile.is_blocking() && !tile.is_hazard())
            .unwrap_or(false)
    }

    fn advance(&mut self, direction: Facing) -> Result<(), Halt> {
        if !self.alive || self.won {
            return Ok(());
        }
        let Some((target, tile)) = self
            .cell
            .step(direction)
            .and_then(|target| self.grid.try_get(target).map(|tile| (target, tile)))
        else {
            return Ok(());
        };
        if tile.is_blocking() {
            return Ok(());
        }
        if tile.is_hazard() {
            self.alive = false;
            log::debug!("bot zapped at {target}; restarting attempt");
            self.restart();
            return Err(Halt::HazardDeath);
        }
        if let Some(color) = tile.key_color() {
            self.grid.collect_key(color, target);
        }
        self.cell = target;
        if self.grid.get(target.row, target.col).is_goal() {
            self.won = true;
            return Err(Halt::Goal);
        }
        Ok(())
    }

    /// Returns the bot and its grid to the attempt's initial state. `alive`
    /// comes back as `true`; the death is only reported through the signal.
    fn restart(&mut self) {
        let layout = self.grid.layout().clone();
        self.cell = layout.start();
        self.facing = layout.start_facing();
        self.alive = true;
        self.won = false;
        self.moves = 0;
        self.grid.reset();
    }

    fn capture(&mut self, action: Action) {
        let Some(trace) = self.trace.as_mut() else {
            return;
        };
        trace.push(Snapshot {
            step: trace.len(),
            action,
            row: self.cell.row,
            col: self.cell.col,
            facing: self.facing,
            alive: self.alive,
            won: self.won,
        });
    }
}
