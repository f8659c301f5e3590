//! Simulation core for the bot grid puzzle.
//!
//! A level's [`Layout`] is immutable and shared; each attempt builds its own
//! [`Grid`] overlay and [`Actuator`] from it, so no attempt can observe state
//! left behind by another.

pub mod accounting;
pub mod actuator;
pub mod grid;
pub mod level;
pub mod tile;

pub use accounting::count_commands;
pub use actuator::{Action, Actuator, ActuatorState, Halt, Snapshot, Status, DEFAULT_MOVE_LIMIT};
pub use grid::{Cell, Facing, Grid, Layout, LayoutError};
pub use level::{Difficulty, LevelCatalog, LevelError, LevelInfo, LevelSpec};
pub use tile::{Color, Tile};
