//! Tile kinds and the predicates movement relies on.

use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key/gate pair colors. Each color names exactly one key and one gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Yellow,
    Red,
    Blue,
    Green,
    Purple,
}

impl Color {
    pub const ALL: [Color; 5] = [
        Color::Yellow,
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Purple,
    ];

    fn key_code(self) -> u8 {
        match self {
            Color::Yellow => 4,
            Color::Red => 6,
            Color::Blue => 8,
            Color::Green => 10,
            Color::Purple => 12,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Color::Yellow => "yellow",
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Purple => "purple",
        };
        f.write_str(label)
    }
}

/// One cell of a level board.
///
/// Level files store tiles as small integers (`0` blank through `13` purple
/// gate); [`Tile::code`] and [`Tile::from_code`] convert between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tile {
    Blank,
    Wall,
    ZappyWall,
    Finish,
    Key(Color),
    Gate(Color),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown tile code {0}")]
pub struct UnknownTileCode(pub u8);

impl Tile {
    /// Walls and every gate stop movement.
    pub fn is_blocking(self) -> bool {
        matches!(self, Tile::Wall | Tile::Gate(_))
    }

    pub fn is_hazard(self) -> bool {
        matches!(self, Tile::ZappyWall)
    }

    pub fn is_goal(self) -> bool {
        matches!(self, Tile::Finish)
    }

    pub fn key_color(self) -> Option<Color> {
        match self {
            Tile::Key(color) => Some(color),
            _ => None,
        }
    }

    pub fn gate_color(self) -> Option<Color> {
        match self {
            Tile::Gate(color) => Some(color),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Tile::Blank => 0,
            Tile::Wall => 1,
            Tile::ZappyWall => 2,
            Tile::Finish => 3,
            Tile::Key(color) => color.key_code(),
            Tile::Gate(color) => color.key_code() + 1,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, UnknownTileCode> {
        match code {
            0 => Ok(Tile::Blank),
            1 => Ok(Tile::Wall),
            2 => Ok(Tile::ZappyWall),
            3 => Ok(Tile::Finish),
            4..=13 => {
                let color = Color::ALL[usize::from((code - 4) / 2)];
                if code % 2 == 0 {
                    Ok(Tile::Key(color))
                } else {
                    Ok(Tile::Gate(color))
                }
            }
            other => Err(UnknownTileCode(other)),
        }
    }
}

impl TryFrom<u8> for Tile {
    type Error = UnknownTileCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Tile::from_code(code)
    }
}

impl From<Tile> for u8 {
    fn from(tile: Tile) -> Self {
        tile.code()
    }
}
