use std::{fmt, fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{Cell, Facing, Layout, LayoutError};
use crate::tile::Tile;

const BUILTIN_LEVELS: &str = include_str!("../data/levels.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
        };
        f.pad(label)
    }
}

/// One level as stored in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub par: u32,
    pub start_pos: (usize, usize),
    pub start_dir: u8,
    pub data: Vec<Vec<Tile>>,
}

impl LevelSpec {
    pub fn layout(&self) -> Result<Layout, LevelError> {
        let facing =
            Facing::from_index(self.start_dir).ok_or_else(|| LevelError::BadFacing {
                name: self.name.clone(),
                index: self.start_dir,
            })?;
        let (row, col) = self.start_pos;
        Layout::new(self.data.clone(), Cell::new(row, col), facing, self.par).map_err(|source| {
            LevelError::Layout {
                name: self.name.clone(),
                source,
            }
        })
    }

    fn size_label(&self) -> String {
        let cols = self.data.first().map(Vec::len).unwrap_or(0);
        format!("{}x{}", self.data.len(), cols)
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level {requested} does not exist; available levels: 1-{available}")]
    Unknown { requested: usize, available: usize },
    #[error("level '{name}' has start direction {index}; expected 0-3")]
    BadFacing { name: String, index: u8 },
    #[error("level '{name}' has an invalid layout")]
    Layout {
        name: String,
        #[source]
        source: LayoutError,
    },
}

/// Summary of a level without its board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub number: usize,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub par: u32,
    pub size: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelCatalog {
    levels: Vec<LevelSpec>,
}

impl LevelCatalog {
    /// The levels shipped with the game, in play order.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_LEVELS).context("parsing built-in level catalog")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read level catalog: {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("failed to parse level catalog: {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let catalog: LevelCatalog = serde_json::from_str(raw)?;
        for spec in &catalog.levels {
            spec.layout()?;
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level ids are 1-based.
    pub fn get(&self, id: usize) -> Result<&LevelSpec, LevelError> {
        id.checked_sub(1)
            .and_then(|index| self.levels.get(index))
            .ok_or(LevelError::Unknown {
                requested: id,
                available: self.levels.len(),
            })
    }

    pub fn layout(&self, id: usize) -> Result<Arc<Layout>, LevelError> {
        self.get(id)?.layout().map(Arc::new)
    }

    pub fn info(&self, id: usize) -> Result<LevelInfo, LevelError> {
        let spec = self.get(id)?;
        Ok(LevelInfo {
            number: id,
            name: spec.name.clone(),
            description: spec.description.clone(),
            difficulty: spec.difficulty,
            par: spec.par,
            size: spec.size_label(),
        })
    }

    pub fn list(&self) -> Vec<LevelInfo> {
        (1..=self.levels.len())
            .filter_map(|id| self.info(id).ok())
            .collect()
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<usize> {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.difficulty == difficulty)
            .map(|(index, _)| index + 1)
            .collect()
    }
}
