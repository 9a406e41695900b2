use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::models::coord::Coord;
use crate::models::game::GameId;

// Which of the three coordinate sets of a board is meant
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoordKind {
    Ship,
    Hit,
    Miss,
}

// Outcome of firing at a single cell of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    AlreadyGuessed,
    Hit,
    Miss,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSummary {
    pub hits: usize,
    pub misses: usize,
    pub remaining: usize,
}

/// One player's side of a game: where their ships are and what the opponent has
/// fired at so far. Hits are always ship cells and misses never are.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Board {
    pub(crate) game_id: GameId,
    pub(crate) owner: String,
    pub(crate) opponent: String,
    pub(crate) grid_size: u8,
    pub(crate) ships: BTreeSet<Coord>,
    pub(crate) hits: BTreeSet<Coord>,
    pub(crate) misses: BTreeSet<Coord>,
}

impl Board {
    pub fn new(game_id: GameId, owner: &str, opponent: &str, grid_size: u8) -> Self {
        Board {
            game_id,
            owner: owner.to_string(),
            opponent: opponent.to_string(),
            grid_size,
            ships: BTreeSet::new(),
            hits: BTreeSet::new(),
            misses: BTreeSet::new(),
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    pub fn grid_size(&self) -> u8 {
        self.grid_size
    }

    /// Adds a ship. Either every cell is added or, on any error, none is.
    pub fn place_ship(&mut self, cells: &[Coord]) -> Result<(), GameError> {
        if cells.is_empty() {
            return Err(GameError::InvalidShip);
        }
        if cells.iter().any(|cell| !cell.in_bounds(self.grid_size)) {
            return Err(GameError::OutOfBounds);
        }

        // overlap with placed ships, or with itself
        let mut fresh = BTreeSet::new();
        for cell in cells {
            if self.ships.contains(cell) || !fresh.insert(*cell) {
                return Err(GameError::Overlap);
            }
        }

        self.ships.append(&mut fresh);
        Ok(())
    }

    pub fn resolve(&mut self, coord: Coord) -> Resolution {
        if self.hits.contains(&coord) || self.misses.contains(&coord) {
            Resolution::AlreadyGuessed
        } else if self.ships.contains(&coord) {
            self.hits.insert(coord);
            Resolution::Hit
        } else {
            self.misses.insert(coord);
            Resolution::Miss
        }
    }

    pub fn has_been_guessed(&self, coord: Coord) -> bool {
        self.hits.contains(&coord) || self.misses.contains(&coord)
    }

    pub fn is_fully_hit(&self) -> bool {
        self.hits.len() == self.ships.len()
    }

    pub fn remaining_ship_cells(&self) -> usize {
        self.ships.len() - self.hits.len()
    }

    pub fn coordinates(&self, kind: CoordKind) -> &BTreeSet<Coord> {
        match kind {
            CoordKind::Ship => &self.ships,
            CoordKind::Hit => &self.hits,
            CoordKind::Miss => &self.misses,
        }
    }

    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            hits: self.hits.len(),
            misses: self.misses.len(),
            remaining: self.remaining_ship_cells(),
        }
    }
}
