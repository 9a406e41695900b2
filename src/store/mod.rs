//! Persistence for players, games and boards.
//!
//! Three logical collections: players keyed by name, games keyed by [`GameId`] and
//! boards keyed by `(GameId, owner)`. The rules engine never talks to a store
//! directly, the [`Directory`](crate::directory::Directory) loads, mutates and saves.

use async_trait::async_trait;

use crate::errors::GameError;
use crate::models::board::Board;
use crate::models::game::{Game, GameId};
use crate::models::player::{GameEnd, Player};

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`GameError::DuplicateName`] when the name is taken.
    async fn insert_player(&self, player: &Player) -> Result<(), GameError>;

    async fn player(&self, name: &str) -> Result<Option<Player>, GameError>;

    async fn players(&self) -> Result<Vec<Player>, GameError>;

    /// Creates a game under a fresh id together with an empty board for each side.
    async fn insert_game(&self, player_1: &str, player_2: &str, grid_size: u8) -> Result<Game, GameError>;

    async fn game(&self, id: GameId) -> Result<Option<Game>, GameError>;

    /// Games that are not over, oldest first.
    async fn active_games(&self) -> Result<Vec<Game>, GameError>;

    async fn count_active_games(&self) -> Result<usize, GameError> {
        Ok(self.active_games().await?.len())
    }

    async fn board(&self, game_id: GameId, owner: &str) -> Result<Option<Board>, GameError>;

    async fn save_board(&self, board: &Board) -> Result<(), GameError>;

    /// Writes the game's state and appends move records not stored yet.
    async fn save_game(&self, game: &Game) -> Result<(), GameError>;

    /// Writes a game and the board that was fired at, all or nothing. When the turn
    /// finished the game, both players' stats are bumped in the same unit, relative to
    /// what is stored rather than to a copy read earlier.
    async fn save_turn(&self, game: &Game, board: &Board, end: Option<GameEnd<'_>>) -> Result<(), GameError>;
}
