//! Player registry and game directory.
//!
//! Every operation the transport layer needs goes through [`Directory`]: it loads
//! records from the [`Store`], runs them through the rules in [`crate::models`] and
//! writes the result back. Mutations of one game are serialized on a per-game lock;
//! creating games is serialized on one pairing lock so two requests can't both see
//! "no active game" for the same pair.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::GameError;
use crate::models::board::{Board, BoardSummary, CoordKind};
use crate::models::coord::{expand_ship, Coord};
use crate::models::game::{Game, GameId, GuessOutcome, MoveRecord};
use crate::models::player::{GameEnd, Player};
use crate::notify::Reminder;
use crate::store::Store;

// What a guess did, plus the state of the board that was fired at
#[derive(Debug, Clone, PartialEq)]
pub struct GuessReport {
    pub outcome: GuessOutcome,
    pub game: Game,
    pub board: BoardSummary,
}

pub struct Directory {
    store: Arc<dyn Store>,
    grid_size: u8,
    pairing: Mutex<()>,
    game_locks: Mutex<HashMap<GameId, Arc<Mutex<()>>>>,
}

impl Directory {
    pub fn new(store: Arc<dyn Store>, grid_size: u8) -> Self {
        Directory {
            store,
            grid_size,
            pairing: Mutex::new(()),
            game_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn grid_size(&self) -> u8 {
        self.grid_size
    }

    async fn lock_game(&self, id: GameId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.game_locks.lock().await;
            // an entry nobody holds or waits on is only referenced by the table, and
            // new holders can only clone it under this same mutex
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /////////////////////////////////////////////////////////////////////////////////
    // Players
    /////////////////////////////////////////////////////////////////////////////////

    pub async fn register(&self, name: &str, email: Option<String>) -> Result<Player, GameError> {
        let player = Player::new(name, email)?;
        self.store.insert_player(&player).await?;
        info!("Registered player {}", player.name);
        Ok(player)
    }

    pub async fn player(&self, name: &str) -> Result<Player, GameError> {
        self.store.player(name).await?.ok_or(GameError::PlayerNotFound)
    }

    /// All players, best win percentage first. Ties go by name.
    pub async fn rankings(&self) -> Result<Vec<Player>, GameError> {
        let mut players = self.store.players().await?;
        players.sort_by(|a, b| {
            b.win_percentage()
                .total_cmp(&a.win_percentage())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(players)
    }

    /////////////////////////////////////////////////////////////////////////////////
    // Games
    /////////////////////////////////////////////////////////////////////////////////

    pub async fn game(&self, id: GameId) -> Result<Game, GameError> {
        self.store.game(id).await?.ok_or(GameError::GameNotFound)
    }

    pub async fn game_by_key(&self, key: &str) -> Result<Game, GameError> {
        self.game(key.parse()?).await
    }

    pub async fn find_active_game_for_pair(&self, a: &str, b: &str) -> Result<Option<Game>, GameError> {
        Ok(self
            .store
            .active_games()
            .await?
            .into_iter()
            .find(|game| game.is_between(a, b)))
    }

    pub async fn new_game(&self, player_1: &str, player_2: &str) -> Result<Game, GameError> {
        let _pairing = self.pairing.lock().await;

        if player_1 == player_2 {
            return Err(GameError::InvalidPlayers);
        }
        for name in [player_1, player_2] {
            if self.store.player(name).await?.is_none() {
                warn!("Unknown player {} in new game request", name);
                return Err(GameError::InvalidPlayers);
            }
        }
        if self.find_active_game_for_pair(player_1, player_2).await?.is_some() {
            return Err(GameError::PlayersAlreadyPlaying);
        }

        let game = self.store.insert_game(player_1, player_2, self.grid_size).await?;
        info!("Game {} created: {} vs {}", game.id(), player_1, player_2);
        Ok(game)
    }

    pub async fn cancel(&self, id: GameId) -> Result<Game, GameError> {
        let _guard = self.lock_game(id).await;
        let mut game = self.game(id).await?;
        game.cancel()?;
        self.store.save_game(&game).await?;
        Ok(game)
    }

    /// Resolves `player`'s guess against the opponent's board. A winning guess
    /// updates both players' stats in the same write as the game.
    pub async fn submit_guess(&self, id: GameId, player: &str, coord: Coord) -> Result<GuessReport, GameError> {
        let _guard = self.lock_game(id).await;
        let mut game = self.game(id).await?;
        let opponent = game.opponent_of(player).ok_or(GameError::InvalidPlayers)?.to_string();
        let mut target = self.find_board_for_player(&game, &opponent).await?;

        let outcome = game.submit_guess(player, coord, &mut target)?;
        match outcome {
            GuessOutcome::Miss | GuessOutcome::Hit => {
                self.store.save_turn(&game, &target, None).await?;
            }
            GuessOutcome::Win => {
                let end = GameEnd { winner: player, loser: &opponent };
                self.store.save_turn(&game, &target, Some(end)).await?;
            }
            // nothing changed
            GuessOutcome::AlreadyGuessed | GuessOutcome::NotYourTurn | GuessOutcome::GameAlreadyOver { .. } => {}
        }

        Ok(GuessReport {
            outcome,
            board: target.summary(),
            game,
        })
    }

    pub async fn history(&self, id: GameId) -> Result<Vec<MoveRecord>, GameError> {
        Ok(self.game(id).await?.moves().to_vec())
    }

    /// Active games, optionally only those `player` takes part in.
    pub async fn list_active_games(&self, player: Option<&str>) -> Result<Vec<Game>, GameError> {
        let games = self.store.active_games().await?;
        Ok(match player {
            Some(name) => games.into_iter().filter(|game| game.involves(name)).collect(),
            None => games,
        })
    }

    pub async fn count_active_games(&self) -> Result<usize, GameError> {
        self.store.count_active_games().await
    }

    /////////////////////////////////////////////////////////////////////////////////
    // Boards
    /////////////////////////////////////////////////////////////////////////////////

    pub async fn find_board_for_player(&self, game: &Game, player: &str) -> Result<Board, GameError> {
        self.store
            .board(game.id(), player)
            .await?
            .ok_or(GameError::BoardNotFound)
    }

    /// `player`'s board in their active game against `opponent`.
    pub async fn board_for_pair(&self, player: &str, opponent: &str) -> Result<(Game, Board), GameError> {
        let game = self
            .find_active_game_for_pair(player, opponent)
            .await?
            .ok_or(GameError::BoardNotFound)?;
        let board = self.find_board_for_player(&game, player).await?;
        Ok((game, board))
    }

    pub async fn place_ship(
        &self,
        player: &str,
        opponent: &str,
        start: Coord,
        length: u8,
        horizontal: bool,
    ) -> Result<Board, GameError> {
        let (game, _) = self.board_for_pair(player, opponent).await?;
        let _guard = self.lock_game(game.id()).await;

        // re-read under the lock, a guess may have ended the game meanwhile
        let game = self.game(game.id()).await?;
        if game.is_over() {
            return Err(GameError::GameAlreadyOver);
        }
        let mut board = self.find_board_for_player(&game, player).await?;
        board.place_ship(&expand_ship(start, length, horizontal))?;
        self.store.save_board(&board).await?;
        Ok(board)
    }

    pub async fn coordinates(&self, player: &str, opponent: &str, kind: CoordKind) -> Result<Vec<Coord>, GameError> {
        let (_, board) = self.board_for_pair(player, opponent).await?;
        Ok(board.coordinates(kind).iter().copied().collect())
    }

    /////////////////////////////////////////////////////////////////////////////////
    // Reminders
    /////////////////////////////////////////////////////////////////////////////////

    /// One reminder per active game whose next player left contact info.
    pub async fn pending_reminders(&self) -> Result<Vec<Reminder>, GameError> {
        let mut reminders = Vec::new();
        for game in self.store.active_games().await? {
            let player = match self.store.player(game.next_player()).await? {
                Some(player) => player,
                None => {
                    warn!("Game {} points at unknown player {}", game.id(), game.next_player());
                    continue;
                }
            };
            if let Some(email) = player.email {
                reminders.push(Reminder {
                    user_name: player.name,
                    email,
                    game_key: game.id().to_string(),
                });
            }
        }
        Ok(reminders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn lock_table_does_not_grow_with_unknown_games() {
        let directory = Directory::new(Arc::new(MemoryStore::new()), 10);
        for id in 1000..1100 {
            assert_eq!(directory.cancel(GameId(id)).await, Err(GameError::GameNotFound));
            assert_eq!(
                directory.submit_guess(GameId(id), "alice", Coord::new(1, 1)).await,
                Err(GameError::GameNotFound)
            );
        }
        // at most the entry of the last released lock is left behind
        assert!(directory.game_locks.lock().await.len() <= 1);
    }

    #[tokio::test]
    async fn held_locks_survive_pruning() {
        let directory = Directory::new(Arc::new(MemoryStore::new()), 10);
        let held = directory.lock_game(GameId(1)).await;
        let _other = directory.lock_game(GameId(2)).await;
        assert!(directory.game_locks.lock().await.contains_key(&GameId(1)));

        drop(held);
        let _again = directory.lock_game(GameId(1)).await;
        assert_eq!(directory.game_locks.lock().await.len(), 2);
    }
}
