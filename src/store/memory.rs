use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::GameError;
use crate::models::board::Board;
use crate::models::game::{Game, GameId};
use crate::models::player::{record_game_end, GameEnd, Player};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    players: HashMap<String, Player>,
    games: BTreeMap<GameId, Game>,
    boards: HashMap<(GameId, String), Board>,
    last_id: u32,
}

/// Process-local store. Every write happens under a single lock, so multi-record
/// writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_player(&self, player: &Player) -> Result<(), GameError> {
        let mut tables = self.tables.write().await;
        if tables.players.contains_key(&player.name) {
            return Err(GameError::DuplicateName);
        }
        tables.players.insert(player.name.clone(), player.clone());
        Ok(())
    }

    async fn player(&self, name: &str) -> Result<Option<Player>, GameError> {
        Ok(self.tables.read().await.players.get(name).cloned())
    }

    async fn players(&self) -> Result<Vec<Player>, GameError> {
        Ok(self.tables.read().await.players.values().cloned().collect())
    }

    async fn insert_game(&self, player_1: &str, player_2: &str, grid_size: u8) -> Result<Game, GameError> {
        let mut tables = self.tables.write().await;
        let id = GameId(tables.last_id + 1);
        let game = Game::new(id, player_1, player_2, grid_size)?;
        tables.last_id = id.0;

        for (owner, opponent) in [(player_1, player_2), (player_2, player_1)] {
            let board = Board::new(id, owner, opponent, grid_size);
            tables.boards.insert((id, owner.to_string()), board);
        }
        tables.games.insert(id, game.clone());
        Ok(game)
    }

    async fn game(&self, id: GameId) -> Result<Option<Game>, GameError> {
        Ok(self.tables.read().await.games.get(&id).cloned())
    }

    async fn active_games(&self) -> Result<Vec<Game>, GameError> {
        Ok(self
            .tables
            .read()
            .await
            .games
            .values()
            .filter(|game| game.is_active())
            .cloned()
            .collect())
    }

    async fn board(&self, game_id: GameId, owner: &str) -> Result<Option<Board>, GameError> {
        Ok(self
            .tables
            .read()
            .await
            .boards
            .get(&(game_id, owner.to_string()))
            .cloned())
    }

    async fn save_board(&self, board: &Board) -> Result<(), GameError> {
        let mut tables = self.tables.write().await;
        tables
            .boards
            .insert((board.game_id(), board.owner().to_string()), board.clone());
        Ok(())
    }

    async fn save_game(&self, game: &Game) -> Result<(), GameError> {
        self.tables.write().await.games.insert(game.id(), game.clone());
        Ok(())
    }

    async fn save_turn(&self, game: &Game, board: &Board, end: Option<GameEnd<'_>>) -> Result<(), GameError> {
        let mut tables = self.tables.write().await;

        // both players are checked before anything is written
        let stats = match end {
            Some(end) => {
                let mut winner = tables.players.get(end.winner).cloned().ok_or(GameError::PlayerNotFound)?;
                let mut loser = tables.players.get(end.loser).cloned().ok_or(GameError::PlayerNotFound)?;
                record_game_end(&mut winner, &mut loser);
                vec![winner, loser]
            }
            None => Vec::new(),
        };

        tables.games.insert(game.id(), game.clone());
        tables
            .boards
            .insert((board.game_id(), board.owner().to_string()), board.clone());
        for player in stats {
            tables.players.insert(player.name.clone(), player);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coord::Coord;

    #[tokio::test]
    async fn duplicate_player_names_are_refused() {
        let store = MemoryStore::new();
        store.insert_player(&Player::new("alice", None).unwrap()).await.unwrap();
        let again = Player::new("alice", Some("other@example.com".into())).unwrap();
        assert_eq!(store.insert_player(&again).await, Err(GameError::DuplicateName));
        assert_eq!(store.player("alice").await.unwrap().unwrap().email, None);
    }

    #[tokio::test]
    async fn new_game_comes_with_two_empty_boards() {
        let store = MemoryStore::new();
        let first = store.insert_game("alice", "bob", 10).await.unwrap();
        let second = store.insert_game("carol", "dave", 10).await.unwrap();
        assert_ne!(first.id(), second.id());

        let board = store.board(first.id(), "bob").await.unwrap().unwrap();
        assert_eq!(board.opponent(), "alice");
        assert_eq!(board.summary().remaining, 0);
        assert!(store.board(first.id(), "carol").await.unwrap().is_none());

        let ids: Vec<GameId> = store.active_games().await.unwrap().iter().map(|g| g.id()).collect();
        assert_eq!(ids, vec![first.id(), second.id()]);
        assert_eq!(store.count_active_games().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn saved_state_is_read_back() {
        let store = MemoryStore::new();
        let mut game = store.insert_game("alice", "bob", 10).await.unwrap();
        let mut board = store.board(game.id(), "bob").await.unwrap().unwrap();
        board.place_ship(&[Coord::new(2, 2)]).unwrap();
        store.save_board(&board).await.unwrap();

        game.cancel().unwrap();
        store.save_game(&game).await.unwrap();

        assert!(store.active_games().await.unwrap().is_empty());
        assert_eq!(store.game(game.id()).await.unwrap(), Some(game));
        assert_eq!(store.board(board.game_id(), "bob").await.unwrap(), Some(board));
    }

    #[tokio::test]
    async fn finished_turns_bump_stored_stats() {
        let store = MemoryStore::new();
        for name in ["alice", "bob"] {
            store.insert_player(&Player::new(name, None).unwrap()).await.unwrap();
        }
        let game = store.insert_game("alice", "bob", 10).await.unwrap();
        let board = store.board(game.id(), "bob").await.unwrap().unwrap();
        let end = GameEnd { winner: "alice", loser: "bob" };

        store.save_turn(&game, &board, Some(end)).await.unwrap();
        store.save_turn(&game, &board, Some(end)).await.unwrap();
        store.save_turn(&game, &board, None).await.unwrap();

        let alice = store.player("alice").await.unwrap().unwrap();
        let bob = store.player("bob").await.unwrap().unwrap();
        assert_eq!((alice.games_played, alice.games_won), (2, 2));
        assert_eq!((bob.games_played, bob.games_won), (2, 0));
    }

    #[tokio::test]
    async fn unknown_player_in_game_end_writes_nothing() {
        let store = MemoryStore::new();
        store.insert_player(&Player::new("alice", None).unwrap()).await.unwrap();
        let mut game = store.insert_game("alice", "bob", 10).await.unwrap();
        let board = store.board(game.id(), "bob").await.unwrap().unwrap();

        game.cancel().unwrap();
        let end = GameEnd { winner: "alice", loser: "bob" };
        assert_eq!(store.save_turn(&game, &board, Some(end)).await, Err(GameError::PlayerNotFound));
        assert!(store.game(game.id()).await.unwrap().unwrap().is_active());
        assert_eq!(store.player("alice").await.unwrap().unwrap().games_won, 0);
    }
}
