use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::mysql::{MySqlConnection, MySqlPool};

use crate::errors::GameError;
use crate::models::board::Board;
use crate::models::coord::{from_bitmap, to_bitmap};
use crate::models::game::{Game, GameId, MoveRecord, MoveResult, Winner};
use crate::models::player::{GameEnd, Player};
use crate::store::Store;

// Tables are created on connect when missing
const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS player (
        name VARCHAR(64) NOT NULL PRIMARY KEY,
        email VARCHAR(255) NULL,
        games_played INT UNSIGNED NOT NULL DEFAULT 0,
        games_won INT UNSIGNED NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS game (
        id INT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
        player_1 VARCHAR(64) NOT NULL,
        player_2 VARCHAR(64) NOT NULL,
        grid_size TINYINT UNSIGNED NOT NULL,
        game_over BOOLEAN NOT NULL DEFAULT FALSE,
        next_player VARCHAR(64) NOT NULL,
        winner VARCHAR(64) NULL,
        created TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        finished TIMESTAMP NULL
    )",
    "CREATE TABLE IF NOT EXISTS board (
        game_id INT UNSIGNED NOT NULL,
        user_name VARCHAR(64) NOT NULL,
        opponent VARCHAR(64) NOT NULL,
        grid_size TINYINT UNSIGNED NOT NULL,
        ship_map VARBINARY(32) NOT NULL,
        hit_map VARBINARY(32) NOT NULL,
        miss_map VARBINARY(32) NOT NULL,
        PRIMARY KEY (game_id, user_name)
    )",
    "CREATE TABLE IF NOT EXISTS game_move (
        game_id INT UNSIGNED NOT NULL,
        seq INT UNSIGNED NOT NULL,
        player VARCHAR(64) NOT NULL,
        coord VARCHAR(16) NOT NULL,
        result TINYINT UNSIGNED NOT NULL,
        PRIMARY KEY (game_id, seq)
    )",
];

// SQLSTATE for integrity constraint violations (duplicate primary key)
const INTEGRITY_VIOLATION: &str = "23000";

#[derive(sqlx::FromRow, Debug)]
struct GameRow {
    id: u32,
    player_1: String,
    player_2: String,
    grid_size: u8,
    game_over: bool,
    next_player: String,
    winner: Option<String>,
    created: DateTime<Utc>,
    finished: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Debug)]
struct MoveRow {
    player: String,
    coord: String,
    result: u8,
}

#[derive(sqlx::FromRow, Debug)]
struct BoardRow {
    game_id: u32,
    user_name: String,
    opponent: String,
    grid_size: u8,
    ship_map: Vec<u8>,
    hit_map: Vec<u8>,
    miss_map: Vec<u8>,
}

impl From<BoardRow> for Board {
    fn from(row: BoardRow) -> Self {
        Board {
            game_id: GameId(row.game_id),
            owner: row.user_name,
            opponent: row.opponent,
            grid_size: row.grid_size,
            ships: from_bitmap(&row.ship_map, row.grid_size),
            hits: from_bitmap(&row.hit_map, row.grid_size),
            misses: from_bitmap(&row.miss_map, row.grid_size),
        }
    }
}

const GAME_COLUMNS: &str =
    "id, player_1, player_2, grid_size, game_over, next_player, winner, created, finished";

/// Store backed by a MySQL database through a sqlx pool.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(database_url: &str) -> Result<Self, GameError> {
        let pool = MySqlPool::connect(database_url).await?;
        let store = MySqlStore { pool };
        store.create_tables().await?;
        info!("Connected to MySQL store");
        Ok(store)
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        MySqlStore { pool }
    }

    async fn create_tables(&self) -> Result<(), GameError> {
        for sql in SCHEMA {
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    // hydrate a game row with its ordered move records
    async fn load_game(&self, row: GameRow) -> Result<Game, GameError> {
        let sql = "SELECT player, coord, result FROM game_move WHERE game_id = ? ORDER BY seq";
        let rows = sqlx::query_as::<_, MoveRow>(sql)
            .bind(row.id)
            .fetch_all(&self.pool)
            .await?;

        let mut moves = Vec::with_capacity(rows.len());
        for record in rows {
            moves.push(MoveRecord {
                player: record.player,
                coord: record.coord.parse()?,
                result: MoveResult::try_from(record.result)?,
            });
        }

        Ok(Game {
            id: GameId(row.id),
            player_1: row.player_1,
            player_2: row.player_2,
            grid_size: row.grid_size,
            game_over: row.game_over,
            next_player: row.next_player,
            winner: row.winner.map(Winner::from),
            moves,
            created: row.created,
            finished: row.finished,
        })
    }
}

async fn insert_board(conn: &mut MySqlConnection, board: &Board) -> Result<(), GameError> {
    let sql = "INSERT INTO board (game_id, user_name, opponent, grid_size, ship_map, hit_map, miss_map) VALUES (?, ?, ?, ?, ?, ?, ?)";
    sqlx::query(sql)
        .bind(board.game_id.0)
        .bind(&board.owner)
        .bind(&board.opponent)
        .bind(board.grid_size)
        .bind(to_bitmap(&board.ships, board.grid_size))
        .bind(to_bitmap(&board.hits, board.grid_size))
        .bind(to_bitmap(&board.misses, board.grid_size))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn update_board(conn: &mut MySqlConnection, board: &Board) -> Result<(), GameError> {
    let sql = "UPDATE board SET ship_map = ?, hit_map = ?, miss_map = ? WHERE game_id = ? AND user_name = ?";
    sqlx::query(sql)
        .bind(to_bitmap(&board.ships, board.grid_size))
        .bind(to_bitmap(&board.hits, board.grid_size))
        .bind(to_bitmap(&board.misses, board.grid_size))
        .bind(board.game_id.0)
        .bind(&board.owner)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn update_game(conn: &mut MySqlConnection, game: &Game) -> Result<(), GameError> {
    let sql = "UPDATE game SET game_over = ?, next_player = ?, winner = ?, finished = ? WHERE id = ?";
    sqlx::query(sql)
        .bind(game.game_over)
        .bind(&game.next_player)
        .bind(game.winner.as_ref().map(|winner| winner.to_string()))
        .bind(game.finished)
        .bind(game.id.0)
        .execute(&mut *conn)
        .await?;

    // moves are append-only, only the tail past what is stored gets written
    let sql = "SELECT COUNT(*) FROM game_move WHERE game_id = ?";
    let stored: i64 = sqlx::query_scalar(sql)
        .bind(game.id.0)
        .fetch_one(&mut *conn)
        .await?;

    let sql = "INSERT INTO game_move (game_id, seq, player, coord, result) VALUES (?, ?, ?, ?, ?)";
    for (seq, record) in game.moves.iter().enumerate().skip(stored as usize) {
        sqlx::query(sql)
            .bind(game.id.0)
            .bind(seq as u32)
            .bind(&record.player)
            .bind(record.coord.to_string())
            .bind(record.result as u8)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// increments are applied to the stored row so concurrent game ends all count
async fn record_game_end(conn: &mut MySqlConnection, end: GameEnd<'_>) -> Result<(), GameError> {
    let sql = "UPDATE player SET games_played = games_played + 1, games_won = games_won + ? WHERE name = ?";
    for (name, won) in [(end.winner, 1u32), (end.loser, 0u32)] {
        let result = sqlx::query(sql)
            .bind(won)
            .bind(name)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(GameError::PlayerNotFound);
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MySqlStore {
    async fn insert_player(&self, player: &Player) -> Result<(), GameError> {
        let sql = "INSERT INTO player (name, email, games_played, games_won) VALUES (?, ?, ?, ?)";
        match sqlx::query(sql)
            .bind(&player.name)
            .bind(&player.email)
            .bind(player.games_played)
            .bind(player.games_won)
            .execute(&self.pool)
            .await
        {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.code().as_deref() == Some(INTEGRITY_VIOLATION) => {
                debug!("Player {} already exists", player.name);
                Err(GameError::DuplicateName)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn player(&self, name: &str) -> Result<Option<Player>, GameError> {
        let sql = "SELECT name, email, games_played, games_won FROM player WHERE name = ?";
        Ok(sqlx::query_as::<_, Player>(sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn players(&self) -> Result<Vec<Player>, GameError> {
        let sql = "SELECT name, email, games_played, games_won FROM player";
        Ok(sqlx::query_as::<_, Player>(sql).fetch_all(&self.pool).await?)
    }

    async fn insert_game(&self, player_1: &str, player_2: &str, grid_size: u8) -> Result<Game, GameError> {
        let mut game = Game::new(GameId(0), player_1, player_2, grid_size)?;

        // Start transaction, the game and both boards land together
        let mut tx = self.pool.begin().await?;

        let sql = "INSERT INTO game (player_1, player_2, grid_size, game_over, next_player, created) VALUES (?, ?, ?, ?, ?, ?)";
        let result = sqlx::query(sql)
            .bind(&game.player_1)
            .bind(&game.player_2)
            .bind(game.grid_size)
            .bind(game.game_over)
            .bind(&game.next_player)
            .bind(game.created)
            .execute(&mut *tx)
            .await?;
        game.id = GameId(result.last_insert_id() as u32);

        insert_board(&mut tx, &Board::new(game.id, player_1, player_2, grid_size)).await?;
        insert_board(&mut tx, &Board::new(game.id, player_2, player_1, grid_size)).await?;

        tx.commit().await?;
        Ok(game)
    }

    async fn game(&self, id: GameId) -> Result<Option<Game>, GameError> {
        let sql = format!("SELECT {} FROM game WHERE id = ?", GAME_COLUMNS);
        let row = sqlx::query_as::<_, GameRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.load_game(row).await?)),
            None => Ok(None),
        }
    }

    async fn active_games(&self) -> Result<Vec<Game>, GameError> {
        let sql = format!("SELECT {} FROM game WHERE game_over = FALSE ORDER BY id", GAME_COLUMNS);
        let rows = sqlx::query_as::<_, GameRow>(&sql).fetch_all(&self.pool).await?;

        let mut games = Vec::with_capacity(rows.len());
        for row in rows {
            games.push(self.load_game(row).await?);
        }
        Ok(games)
    }

    async fn count_active_games(&self) -> Result<usize, GameError> {
        let sql = "SELECT COUNT(*) FROM game WHERE game_over = FALSE";
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(count as usize)
    }

    async fn board(&self, game_id: GameId, owner: &str) -> Result<Option<Board>, GameError> {
        let sql = "SELECT game_id, user_name, opponent, grid_size, ship_map, hit_map, miss_map FROM board WHERE game_id = ? AND user_name = ?";
        let row = sqlx::query_as::<_, BoardRow>(sql)
            .bind(game_id.0)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Board::from))
    }

    async fn save_board(&self, board: &Board) -> Result<(), GameError> {
        let mut conn = self.pool.acquire().await?;
        update_board(&mut conn, board).await
    }

    async fn save_game(&self, game: &Game) -> Result<(), GameError> {
        let mut tx = self.pool.begin().await?;
        update_game(&mut tx, game).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_turn(&self, game: &Game, board: &Board, end: Option<GameEnd<'_>>) -> Result<(), GameError> {
        let mut tx = self.pool.begin().await?;
        update_game(&mut tx, game).await?;
        update_board(&mut tx, board).await?;
        if let Some(end) = end {
            record_game_end(&mut tx, end).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
