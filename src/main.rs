use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::{get, post, put}, Router};
use log::{debug, info, warn};
use simplelog::{Config as LogConfig, SimpleLogger};

use battleship_api::config::Config;
use battleship_api::controllers;
use battleship_api::directory::Directory;
use battleship_api::notify::{remind_periodically, Notifier, SmtpNotifier};
use battleship_api::store::{MemoryStore, MySqlStore, Store};
use battleship_api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {

    // settings come from the environment
    let config = Config::from_env()?;

    // set up tracing facility
    let _ = SimpleLogger::init(config.log_level, LogConfig::default());
    info!("Starting..");
    debug!("config: listen={} grid={}", config.listen_addr, config.grid_size);

    // pick the store: MySQL when a database url is configured, memory otherwise
    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => Arc::new(
            MySqlStore::connect(database_url)
                .await
                .context("could not open the MySQL store")?,
        ),
        None => {
            warn!("$DATABASE_URL is not set, games are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let directory = Arc::new(Directory::new(store, config.grid_size));
    let state = AppState::new(directory.clone());
    state
        .active_games
        .store(directory.count_active_games().await?, Ordering::Relaxed);

    // turn reminders run on their own schedule when mail is configured
    match &config.mail {
        Some(mail) => {
            let notifier: Arc<dyn Notifier> = Arc::new(SmtpNotifier::new(mail)?);
            tokio::spawn(remind_periodically(directory.clone(), notifier, config.reminder_interval));
            info!("Turn reminders every {:?}", config.reminder_interval);
        }
        None => info!("Mail is not configured, turn reminders are off"),
    }

    // Define routes
    let app = Router::new()
        .route("/user", post(controllers::player::create_user))
        .route("/player", get(controllers::player::get_user_rankings))
        .route("/player/:name", get(controllers::player::player_stats))
        .route("/player/:name/games", get(controllers::player::get_user_games))
        .route("/game/new", post(controllers::game::new_game))
        .route("/game/list", get(controllers::game::list_active_games))
        .route("/game/count", get(controllers::game::active_game_count))
        .route("/game/:game_key", put(controllers::game::make_guess))
        .route("/game/:game_key/cancel", put(controllers::game::cancel_game))
        .route("/game/:game_key/history", get(controllers::game::get_game_history))
        .route("/board/insert_ship", put(controllers::board::insert_ship))
        .route("/board/:player/:opponent", get(controllers::board::board_summary))
        .route("/board/:player/:opponent/coords", get(controllers::board::get_coords))
        .with_state(state);

    // Start the server
    debug!("Listening on {}", config.listen_addr);
    axum::Server::bind(&config.listen_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
