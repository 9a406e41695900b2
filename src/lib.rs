//! Two-player battleship service.
//!
//! The rules engine lives in [`models`]: coordinates, boards, the game state
//! machine and player records. [`directory::Directory`] is the entry point that
//! loads and stores them through a [`store::Store`]. [`controllers`] expose the
//! directory over HTTP and [`notify`] sends turn reminders.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::sync::Mutex;

pub mod config;
pub mod controllers;
pub mod directory;
pub mod errors;
pub mod models;
pub mod notify;
pub mod store;

use crate::directory::Directory;

// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<Directory>,
    // cached count of active games, refreshed in the background
    pub active_games: Arc<AtomicUsize>,
    // held across count-and-store so a stale count never lands after a fresh one
    pub count_refresh: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(directory: Arc<Directory>) -> Self {
        AppState {
            directory,
            active_games: Arc::new(AtomicUsize::new(0)),
            count_refresh: Arc::new(Mutex::new(())),
        }
    }
}
