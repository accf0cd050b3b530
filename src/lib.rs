pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod db;
pub mod service;
pub mod session;
pub mod validation;

pub use db::DbPool;

use auth::RouteTable;
use config::Config;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    /// Client routes answered by `/api/navigate`
    pub routes: RouteTable,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        Self {
            config,
            db,
            routes: RouteTable::default(),
        }
    }
}
