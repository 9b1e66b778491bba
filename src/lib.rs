use std::sync::Arc;

use config::Config;
use routes::user::UserRepository;
use session::SessionManager;

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<SessionManager>,
}
