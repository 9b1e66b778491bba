use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::{AppState, middleware::log_errors};

pub mod user;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/reg", post(user::sign_up))
        .route("/oauth", post(user::sign_in))
        .route("/home", get(user::home))
        .route("/signOut", delete(user::sign_out))
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
