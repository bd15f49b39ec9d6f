use crate::state::AppState;
use axum::Router;

pub mod cookie;
pub mod dto;
pub mod guard;
pub mod handlers;
pub mod password;
pub mod session;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
