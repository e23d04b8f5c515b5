use crate::state::AppState;
use axum::Router;

mod dto;
pub mod google;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
