use axum::{
    Router,
    routing::{get, post, put},
};
use util::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use get::{export_attendance, list_tokens};
pub use post::{import_attendance, issue_token};
pub use put::set_token_active;

pub fn subjects_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/{subject_id}/tokens", post(issue_token))
        .route("/{subject_id}/tokens", get(list_tokens))
        .route("/{subject_id}/tokens/{token}", put(set_token_active))
        .route("/{subject_id}/attendance/export", get(export_attendance))
        .route("/{subject_id}/attendance/import", post(import_attendance))
        .with_state(app_state)
}
