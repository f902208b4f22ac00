use axum::{
    Router,
    routing::{get, post},
};
use util::state::AppState;

mod common;
mod get;
mod post;

pub use get::network_info;
pub use post::scan_attendance;

pub fn attendance_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/scans", post(scan_attendance))
        .route("/network-info", get(network_info))
        .with_state(app_state)
}
