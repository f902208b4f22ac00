//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → Health check endpoint (public)
//! - `/attendance` → Scan verification and network info (scanning clients)
//! - `/subjects` → Token issuance/administration and bulk export/import

use crate::routes::{
    attendance::attendance_routes, health::health_routes, subjects::subjects_routes,
};
use axum::Router;
use util::state::AppState;

pub mod attendance;
pub mod common;
pub mod health;
pub mod subjects;

/// Builds the complete application router for all HTTP endpoints.
///
/// The groups are nested under their base paths and share the one
/// `AppState`; the final `with_state` here fixes the state so `main` (and
/// the tests) can serve the router directly.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/attendance", attendance_routes(app_state.clone()))
        .nest("/subjects", subjects_routes(app_state.clone()))
        .with_state(app_state)
}
