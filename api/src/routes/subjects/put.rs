use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::common::{SetTokenActiveRequest, TokenResponse};
use crate::response::ApiResponse;
use crate::routes::common::service_error_response;
use util::state::AppState;

/// PUT /api/subjects/{subject_id}/tokens/{token}
///
/// Activates or deactivates a token belonging to the subject. Deactivation
/// is the kill switch for a leaked or mis-issued token; scanning it fails
/// with the usual invalid-token rejection.
pub async fn set_token_active(
    State(state): State<AppState>,
    Path((subject_id, token)): Path<(i64, String)>,
    Json(body): Json<SetTokenActiveRequest>,
) -> impl IntoResponse {
    match services::token::set_active(state.db(), subject_id, &token, body.active).await {
        Ok(updated) => {
            let message = if body.active {
                "Attendance token activated"
            } else {
                "Attendance token deactivated"
            };
            (
                StatusCode::OK,
                Json(ApiResponse::success(TokenResponse::from(updated), message)),
            )
                .into_response()
        }
        Err(e) => service_error_response(e),
    }
}
