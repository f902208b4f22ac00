use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::SocketAddr;
use validator::ValidationErrors;

use crate::response::ApiResponse;
use services::error::ServiceError;

/// Client address as seen by the verification layer.
///
/// The first `X-Forwarded-For` hop wins so deployments behind a reverse
/// proxy still see the claimant's address; otherwise the peer address from
/// `ConnectInfo` is used.
pub fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// Flattens `validator` output into the single message the envelope carries.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Maps service failures onto the response envelope.
///
/// Verification rejections are client errors and keep their diagnostic
/// payload in `data`; storage faults become an opaque 500 with the detail
/// kept in the log.
pub fn service_error_response(err: ServiceError) -> Response {
    match err {
        ServiceError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(err.to_string())),
        )
            .into_response(),
        ServiceError::TokenInvalidOrExpired
        | ServiceError::DuplicateAttendance
        | ServiceError::LocationRequired
        | ServiceError::Spreadsheet(_) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(err.to_string())),
        )
            .into_response(),
        ServiceError::OutOfRange(check) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_with_data(
                check,
                format!(
                    "You are {:.0} m from the session location (allowed {:.0} m)",
                    check.distance_m, check.effective_radius_m
                ),
            )),
        )
            .into_response(),
        ServiceError::NetworkMismatch(check) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_with_data(
                check,
                "Scan must come from the session's network",
            )),
        )
            .into_response(),
        ServiceError::SchemaMismatch { missing, found } => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_with_data(
                json!({ "missing": missing, "found": found }),
                "Spreadsheet is missing required columns",
            )),
        )
            .into_response(),
        ServiceError::QrRender(ref detail) => {
            tracing::error!("qr rendering failed: {detail}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error("Failed to render QR code")),
            )
                .into_response()
        }
        ServiceError::Db(ref e) => {
            tracing::error!("database error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error("Database error")),
            )
                .into_response()
        }
    }
}
