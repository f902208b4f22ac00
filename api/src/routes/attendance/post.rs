use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use std::net::SocketAddr;
use validator::Validate;

use super::common::{ScanRequestBody, ScanResponse};
use crate::response::ApiResponse;
use crate::routes::common::{client_ip, format_validation_errors, service_error_response};
use util::state::AppState;

/// POST /api/attendance/scans
///
/// Verifies a presented attendance token against the claimant's evidence
/// (location, accuracy, network) and records presence for today's session.
///
/// ### Responses
/// - `200 OK` with the record and verification breakdown
/// - `400 Bad Request` for verification rejections (expired token, duplicate
///   scan, missing location, out of range, network mismatch); range and
///   network rejections carry their numeric breakdown in `data`
/// - `404 Not Found` when the student is unknown
pub async fn scan_attendance(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<ScanRequestBody>,
) -> impl IntoResponse {
    if let Err(validation_errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(format_validation_errors(
                &validation_errors,
            ))),
        )
            .into_response();
    }

    let ip = client_ip(&headers, &addr);
    let request = body.into_scan_request(ip);

    match services::scan::verify_and_record(state.db(), state.evidence(), request, Utc::now())
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                ScanResponse::from(outcome),
                "Attendance recorded",
            )),
        )
            .into_response(),
        Err(e) => service_error_response(e),
    }
}
