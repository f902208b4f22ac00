use axum::{
    Json,
    extract::{ConnectInfo, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use std::net::SocketAddr;
use validator::Validate;

use super::common::{IssueTokenRequest, IssuedTokenResponse};
use crate::response::ApiResponse;
use crate::routes::common::{client_ip, format_validation_errors, service_error_response};
use services::geofence::Coordinates;
use services::reconcile::ImportSummary;
use services::token::IssueTokenParams;
use util::state::AppState;

/// POST /api/subjects/{subject_id}/tokens
///
/// Issues a new attendance token for the subject. The issuer's IP is taken
/// from the request itself, never from the body.
///
/// ### Responses
/// - `201 Created` with the token row, scan URL, and QR data URL
/// - `400 Bad Request` on invalid coordinates
/// - `404 Not Found` for an unknown subject or session year
pub async fn issue_token(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<IssueTokenRequest>,
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

    let issuer_location = match (body.latitude, body.longitude) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    };
    let require_network = body.require_network.unwrap_or(false);
    let issuer_ip = require_network.then(|| client_ip(&headers, &addr));

    let params = IssueTokenParams {
        subject_id,
        session_year_id: body.session_year_id,
        expiry_minutes: body.expiry_minutes,
        issuer_location,
        radius_m: body.radius,
        require_network,
        issuer_ip,
        issuer_ssid: body.network_name,
    };

    match services::token::issue(state.db(), state.evidence(), params, Utc::now()).await {
        Ok(issued) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                IssuedTokenResponse::from(issued),
                "Attendance token issued",
            )),
        )
            .into_response(),
        Err(e) => service_error_response(e),
    }
}

/// POST /api/subjects/{subject_id}/attendance/import
///
/// Multipart form: `session_year_id`, `attendance_date` (`YYYY-MM-DD`,
/// fallback for rows without a date column), `file` (xlsx).
///
/// ### Responses
/// - `200 OK` with the import summary (rows imported/failed, per-row errors,
///   dates touched)
/// - `400 Bad Request` for missing fields or an unusable spreadsheet; schema
///   mismatches list missing and found columns in `data`
pub async fn import_attendance(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut session_year_id: Option<i64> = None;
    let mut attendance_date: Option<NaiveDate> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "session_year_id" => {
                if let Ok(text) = field.text().await {
                    match text.trim().parse::<i64>() {
                        Ok(v) => session_year_id = Some(v),
                        Err(_) => {
                            return (
                                StatusCode::BAD_REQUEST,
                                Json(ApiResponse::<ImportSummary>::error(
                                    "session_year_id must be an integer",
                                )),
                            )
                                .into_response();
                        }
                    }
                }
            }
            "attendance_date" => {
                if let Ok(text) = field.text().await {
                    match NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
                        Ok(d) => attendance_date = Some(d),
                        Err(_) => {
                            return (
                                StatusCode::BAD_REQUEST,
                                Json(ApiResponse::<ImportSummary>::error(
                                    "attendance_date must be formatted YYYY-MM-DD",
                                )),
                            )
                                .into_response();
                        }
                    }
                }
            }
            "file" => {
                file_bytes = Some(field.bytes().await.unwrap_or_default().to_vec());
            }
            _ => continue,
        }
    }

    let Some(session_year_id) = session_year_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<ImportSummary>::error(
                "Missing required field: session_year_id",
            )),
        )
            .into_response();
    };
    let Some(attendance_date) = attendance_date else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<ImportSummary>::error(
                "Missing required field: attendance_date",
            )),
        )
            .into_response();
    };
    let Some(bytes) = file_bytes.filter(|b| !b.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<ImportSummary>::error(
                "Missing required field: file",
            )),
        )
            .into_response();
    };

    match services::reconcile::import_attendance(
        state.db(),
        subject_id,
        session_year_id,
        attendance_date,
        &bytes,
    )
    .await
    {
        Ok(summary) => {
            let message = format!(
                "Imported {} rows ({} failed)",
                summary.imported, summary.failed
            );
            (StatusCode::OK, Json(ApiResponse::success(summary, message))).into_response()
        }
        Err(e) => service_error_response(e),
    }
}
