use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use super::common::{ExportQuery, TokenListResponse, TokenResponse};
use crate::response::ApiResponse;
use crate::routes::common::service_error_response;
use services::reconcile::{self, DateRange};
use util::state::AppState;

/// GET /api/subjects/{subject_id}/tokens
///
/// Lists the subject's attendance tokens, newest first.
pub async fn list_tokens(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
) -> impl IntoResponse {
    match services::token::list_for_subject(state.db(), subject_id).await {
        Ok(rows) => {
            let tokens: Vec<TokenResponse> = rows.into_iter().map(Into::into).collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    TokenListResponse { tokens },
                    "Attendance tokens retrieved",
                )),
            )
                .into_response()
        }
        Err(e) => service_error_response(e),
    }
}

/// GET /api/subjects/{subject_id}/attendance/export
///
/// Query: `session_year_id` (required), `start_date` / `end_date` (ISO,
/// optional window), `student` (optional; switches to the per-student
/// report).
///
/// **Response**: xlsx attachment, or the usual JSON envelope on failure.
pub async fn export_attendance(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let result = match query.student.as_deref() {
        Some(student) => {
            reconcile::export_student_report(state.db(), subject_id, query.session_year_id, student)
                .await
        }
        None => {
            reconcile::export_attendance(
                state.db(),
                subject_id,
                query.session_year_id,
                DateRange {
                    from: query.start_date,
                    to: query.end_date,
                },
            )
            .await
        }
    };

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => return service_error_response(e),
    };

    let filename = match query.student.as_deref() {
        Some(student) => format!(
            "attendance_subject_{}_{}.xlsx",
            subject_id,
            sanitize_for_filename(student)
        ),
        None => format!("attendance_subject_{subject_id}.xlsx"),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
    );
    headers.insert(
        axum::http::header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
            .unwrap_or(HeaderValue::from_static("attachment")),
    );

    (StatusCode::OK, (headers, bytes)).into_response()
}

fn sanitize_for_filename(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}
