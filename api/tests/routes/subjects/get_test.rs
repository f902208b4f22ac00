#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{
            Request, StatusCode,
            header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        },
    };
    use calamine::{Reader, Xlsx};
    use chrono::{Duration, NaiveDate, Utc};
    use serde_json::Value;
    use std::io::Cursor;
    use tower::ServiceExt;

    use db::models::{
        attendance_record::Model as RecordModel, attendance_session::Model as SessionModel,
        attendance_token::Model as TokenModel, session_year::Model as YearModel,
        student::Model as StudentModel, subject::Model as SubjectModel,
    };

    use crate::helpers::app::make_test_app;

    struct TestCtx {
        subject: SubjectModel,
        year: YearModel,
        student_a: StudentModel,
        student_b: StudentModel,
    }

    async fn setup(db: &sea_orm::DatabaseConnection) -> TestCtx {
        let subject = SubjectModel::create(db, "CS101", "Intro to Computer Science")
            .await
            .unwrap();
        let year = YearModel::create(
            db,
            "2025/26",
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
        )
        .await
        .unwrap();
        let student_a = StudentModel::create(db, "u23000001", "A0042", "Thabo", "Nkosi")
            .await
            .unwrap();
        let student_b = StudentModel::create(db, "u23000002", "A0043", "Lerato", "Mokoena")
            .await
            .unwrap();

        TestCtx {
            subject,
            year,
            student_a,
            student_b,
        }
    }

    async fn seed_session_with_presence(
        db: &sea_orm::DatabaseConnection,
        ctx: &TestCtx,
        date: NaiveDate,
        presences: &[(i64, bool)],
    ) {
        let session = SessionModel::get_or_create(db, ctx.subject.id, ctx.year.id, date)
            .await
            .unwrap();
        for (student_id, present) in presences {
            RecordModel::upsert_presence(db, session.id, *student_id, *present)
                .await
                .unwrap();
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sheet_rows(bytes: &[u8]) -> Vec<Vec<String>> {
        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let name = workbook.sheet_names().first().unwrap().clone();
        let range = workbook.worksheet_range(&name).unwrap();
        range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    // ---------------------------
    // list_tokens
    // ---------------------------

    #[tokio::test]
    async fn test_list_tokens_newest_first() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;

        let now = Utc::now();
        TokenModel::create(
            state.db(),
            ctx.subject.id,
            ctx.year.id,
            None,
            100.0,
            now - Duration::minutes(10),
            now + Duration::minutes(20),
            Some("token-older"),
        )
        .await
        .unwrap();
        TokenModel::create(
            state.db(),
            ctx.subject.id,
            ctx.year.id,
            None,
            100.0,
            now,
            now + Duration::minutes(30),
            Some("token-newer"),
        )
        .await
        .unwrap();

        let req = Request::builder()
            .method("GET")
            .uri(format!("/api/subjects/{}/tokens", ctx.subject.id))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Attendance tokens retrieved");
        let tokens = jsn["data"]["tokens"].as_array().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0]["token"], "token-newer");
        assert_eq!(tokens[1]["token"], "token-older");
    }

    #[tokio::test]
    async fn test_list_tokens_unknown_subject_is_404() {
        let (app, _state) = make_test_app().await;

        let req = Request::builder()
            .method("GET")
            .uri("/api/subjects/9999/tokens")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Subject not found");
    }

    // ---------------------------
    // export_attendance
    // ---------------------------

    #[tokio::test]
    async fn test_export_downloads_a_spreadsheet() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;

        let date = NaiveDate::from_ymd_opt(2025, 10, 6).unwrap();
        seed_session_with_presence(
            state.db(),
            &ctx,
            date,
            &[(ctx.student_a.id, true), (ctx.student_b.id, false)],
        )
        .await;

        let req = Request::builder()
            .method("GET")
            .uri(format!(
                "/api/subjects/{}/attendance/export?session_year_id={}",
                ctx.subject.id, ctx.year.id
            ))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains(&format!("attendance_subject_{}.xlsx", ctx.subject.id)));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rows = sheet_rows(&bytes);

        assert_eq!(rows[0], vec!["Student ID", "Student Name", "Date", "Status"]);
        assert_eq!(
            rows[1],
            vec!["u23000001", "Thabo Nkosi", "2025-10-06", "Present"]
        );
        assert_eq!(
            rows[2],
            vec!["u23000002", "Lerato Mokoena", "2025-10-06", "Absent"]
        );
    }

    #[tokio::test]
    async fn test_export_honors_the_date_window() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;

        let inside = NaiveDate::from_ymd_opt(2025, 10, 6).unwrap();
        let outside = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        seed_session_with_presence(state.db(), &ctx, inside, &[(ctx.student_a.id, true)]).await;
        seed_session_with_presence(state.db(), &ctx, outside, &[(ctx.student_a.id, true)]).await;

        let req = Request::builder()
            .method("GET")
            .uri(format!(
                "/api/subjects/{}/attendance/export?session_year_id={}&start_date=2025-10-01&end_date=2025-10-10",
                ctx.subject.id, ctx.year.id
            ))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rows = sheet_rows(&bytes);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][2], "2025-10-06");
    }

    #[tokio::test]
    async fn test_export_unknown_session_year_is_404() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;

        let req = Request::builder()
            .method("GET")
            .uri(format!(
                "/api/subjects/{}/attendance/export?session_year_id=9999",
                ctx.subject.id
            ))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let jsn = body_json(response).await;
        assert_eq!(jsn["success"], false);
        assert_eq!(jsn["message"], "Session year not found");
    }

    // ---------------------------
    // per-student report
    // ---------------------------

    #[tokio::test]
    async fn test_student_report_has_banner_and_totals() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;

        let first = NaiveDate::from_ymd_opt(2025, 10, 6).unwrap();
        let second = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        seed_session_with_presence(state.db(), &ctx, first, &[(ctx.student_a.id, true)]).await;
        // Second session has no record for the student; the report shows absent.
        seed_session_with_presence(state.db(), &ctx, second, &[(ctx.student_b.id, true)]).await;

        let req = Request::builder()
            .method("GET")
            .uri(format!(
                "/api/subjects/{}/attendance/export?session_year_id={}&student=u23000001",
                ctx.subject.id, ctx.year.id
            ))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("u23000001"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rows = sheet_rows(&bytes);

        assert!(rows[0][0].starts_with("Attendance Report - CS101"));
        assert!(rows[1][0].starts_with("Student: Thabo Nkosi (u23000001)"));
        assert_eq!(rows[3], vec!["Student ID", "Student Name", "Date", "Status"]);
        assert_eq!(
            rows[4],
            vec!["u23000001", "Thabo Nkosi", "2025-10-06", "Present"]
        );
        assert_eq!(
            rows[5],
            vec!["u23000001", "Thabo Nkosi", "2025-10-20", "Absent"]
        );

        assert_eq!(rows[7][0], "Total Sessions:");
        assert_eq!(rows[7][1], "2");
        assert_eq!(rows[8][0], "Present:");
        assert_eq!(rows[8][1], "1");
        assert_eq!(rows[9][0], "Attendance Rate:");
        assert_eq!(rows[9][1], "50.0%");
    }

    #[tokio::test]
    async fn test_student_report_unknown_student_is_404() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;

        let req = Request::builder()
            .method("GET")
            .uri(format!(
                "/api/subjects/{}/attendance/export?session_year_id={}&student=nobody",
                ctx.subject.id, ctx.year.id
            ))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Student not found");
    }
}
