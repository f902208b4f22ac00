#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use chrono::{Duration, NaiveDate, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use db::models::{
        attendance_token::Model as TokenModel, session_year::Model as YearModel,
        student::Model as StudentModel, subject::Model as SubjectModel,
    };

    use crate::helpers::app::{make_test_app, with_connect_info};

    struct TestCtx {
        subject: SubjectModel,
        year: YearModel,
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
        StudentModel::create(db, "u23000001", "A0042", "Thabo", "Nkosi")
            .await
            .unwrap();

        TestCtx { subject, year }
    }

    async fn seed_token(db: &sea_orm::DatabaseConnection, ctx: &TestCtx) -> TokenModel {
        let now = Utc::now();
        TokenModel::create(
            db,
            ctx.subject.id,
            ctx.year.id,
            None,
            100.0,
            now,
            now + Duration::minutes(30),
            None,
        )
        .await
        .unwrap()
    }

    fn set_active_request(subject_id: i64, token: &str, active: bool) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(format!("/api/subjects/{subject_id}/tokens/{token}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "active": active }).to_string()))
            .unwrap()
    }

    fn scan_request(token: &str) -> Request<Body> {
        let body = json!({ "token": token, "student": "u23000001" });
        let req = Request::builder()
            .method("POST")
            .uri("/api/attendance/scans")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        with_connect_info(req, [10, 0, 0, 1])
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_deactivated_token_rejects_scans() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx).await;

        let response = app
            .clone()
            .oneshot(set_active_request(ctx.subject.id, &token.token, false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Attendance token deactivated");
        assert_eq!(jsn["data"]["active"], false);

        let response = app.oneshot(scan_request(&token.token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_reactivated_token_scans_again() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx).await;

        let response = app
            .clone()
            .oneshot(set_active_request(ctx.subject.id, &token.token, false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(set_active_request(ctx.subject.id, &token.token, true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Attendance token activated");
        assert_eq!(jsn["data"]["active"], true);

        let response = app.oneshot(scan_request(&token.token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_token_is_404() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;

        let response = app
            .oneshot(set_active_request(ctx.subject.id, "no-such-token", false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Token not found");
    }

    #[tokio::test]
    async fn test_token_scoped_to_its_subject() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx).await;

        let other = SubjectModel::create(state.db(), "CS102", "Data Structures")
            .await
            .unwrap();

        let response = app
            .oneshot(set_active_request(other.id, &token.token, false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Token not found");
    }
}
