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
        attendance_record::Model as RecordModel, attendance_token::Model as TokenModel,
        session_year::Model as YearModel, student::Model as StudentModel,
        subject::Model as SubjectModel,
    };

    use crate::helpers::app::{make_test_app, with_connect_info};

    // Roughly 95 m and 150 m north of the equator origin.
    const NEAR_LAT: f64 = 0.000_859_152;
    const FAR_LAT: f64 = 0.001_356_543;

    struct TestCtx {
        subject: SubjectModel,
        year: YearModel,
        student: StudentModel,
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
        let student = StudentModel::create(db, "u23000001", "A0042", "Thabo", "Nkosi")
            .await
            .unwrap();

        TestCtx {
            subject,
            year,
            student,
        }
    }

    async fn seed_token(
        db: &sea_orm::DatabaseConnection,
        ctx: &TestCtx,
        location: Option<(f64, f64)>,
        expires_in: Duration,
    ) -> TokenModel {
        let now = Utc::now();
        TokenModel::create(
            db,
            ctx.subject.id,
            ctx.year.id,
            location,
            100.0,
            now,
            now + expires_in,
            None,
        )
        .await
        .unwrap()
    }

    fn scan_request(body: Value, ip: [u8; 4]) -> Request<Body> {
        let req = Request::builder()
            .method("POST")
            .uri("/api/attendance/scans")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        with_connect_info(req, ip)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_scan_inside_radius_records_presence() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx, Some((0.0, 0.0)), Duration::minutes(30)).await;

        let body = json!({
            "token": token.token,
            "student": ctx.student.username,
            "latitude": NEAR_LAT,
            "longitude": 0.0,
            "accuracy": 5.0,
        });

        let response = app.oneshot(scan_request(body, [10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let jsn = body_json(response).await;
        assert_eq!(jsn["success"], true);
        assert_eq!(jsn["message"], "Attendance recorded");
        assert_eq!(jsn["data"]["student"], "u23000001");
        assert_eq!(jsn["data"]["student_name"], "Thabo Nkosi");
        assert_eq!(jsn["data"]["present"], true);
        assert_eq!(jsn["data"]["location_verified"], true);
        assert_eq!(jsn["data"]["verification"]["geofence"]["within_radius"], true);
        assert_eq!(
            jsn["data"]["session_date"],
            Utc::now().date_naive().format("%Y-%m-%d").to_string()
        );
    }

    #[tokio::test]
    async fn test_scan_outside_radius_is_rejected_with_breakdown() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx, Some((0.0, 0.0)), Duration::minutes(30)).await;

        let body = json!({
            "token": token.token,
            "student": "u23000001",
            "latitude": FAR_LAT,
            "longitude": 0.0,
            "accuracy": 5.0,
        });

        let response = app
            .clone()
            .oneshot(scan_request(body, [10, 0, 0, 1]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let jsn = body_json(response).await;
        assert_eq!(jsn["success"], false);
        assert!(
            jsn["message"]
                .as_str()
                .unwrap()
                .contains("from the session location")
        );
        assert_eq!(jsn["data"]["within_radius"], false);
        let distance = jsn["data"]["distance_m"].as_f64().unwrap();
        assert!((140.0..160.0).contains(&distance), "distance {distance}");

        // The rejection stored nothing, so a compliant retry still succeeds.
        let retry = json!({
            "token": token.token,
            "student": "u23000001",
            "latitude": NEAR_LAT,
            "longitude": 0.0,
            "accuracy": 5.0,
        });
        let response = app.oneshot(scan_request(retry, [10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_geofenced_token_requires_a_location() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx, Some((0.0, 0.0)), Duration::minutes(30)).await;

        let body = json!({
            "token": token.token,
            "student": "u23000001",
        });

        let response = app.oneshot(scan_request(body, [10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let jsn = body_json(response).await;
        assert_eq!(jsn["success"], false);
        assert_eq!(jsn["message"], "This token requires a location to be submitted");
    }

    #[tokio::test]
    async fn test_token_without_geofence_accepts_a_bare_scan() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx, None, Duration::minutes(30)).await;

        let body = json!({
            "token": token.token,
            "student": "A0042",
        });

        let response = app.oneshot(scan_request(body, [10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let jsn = body_json(response).await;
        assert_eq!(jsn["data"]["location_verified"], true);
        assert!(jsn["data"]["verification"]["geofence"].is_null());
    }

    #[tokio::test]
    async fn test_second_scan_is_rejected_as_duplicate() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx, None, Duration::minutes(30)).await;

        let body = json!({
            "token": token.token,
            "student": "u23000001",
        });

        let response = app
            .clone()
            .oneshot(scan_request(body.clone(), [10, 0, 0, 1]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(scan_request(body, [10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Attendance already recorded for this session");

        let session = db::models::attendance_session::Model::find_for_date(
            state.db(),
            ctx.subject.id,
            ctx.year.id,
            Utc::now().date_naive(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(
            RecordModel::count_for_session(state.db(), session.id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx, None, Duration::minutes(-1)).await;

        let body = json!({
            "token": token.token,
            "student": "u23000001",
        });

        let response = app.oneshot(scan_request(body, [10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_unknown_student_is_rejected() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx, None, Duration::minutes(30)).await;

        let body = json!({
            "token": token.token,
            "student": "u99999999",
        });

        let response = app.oneshot(scan_request(body, [10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Student not found");
    }

    #[tokio::test]
    async fn test_out_of_range_latitude_fails_validation() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = seed_token(state.db(), &ctx, Some((0.0, 0.0)), Duration::minutes(30)).await;

        let body = json!({
            "token": token.token,
            "student": "u23000001",
            "latitude": 200.0,
            "longitude": 0.0,
        });

        let response = app.oneshot(scan_request(body, [10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let jsn = body_json(response).await;
        assert_eq!(jsn["success"], false);
        assert_eq!(jsn["message"], "latitude must be between -90 and 90");
    }

    async fn issue_network_token(app: &axum::Router, ctx: &TestCtx, issuer_ip: [u8; 4]) -> String {
        let body = json!({
            "session_year_id": ctx.year.id,
            "require_network": true,
            "network_name": "CampusNet",
        });
        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/subjects/{}/tokens", ctx.subject.id))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app
            .clone()
            .oneshot(with_connect_info(req, issuer_ip))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let jsn = body_json(response).await;
        jsn["data"]["token"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_scan_from_the_issuers_subnet_passes() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = issue_network_token(&app, &ctx, [10, 1, 2, 3]).await;
        assert_eq!(state.evidence().len(), 1);

        let body = json!({
            "token": token,
            "student": "u23000001",
        });

        let response = app
            .oneshot(scan_request(body, [10, 1, 2, 99]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let jsn = body_json(response).await;
        assert_eq!(jsn["data"]["verification"]["network"]["same_network"], true);
        assert_eq!(jsn["data"]["verification"]["network"]["ip_match"], true);
    }

    #[tokio::test]
    async fn test_scan_from_another_network_is_rejected() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let token = issue_network_token(&app, &ctx, [10, 1, 2, 3]).await;

        let body = json!({
            "token": token,
            "student": "u23000001",
            "network_name": "OtherNet",
        });

        let response = app.oneshot(scan_request(body, [10, 9, 9, 9])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let jsn = body_json(response).await;
        assert_eq!(jsn["message"], "Scan must come from the session's network");
        assert_eq!(jsn["data"]["same_network"], false);
        assert_eq!(jsn["data"]["ip_match"], false);
        assert_eq!(jsn["data"]["ssid_match"], false);
    }
}
