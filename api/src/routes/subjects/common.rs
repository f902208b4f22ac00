use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use db::models::attendance_token;
use services::token::IssuedToken;

#[derive(Debug, Deserialize, Validate)]
pub struct IssueTokenRequest {
    pub session_year_id: i64,
    /// Defaults to the configured expiry; values below one minute are raised
    /// to one.
    pub expiry_minutes: Option<i64>,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "longitude must be between -180 and 180"
    ))]
    pub longitude: Option<f64>,
    /// Meters; clamped into the allowed band rather than rejected.
    pub radius: Option<f64>,
    pub require_network: Option<bool>,
    pub network_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetTokenActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub session_year_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// When present, export the per-student report instead of the full
    /// subject export.
    pub student: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: i64,
    pub subject_id: i64,
    pub session_year_id: i64,
    pub token: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub allowed_radius_m: f64,
    pub issued_at: String,
    pub expires_at: String,
    pub active: bool,
}

impl From<attendance_token::Model> for TokenResponse {
    fn from(m: attendance_token::Model) -> Self {
        Self {
            id: m.id,
            subject_id: m.subject_id,
            session_year_id: m.session_year_id,
            token: m.token,
            latitude: m.latitude,
            longitude: m.longitude,
            allowed_radius_m: m.allowed_radius_m,
            issued_at: m.issued_at.to_rfc3339(),
            expires_at: m.expires_at.to_rfc3339(),
            active: m.active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssuedTokenResponse {
    pub token: TokenResponse,
    pub scan_url: String,
    /// Base64 `data:` URL holding the SVG QR image.
    pub qr_code: String,
}

impl From<IssuedToken> for IssuedTokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: TokenResponse::from(issued.token),
            scan_url: issued.scan_url,
            qr_code: issued.qr_svg,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenListResponse {
    pub tokens: Vec<TokenResponse>,
}
