//! Attendance-token issuance: a time-boxed, optionally location-bound
//! capability string rendered as a scannable QR payload.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use qrcode::QrCode;
use qrcode::render::svg;
use sea_orm::{DbConn, EntityTrait};

use crate::error::ServiceError;
use crate::geofence::Coordinates;
use db::models::{attendance_token, session_year, subject};
use util::config;
use util::evidence::{EvidenceCache, NetworkEvidence};

pub const MIN_RADIUS_M: f64 = 10.0;
pub const MAX_RADIUS_M: f64 = 50_000.0;

#[derive(Debug, Clone, Default)]
pub struct IssueTokenParams {
    pub subject_id: i64,
    pub session_year_id: i64,
    pub expiry_minutes: Option<i64>,
    pub issuer_location: Option<Coordinates>,
    pub radius_m: Option<f64>,
    pub require_network: bool,
    pub issuer_ip: Option<String>,
    pub issuer_ssid: Option<String>,
}

#[derive(Debug)]
pub struct IssuedToken {
    pub token: attendance_token::Model,
    pub scan_url: String,
    /// SVG rendering of the scan URL, wrapped as a base64 `data:` URL.
    pub qr_svg: String,
}

/// Clamps a requested radius into `[MIN_RADIUS_M, MAX_RADIUS_M]`.
///
/// Non-finite input falls back to the default instead of rejecting; issuing
/// stays resilient to malformed client values.
pub fn clamp_radius(requested: Option<f64>, default_m: f64) -> f64 {
    let raw = requested.unwrap_or(default_m);
    if !raw.is_finite() {
        return default_m;
    }
    raw.clamp(MIN_RADIUS_M, MAX_RADIUS_M)
}

pub async fn issue(
    db: &DbConn,
    cache: &EvidenceCache,
    params: IssueTokenParams,
    now: DateTime<Utc>,
) -> Result<IssuedToken, ServiceError> {
    if subject::Entity::find_by_id(params.subject_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ServiceError::NotFound("Subject"));
    }
    if session_year::Entity::find_by_id(params.session_year_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ServiceError::NotFound("Session year"));
    }

    let expiry_minutes = params
        .expiry_minutes
        .unwrap_or_else(config::default_token_expiry_minutes)
        .max(1);
    let radius_m = clamp_radius(params.radius_m, config::default_radius_meters());
    let expires_at = now + Duration::minutes(expiry_minutes);

    let row = attendance_token::Model::create(
        db,
        params.subject_id,
        params.session_year_id,
        params.issuer_location.map(|c| (c.latitude, c.longitude)),
        radius_m,
        now,
        expires_at,
        None,
    )
    .await?;

    // Evidence lives only in the cache, with the token's own lifetime; if it
    // is gone at scan time the network check is skipped, not failed.
    if params.require_network
        && (params.issuer_ip.is_some() || params.issuer_ssid.is_some())
    {
        cache.put(
            row.token.clone(),
            NetworkEvidence {
                issuer_ip: params.issuer_ip,
                issuer_ssid: params.issuer_ssid,
                require_verification: true,
            },
            expires_at,
        );
    }

    let scan_url = scan_url_for(&row.token);
    let qr_svg = render_qr_svg(&scan_url)?;

    tracing::info!(
        subject_id = params.subject_id,
        session_year_id = params.session_year_id,
        expires_at = %expires_at,
        geofenced = params.issuer_location.is_some(),
        "attendance token issued"
    );

    Ok(IssuedToken {
        token: row,
        scan_url,
        qr_svg,
    })
}

/// The payload embedded in the QR image: a deep link into the scan flow.
pub fn scan_url_for(token: &str) -> String {
    format!(
        "{}/scan-attendance?token={}",
        config::scan_base_url().trim_end_matches('/'),
        token
    )
}

fn render_qr_svg(payload: &str) -> Result<String, ServiceError> {
    let code =
        QrCode::new(payload.as_bytes()).map_err(|e| ServiceError::QrRender(e.to_string()))?;
    let image = code.render::<svg::Color>().min_dimensions(240, 240).build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image.as_bytes())
    ))
}

/// Administrative kill switch for a token belonging to `subject_id`.
pub async fn set_active(
    db: &DbConn,
    subject_id: i64,
    token: &str,
    active: bool,
) -> Result<attendance_token::Model, ServiceError> {
    let Some(row) = attendance_token::Model::find_for_subject(db, subject_id, token).await? else {
        return Err(ServiceError::NotFound("Token"));
    };

    tracing::info!(subject_id, active, "attendance token active flag changed");
    row.set_active(db, active).await.map_err(Into::into)
}

pub async fn list_for_subject(
    db: &DbConn,
    subject_id: i64,
) -> Result<Vec<attendance_token::Model>, ServiceError> {
    if subject::Entity::find_by_id(subject_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ServiceError::NotFound("Subject"));
    }

    attendance_token::Model::list_for_subject(db, subject_id)
        .await
        .map_err(Into::into)
}
