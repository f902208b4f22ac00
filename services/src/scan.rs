//! Live scan verification: turns a presented token plus claimant evidence
//! into an attendance record, or a typed rejection.

use chrono::{DateTime, Utc};
use sea_orm::{DbConn, SqlErr};
use serde::Serialize;

use crate::error::ServiceError;
use crate::geofence::{self, Coordinates, GeofenceCheck};
use crate::network::{self, NetworkCheck};
use db::models::{attendance_record, attendance_session, attendance_token, student};
use util::evidence::EvidenceCache;

/// Evidence presented by the scanning device.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub token: String,
    /// Username, admin number, or numeric id; resolved in that order.
    pub student: String,
    pub location: Option<Coordinates>,
    pub accuracy_m: Option<f64>,
    pub client_ip: Option<String>,
    pub ssid: Option<String>,
}

/// What was actually checked for this scan; persisted alongside the record.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanVerification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geofence: Option<GeofenceCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkCheck>,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub record: attendance_record::Model,
    pub session: attendance_session::Model,
    pub student: student::Model,
    pub verification: ScanVerification,
}

/// Runs the full verification pipeline and records presence.
///
/// Checks run in a fixed order so the caller always learns the earliest
/// failure: token validity, student identity, duplicate detection, geofence,
/// then network. The session row for (subject, year, today) is materialized
/// on first use.
pub async fn verify_and_record(
    db: &DbConn,
    cache: &EvidenceCache,
    req: ScanRequest,
    now: DateTime<Utc>,
) -> Result<ScanOutcome, ServiceError> {
    let Some(token) = attendance_token::Model::find_usable(db, req.token.trim(), now).await? else {
        return Err(ServiceError::TokenInvalidOrExpired);
    };

    let Some(student) = student::Model::resolve_identifier(db, req.student.trim()).await? else {
        return Err(ServiceError::NotFound("Student"));
    };

    let session = attendance_session::Model::get_or_create(
        db,
        token.subject_id,
        token.session_year_id,
        now.date_naive(),
    )
    .await?;

    if attendance_record::Model::find_for(db, session.id, student.id)
        .await?
        .is_some()
    {
        return Err(ServiceError::DuplicateAttendance);
    }

    let mut verification = ScanVerification::default();

    if let Some((lat, lng)) = token.issuer_location() {
        if req.location.is_none() {
            return Err(ServiceError::LocationRequired);
        }

        let check = geofence::check_within_radius(
            req.location,
            req.accuracy_m,
            Coordinates::new(lat, lng),
            None,
            token.allowed_radius_m,
        );

        if check.identical_coordinates {
            tracing::warn!(
                student_id = student.id,
                session_id = session.id,
                "claimant fix identical to issuer fix, possible relayed coordinates"
            );
        }

        if !check.within_radius {
            tracing::info!(
                student_id = student.id,
                session_id = session.id,
                distance_m = check.distance_m,
                effective_radius_m = check.effective_radius_m,
                "scan rejected outside geofence"
            );
            return Err(ServiceError::OutOfRange(check));
        }

        verification.geofence = Some(check);
    }

    // Network evidence lives only in the issue-time cache; when it has
    // expired or was never stored, the check is skipped rather than failed.
    if let Some(evidence) = cache.get(req.token.trim(), now) {
        if evidence.require_verification {
            let check = network::verify_network(
                req.client_ip.as_deref(),
                evidence.issuer_ip.as_deref(),
                req.ssid.as_deref(),
                evidence.issuer_ssid.as_deref(),
            );

            if !check.same_network {
                tracing::info!(
                    student_id = student.id,
                    session_id = session.id,
                    "scan rejected on network mismatch"
                );
                return Err(ServiceError::NetworkMismatch(check));
            }

            verification.network = Some(check);
        }
    }

    let verification_json = if verification.geofence.is_some() || verification.network.is_some() {
        serde_json::to_value(verification).ok()
    } else {
        None
    };

    // Every rejection above returned early, so a recorded scan is location
    // verified either by a passing geofence check or vacuously, when the
    // token never asked for one.
    let record = attendance_record::Model::create(
        db,
        session.id,
        student.id,
        true,
        req.location.map(|c| (c.latitude, c.longitude)),
        req.accuracy_m,
        true,
        verification_json,
    )
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::DuplicateAttendance,
        _ => ServiceError::Db(e),
    })?;

    tracing::info!(
        student_id = student.id,
        session_id = session.id,
        geofenced = verification.geofence.is_some(),
        "attendance recorded"
    );

    Ok(ScanOutcome {
        record,
        session,
        student,
        verification,
    })
}
