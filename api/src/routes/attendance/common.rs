use serde::{Deserialize, Serialize};
use validator::Validate;

use services::geofence::Coordinates;
use services::scan::{ScanOutcome, ScanRequest, ScanVerification};

#[derive(Debug, Deserialize, Validate)]
pub struct ScanRequestBody {
    pub token: String,
    /// Username, admin number, or numeric student id.
    pub student: String,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "longitude must be between -180 and 180"
    ))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0, message = "accuracy must not be negative"))]
    pub accuracy: Option<f64>,
    pub network_name: Option<String>,
}

impl ScanRequestBody {
    /// Builds the service-layer request; a location only exists when both
    /// coordinates were supplied.
    pub fn into_scan_request(self, client_ip: String) -> ScanRequest {
        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };

        ScanRequest {
            token: self.token,
            student: self.student,
            location,
            accuracy_m: self.accuracy,
            client_ip: Some(client_ip),
            ssid: self.network_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub session_id: i64,
    pub session_date: String,
    pub student: String,
    pub student_name: String,
    pub present: bool,
    pub location_verified: bool,
    pub verification: ScanVerification,
    pub recorded_at: String,
}

impl From<ScanOutcome> for ScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        Self {
            session_id: outcome.session.id,
            session_date: outcome.session.session_date.format("%Y-%m-%d").to_string(),
            student: outcome.student.username.clone(),
            student_name: outcome.student.full_name(),
            present: outcome.record.present,
            location_verified: outcome.record.location_verified,
            verification: outcome.verification,
            recorded_at: outcome.record.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NetworkInfoResponse {
    pub ip: String,
    /// True when the address came from an `X-Forwarded-For` header rather
    /// than the socket peer.
    pub forwarded: bool,
}
