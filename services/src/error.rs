use crate::geofence::GeofenceCheck;
use crate::network::NetworkCheck;
use sea_orm::DbErr;
use thiserror::Error;

/// Typed outcomes for everything that can go wrong in the attendance engine.
///
/// The verification rejections (`OutOfRange`, `NetworkMismatch`,
/// `LocationRequired`, `DuplicateAttendance`, `TokenInvalidOrExpired`) are
/// expected, recoverable outcomes carrying enough detail for the client to
/// explain the rejection; only `Db` represents an actual fault.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid or expired token")]
    TokenInvalidOrExpired,

    #[error("Attendance already recorded for this session")]
    DuplicateAttendance,

    #[error("This token requires a location to be submitted")]
    LocationRequired,

    #[error("Location is outside the allowed radius")]
    OutOfRange(GeofenceCheck),

    #[error("Network verification failed")]
    NetworkMismatch(NetworkCheck),

    #[error("Spreadsheet is missing required columns: {}", missing.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Unreadable spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("Failed to render scan payload: {0}")]
    QrRender(String),

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<calamine::XlsxError> for ServiceError {
    fn from(e: calamine::XlsxError) -> Self {
        ServiceError::Spreadsheet(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ServiceError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ServiceError::Spreadsheet(e.to_string())
    }
}
