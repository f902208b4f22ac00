//! Domain services for the attendance engine.
//!
//! Everything here is callable without an HTTP server: handlers pass in the
//! database connection, the evidence cache, and the current time, and get
//! typed results or a [`error::ServiceError`] back.

pub mod error;
pub mod geofence;
pub mod network;
pub mod reconcile;
pub mod scan;
pub mod token;
