//! Application state container shared across Axum route handlers and services.
//!
//! This struct holds shared resources such as the database connection and the
//! network-evidence cache. It is cloned into route handlers via Axum's
//! `State<T>` extractor.

use crate::evidence::EvidenceCache;
use sea_orm::DatabaseConnection;

/// Central application state shared across the server.
///
/// This includes:
/// - A cloned, thread-safe database connection for use with SeaORM.
/// - The process-wide [`EvidenceCache`] for token-scoped network evidence.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    evidence: EvidenceCache,
}

impl AppState {
    pub fn new(db: DatabaseConnection, evidence: EvidenceCache) -> Self {
        Self { db, evidence }
    }

    /// Returns a shared reference to the internal `DatabaseConnection`.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Returns an owned clone of the connection for moving into spawned tasks.
    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    pub fn evidence(&self) -> &EvidenceCache {
        &self.evidence
    }

    pub fn evidence_clone(&self) -> EvidenceCache {
        self.evidence.clone()
    }
}
