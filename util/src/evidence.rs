//! Best-effort expiring store for token-scoped network evidence.
//!
//! Issuers that request network verification leave their IP/SSID here, keyed
//! by the token string, with a TTL matching the token's expiry window. The
//! store is deliberately soft state: an entry that has expired or was lost to
//! a restart means the scan path skips network verification, it never fails.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// What the issuer knew about its own network when the token was created.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkEvidence {
    pub issuer_ip: Option<String>,
    pub issuer_ssid: Option<String>,
    /// Whether the issuer asked for scans to be checked against this evidence.
    pub require_verification: bool,
}

#[derive(Clone, Default)]
pub struct EvidenceCache {
    entries: Arc<DashMap<String, (NetworkEvidence, DateTime<Utc>)>>,
}

impl EvidenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(
        &self,
        token: impl Into<String>,
        evidence: NetworkEvidence,
        expires_at: DateTime<Utc>,
    ) {
        self.entries.insert(token.into(), (evidence, expires_at));
    }

    /// Returns the evidence for `token` if it has not expired; expired
    /// entries are dropped on the way out.
    pub fn get(&self, token: &str, now: DateTime<Utc>) -> Option<NetworkEvidence> {
        let expired = match self.entries.get(token) {
            Some(entry) => {
                let (evidence, expires_at) = entry.value();
                if *expires_at > now {
                    return Some(evidence.clone());
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(token);
        }
        None
    }

    pub fn remove(&self, token: &str) {
        self.entries.remove(token);
    }

    /// Drops every expired entry; returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
