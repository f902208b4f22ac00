//! Network proximity heuristics: same-/24 IPv4 matching and case-insensitive
//! Wi-Fi name comparison.
//!
//! Signals combine with OR. One flaky reading (a carrier-grade NAT address,
//! a renamed SSID) should not block a student who matches on the other
//! signal, so either positive is sufficient; the method field records which
//! one carried the match.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Which signal produced a positive network match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMatchMethod {
    IpSubnet,
    WifiSsid,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkCheck {
    pub same_network: bool,
    pub ip_match: bool,
    pub ssid_match: bool,
    pub method: Option<NetworkMatchMethod>,
}

/// True when both strings parse as IPv4 and the claimant falls inside the
/// issuer's /24 block. Malformed input is a non-match, never an error.
pub fn same_ipv4_subnet(claimant: &str, issuer: &str) -> bool {
    let (Ok(claimant), Ok(issuer)) = (
        claimant.trim().parse::<Ipv4Addr>(),
        issuer.trim().parse::<Ipv4Addr>(),
    ) else {
        return false;
    };

    let Ok(block) = Ipv4Net::new(issuer, 24) else {
        return false;
    };
    block.trunc().contains(&claimant)
}

fn ssid_matches(claimant: &str, issuer: &str) -> bool {
    let claimant = claimant.trim();
    let issuer = issuer.trim();
    !claimant.is_empty() && claimant.eq_ignore_ascii_case(issuer)
}

/// Compares claimant evidence against issuer evidence.
///
/// A signal only participates when both sides supplied it; with both signals
/// present either match passes.
pub fn verify_network(
    claimant_ip: Option<&str>,
    issuer_ip: Option<&str>,
    claimant_ssid: Option<&str>,
    issuer_ssid: Option<&str>,
) -> NetworkCheck {
    let ip_match = match (claimant_ip, issuer_ip) {
        (Some(c), Some(i)) => same_ipv4_subnet(c, i),
        _ => false,
    };

    let ssid_match = match (claimant_ssid, issuer_ssid) {
        (Some(c), Some(i)) => ssid_matches(c, i),
        _ => false,
    };

    let method = match (ip_match, ssid_match) {
        (true, true) => Some(NetworkMatchMethod::Both),
        (true, false) => Some(NetworkMatchMethod::IpSubnet),
        (false, true) => Some(NetworkMatchMethod::WifiSsid),
        (false, false) => None,
    };

    NetworkCheck {
        same_network: ip_match || ssid_match,
        ip_match,
        ssid_match,
        method,
    }
}
