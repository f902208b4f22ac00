use axum::{
    Json,
    extract::ConnectInfo,
    http::HeaderMap,
    response::IntoResponse,
};
use std::net::SocketAddr;

use super::common::NetworkInfoResponse;
use crate::response::ApiResponse;
use crate::routes::common::client_ip;

/// GET /api/attendance/network-info
///
/// Returns the caller's address as this server sees it. Issuing clients use
/// it to capture the issuer IP before requesting a network-bound token.
pub async fn network_info(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let forwarded = headers.contains_key("x-forwarded-for");
    let ip = client_ip(&headers, &addr);

    Json(ApiResponse::success(
        NetworkInfoResponse { ip, forwarded },
        "Network info retrieved",
    ))
}
