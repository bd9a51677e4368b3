use crate::State;
use crate::address;
use crate::classifier::{UNKNOWN_LOCALITY, UNKNOWN_OWNER};
use crate::error::ApiError;
use crate::lookup::{extract_client_ip, extract_proxy_geo, resolve_query};
use axum::extract::{ConnectInfo, Query};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use models::classification::{ClassificationResult, Provenance};
use models::lookup::IpLookupResponse;
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::debug;

const IP_LOOKUP_TAG: &str = "ip_lookup";

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Lookup of the caller's own address", body = IpLookupResponse),
    ),
    tag = IP_LOOKUP_TAG
)]
pub async fn lookup_self(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Json<IpLookupResponse> {
    let visitor_ip = extract_client_ip(&headers, addr);
    debug!("Self lookup for {}", visitor_ip);

    let meta = extract_proxy_geo(&headers);
    let (result, provenance) = match state.classifier.compose_proxy_location(&meta) {
        Some(result) => (result, Provenance::Proxy),
        None => match address::validate(&visitor_ip) {
            Ok(parsed) => (state.classifier.classify(&parsed), Provenance::Local),
            Err(err) => {
                // The peer address text should always parse; a failure here
                // means an exotic socket form, not a client error.
                debug!("Could not parse visitor address {:?}: {}", visitor_ip, err);
                (
                    ClassificationResult::new(UNKNOWN_LOCALITY, UNKNOWN_OWNER),
                    Provenance::Local,
                )
            }
        },
    };

    Json(IpLookupResponse {
        ip: visitor_ip,
        city: result.locality,
        isp: result.owner,
        database: provenance,
    })
}

#[derive(Deserialize, Debug)]
pub struct IpQuery {
    ip: Option<String>,
}

#[utoipa::path(
    get,
    path = "/ip",
    params(
        ("ip" = String, Query, description = "IPv4 or IPv6 address to look up"),
    ),
    responses(
        (status = 200, description = "Lookup of the queried address", body = IpLookupResponse),
        (status = 400, description = "Missing or invalid ip parameter", body = String),
    ),
    tag = IP_LOOKUP_TAG
)]
pub async fn lookup_address(
    Extension(state): Extension<State>,
    Query(query): Query<IpQuery>,
) -> Result<Json<IpLookupResponse>, ApiError> {
    let ip = query
        .ip
        .ok_or_else(|| ApiError::bad_request("missing ip parameter"))?;
    let parsed =
        address::validate(&ip).map_err(|err| ApiError::bad_request(err.to_string()))?;

    debug!("Query lookup for {} ({:?})", ip, parsed.family());
    let (result, provenance) =
        resolve_query(&parsed, &state.classifier, state.geo.as_deref()).await;

    Ok(Json(IpLookupResponse {
        ip,
        city: result.locality,
        isp: result.owner,
        database: provenance,
    }))
}
