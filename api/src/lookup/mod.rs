pub mod route;

use crate::address;
use crate::classifier::{Classifier, ProxyGeoMetadata};
use crate::geo::GeoClient;
use axum::http::HeaderMap;
use models::classification::{ClassificationResult, Provenance};
use std::net::SocketAddr;
use tracing::warn;

pub fn extract_client_ip(headers: &HeaderMap, fallback_addr: SocketAddr) -> String {
    // Check X-Forwarded-For header first (load balancer/proxy). It can
    // contain multiple IPs; the first is the original client.
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded_for.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let candidate = first_ip.trim();
                if address::validate(candidate).is_ok() {
                    return candidate.to_string();
                }
            }
        }
    }

    // Check X-Real-IP header (alternative proxy header)
    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            let candidate = real_ip_str.trim();
            if address::validate(candidate).is_ok() {
                return candidate.to_string();
            }
        }
    }

    // Fall back to direct connection IP
    fallback_addr.ip().to_string()
}

/// Reads the reverse proxy's geolocation headers. Empty values count as
/// absent.
pub fn extract_proxy_geo(headers: &HeaderMap) -> ProxyGeoMetadata {
    ProxyGeoMetadata {
        country: header_value(headers, "x-geo-country"),
        region: header_value(headers, "x-geo-region"),
        city: header_value(headers, "x-geo-city"),
        organization: header_value(headers, "x-geo-org"),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolves a query lookup: the remote data source when configured and
/// answering, otherwise the local classifier. Remote failures never surface
/// to the caller; they only change the reported provenance.
pub async fn resolve_query(
    addr: &address::Address,
    classifier: &Classifier,
    geo: Option<&GeoClient>,
) -> (ClassificationResult, Provenance) {
    if let Some(geo) = geo {
        if let Some(result) = geo.lookup(addr).await {
            return (result, Provenance::Remote);
        }
        warn!(
            "Remote lookup for {} failed, using local classification",
            addr.raw()
        );
    }
    (classifier.classify(addr), Provenance::Local)
}
