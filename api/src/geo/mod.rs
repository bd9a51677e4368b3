use crate::address::Address;
use crate::classifier::{UNKNOWN_LOCALITY, UNKNOWN_OWNER};
use crate::config::Config;
use models::classification::ClassificationResult;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Fields requested from the geolocation API. Filtering keeps responses
/// small and quota usage predictable.
const IP_API_FIELDS: &str = "status,message,country,regionName,region,city,isp";

#[derive(Deserialize, Debug)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    region: Option<String>,
    city: Option<String>,
    isp: Option<String>,
}

/// Client for the remote geolocation API, used for query lookups only.
/// Absent entirely when no API key is configured.
#[derive(Debug)]
pub struct GeoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeoClient {
    pub fn new(config: &Config) -> Option<GeoClient> {
        let api_key = config.ip_api_key.clone()?;
        match GeoClient::with_endpoint(
            config.geo_api_url.clone(),
            api_key,
            Duration::from_secs(config.geo_lookup_timeout_secs),
        ) {
            Ok(client) => Some(client),
            Err(err) => {
                warn!("Failed to build geolocation client: {}", err);
                None
            }
        }
    }

    pub fn with_endpoint(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> anyhow::Result<GeoClient> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(GeoClient {
            client,
            base_url,
            api_key,
        })
    }

    /// Looks up `addr` against the remote API.
    ///
    /// Every failure mode (network error, timeout, non-2xx status,
    /// unparsable body, API-level error status) returns `None` so the
    /// caller falls back to the local classifier instead of surfacing an
    /// error.
    pub async fn lookup(&self, addr: &Address) -> Option<ClassificationResult> {
        let url = format!(
            "{}/{}?key={}&fields={}",
            self.base_url,
            addr.raw(),
            self.api_key,
            IP_API_FIELDS
        );

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("Geolocation request for {} failed: {}", addr.raw(), err);
                return None;
            }
        };

        if let Err(err) = response.error_for_status_ref() {
            warn!(
                "Geolocation API returned HTTP error for {}: {}",
                addr.raw(),
                err
            );
            return None;
        }

        let body = match response.json::<IpApiResponse>().await {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    "Failed to parse geolocation response for {}: {}",
                    addr.raw(),
                    err
                );
                return None;
            }
        };

        if body.status != "success" {
            warn!(
                "Geolocation API rejected {}: {}",
                addr.raw(),
                body.message.as_deref().unwrap_or("no message")
            );
            return None;
        }

        debug!("Geolocation hit for {}: {:?}", addr.raw(), body);
        let owner = body
            .isp
            .clone()
            .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
        Some(ClassificationResult {
            locality: compose_locality(&body),
            owner,
        })
    }
}

fn compose_locality(body: &IpApiResponse) -> String {
    let Some(country) = body.country.as_deref() else {
        return UNKNOWN_LOCALITY.to_string();
    };
    let region = body.region_name.as_deref().or(body.region.as_deref());
    match (body.city.as_deref(), region) {
        (Some(city), Some(region)) => format!("{country}, {region}, {city}"),
        (Some(city), None) => format!("{country}, {city}"),
        _ => country.to_string(),
    }
}
