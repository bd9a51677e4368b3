use anyhow::Context;
use std::env;

#[derive(Debug)]
pub struct Config {
    pub bind_address: String,
    /// Enables the remote geolocation client when set.
    pub ip_api_key: Option<String>,
    pub geo_api_url: String,
    pub geo_lookup_timeout_secs: u64,
    pub sentry_url: Option<String>,
}

impl Config {
    pub fn new() -> anyhow::Result<Config> {
        _ = dotenvy::dotenv();

        let geo_lookup_timeout_secs = match env::var("GEO_LOOKUP_TIMEOUT_SECS") {
            Ok(value) => value
                .parse()
                .context("GEO_LOOKUP_TIMEOUT_SECS must be an integer number of seconds.")?,
            Err(_) => 5,
        };

        Ok(Config {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            ip_api_key: env::var("IP_API_KEY").ok(),
            geo_api_url: env::var("GEO_API_URL")
                .unwrap_or_else(|_| "https://pro.ip-api.com/json".to_string()),
            geo_lookup_timeout_secs,
            sentry_url: env::var("SENTRY_URL").ok(),
        })
    }
}
