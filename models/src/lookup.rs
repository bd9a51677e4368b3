use crate::classification::Provenance;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response envelope for both the self-lookup and query-lookup endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IpLookupResponse {
    #[schema(example = "8.8.8.8")]
    pub ip: String,
    /// Locality label: a place name when a data source answered, otherwise a
    /// network-segment category such as "loopback" or "private network".
    #[schema(example = "United States")]
    pub city: String,
    /// Owner label: ISP or organization name, or an ownership category.
    #[schema(example = "Google Public DNS")]
    pub isp: String,
    /// Which data source produced the result.
    pub database: Provenance,
}
