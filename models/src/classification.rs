use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a lookup result came from.
///
/// `Remote` means the external geolocation API answered, `Proxy` means the
/// reverse proxy supplied edge metadata for the caller's own address, and
/// `Local` means the built-in heuristic classifier produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Remote,
    Proxy,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResult {
    #[schema(example = "private network (class C)")]
    pub locality: String,
    #[schema(example = "local network")]
    pub owner: String,
}

impl ClassificationResult {
    pub fn new(locality: impl Into<String>, owner: impl Into<String>) -> Self {
        ClassificationResult {
            locality: locality.into(),
            owner: owner.into(),
        }
    }
}
