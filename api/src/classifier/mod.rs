use crate::address::{Address, expand_hextets};
use models::classification::ClassificationResult;
use std::collections::HashMap;
use tracing::debug;

pub const UNKNOWN_LOCALITY: &str = "unknown region";
pub const UNKNOWN_V6_LOCALITY: &str = "unknown region (IPv6)";
pub const UNKNOWN_OWNER: &str = "unknown provider";

/// Geolocation strings supplied out-of-band by a trusted reverse proxy for
/// the caller's own address.
#[derive(Debug, Default, Clone)]
pub struct ProxyGeoMetadata {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub organization: Option<String>,
}

/// An ordered subnet-membership rule. Rules are evaluated top to bottom and
/// the first match wins.
struct RangeRule<C> {
    name: &'static str,
    matches: fn(C) -> bool,
    locality: &'static str,
    owner: &'static str,
}

fn v4_private_class_c(octets: [u8; 4]) -> bool {
    octets[0] == 192 && octets[1] == 168
}

fn v4_private_class_a(octets: [u8; 4]) -> bool {
    octets[0] == 10
}

// 172.16.0.0/12, not the whole of 172.*: only second octets 16..=31 are
// private.
fn v4_private_class_b(octets: [u8; 4]) -> bool {
    octets[0] == 172 && (16..=31).contains(&octets[1])
}

fn v4_loopback(octets: [u8; 4]) -> bool {
    octets[0] == 127
}

fn v4_link_local(octets: [u8; 4]) -> bool {
    octets[0] == 169 && octets[1] == 254
}

fn v4_multicast(octets: [u8; 4]) -> bool {
    (224..=239).contains(&octets[0])
}

fn v6_loopback(segments: [u16; 8]) -> bool {
    segments == [0, 0, 0, 0, 0, 0, 0, 1]
}

fn v6_link_local(segments: [u16; 8]) -> bool {
    segments[0] & 0xffc0 == 0xfe80
}

fn v6_unique_local(segments: [u16; 8]) -> bool {
    segments[0] & 0xfe00 == 0xfc00
}

fn v6_multicast(segments: [u16; 8]) -> bool {
    segments[0] & 0xff00 == 0xff00
}

fn v6_documentation(segments: [u16; 8]) -> bool {
    segments[0] == 0x2001 && segments[1] == 0x0db8
}

const V4_RULES: &[RangeRule<[u8; 4]>] = &[
    RangeRule {
        name: "rfc1918-192.168.0.0/16",
        matches: v4_private_class_c,
        locality: "private network (class C)",
        owner: "local network",
    },
    RangeRule {
        name: "rfc1918-10.0.0.0/8",
        matches: v4_private_class_a,
        locality: "private network (class A)",
        owner: "local network",
    },
    RangeRule {
        name: "rfc1918-172.16.0.0/12",
        matches: v4_private_class_b,
        locality: "private network (class B)",
        owner: "local network",
    },
    RangeRule {
        name: "loopback-127.0.0.0/8",
        matches: v4_loopback,
        locality: "loopback",
        owner: "local machine",
    },
    RangeRule {
        name: "link-local-169.254.0.0/16",
        matches: v4_link_local,
        locality: "link-local",
        owner: "local machine",
    },
    RangeRule {
        name: "multicast-224.0.0.0/4",
        matches: v4_multicast,
        locality: "multicast",
        owner: "multicast group",
    },
];

const V6_RULES: &[RangeRule<[u16; 8]>] = &[
    RangeRule {
        name: "loopback-::1",
        matches: v6_loopback,
        locality: "loopback",
        owner: "local machine",
    },
    RangeRule {
        name: "link-local-fe80::/10",
        matches: v6_link_local,
        locality: "link-local",
        owner: "local machine",
    },
    RangeRule {
        name: "unique-local-fc00::/7",
        matches: v6_unique_local,
        locality: "private network (unique local)",
        owner: "local network",
    },
    RangeRule {
        name: "multicast-ff00::/8",
        matches: v6_multicast,
        locality: "multicast",
        owner: "multicast group",
    },
    RangeRule {
        name: "documentation-2001:db8::/32",
        matches: v6_documentation,
        locality: "documentation range",
        owner: "IETF reserved",
    },
];

/// Curated well-known resolvers, keyed on the exact address text. These win
/// over every range rule and are the only source of real provider names when
/// no remote data source is configured.
const OVERRIDES: &[(&str, &str, &str)] = &[
    ("8.8.8.8", "United States", "Google Public DNS"),
    ("8.8.4.4", "United States", "Google Public DNS"),
    ("2001:4860:4860::8888", "United States", "Google Public DNS"),
    ("1.1.1.1", "United States", "Cloudflare DNS"),
    ("1.0.0.1", "United States", "Cloudflare DNS"),
    ("9.9.9.9", "United States", "Quad9 DNS"),
    ("208.67.222.222", "United States", "OpenDNS"),
    ("114.114.114.114", "China", "114DNS"),
    ("223.5.5.5", "Hangzhou, China", "Alibaba Cloud DNS"),
    ("119.29.29.29", "Shenzhen, China", "Tencent DNS"),
    ("180.76.76.76", "Beijing, China", "Baidu DNS"),
];

/// Country codes the reverse proxy is known to send, mapped to display
/// names. Codes outside the table pass through verbatim.
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("US", "United States"),
    ("CN", "China"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("GB", "United Kingdom"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("CA", "Canada"),
    ("AU", "Australia"),
    ("SG", "Singapore"),
    ("HK", "Hong Kong"),
    ("TW", "Taiwan"),
    ("RU", "Russia"),
    ("IN", "India"),
    ("BR", "Brazil"),
];

/// Read-only classification tables, built once at startup and shared across
/// requests.
#[derive(Debug)]
pub struct Classifier {
    overrides: HashMap<&'static str, (&'static str, &'static str)>,
    countries: HashMap<&'static str, &'static str>,
}

impl Classifier {
    pub fn new() -> Classifier {
        Classifier {
            overrides: OVERRIDES
                .iter()
                .map(|(ip, locality, owner)| (*ip, (*locality, *owner)))
                .collect(),
            countries: COUNTRY_NAMES.iter().copied().collect(),
        }
    }

    /// Classifies a validated address into a `(locality, owner)` pair.
    ///
    /// Precedence: exact override entry, then the family's range rules in
    /// order, then the unknown fallback. Total over all `Address` values.
    pub fn classify(&self, addr: &Address) -> ClassificationResult {
        if let Some((locality, owner)) = self.overrides.get(addr.raw()) {
            debug!(ip = addr.raw(), "override table hit");
            return ClassificationResult::new(*locality, *owner);
        }

        match addr {
            Address::V4 { octets, .. } => {
                for rule in V4_RULES {
                    if (rule.matches)(*octets) {
                        debug!(ip = addr.raw(), rule = rule.name, "range rule matched");
                        return ClassificationResult::new(rule.locality, rule.owner);
                    }
                }
                ClassificationResult::new(UNKNOWN_LOCALITY, UNKNOWN_OWNER)
            }
            Address::V6 {
                groups, elision, ..
            } => {
                let segments = expand_hextets(groups, *elision);
                for rule in V6_RULES {
                    if (rule.matches)(segments) {
                        debug!(ip = addr.raw(), rule = rule.name, "range rule matched");
                        return ClassificationResult::new(rule.locality, rule.owner);
                    }
                }
                ClassificationResult::new(UNKNOWN_V6_LOCALITY, UNKNOWN_OWNER)
            }
        }
    }

    /// Builds a result from reverse-proxy geolocation metadata, composing the
    /// locality as `country[, region][, city]`. Returns `None` without a
    /// country so the caller can fall back to `classify`.
    pub fn compose_proxy_location(
        &self,
        meta: &ProxyGeoMetadata,
    ) -> Option<ClassificationResult> {
        let code = meta.country.as_deref()?;
        let country = self.countries.get(code).copied().unwrap_or(code);
        let locality = match (meta.city.as_deref(), meta.region.as_deref()) {
            (Some(city), Some(region)) => format!("{country}, {region}, {city}"),
            (Some(city), None) => format!("{country}, {city}"),
            _ => country.to_string(),
        };
        let owner = meta
            .organization
            .clone()
            .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
        Some(ClassificationResult { locality, owner })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::validate;

    fn classify(input: &str) -> ClassificationResult {
        Classifier::new().classify(&validate(input).unwrap())
    }

    #[test]
    fn test_curated_resolvers_hit_override_table() {
        let result = classify("8.8.8.8");
        assert_eq!(result.locality, "United States");
        assert_eq!(result.owner, "Google Public DNS");

        let result = classify("223.5.5.5");
        assert_eq!(result.locality, "Hangzhou, China");
        assert_eq!(result.owner, "Alibaba Cloud DNS");

        let result = classify("2001:4860:4860::8888");
        assert_eq!(result.owner, "Google Public DNS");
    }

    #[test]
    fn test_override_entry_beats_range_rules() {
        let mut classifier = Classifier::new();
        classifier
            .overrides
            .insert("127.0.0.1", ("Test Lab", "Test Resolver"));

        let result = classifier.classify(&validate("127.0.0.1").unwrap());
        assert_eq!(result.locality, "Test Lab");
        assert_eq!(result.owner, "Test Resolver");

        // A loopback address not in the table still takes the range rule.
        let result = classifier.classify(&validate("127.0.0.2").unwrap());
        assert_eq!(result.locality, "loopback");
    }

    #[test]
    fn test_private_ranges() {
        assert_eq!(classify("192.168.1.1").locality, "private network (class C)");
        assert_eq!(classify("10.0.0.1").locality, "private network (class A)");
        assert_eq!(classify("10.255.255.255").owner, "local network");
        assert_eq!(classify("172.16.0.1").locality, "private network (class B)");
        assert_eq!(
            classify("172.31.255.255").locality,
            "private network (class B)"
        );
    }

    #[test]
    fn test_class_b_scoping_boundaries() {
        // 172.16.0.0/12 only; neighbours fall through to unknown.
        assert_eq!(classify("172.15.255.255").locality, UNKNOWN_LOCALITY);
        assert_eq!(classify("172.32.0.1").locality, UNKNOWN_LOCALITY);
    }

    #[test]
    fn test_loopback_and_link_local() {
        assert_eq!(classify("127.0.0.1").locality, "loopback");
        assert_eq!(classify("127.0.0.1").owner, "local machine");
        assert_eq!(classify("169.254.10.20").locality, "link-local");
    }

    #[test]
    fn test_multicast_boundaries() {
        assert_eq!(classify("224.0.0.1").locality, "multicast");
        assert_eq!(classify("239.255.255.255").locality, "multicast");
        assert_eq!(classify("223.255.255.255").locality, UNKNOWN_LOCALITY);
        assert_eq!(classify("240.0.0.1").locality, UNKNOWN_LOCALITY);
    }

    #[test]
    fn test_ipv6_special_ranges() {
        assert_eq!(classify("::1").locality, "loopback");
        assert_eq!(classify("::1").owner, "local machine");
        assert_eq!(classify("fe80::1").locality, "link-local");
        assert_eq!(
            classify("fc00::1").locality,
            "private network (unique local)"
        );
        assert_eq!(
            classify("fd12:3456::1").locality,
            "private network (unique local)"
        );
        assert_eq!(classify("ff02::1").locality, "multicast");
        assert_eq!(classify("2001:db8::1").locality, "documentation range");
        assert_eq!(classify("2606:4700::1111").locality, UNKNOWN_V6_LOCALITY);
    }

    #[test]
    fn test_unknown_fallback() {
        let result = classify("203.0.113.7");
        assert_eq!(result.locality, UNKNOWN_LOCALITY);
        assert_eq!(result.owner, UNKNOWN_OWNER);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = Classifier::new();
        let addr = validate("172.20.1.2").unwrap();
        assert_eq!(classifier.classify(&addr), classifier.classify(&addr));
    }

    #[test]
    fn test_proxy_composition_with_full_metadata() {
        let classifier = Classifier::new();
        let meta = ProxyGeoMetadata {
            country: Some("US".to_string()),
            region: Some("California".to_string()),
            city: Some("Los Angeles".to_string()),
            organization: Some("Example ISP".to_string()),
        };
        let result = classifier.compose_proxy_location(&meta).unwrap();
        assert_eq!(result.locality, "United States, California, Los Angeles");
        assert_eq!(result.owner, "Example ISP");
    }

    #[test]
    fn test_proxy_composition_partial_metadata() {
        let classifier = Classifier::new();

        let meta = ProxyGeoMetadata {
            country: Some("JP".to_string()),
            city: Some("Tokyo".to_string()),
            ..Default::default()
        };
        let result = classifier.compose_proxy_location(&meta).unwrap();
        assert_eq!(result.locality, "Japan, Tokyo");
        assert_eq!(result.owner, UNKNOWN_OWNER);

        // Region without city is not composed in.
        let meta = ProxyGeoMetadata {
            country: Some("DE".to_string()),
            region: Some("Bavaria".to_string()),
            ..Default::default()
        };
        let result = classifier.compose_proxy_location(&meta).unwrap();
        assert_eq!(result.locality, "Germany");
    }

    #[test]
    fn test_proxy_composition_requires_country() {
        let classifier = Classifier::new();
        let meta = ProxyGeoMetadata {
            city: Some("Nowhere".to_string()),
            ..Default::default()
        };
        assert!(classifier.compose_proxy_location(&meta).is_none());
    }

    #[test]
    fn test_unmapped_country_code_passes_through() {
        let classifier = Classifier::new();
        let meta = ProxyGeoMetadata {
            country: Some("NO".to_string()),
            ..Default::default()
        };
        let result = classifier.compose_proxy_location(&meta).unwrap();
        assert_eq!(result.locality, "NO");
    }
}
