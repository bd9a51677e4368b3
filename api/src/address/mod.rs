use thiserror::Error;

/// Longest text form we accept. A full uncompressed IPv6 address is 39
/// bytes; the bound only guards against pathological input.
const MAX_INPUT_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("empty address")]
    Empty,
    #[error("address exceeds {MAX_INPUT_LEN} characters")]
    TooLong,
    #[error("mixed IPv4/IPv6 notation is not supported")]
    MixedNotation,
    #[error("not a valid IPv4 or IPv6 address")]
    InvalidSyntax,
}

/// A syntactically valid address. Only `validate` constructs these, so any
/// `Address` value downstream code sees is well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    V4 {
        raw: String,
        octets: [u8; 4],
    },
    V6 {
        raw: String,
        /// Explicit hextet groups, as written.
        groups: Vec<u16>,
        /// Index in `groups` where a single `::` zero-run was elided.
        elision: Option<usize>,
    },
}

impl Address {
    pub fn raw(&self) -> &str {
        match self {
            Address::V4 { raw, .. } | Address::V6 { raw, .. } => raw,
        }
    }

    pub fn family(&self) -> AddressFamily {
        match self {
            Address::V4 { .. } => AddressFamily::V4,
            Address::V6 { .. } => AddressFamily::V6,
        }
    }
}

/// Expands an explicit group list plus elision marker to the full eight
/// hextets. `elision` must come from a validated `Address::V6`.
pub fn expand_hextets(groups: &[u16], elision: Option<usize>) -> [u16; 8] {
    let mut segments = [0u16; 8];
    match elision {
        Some(position) => {
            for (i, group) in groups[..position].iter().enumerate() {
                segments[i] = *group;
            }
            let tail = groups.len() - position;
            for (i, group) in groups[position..].iter().enumerate() {
                segments[8 - tail + i] = *group;
            }
        }
        None => {
            for (i, group) in groups.iter().enumerate() {
                segments[i] = *group;
            }
        }
    }
    segments
}

/// Parses `input` as an IPv4 or IPv6 address.
///
/// Dotted-quad input must be canonical decimal: four segments in [0, 255],
/// no signs, no leading zeros. Colon input takes the IPv6 path. Input mixing
/// the two notations (IPv4-mapped IPv6) is rejected outright.
pub fn validate(input: &str) -> Result<Address, AddressParseError> {
    if input.is_empty() {
        return Err(AddressParseError::Empty);
    }
    if input.len() > MAX_INPUT_LEN {
        return Err(AddressParseError::TooLong);
    }

    let has_colon = input.contains(':');
    if has_colon && input.contains('.') {
        return Err(AddressParseError::MixedNotation);
    }

    if has_colon {
        parse_v6(input)
    } else {
        parse_v4(input)
    }
}

fn parse_v4(input: &str) -> Result<Address, AddressParseError> {
    let mut octets = [0u8; 4];
    let mut count = 0;
    for part in input.split('.') {
        if count == 4 {
            return Err(AddressParseError::InvalidSyntax);
        }
        octets[count] = parse_octet(part).ok_or(AddressParseError::InvalidSyntax)?;
        count += 1;
    }
    if count != 4 {
        return Err(AddressParseError::InvalidSyntax);
    }
    Ok(Address::V4 {
        raw: input.to_string(),
        octets,
    })
}

fn parse_octet(part: &str) -> Option<u8> {
    if part.is_empty() || part.len() > 3 {
        return None;
    }
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Canonical decimal only: "0" is fine, "010" is not.
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

fn parse_v6(input: &str) -> Result<Address, AddressParseError> {
    // Loopback shows up constantly; accept it ahead of the general matchers.
    if input == "::1" {
        return Ok(Address::V6 {
            raw: input.to_string(),
            groups: vec![1],
            elision: Some(0),
        });
    }

    if let Some((left, right)) = input.split_once("::") {
        if right.contains("::") {
            // More than one elision is ambiguous.
            return Err(AddressParseError::InvalidSyntax);
        }
        let left_groups = parse_groups(left)?;
        let right_groups = parse_groups(right)?;
        if left_groups.len() + right_groups.len() > 7 {
            return Err(AddressParseError::InvalidSyntax);
        }
        let elision = Some(left_groups.len());
        let mut groups = left_groups;
        groups.extend(right_groups);
        Ok(Address::V6 {
            raw: input.to_string(),
            groups,
            elision,
        })
    } else {
        let groups = parse_groups(input)?;
        if groups.len() != 8 {
            return Err(AddressParseError::InvalidSyntax);
        }
        Ok(Address::V6 {
            raw: input.to_string(),
            groups,
            elision: None,
        })
    }
}

fn parse_groups(side: &str) -> Result<Vec<u16>, AddressParseError> {
    if side.is_empty() {
        return Ok(Vec::new());
    }
    side.split(':').map(parse_group).collect()
}

fn parse_group(group: &str) -> Result<u16, AddressParseError> {
    if group.is_empty() || group.len() > 4 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressParseError::InvalidSyntax);
    }
    u16::from_str_radix(group, 16).map_err(|_| AddressParseError::InvalidSyntax)
}
