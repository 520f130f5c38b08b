//! Tolerant extraction of fields from a `WWW-Authenticate` challenge.
//!
//! Servers in the wild send anything from strict RFC 7616 headers to
//! unquoted, oddly spaced RFC 2069 leftovers. Nothing here fails: a missing
//! field is reported as `None` and the caller picks a default.

use crate::Qop;
use std::str::FromStr;

/// Challenges shorter than this are treated as "no challenge at all"
pub const MIN_CHALLENGE_LEN: usize = 5;

/// Extract the value of `field` from a raw challenge header.
///
/// The field name matches case-insensitively and must start a token (be at the
/// beginning of the header or follow whitespace or a comma). The value is either
/// a quoted string or everything up to the next comma. With `trim` set,
/// surrounding quotes and whitespace are removed from the captured value.
pub fn parse_field(raw: &str, field: &str, trim: bool) -> Option<String> {
    let haystack = raw.to_ascii_lowercase();
    let needle = format!("{}=", field.to_ascii_lowercase());

    let mut from = 0;
    let start = loop {
        let idx = from + haystack[from..].find(&needle)?;
        let at_boundary = haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| c == ',' || c.is_whitespace());
        if at_boundary {
            break idx + needle.len();
        }
        from = idx + needle.len();
    };

    let rest = &raw[start..];
    let captured = match rest.strip_prefix('"').and_then(|r| r.find('"')) {
        // closing quote included
        Some(end) => &rest[..end + 2],
        None => rest.split(',').next().unwrap_or(""),
    };

    Some(if trim {
        captured
            .trim_matches(|c: char| c == '"' || c.is_whitespace())
            .to_string()
    } else {
        captured.to_string()
    })
}

/// Select the quality of protection from the `qop` list offered by the server.
///
/// `auth` wins over `auth-int`; anything else (or no `qop` field) means the
/// RFC 2069 compatible mode, encoded as `None`.
pub fn parse_qop(raw: &str) -> Option<Qop> {
    let offered = parse_field(raw, "qop", true)?;
    let qops: Vec<Qop> = offered
        .split(',')
        .filter_map(|q| Qop::from_str(q.trim()).ok())
        .collect();

    if qops.contains(&Qop::AUTH) {
        Some(Qop::AUTH)
    } else if qops.contains(&Qop::AUTH_INT) {
        Some(Qop::AUTH_INT)
    } else {
        None
    }
}

/// Authentication scheme, the first whitespace-delimited token of the header
pub fn parse_scheme(raw: &str) -> &str {
    raw.split_whitespace().next().unwrap_or("")
}

/// Snapshot of the fields a client needs from one challenge
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Challenge {
    /// Scheme token, normally `Digest`
    pub scheme: String,
    /// Protection realm, quotes removed, inner whitespace kept
    pub realm: String,
    /// Server nonce, empty if the server did not send one
    pub nonce: String,
    /// Echoed back verbatim if present
    pub opaque: Option<String>,
    pub qop: Option<Qop>,
    /// Algorithm advertised by the server, unvalidated
    pub algorithm: Option<String>,
}

impl Challenge {
    /// Parse a `WWW-Authenticate` value.
    ///
    /// Returns `None` for values too short to be a challenge; this is how a
    /// server that did not ask for credentials is recognized.
    pub fn parse(header: &str) -> Option<Challenge> {
        if header.len() < MIN_CHALLENGE_LEN {
            return None;
        }

        Some(Challenge {
            scheme: parse_scheme(header).to_string(),
            realm: parse_field(header, "realm", false)
                .map(|r| r.replace('"', ""))
                .unwrap_or_default(),
            nonce: parse_field(header, "nonce", true).unwrap_or_default(),
            opaque: parse_field(header, "opaque", true),
            qop: parse_qop(header),
            algorithm: parse_field(header, "algorithm", true),
        })
    }
}
