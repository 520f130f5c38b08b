//! A digest-protected server simulated in memory.
//!
//! Verification is written against the RFCs directly with `md-5`/`sha2`, not
//! with the crate's own helpers, so both sides have to agree independently.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use digest_fetch::{ChallengeResponse, RequestOptions};
use md5::Md5;
use sha2::{Digest, Sha256, Sha512_256};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub www_authenticate: Option<String>,
}

impl ChallengeResponse for Reply {
    fn status(&self) -> u16 {
        self.status
    }

    fn www_authenticate(&self) -> Option<&str> {
        self.www_authenticate.as_deref()
    }
}

pub fn hash(algorithm: &str, data: &str) -> String {
    if algorithm.starts_with("SHA-512-256") {
        hex::encode(Sha512_256::digest(data.as_bytes()))
    } else if algorithm.starts_with("SHA-256") {
        hex::encode(Sha256::digest(data.as_bytes()))
    } else {
        hex::encode(Md5::digest(data.as_bytes()))
    }
}

/// Split an Authorization value into its fields, quotes removed
pub fn parse_authorization(value: &str) -> (String, HashMap<String, String>) {
    let (scheme, rest) = value.split_once(' ').unwrap_or((value, ""));
    let fields = rest
        .split(',')
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().trim_matches('"').to_string()))
        .collect();
    (scheme.to_string(), fields)
}

pub struct DigestServer {
    pub realm: String,
    pub users: HashMap<String, String>,
    pub algorithm: String,
    /// qop list offered, None for RFC 2069
    pub qop: Option<String>,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Status used for challenges
    pub challenge_status: u16,
    /// Highest nc seen for the current nonce
    pub last_nc: u32,
    /// Every Authorization header received, None for unauthenticated requests
    pub received: Vec<Option<String>>,
}

impl DigestServer {
    pub fn new(algorithm: &str) -> Self {
        let mut users = HashMap::new();
        users.insert("test".to_string(), "test".to_string());

        DigestServer {
            realm: "Users".to_string(),
            users,
            algorithm: algorithm.to_string(),
            qop: Some("auth".to_string()),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_string()),
            challenge_status: 401,
            last_nc: 0,
            received: Vec::new(),
        }
    }

    /// Issue a fresh nonce, e.g. after the old one expired
    pub fn rotate_nonce(&mut self, nonce: &str) {
        self.nonce = nonce.to_string();
        self.last_nc = 0;
    }

    pub fn challenge(&self) -> String {
        let mut out = format!("Digest realm=\"{}\", nonce=\"{}\"", self.realm, self.nonce);
        if let Some(qop) = &self.qop {
            out.push_str(&format!(", qop=\"{}\"", qop));
        }
        out.push_str(&format!(", algorithm={}", self.algorithm));
        if let Some(opaque) = &self.opaque {
            out.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        out
    }

    fn reject(&self) -> Reply {
        Reply {
            status: self.challenge_status,
            www_authenticate: Some(self.challenge()),
        }
    }

    fn ok() -> Reply {
        Reply {
            status: 200,
            www_authenticate: None,
        }
    }

    pub fn handle(&mut self, target: &str, options: &RequestOptions) -> Reply {
        let authorization = options
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .map(|(_, v)| v.clone());
        self.received.push(authorization.clone());

        let Some(authorization) = authorization else {
            return self.reject();
        };

        if self.verify(target, &options.method(), &authorization) {
            Self::ok()
        } else {
            self.reject()
        }
    }

    fn verify(&mut self, target: &str, method: &str, authorization: &str) -> bool {
        let (scheme, f) = parse_authorization(authorization);
        if scheme != "Digest" {
            return false;
        }

        let Some(password) = f.get("username").and_then(|u| self.users.get(u)) else {
            return false;
        };
        if f.get("realm") != Some(&self.realm)
            || f.get("nonce") != Some(&self.nonce)
            || f.get("algorithm") != Some(&self.algorithm)
            || f.get("opaque") != self.opaque.as_ref()
        {
            return false;
        }

        let path = match target.find("://") {
            Some(i) => target[i + 3..]
                .find('/')
                .map_or("/", |p| &target[i + 3 + p..]),
            None => target,
        };
        if f.get("uri").map(String::as_str) != Some(path) {
            return false;
        }

        let alg = self.algorithm.as_str();
        let mut ha1 = hash(alg, &format!("{}:{}:{}", f["username"], self.realm, password));
        let ha2 = hash(alg, &format!("{}:{}", method, path));

        let expected = if self.qop.is_some() {
            let (Some(nc), Some(cnonce), Some(qop)) = (f.get("nc"), f.get("cnonce"), f.get("qop"))
            else {
                return false;
            };
            let Ok(count) = nc.parse::<u32>() else {
                return false;
            };
            // replayed or reordered count
            if count <= self.last_nc {
                return false;
            }
            self.last_nc = count;

            if alg.ends_with("-sess") {
                ha1 = hash(alg, &format!("{}:{}:{}", ha1, self.nonce, cnonce));
            }
            hash(
                alg,
                &format!("{}:{}:{}:{}:{}:{}", ha1, self.nonce, nc, cnonce, qop, ha2),
            )
        } else {
            hash(alg, &format!("{}:{}:{}", ha1, self.nonce, ha2))
        };

        f.get("response") == Some(&expected)
    }
}

/// `/basic` endpoint accepting the same users with Basic auth
pub fn basic_endpoint(users: &HashMap<String, String>, options: &RequestOptions) -> Reply {
    let accepted = options.headers.iter().any(|(k, v)| {
        k.eq_ignore_ascii_case("authorization")
            && users.iter().any(|(u, p)| {
                *v == format!("Basic {}", STANDARD.encode(format!("{}:{}", u, p)))
            })
    });

    Reply {
        status: if accepted { 200 } else { 401 },
        www_authenticate: if accepted {
            None
        } else {
            Some("Basic realm=\"Users\"".to_string())
        },
    }
}
