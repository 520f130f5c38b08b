use crate::challenge::Challenge;
use crate::config::{Logger, Warnings};
use crate::utils::{format_nc, make_nonce, request_uri, DEFAULT_CNONCE_SIZE};
use crate::{Algorithm, Qop};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Login credentials, fixed for the lifetime of a session
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login username
    pub identity: String,
    /// Plain password, or `H(identity:realm:password)` when `precomputed` is set
    pub secret: String,
    pub precomputed: bool,
}

impl Credentials {
    /// Plain identity/password pair
    pub fn new(identity: &str, secret: &str) -> Self {
        Credentials {
            identity: identity.to_string(),
            secret: secret.to_string(),
            precomputed: false,
        }
    }

    /// Credentials whose secret already is the HA1 hash for the realm
    pub fn precomputed(identity: &str, ha1: &str) -> Self {
        Credentials {
            precomputed: true,
            ..Credentials::new(identity, ha1)
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("precomputed", &self.precomputed)
            .finish()
    }
}

/// Per-client digest state, overwritten by every consumed challenge
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionRecord {
    /// Configured hashing algorithm
    pub algorithm: Algorithm,
    /// Scheme token echoed from the challenge
    pub scheme: String,
    pub realm: String,
    /// Server nonce
    pub nonce: String,
    /// Server opaque string
    pub opaque: Option<String>,
    /// Selected qop, None in RFC 2069 compat mode
    pub qop: Option<Qop>,
    /// Client nonce, regenerated for each challenge
    pub cnonce: String,
    /// Nonce count. Never decreases.
    pub nc: u32,
    /// A usable challenge has been consumed
    pub authenticated: bool,
}

/// Owns one [`SessionRecord`] and computes `Authorization` values against it.
///
/// The record is plain mutable state: driving one session from overlapping
/// requests races on `nonce`, `cnonce` and `nc`. Use
/// [`SharedDigestClient`](crate::SharedDigestClient) if requests cannot be sequenced.
pub struct DigestSession {
    credentials: Credentials,
    record: SessionRecord,
    cnonce_size: usize,
    rng: Box<dyn RngCore + Send>,
    warnings: Warnings,
}

impl DigestSession {
    /// Fresh unauthenticated session with an entropy-seeded nonce generator
    pub fn new(credentials: Credentials, algorithm: Algorithm) -> Self {
        DigestSession {
            credentials,
            record: SessionRecord {
                algorithm,
                ..SessionRecord::default()
            },
            cnonce_size: DEFAULT_CNONCE_SIZE,
            rng: Box::new(StdRng::from_entropy()),
            warnings: Warnings::default(),
        }
    }

    /// Length of generated client nonces
    pub fn with_cnonce_size(mut self, size: usize) -> Self {
        self.cnonce_size = size;
        self
    }

    /// Use `rng` for client nonces instead of an entropy-seeded one
    pub fn with_rng<R: RngCore + Send + 'static>(self, rng: R) -> Self {
        self.with_boxed_rng(Box::new(rng))
    }

    pub(crate) fn with_boxed_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    /// Send warnings to `logger` as well as to `log`
    pub fn with_logger<L: Logger + 'static>(self, logger: L) -> Self {
        self.with_warnings(Warnings::new(Some(Arc::new(logger))))
    }

    pub(crate) fn with_warnings(mut self, warnings: Warnings) -> Self {
        self.warnings = warnings;
        self
    }

    /// Credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Current challenge state
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Direct access to the record, e.g. to pin a client nonce in tests
    pub fn record_mut(&mut self) -> &mut SessionRecord {
        &mut self.record
    }

    /// Whether a challenge has been consumed and credentials go out pre-emptively
    pub fn is_authenticated(&self) -> bool {
        self.record.authenticated
    }

    /// Forget the challenge; the next request goes out without credentials
    pub fn invalidate(&mut self) {
        self.record.authenticated = false;
    }

    /// Bump the nonce count
    pub fn advance(&mut self) {
        self.record.nc = self.record.nc.saturating_add(1);
    }

    /// Take in the value of a `WWW-Authenticate` header.
    ///
    /// A missing or too short value only clears `authenticated`. Anything else
    /// overwrites the server fields, draws a new client nonce and bumps the
    /// nonce count, even when the same challenge is consumed twice.
    pub fn consume_challenge(&mut self, header: Option<&str>) {
        let Some(challenge) = header.and_then(Challenge::parse) else {
            debug!("No usable challenge, continuing without credentials");
            self.record.authenticated = false;
            return;
        };

        if let Some(offered) = &challenge.algorithm {
            if *offered != self.record.algorithm.to_string() {
                debug!(
                    "Server offers algorithm {}, keeping configured {}",
                    offered, self.record.algorithm
                );
            }
        }

        let record = &mut self.record;
        record.authenticated = true;
        record.scheme = challenge.scheme;
        record.realm = challenge.realm;
        record.qop = challenge.qop;
        record.opaque = challenge.opaque;
        record.nonce = challenge.nonce;
        record.cnonce = make_nonce(&mut self.rng, self.cnonce_size);
        self.advance();

        debug!(
            "Consumed {} challenge for realm \"{}\" (nc={})",
            self.record.scheme, self.record.realm, self.record.nc
        );
    }

    /// Compute the `Authorization` value for a request.
    ///
    /// `target` may be a path or a full URL; only path and query are signed.
    /// An empty `method` means GET. Pure with respect to the record: calling it
    /// twice without consuming a challenge or advancing yields the same value.
    pub fn build_authorization(&self, target: &str, method: &str) -> AuthorizationHeader<'_> {
        let record = &self.record;
        let h = record.algorithm;
        let uri = request_uri(target).to_string();
        let method = if method.is_empty() {
            "GET".to_string()
        } else {
            method.to_ascii_uppercase()
        };

        let mut ha1 = if self.credentials.precomputed {
            self.credentials.secret.clone()
        } else {
            h.compute_hash(
                &self.credentials.identity,
                &record.realm,
                &self.credentials.secret,
            )
        };
        if h.sess {
            ha1 = h.hash_str(&format!("{}:{}:{}", ha1, record.nonce, record.cnonce));
        }

        if record.qop == Some(Qop::AUTH_INT) {
            self.warnings
                .warn("auth-int is not implemented, the entity body is not hashed");
        }
        let ha2 = h.hash_str(&format!("{}:{}", method, uri));

        let response = match record.qop {
            Some(qop) => h.hash_str(&format!(
                "{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}",
                ha1 = ha1,
                nonce = record.nonce,
                nc = format_nc(record.nc),
                cnonce = record.cnonce,
                qop = qop,
                ha2 = ha2
            )),
            None => h.hash_str(&format!(
                "{ha1}:{nonce}:{ha2}",
                ha1 = ha1,
                nonce = record.nonce,
                ha2 = ha2
            )),
        };

        let header = AuthorizationHeader {
            record,
            username: &self.credentials.identity,
            uri,
            response,
        };
        trace!("Authorization: {}", header);
        header
    }
}

impl fmt::Debug for DigestSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestSession")
            .field("credentials", &self.credentials)
            .field("record", &self.record)
            .field("cnonce_size", &self.cnonce_size)
            .finish()
    }
}

/// Header sent back to the server
///
/// Obtained from [`DigestSession::build_authorization()`]. Serializes with a
/// fixed field order; some servers parse it positionally.
#[derive(Debug)]
pub struct AuthorizationHeader<'a> {
    /// Session the response was computed against
    pub record: &'a SessionRecord,
    pub username: &'a str,
    /// Path and query that were signed
    pub uri: String,
    /// Computed digest
    pub response: String,
}

impl<'a> AuthorizationHeader<'a> {
    /// Produce a header string (also accessible through the Display trait)
    pub fn to_header_string(&self) -> String {
        self.to_string()
    }
}

impl<'a> Display for AuthorizationHeader<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let record = self.record;

        write!(
            f,
            "{} username=\"{}\",realm=\"{}\",nonce=\"{}\",uri=\"{}\",",
            record.scheme, self.username, record.realm, record.nonce, self.uri
        )?;

        if let Some(opaque) = &record.opaque {
            write!(f, "opaque=\"{}\",", opaque)?;
        }

        if let Some(qop) = record.qop {
            write!(f, "qop={},", qop)?;
        }

        // nc and cnonce go out even without qop; they just don't enter the response then
        write!(
            f,
            "algorithm={},response=\"{}\",nc={},cnonce=\"{}\"",
            record.algorithm,
            self.response,
            format_nc(record.nc),
            record.cnonce
        )
    }
}
