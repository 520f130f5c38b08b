//! Client options and their validation.

use crate::digest::{Credentials, DigestSession};
use crate::utils::DEFAULT_CNONCE_SIZE;
use crate::{Algorithm, DigestClient, Error, Result};
use log::warn;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Status code servers use to ask for credentials unless configured otherwise
pub const DEFAULT_STATUS_CODE: u16 = 401;

/// Sink for advisory warnings (unsupported algorithm, `auth-int` degradation).
///
/// Warnings always go through the `log` facade as well; a sink is only needed
/// when the application wants to see them without installing a logger.
pub trait Logger: Send + Sync {
    fn warn(&self, message: &str);
}

impl<F> Logger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn warn(&self, message: &str) {
        self(message)
    }
}

#[derive(Clone, Default)]
pub(crate) struct Warnings {
    sink: Option<Arc<dyn Logger>>,
}

impl Warnings {
    pub(crate) fn new(sink: Option<Arc<dyn Logger>>) -> Self {
        Warnings { sink }
    }

    pub(crate) fn warn(&self, message: &str) {
        warn!("{}", message);
        if let Some(sink) = &self.sink {
            sink.warn(message);
        }
    }
}

impl fmt::Debug for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Warnings")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Client options
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientOptions {
    /// One of [`SUPPORTED_ALGORITHMS`](crate::SUPPORTED_ALGORITHMS); anything else falls back to MD5
    pub algorithm: String,
    /// The secret is `H(identity:realm:password)` rather than the password
    pub precomputed_hash: bool,
    /// Length of the generated client nonce
    pub cnonce_size: usize,
    /// Response status that carries a challenge
    pub status_code: u16,
    /// Send Basic credentials on every request instead of doing digest
    pub basic: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            algorithm: Algorithm::default().to_string(),
            precomputed_hash: false,
            cnonce_size: DEFAULT_CNONCE_SIZE,
            status_code: DEFAULT_STATUS_CODE,
            basic: false,
        }
    }
}

impl ClientOptions {
    /// Check the options that cannot be degraded gracefully
    pub fn validate(&self) -> Result<()> {
        if self.cnonce_size == 0 {
            return Err(Error::InvalidConfig("cnonce_size must be at least 1".into()));
        }
        if !(100..=599).contains(&self.status_code) {
            return Err(Error::InvalidConfig(format!(
                "status_code {} is not an HTTP status",
                self.status_code
            )));
        }
        if self.basic && self.precomputed_hash {
            return Err(Error::InvalidConfig(
                "a precomputed hash cannot be sent with Basic auth".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the algorithm name, falling back to MD5 with a warning
    pub(crate) fn resolve_algorithm(&self, warnings: &Warnings) -> Algorithm {
        match Algorithm::from_str(&self.algorithm) {
            Ok(algorithm) => algorithm,
            Err(_) => {
                warnings.warn(&format!(
                    "Unsupported algorithm {}, will try with MD5",
                    self.algorithm
                ));
                Algorithm::default()
            }
        }
    }
}

/// Builder for [`DigestClient`]
pub struct ClientBuilder {
    identity: String,
    secret: String,
    options: ClientOptions,
    logger: Option<Arc<dyn Logger>>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl ClientBuilder {
    pub(crate) fn new(identity: &str, secret: &str) -> Self {
        ClientBuilder {
            identity: identity.to_string(),
            secret: secret.to_string(),
            options: ClientOptions::default(),
            logger: None,
            rng: None,
        }
    }

    /// Replace all options at once, e.g. with ones loaded from a config file
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Algorithm used until a challenge names one, see [`SUPPORTED_ALGORITHMS`](crate::SUPPORTED_ALGORITHMS)
    pub fn algorithm(mut self, algorithm: &str) -> Self {
        self.options.algorithm = algorithm.to_string();
        self
    }

    /// Treat the secret as `H(identity:realm:password)`
    pub fn precomputed_hash(mut self, precomputed: bool) -> Self {
        self.options.precomputed_hash = precomputed;
        self
    }

    /// Client nonce length
    pub fn cnonce_size(mut self, size: usize) -> Self {
        self.options.cnonce_size = size;
        self
    }

    /// Status that carries a challenge, 401 by default
    pub fn status_code(mut self, status: u16) -> Self {
        self.options.status_code = status;
        self
    }

    /// Send Basic credentials up front instead of answering Digest challenges
    pub fn basic(mut self, basic: bool) -> Self {
        self.options.basic = basic;
        self
    }

    /// Receives warnings alongside the `log` crate
    pub fn logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Randomness for client nonces; seed one to get reproducible nonces in tests
    pub fn rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Validate the options and create the client.
    ///
    /// # Errors
    /// If the options are malformed (see [`ClientOptions::validate`]) or the identity is empty.
    pub fn build(self) -> Result<DigestClient> {
        self.options.validate()?;
        if self.identity.is_empty() {
            return Err(Error::InvalidConfig("identity must not be empty".into()));
        }

        let warnings = Warnings::new(self.logger);
        let algorithm = self.options.resolve_algorithm(&warnings);

        let credentials = Credentials {
            identity: self.identity,
            secret: self.secret,
            precomputed: self.options.precomputed_hash,
        };

        let mut session = DigestSession::new(credentials, algorithm)
            .with_cnonce_size(self.options.cnonce_size)
            .with_warnings(warnings);
        if let Some(rng) = self.rng {
            session = session.with_boxed_rng(rng);
        }

        Ok(DigestClient::from_parts(session, self.options))
    }
}
