use crate::config::{ClientBuilder, ClientOptions};
use crate::digest::DigestSession;
use crate::utils::basic_authorization;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

const AUTHORIZATION: &str = "Authorization";

/// Status some servers send on rejected credentials regardless of the configured one
const UNAUTHORIZED: u16 = 401;

/// Something outgoing headers can be written to
pub trait SetHeader {
    /// Set `key` to `value`, replacing a previous value of the same header
    fn set_header(&mut self, key: &str, value: &str);
}

impl SetHeader for Vec<(String, String)> {
    fn set_header(&mut self, key: &str, value: &str) {
        match self.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.push((key.to_string(), value.to_string())),
        }
    }
}

impl SetHeader for HashMap<String, String> {
    fn set_header(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

impl SetHeader for BTreeMap<String, String> {
    fn set_header(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

#[cfg(feature = "http")]
impl SetHeader for http::HeaderMap {
    fn set_header(&mut self, key: &str, value: &str) {
        match (
            http::header::HeaderName::from_bytes(key.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.insert(name, value);
            }
            _ => warn!("Dropping header {}, the value cannot be sent", key),
        }
    }
}

/// The parts of a response the client reacts to
pub trait ChallengeResponse {
    fn status(&self) -> u16;
    /// Value of the `WWW-Authenticate` header, if any
    fn www_authenticate(&self) -> Option<&str>;
}

#[cfg(feature = "http")]
impl<B> ChallengeResponse for http::Response<B> {
    fn status(&self) -> u16 {
        self.status().as_u16()
    }

    fn www_authenticate(&self) -> Option<&str> {
        self.headers()
            .get(http::header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Default header container
pub type Headers = Vec<(String, String)>;

/// Request description handed to the request function.
///
/// Every attempt gets its own copy, so a body can be sent twice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestOptions<H = Headers> {
    /// HTTP method, GET if not set
    pub method: Option<String>,
    pub headers: H,
    pub body: Option<Vec<u8>>,
}

impl<H: Default> RequestOptions<H> {
    /// Options for a `method` request with empty headers
    pub fn new(method: &str) -> Self {
        RequestOptions {
            method: Some(method.to_string()),
            headers: H::default(),
            body: None,
        }
    }
}

impl<H> RequestOptions<H> {
    /// Request body, resent unchanged on the retry
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Upper-cased method, GET if not set
    pub fn method(&self) -> String {
        match &self.method {
            Some(m) if !m.is_empty() => m.to_ascii_uppercase(),
            _ => "GET".to_string(),
        }
    }
}

impl<H: SetHeader> RequestOptions<H> {
    /// Set a header, replacing one with the same name
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.set_header(key, value);
        self
    }
}

#[cfg(feature = "http")]
impl RequestOptions<http::HeaderMap> {
    /// Turn into an `http::Request` for `target`
    pub fn into_request(self, target: &str) -> http::Result<http::Request<Vec<u8>>> {
        let mut builder = http::Request::builder()
            .method(self.method().as_str())
            .uri(target);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }
        builder.body(self.body.unwrap_or_default())
    }
}

/// HTTP client wrapper answering Digest (or Basic) challenges.
///
/// Wraps any request function: the client decides which `Authorization`
/// header goes out and whether to try a second time, the function does the I/O.
#[derive(Debug)]
pub struct DigestClient {
    session: DigestSession,
    options: ClientOptions,
}

impl DigestClient {
    /// Client with default options
    ///
    /// # Errors
    /// If the identity is empty
    pub fn new(identity: &str, secret: &str) -> crate::Result<Self> {
        Self::builder(identity, secret).build()
    }

    /// Start a [`ClientBuilder`]
    pub fn builder(identity: &str, secret: &str) -> ClientBuilder {
        ClientBuilder::new(identity, secret)
    }

    pub(crate) fn from_parts(session: DigestSession, options: ClientOptions) -> Self {
        DigestClient { session, options }
    }

    /// Options
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Digest state shared by all requests of this client
    pub fn session(&self) -> &DigestSession {
        &self.session
    }

    /// Mutable digest state, e.g. to [`invalidate`](DigestSession::invalidate) it
    pub fn session_mut(&mut self) -> &mut DigestSession {
        &mut self.session
    }

    /// `H(identity:realm:secret)` with the configured algorithm, for use with `precomputed_hash`
    pub fn compute_hash(&self, identity: &str, realm: &str, secret: &str) -> String {
        self.session
            .record()
            .algorithm
            .compute_hash(identity, realm, secret)
    }

    /// `Basic` header value for the configured credentials
    pub fn basic_header(&self) -> String {
        let credentials = self.session.credentials();
        basic_authorization(&credentials.identity, &credentials.secret)
    }

    /// Copy of `options` with Basic credentials attached
    pub fn add_basic_auth<H: SetHeader + Clone>(
        &self,
        options: &RequestOptions<H>,
    ) -> RequestOptions<H> {
        let mut options = options.clone();
        options.headers.set_header(AUTHORIZATION, &self.basic_header());
        options
    }

    /// Copy of `options` with the digest `Authorization` header attached.
    ///
    /// Without a consumed challenge the copy is returned untouched.
    pub fn authorize<H: SetHeader + Clone>(
        &self,
        target: &str,
        options: &RequestOptions<H>,
    ) -> RequestOptions<H> {
        let mut options = options.clone();
        if self.session.is_authenticated() {
            let header = self
                .session
                .build_authorization(target, &options.method())
                .to_header_string();
            options.headers.set_header(AUTHORIZATION, &header);
        }
        options
    }

    /// Send a request through `fetch`, answering one challenge if the server asks.
    ///
    /// At most two calls are made. A second rejection is returned as-is and
    /// leaves the session unauthenticated. Errors from `fetch` are passed through.
    pub fn request<H, R, E, F>(
        &mut self,
        target: &str,
        options: &RequestOptions<H>,
        mut fetch: F,
    ) -> Result<R, E>
    where
        H: SetHeader + Clone,
        R: ChallengeResponse,
        F: FnMut(&str, RequestOptions<H>) -> Result<R, E>,
    {
        if self.options.basic {
            return fetch(target, self.add_basic_auth(options));
        }

        let res = fetch(target, self.authorize(target, options))?;
        if !self.should_retry(&res) {
            return Ok(res);
        }

        debug!("Repeating request to {} with digest credentials", target);
        let res = fetch(target, self.authorize(target, options))?;
        self.finish_retry(target, &res);
        Ok(res)
    }

    /// [`request`](Self::request) for asynchronous request functions
    pub async fn request_async<H, R, E, F, Fut>(
        &mut self,
        target: &str,
        options: &RequestOptions<H>,
        mut fetch: F,
    ) -> Result<R, E>
    where
        H: SetHeader + Clone,
        R: ChallengeResponse,
        F: FnMut(String, RequestOptions<H>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        if self.options.basic {
            return fetch(target.to_string(), self.add_basic_auth(options)).await;
        }

        let res = fetch(target.to_string(), self.authorize(target, options)).await?;
        if !self.should_retry(&res) {
            return Ok(res);
        }

        debug!("Repeating request to {} with digest credentials", target);
        let res = fetch(target.to_string(), self.authorize(target, options)).await?;
        self.finish_retry(target, &res);
        Ok(res)
    }

    /// Book-keeping after the first attempt; true if a second one is due
    fn should_retry<R: ChallengeResponse>(&mut self, res: &R) -> bool {
        if res.status() != self.options.status_code {
            // keeps nc in step for a later request reusing this nonce
            self.session.advance();
            return false;
        }

        self.session.invalidate();
        self.session.consume_challenge(res.www_authenticate());
        self.session.is_authenticated()
    }

    fn finish_retry<R: ChallengeResponse>(&mut self, target: &str, res: &R) {
        let status = res.status();
        if status == UNAUTHORIZED || status == self.options.status_code {
            warn!(
                "Credentials for {} rejected by {} [status={}]",
                self.session.credentials().identity,
                target,
                status
            );
            self.session.invalidate();
        } else {
            self.session.advance();
        }
    }

    /// Wrap for use from several places at once
    pub fn into_shared(self) -> SharedDigestClient {
        SharedDigestClient {
            inner: Arc::new(Mutex::new(self)),
        }
    }
}

/// Cloneable handle that serializes whole request cycles on one session.
///
/// The lock is held across both attempts, so the nonce count stays consistent
/// at the price of requests waiting for each other.
#[derive(Debug, Clone)]
pub struct SharedDigestClient {
    inner: Arc<Mutex<DigestClient>>,
}

impl SharedDigestClient {
    /// Exclusive access to the wrapped client
    pub fn lock(&self) -> MutexGuard<'_, DigestClient> {
        // no method leaves the record half-written, poisoning carries no information
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// See [`DigestClient::request`]
    pub fn request<H, R, E, F>(
        &self,
        target: &str,
        options: &RequestOptions<H>,
        fetch: F,
    ) -> Result<R, E>
    where
        H: SetHeader + Clone,
        R: ChallengeResponse,
        F: FnMut(&str, RequestOptions<H>) -> Result<R, E>,
    {
        self.lock().request(target, options, fetch)
    }
}
