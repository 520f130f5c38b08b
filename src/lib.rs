//! This crate answers HTTP Digest Auth challenges (IETF RFC 2069, 2617 and 7616)
//! on behalf of an arbitrary HTTP request function. It keeps the per-server
//! session (realm, nonce, client nonce, nonce count) between requests, so
//! repeated calls to the same realm skip the extra round trip.
//!
//! The crate does no I/O of its own. Hand [`DigestClient::request`] a closure
//! that performs the request with your HTTP library of choice; the client
//! attaches the `Authorization` header and repeats the request once when the
//! server answers with a challenge.
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```
//! use digest_fetch::{ChallengeResponse, DigestClient, RequestOptions};
//!
//! // Whatever your HTTP library returns, it needs to expose these two things
//! struct Reply {
//!     status: u16,
//!     challenge: Option<String>,
//! }
//!
//! impl ChallengeResponse for Reply {
//!     fn status(&self) -> u16 {
//!         self.status
//!     }
//!
//!     fn www_authenticate(&self) -> Option<&str> {
//!         self.challenge.as_deref()
//!     }
//! }
//!
//! let mut client = DigestClient::builder("test", "test")
//!     .algorithm("SHA-256")
//!     .build()?;
//!
//! let options: RequestOptions = RequestOptions::new("GET");
//! let res = client.request("http://localhost/auth", &options, |_url: &str, req: RequestOptions| {
//!     // a server that wants digest credentials
//!     let authorized = req.headers.iter().any(|(k, _)| k == "Authorization");
//!     Ok::<_, std::io::Error>(if authorized {
//!         Reply { status: 200, challenge: None }
//!     } else {
//!         Reply {
//!             status: 401,
//!             challenge: Some(r#"Digest realm="Users", qop="auth", nonce="b25a4e8c2f6d93e1""#.into()),
//!         }
//!     })
//! })?;
//!
//! assert_eq!(res.status, 200);
//! // the session is kept; the next request is authorized right away with nc=00000002
//! assert!(client.session().is_authenticated());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The session can also be driven by hand:
//!
//! ```
//! use digest_fetch::{Algorithm, Credentials, DigestSession};
//!
//! let www_authenticate = r#"Digest realm="Users", qop="auth", nonce="b25a4e8c2f6d93e1", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;
//!
//! let mut session = DigestSession::new(Credentials::new("test", "test"), Algorithm::default());
//! session.consume_challenge(Some(www_authenticate));
//!
//! // For this example, we pin the client nonce. It's generated for you otherwise.
//! session.record_mut().cnonce = "0123456789abcdef0123456789abcdef".to_string();
//!
//! let answer = session.build_authorization("/auth", "GET").to_string();
//! assert_eq!(answer, r#"Digest username="test",realm="Users",nonce="b25a4e8c2f6d93e1",uri="/auth",opaque="5ccc069c403ebaf9f0171e9517f40e41",qop=auth,algorithm=MD5,response="552593f06aef6e773280773cadf16520",nc=00000001,cnonce="0123456789abcdef0123456789abcdef""#);
//! ```

mod challenge;
mod client;
mod config;
mod digest;
mod enums;
mod error;
mod utils;

pub use error::{Error, Result};

pub use crate::challenge::{parse_field, parse_qop, parse_scheme, Challenge, MIN_CHALLENGE_LEN};
pub use crate::client::{
    ChallengeResponse, DigestClient, Headers, RequestOptions, SetHeader, SharedDigestClient,
};
pub use crate::config::{ClientBuilder, ClientOptions, Logger, DEFAULT_STATUS_CODE};
pub use crate::digest::{AuthorizationHeader, Credentials, DigestSession, SessionRecord};
pub use crate::utils::{
    basic_authorization, format_nc, make_nonce, request_uri, DEFAULT_CNONCE_SIZE, NONCE_ALPHABET,
};

pub use crate::enums::*;

/// Parse a `WWW-Authenticate` header value.
/// It's just a convenience method to call [`Challenge::parse()`](struct.Challenge.html#method.parse).
pub fn parse(www_authenticate: &str) -> Option<Challenge> {
    Challenge::parse(www_authenticate)
}

#[test]
fn test_parse_respond() {
    let src = r#"
    Digest
       realm="Users",
       qop="auth, auth-int",
       algorithm=MD5,
       nonce="b25a4e8c2f6d93e1",
       opaque="5ccc069c403ebaf9f0171e9517f40e41"
    "#;

    let challenge = crate::parse(src).unwrap();
    // the header starts with a newline, the scheme is still found
    assert_eq!(challenge.scheme, "Digest");

    let mut session = DigestSession::new(Credentials::new("test", "test"), Algorithm::default());
    session.consume_challenge(Some(src));
    session.record_mut().cnonce = "0123456789abcdef0123456789abcdef".to_string();

    let answer = session.build_authorization("/auth", "GET");
    let str = answer.to_string().replace(",", ",\n  ");

    assert_eq!(
        str,
        r#"
Digest username="test",
  realm="Users",
  nonce="b25a4e8c2f6d93e1",
  uri="/auth",
  opaque="5ccc069c403ebaf9f0171e9517f40e41",
  qop=auth,
  algorithm=MD5,
  response="552593f06aef6e773280773cadf16520",
  nc=00000001,
  cnonce="0123456789abcdef0123456789abcdef"
"#
        .trim()
    );
}
