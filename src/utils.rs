use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;

/// Symbols a client nonce is drawn from
pub const NONCE_ALPHABET: &[u8; 16] = b"abcdef0123456789";

/// Default client nonce length
pub const DEFAULT_CNONCE_SIZE: usize = 32;

/// Generate a client nonce of `size` symbols, each drawn uniformly from [`NONCE_ALPHABET`].
pub fn make_nonce<R: Rng + ?Sized>(rng: &mut R, size: usize) -> String {
    (0..size)
        .map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char)
        .collect()
}

/// Format the nonce count as 8 zero-padded decimal digits.
///
/// Counters wider than 8 digits keep their low 8 digits.
pub fn format_nc(nc: u32) -> String {
    let padded = format!("{:08}", nc);
    padded[padded.len() - 8..].to_string()
}

/// Reduce a request target to the path and query sent as the digest `uri`.
///
/// Scheme and authority are dropped; a target without a path maps to "/".
/// Only a `//` opening the authority (`scheme://` or a leading `//`) is special,
/// later ones belong to the path or query.
pub fn request_uri(target: &str) -> &str {
    let Some(slash) = target.find('/') else {
        return "/";
    };

    let opens_authority = target[slash..].starts_with("//")
        && (slash == 0 || target[..slash].ends_with(':'));
    if !opens_authority {
        return &target[slash..];
    }

    let rest = &target[slash + 2..];
    match rest.find('/') {
        Some(i) => &rest[i..],
        None => "/",
    }
}

/// Value of a `Basic` Authorization header
pub fn basic_authorization(identity: &str, secret: &str) -> String {
    let cred = format!("{}:{}", identity, secret);
    format!("Basic {}", STANDARD.encode(cred))
}
