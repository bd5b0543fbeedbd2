//! Message digests and derived hash claims
//!
//! The digest functions here back two derived values in the OAuth2/OIDC
//! space: the PKCE code challenge (`S256`) and the ID token's `at_hash`
//! claim. All outputs are base64url without padding.

use aliri_base64::Base64UrlRef;

use crate::{jws, jwt::JwtRef};

/// A message digest from the SHA-2 family
///
/// Each signing algorithm in the catalog binds exactly one of these; the
/// binding is what keeps `at_hash` in step with the ID token's own
/// algorithm.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[must_use]
pub enum DigestAlgorithm {
    /// SHA-256
    Sha256,

    /// SHA-384
    Sha384,

    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    fn into_ring_params(self) -> &'static ring::digest::Algorithm {
        match self {
            Self::Sha256 => &ring::digest::SHA256,
            Self::Sha384 => &ring::digest::SHA384,
            Self::Sha512 => &ring::digest::SHA512,
        }
    }

    /// Digests `data`, returning the raw hash
    pub fn digest(self, data: &[u8]) -> ring::digest::Digest {
        ring::digest::digest(self.into_ring_params(), data)
    }
}

/// Hashes `data` with SHA-256 and encodes the result as base64url
///
/// The input is hashed as its UTF-8 bytes; an empty string hashes the
/// zero-length message. This is the transform behind the PKCE `S256` code
/// challenge method.
///
/// ```
/// assert_eq!(
///     tokenmint::digest::sha256("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
/// );
/// ```
#[must_use]
pub fn sha256(data: &str) -> String {
    let digest = DigestAlgorithm::Sha256.digest(data.as_bytes());
    Base64UrlRef::from_slice(digest.as_ref()).to_string()
}

/// Computes the `at_hash` value binding an ID token to an access token
///
/// Per OpenID Connect Core §3.1.3.6: the access token's ASCII bytes are
/// hashed with the digest bound to the ID token's signing algorithm, and
/// the left half of the hash (by octet count) is base64url encoded.
#[must_use]
pub fn access_token_hash(access_token: &JwtRef, alg: jws::Algorithm) -> String {
    let digest = alg
        .digest_algorithm()
        .digest(access_token.as_str().as_bytes());
    let left_half = &digest.as_ref()[..digest.as_ref().len() / 2];
    Base64UrlRef::from_slice(left_half).to_string()
}
