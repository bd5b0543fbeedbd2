//! Common errors

#![allow(missing_copy_implementations)]

use std::error::Error as StdError;

use thiserror::Error;

/// The named algorithm, curve, or key capability is outside the
/// allow-listed signature catalog
///
/// The engine never degrades to an unlisted algorithm; anything not in the
/// catalog fails closed with this error.
#[derive(Debug, Error)]
#[error("'{value}' is not an allow-listed signature algorithm")]
pub struct UnsupportedAlgorithm {
    value: String,
}

#[inline]
pub(crate) fn unsupported_algorithm(value: impl Into<String>) -> UnsupportedAlgorithm {
    UnsupportedAlgorithm {
        value: value.into(),
    }
}

/// The JWK declares a key type this engine cannot sign with
#[derive(Debug, Error)]
#[error("key type '{kty}' is not supported; expected 'RSA' or 'EC'")]
pub struct UnsupportedKeyType {
    kty: String,
}

#[inline]
pub(crate) fn unsupported_key_type(kty: impl Into<String>) -> UnsupportedKeyType {
    UnsupportedKeyType { kty: kty.into() }
}

/// The JWK text could not be parsed into usable key material
#[derive(Debug, Error)]
#[error("malformed key")]
pub struct MalformedKey {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_key(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedKey {
    MalformedKey {
        source: source.into(),
    }
}

/// The key cannot be used with the bound or requested algorithm
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key incompatible with algorithm '{alg}'")]
pub struct IncompatibleAlgorithm {
    alg: crate::jws::Algorithm,
}

#[inline]
pub(crate) fn incompatible_algorithm(
    alg: impl Into<crate::jws::Algorithm>,
) -> IncompatibleAlgorithm {
    IncompatibleAlgorithm { alg: alg.into() }
}

/// The signature did not match
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// Missing private key
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("cannot sign without a private key")]
pub struct MissingPrivateKey {
    _p: (),
}

pub(crate) const fn missing_private_key() -> MissingPrivateKey {
    MissingPrivateKey { _p: () }
}

/// Unexpected error (possibly a bug)
#[derive(Debug, Error)]
#[error("unexpected error")]
pub struct Unexpected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn unexpected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> Unexpected {
    Unexpected {
        source: source.into(),
    }
}

/// An error occurring while importing a JWK
#[derive(Debug, Error)]
pub enum KeyImportError {
    /// The JWK text or a required member of it could not be parsed
    #[error(transparent)]
    MalformedKey(#[from] MalformedKey),

    /// The JWK declares a key type other than RSA or EC
    #[error(transparent)]
    UnsupportedKeyType(#[from] UnsupportedKeyType),

    /// The JWK declares an algorithm, curve, or usage outside the catalog
    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),
}

impl KeyImportError {
    /// Whether the error is due to unparseable key material
    #[must_use]
    pub fn is_malformed_key(&self) -> bool {
        matches!(self, Self::MalformedKey(_))
    }

    /// Whether the error is due to an unsupported key type
    #[must_use]
    pub fn is_unsupported_key_type(&self) -> bool {
        matches!(self, Self::UnsupportedKeyType(_))
    }

    /// Whether the error is due to an algorithm outside the catalog
    #[must_use]
    pub fn is_unsupported_algorithm(&self) -> bool {
        matches!(self, Self::UnsupportedAlgorithm(_))
    }
}

/// An error occurring while creating a signature
#[derive(Debug, Error)]
pub enum SigningError {
    /// The key cannot be used for signing operations
    #[error(transparent)]
    MissingPrivateKey(#[from] MissingPrivateKey),

    /// The key cannot be used with this algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// An unexpected error
    #[error(transparent)]
    Unexpected(#[from] Unexpected),
}

/// An error occurring while verifying a signature against a key
#[derive(Debug, Error)]
pub enum KeyVerifyError {
    /// The key cannot be used with this algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// Signature is invalid
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),

    /// An unexpected error
    #[error(transparent)]
    Unexpected(#[from] Unexpected),
}

impl KeyVerifyError {
    /// Whether the error is due to an incompatible algorithm
    #[must_use]
    pub fn is_incompatible_alg(&self) -> bool {
        matches!(self, Self::IncompatibleAlgorithm(_))
    }

    /// Whether the error is due to a signature mismatch
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch(_))
    }
}

/// The JWT header section could not be serialized
#[derive(Debug, Error)]
#[error("malformed JWT header")]
pub struct MalformedJwtHeader {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_header(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtHeader {
    MalformedJwtHeader {
        source: source.into(),
    }
}

/// The JWT payload section could not be serialized
#[derive(Debug, Error)]
#[error("malformed JWT payload")]
pub struct MalformedJwtPayload {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtPayload {
    MalformedJwtPayload {
        source: source.into(),
    }
}

/// An error occurring while signing a JWT
#[derive(Debug, Error)]
pub enum JwtSigningError {
    /// The signature could not be produced
    #[error(transparent)]
    SigningError(#[from] SigningError),

    /// The JWT header could not be serialized
    #[error(transparent)]
    MalformedJwtHeader(#[from] MalformedJwtHeader),

    /// The JWT payload could not be serialized
    #[error(transparent)]
    MalformedJwtPayload(#[from] MalformedJwtPayload),
}

/// A claim rule violated by a token payload
///
/// Every variant names the offending claim and the rule it broke. Any
/// violation aborts issuance; no token is produced.
#[derive(Debug, Error)]
pub enum ClaimsViolation {
    /// A required claim is missing
    #[error("required {_0} claim missing")]
    MissingRequiredClaim(&'static str),

    /// The `iss` claim contains a query string, fragment, or is otherwise
    /// not a canonical issuer URL
    #[error("iss claim is not a canonical issuer URL")]
    MalformedIssuer,

    /// The `iss` claim does not exactly match the configured issuer
    #[error("iss claim does not match the configured issuer")]
    IssuerMismatch,

    /// The `sub` claim is empty
    #[error("sub claim must not be empty")]
    EmptySubject,

    /// The `sub` claim exceeds 255 characters or contains non-ASCII data
    #[error("sub claim must be at most 255 ASCII characters")]
    SubjectTooLong,

    /// The `aud` claim does not include the configured client id
    #[error("aud claim does not include the configured client id")]
    AudienceMissingClientId,

    /// The `exp` claim is not strictly greater than the `iat` claim
    #[error("exp claim must be strictly greater than iat")]
    ExpirationNotAfterIssuedAt,

    /// The `exp` claim is not in the future
    #[error("exp claim must be in the future")]
    TokenExpired,

    /// The `nonce` claim does not match the nonce from the originating
    /// request
    #[error("nonce claim does not match the originating request")]
    NonceMismatch,

    /// The `azp` claim does not equal the requesting client id
    #[error("azp claim does not match the requesting client id")]
    AuthorizedPartyMismatch,

    /// The `azp` claim is present although the profile forbids it for a
    /// single-entry `aud`
    #[error("azp claim must be absent when aud has a single entry")]
    UnexpectedAuthorizedParty,

    /// The `at_hash` claim does not match the bound access token
    #[error("at_hash claim does not match the bound access token")]
    AccessTokenHashMismatch,
}

/// An error occurring while issuing a token
#[derive(Debug, Error)]
pub enum IssueError {
    /// The payload violated a claim rule of the token profile
    #[error("token rejected by claims validation")]
    ClaimsViolation(#[from] ClaimsViolation),

    /// The token could not be encoded or signed
    #[error(transparent)]
    Signing(#[from] JwtSigningError),
}

impl IssueError {
    /// Whether the error is due to a claims violation
    #[must_use]
    pub fn is_claims_violation(&self) -> bool {
        matches!(self, Self::ClaimsViolation(_))
    }
}
