//! This crate issues OAuth2 Access Tokens and OpenID Connect ID Tokens in
//! the compact JSON Web Token form, built on the JOSE standards:
//!
//! * JSON Web Signature (JWS): [RFC7515][]
//! * JSON Web Key (JWK): [RFC7517][]
//! * JSON Web Algorithms (JWA): [RFC7518][]
//! * JSON Web Token (JWT): [RFC7519][]
//!
//! The engine covers the issuing half of the token lifecycle: importing a
//! signing key from JWK text, resolving its signature algorithm, validating
//! a claims payload against the access-token or ID-token profile, and
//! encoding and signing the result. It deliberately does no verification —
//! a downstream consumer fetching keys from a JWKS endpoint handles that —
//! and the signing algorithm always derives from the key's own declared
//! capability, never from caller-supplied text.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use aliri_clock::{Clock, System, UnixTime};
//! use tokenmint::claims::{AccessTokenClaims, AccessTokenProfile};
//! use tokenmint::issue::AccessTokenIssuer;
//! use tokenmint::{jwa, Jwk};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = Jwk::from(jwa::Rsa::generate()?).with_key_id("2024-06-signing");
//!
//! let now = System.now();
//! let claims = AccessTokenClaims::new()
//!     .with_issuer("https://issuer.example.com/")
//!     .with_subject("user-1234")
//!     .with_audience("https://api.example.com")
//!     .with_issued_at(now)
//!     .with_expiration(UnixTime(now.0 + 300))
//!     .with_scope("openid profile");
//!
//! let issuer = AccessTokenIssuer::new(AccessTokenProfile::new("https://issuer.example.com/"));
//! let token = issuer.issue(&claims, &key)?;
//!
//! assert_eq!(token.as_str().split('.').count(), 3);
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod claims;
pub mod digest;
pub mod error;
pub mod issue;
pub mod jwa;
pub mod jwk;
pub mod jws;
pub mod jwt;

#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};
