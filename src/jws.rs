//! Implementations of the JSON Web Signature (JWS) standard
//!
//! The specifications for this standard can be found in [RFC7515][].
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515

use std::{convert::TryFrom, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{digest::DigestAlgorithm, error, jwa};

/// JSON Web Signature signing algorithms
///
/// This union is the entire algorithm catalog: nine asymmetric signing
/// algorithms, each carrying its family, digest, and (for ECDSA) curve.
/// Anything else — symmetric algorithms, `none`, weak digests — cannot be
/// represented, which is what forecloses algorithm-substitution attacks.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Algorithm {
    /// RSA public/private key pair
    Rsa(jwa::rsa::SigningAlgorithm),

    /// Elliptic curve cryptography
    EllipticCurve(jwa::ec::SigningAlgorithm),
}

impl Algorithm {
    /// The RS256 signing algorithm
    pub const RS256: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS256);
    /// The RS384 signing algorithm
    pub const RS384: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS384);
    /// The RS512 signing algorithm
    pub const RS512: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS512);
    /// The PS256 signing algorithm
    pub const PS256: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS256);
    /// The PS384 signing algorithm
    pub const PS384: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS384);
    /// The PS512 signing algorithm
    pub const PS512: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS512);
    /// The ES256 signing algorithm
    pub const ES256: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES256);
    /// The ES384 signing algorithm
    pub const ES384: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES384);
    /// The ES512 signing algorithm
    pub const ES512: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES512);

    /// The expected output size of the algorithm's signature in bytes
    #[must_use]
    pub fn signature_size(self) -> usize {
        match self {
            Self::Rsa(alg) => alg.signature_size(),
            Self::EllipticCurve(alg) => alg.signature_size(),
        }
    }

    /// The digest bound to this algorithm
    pub fn digest_algorithm(self) -> DigestAlgorithm {
        match self {
            Self::Rsa(alg) => alg.digest_algorithm(),
            Self::EllipticCurve(alg) => alg.digest_algorithm(),
        }
    }

    /// The curve bound to this algorithm, if it is an ECDSA algorithm
    #[must_use]
    pub fn curve(self) -> Option<jwa::ec::Curve> {
        match self {
            Self::Rsa(_) => None,
            Self::EllipticCurve(alg) => Some(jwa::ec::Curve::from(alg)),
        }
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnsupportedAlgorithm;

    #[inline]
    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        match value {
            "RS256" => Ok(Algorithm::RS256),
            "RS384" => Ok(Algorithm::RS384),
            "RS512" => Ok(Algorithm::RS512),
            "PS256" => Ok(Algorithm::PS256),
            "PS384" => Ok(Algorithm::PS384),
            "PS512" => Ok(Algorithm::PS512),
            "ES256" => Ok(Algorithm::ES256),
            "ES384" => Ok(Algorithm::ES384),
            "ES512" => Ok(Algorithm::ES512),
            _ => Err(error::unsupported_algorithm(value)),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = error::UnsupportedAlgorithm;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = error::UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Rsa(a) => fmt::Display::fmt(a, f),
            Self::EllipticCurve(a) => fmt::Display::fmt(a, f),
        }
    }
}

/// A JWS signer
pub trait Signer {
    /// The usable signature algorithms
    type Algorithm;

    /// The error returned on failure to sign
    type Error: fmt::Debug + fmt::Display + Sync + Send + 'static;

    /// Whether the specific algorithm provided is compatible
    /// with this signer
    fn can_sign(&self, alg: Self::Algorithm) -> bool;

    /// Attempts to sign the data provided using the specified algorithm
    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

/// A JWS verifier
pub trait Verifier {
    /// The verifiable signature algorithms
    type Algorithm;

    /// The error returned on a failure to verify
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether the specific algorithm provided is compatible
    /// with this verifier
    fn can_verify(&self, alg: Self::Algorithm) -> bool;

    /// Attempts to verify the data against the signature using the
    /// specified algorithm
    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_entry_parses_to_itself() {
        let names = [
            "RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256", "ES384", "ES512",
        ];

        for name in names.iter() {
            let alg = Algorithm::try_from(*name).unwrap();
            assert_eq!(alg.to_string(), *name);
        }
    }

    #[test]
    fn unlisted_identifiers_fail_closed() {
        assert!(Algorithm::try_from("none").is_err());
        assert!(Algorithm::try_from("HS256").is_err());
        assert!(Algorithm::try_from("RS1").is_err());
        assert!(Algorithm::try_from("ES256K").is_err());
        assert!(Algorithm::try_from("RSA-OAEP").is_err());
        assert!(Algorithm::try_from("").is_err());
    }

    #[test]
    fn serializes_as_the_jwa_identifier() {
        assert_eq!(
            serde_json::to_string(&Algorithm::PS384).unwrap(),
            r#""PS384""#
        );
        let alg: Algorithm = serde_json::from_str(r#""ES512""#).unwrap();
        assert_eq!(alg, Algorithm::ES512);
    }
}
