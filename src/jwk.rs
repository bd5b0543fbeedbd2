//! Implementations of the JSON Web Keys (JWK) standard
//!
//! The specifications for JSON Web Keys can be found in [RFC7517][].
//! This module is the only boundary through which key material enters or
//! leaves the engine: JWK text in, a bound [`Jwk`] handle out. The signing
//! algorithm is derived from the key's declared capability at import — a
//! caller can never coerce a key into an algorithm its material does not
//! support.
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use std::convert::{TryFrom, TryInto};

use aliri_braid::braid;
use serde::{Serialize, Serializer};

use crate::{
    error,
    jwa::{self, Usage},
    jws::{self, Signer, Verifier},
};

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to JWK identifier ([`KeyId`])")]
pub struct KeyId;

/// An imported JSON Web Key, bound to its resolved signing algorithm
///
/// A `Jwk` is created once per signing key and shared freely; it is
/// read-only after import. Private material is never exposed through
/// `Debug` and only leaves through the explicit JWK serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Jwk {
    key_id: Option<KeyId>,
    algorithm: jws::Algorithm,
    key: Key,
}

impl Jwk {
    /// Imports a key from JWK text
    ///
    /// The signing algorithm is bound from the key's own declarations: an
    /// `alg` member is checked against the catalog and the key material;
    /// an EC key without one binds the algorithm its curve dictates; an
    /// RSA key without one defaults to RS256 (RSASSA-PKCS1-v1_5 with
    /// SHA-256). Keys with private members import in the signing role,
    /// public-only keys in the verification role.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedKey`][error::MalformedKey] when the text is not
    /// valid JSON or lacks required members for the declared key type,
    /// [`UnsupportedKeyType`][error::UnsupportedKeyType] for key types
    /// other than RSA and EC, and
    /// [`UnsupportedAlgorithm`][error::UnsupportedAlgorithm] for any
    /// algorithm, curve, or usage outside the allow-list.
    pub fn import(json: &str) -> Result<Self, error::KeyImportError> {
        Self::import_inner(json, None)
    }

    /// Imports a key from JWK text, requesting a specific algorithm
    ///
    /// Used when the JWK itself does not pin the intended algorithm, most
    /// commonly to select RSA-PSS over the RS256 default. The requested
    /// algorithm takes precedence over the JWK's `alg` member but is still
    /// checked against the key material.
    ///
    /// # Errors
    ///
    /// As for [`import`][Self::import]; additionally fails with
    /// [`UnsupportedAlgorithm`][error::UnsupportedAlgorithm] if the
    /// requested algorithm is incompatible with the key.
    pub fn import_with_algorithm(
        json: &str,
        algorithm: jws::Algorithm,
    ) -> Result<Self, error::KeyImportError> {
        Self::import_inner(json, Some(algorithm))
    }

    fn import_inner(
        json: &str,
        requested: Option<jws::Algorithm>,
    ) -> Result<Self, error::KeyImportError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(error::malformed_key)?;
        let meta: JwkMeta = serde_json::from_value(value.clone()).map_err(error::malformed_key)?;

        if meta.usage == Some(Usage::Encryption) {
            return Err(error::unsupported_algorithm("enc").into());
        }

        let declared = match &meta.algorithm {
            Some(alg) => Some(jws::Algorithm::try_from(alg.as_str())?),
            None => None,
        };

        let kty = meta
            .key_type
            .as_deref()
            .ok_or_else(|| error::malformed_key("missing required member 'kty'"))?;

        let key = match kty {
            "RSA" => Key::Rsa(serde_json::from_value(value).map_err(error::malformed_key)?),
            "EC" => {
                let crv = value
                    .get("crv")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| error::malformed_key("missing required member 'crv'"))?;

                // Gate the curve before handing the document to serde so
                // that P-192 and friends fail closed rather than malformed.
                let _ = jwa::ec::Curve::try_from(crv)?;

                Key::EllipticCurve(
                    serde_json::from_value(value).map_err(error::malformed_key)?,
                )
            }
            other => return Err(error::unsupported_key_type(other).into()),
        };

        let algorithm = key.bind_algorithm(requested.or(declared))?;

        tracing::debug!(
            jwk.kty = kty,
            jwk.kid = ?meta.key_id,
            %algorithm,
            "imported JWK"
        );

        Ok(Self {
            key_id: meta.key_id,
            algorithm,
            key,
        })
    }

    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The signing algorithm bound to this key
    #[must_use]
    pub fn algorithm(&self) -> jws::Algorithm {
        self.algorithm
    }

    /// Whether this key carries private material and can sign
    #[must_use]
    pub fn can_sign(&self) -> bool {
        self.key.can_sign(self.algorithm)
    }

    /// Sets the key ID
    pub fn with_key_id(self, kid: impl Into<KeyId>) -> Self {
        Self {
            key_id: Some(kid.into()),
            ..self
        }
    }

    /// Rebinds the key to a different algorithm
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedAlgorithm`][error::UnsupportedAlgorithm] if
    /// the algorithm is incompatible with the key material.
    pub fn with_algorithm(
        self,
        alg: impl Into<jws::Algorithm>,
    ) -> Result<Self, error::UnsupportedAlgorithm> {
        let algorithm = self.key.bind_algorithm(Some(alg.into()))?;
        Ok(Self { algorithm, ..self })
    }

    /// Strips any private key components, leaving a verification-only key
    pub fn public_only(self) -> Self {
        Self {
            key: self.key.public_only(),
            ..self
        }
    }

    /// Signs a message with the key's bound algorithm
    ///
    /// # Errors
    ///
    /// Fails if the key holds no private material or the underlying
    /// provider rejects the operation.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, error::SigningError> {
        self.key.sign(self.algorithm, data)
    }

    /// Verifies a signature over a message with the key's bound algorithm
    ///
    /// # Errors
    ///
    /// Fails if the signature does not match.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<(), error::KeyVerifyError> {
        self.key.verify(self.algorithm, data, signature)
    }
}

impl From<jwa::Rsa> for Jwk {
    /// Wraps an RSA key, bound to the RS256 default
    fn from(key: jwa::Rsa) -> Self {
        Self {
            key_id: None,
            algorithm: jws::Algorithm::RS256,
            key: Key::Rsa(key),
        }
    }
}

impl From<jwa::EllipticCurve> for Jwk {
    /// Wraps an EC key, bound to the algorithm its curve dictates
    fn from(key: jwa::EllipticCurve) -> Self {
        let algorithm = jwa::ec::SigningAlgorithm::from(key.curve()).into();
        Self {
            key_id: None,
            algorithm,
            key: Key::EllipticCurve(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
struct JwkMeta {
    #[serde(rename = "kid", default)]
    key_id: Option<KeyId>,

    #[serde(rename = "use", default)]
    usage: Option<Usage>,

    #[serde(rename = "alg", default)]
    algorithm: Option<String>,

    #[serde(rename = "kty", default)]
    key_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct JwkDtoRef<'a> {
    #[serde(rename = "kid", skip_serializing_if = "Option::is_none")]
    key_id: Option<&'a KeyIdRef>,

    #[serde(rename = "use")]
    usage: Usage,

    #[serde(rename = "alg")]
    algorithm: jws::Algorithm,

    #[serde(flatten)]
    key: &'a Key,
}

impl Serialize for Jwk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let dto = JwkDtoRef {
            key_id: self.key_id(),
            usage: Usage::Signing,
            algorithm: self.algorithm,
            key: &self.key,
        };

        dto.serialize(serializer)
    }
}

/// Key material by JWK key type
#[derive(Debug, Clone, Eq, PartialEq, Serialize, serde::Deserialize)]
#[serde(tag = "kty")]
enum Key {
    /// RSA
    #[serde(rename = "RSA")]
    Rsa(jwa::Rsa),

    /// Elliptic curve cryptography
    #[serde(rename = "EC")]
    EllipticCurve(jwa::EllipticCurve),
}

impl Key {
    fn bind_algorithm(
        &self,
        requested: Option<jws::Algorithm>,
    ) -> Result<jws::Algorithm, error::UnsupportedAlgorithm> {
        match (self, requested) {
            (Self::Rsa(_), None) => Ok(jws::Algorithm::RS256),
            (Self::Rsa(_), Some(alg @ jws::Algorithm::Rsa(_))) => Ok(alg),
            (Self::EllipticCurve(k), None) => {
                Ok(jwa::ec::SigningAlgorithm::from(k.curve()).into())
            }
            (Self::EllipticCurve(k), Some(alg)) if alg.curve() == Some(k.curve()) => Ok(alg),
            (_, Some(alg)) => Err(error::unsupported_algorithm(alg.to_string())),
        }
    }

    fn public_only(self) -> Self {
        match self {
            Self::Rsa(k) => Self::Rsa(k.public_only()),
            Self::EllipticCurve(k) => Self::EllipticCurve(k.public_only()),
        }
    }

    fn can_sign(&self, alg: jws::Algorithm) -> bool {
        match self {
            Self::Rsa(p) => {
                if let Ok(alg) = alg.try_into() {
                    p.can_sign(alg)
                } else {
                    false
                }
            }
            Self::EllipticCurve(p) => {
                if let Ok(alg) = alg.try_into() {
                    p.can_sign(alg)
                } else {
                    false
                }
            }
        }
    }

    fn sign(&self, alg: jws::Algorithm, data: &[u8]) -> Result<Vec<u8>, error::SigningError> {
        let signature = match self {
            Self::Rsa(p) => p.sign(alg.try_into()?, data)?,
            Self::EllipticCurve(p) => p.sign(alg.try_into()?, data)?,
        };

        Ok(signature)
    }

    fn verify(
        &self,
        alg: jws::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::KeyVerifyError> {
        match self {
            Self::Rsa(p) => p.verify(alg.try_into()?, data, signature)?,
            Self::EllipticCurve(p) => p.verify(alg.try_into()?, data, signature)?,
        }

        Ok(())
    }
}
