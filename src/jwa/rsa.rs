//! RSA JSON Web Algorithm implementations

use std::{convert::TryFrom, fmt};

use serde::{Deserialize, Serialize};

use crate::{digest::DigestAlgorithm, error, jws};

mod private;
mod public;

pub use private::PrivateKey;
pub use public::PublicKey;

/// RSA key
///
/// Holds either a full key pair or only the public components; the private
/// half is what grants the signing role.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
#[must_use]
pub struct Rsa {
    key: MaybePrivate,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum MaybePrivate {
    PublicAndPrivate(PrivateKey),
    PublicOnly(PublicKey),
}

impl Rsa {
    /// Generates a newly minted RSA public/private key pair
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate() -> Result<Self, error::Unexpected> {
        let private_key = PrivateKey::generate()?;

        Ok(Self::from(private_key))
    }

    pub(crate) fn private_key(&self) -> Option<&PrivateKey> {
        match &self.key {
            MaybePrivate::PublicAndPrivate(p) => Some(p),
            MaybePrivate::PublicOnly(_) => None,
        }
    }

    pub(crate) fn public_key(&self) -> &PublicKey {
        match &self.key {
            MaybePrivate::PublicAndPrivate(p) => p.public_key(),
            MaybePrivate::PublicOnly(p) => p,
        }
    }

    /// Whether this key carries the private signing components
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.private_key().is_some()
    }

    /// Removes the private key components, if any
    pub fn public_only(self) -> Self {
        match self.key {
            MaybePrivate::PublicAndPrivate(p) => Self::from(p.into_public_key()),
            MaybePrivate::PublicOnly(_) => self,
        }
    }
}

/// RSA public/private key signing algorithms
///
/// Covers RSASSA-PKCS1-v1_5 and RSASSA-PSS, each bound to a SHA-2 digest.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// RSASSA-PSS using SHA-256
    PS256,
    /// RSASSA-PSS using SHA-384
    PS384,
    /// RSASSA-PSS using SHA-512
    PS512,
}

impl SigningAlgorithm {
    /// The size in bytes of a signature from a 2048-bit RSA key
    ///
    /// Larger keys produce proportionally larger signatures; this value is
    /// only a sizing hint.
    #[must_use]
    pub const fn signature_size(self) -> usize {
        256
    }

    /// The digest bound to this algorithm
    pub const fn digest_algorithm(self) -> DigestAlgorithm {
        match self {
            Self::RS256 | Self::PS256 => DigestAlgorithm::Sha256,
            Self::RS384 | Self::PS384 => DigestAlgorithm::Sha384,
            Self::RS512 | Self::PS512 => DigestAlgorithm::Sha512,
        }
    }

    fn into_verification_params(self) -> &'static ring::signature::RsaParameters {
        match self {
            SigningAlgorithm::RS256 => &ring::signature::RSA_PKCS1_2048_8192_SHA256,
            SigningAlgorithm::RS384 => &ring::signature::RSA_PKCS1_2048_8192_SHA384,
            SigningAlgorithm::RS512 => &ring::signature::RSA_PKCS1_2048_8192_SHA512,
            SigningAlgorithm::PS256 => &ring::signature::RSA_PSS_2048_8192_SHA256,
            SigningAlgorithm::PS384 => &ring::signature::RSA_PSS_2048_8192_SHA384,
            SigningAlgorithm::PS512 => &ring::signature::RSA_PSS_2048_8192_SHA512,
        }
    }

    fn into_signing_params(self) -> &'static dyn ring::signature::RsaEncoding {
        match self {
            SigningAlgorithm::RS256 => &ring::signature::RSA_PKCS1_SHA256,
            SigningAlgorithm::RS384 => &ring::signature::RSA_PKCS1_SHA384,
            SigningAlgorithm::RS512 => &ring::signature::RSA_PKCS1_SHA512,
            SigningAlgorithm::PS256 => &ring::signature::RSA_PSS_SHA256,
            SigningAlgorithm::PS384 => &ring::signature::RSA_PSS_SHA384,
            SigningAlgorithm::PS512 => &ring::signature::RSA_PSS_SHA512,
        }
    }
}

impl From<SigningAlgorithm> for jws::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        Self::Rsa(alg)
    }
}

impl TryFrom<jws::Algorithm> for SigningAlgorithm {
    type Error = error::IncompatibleAlgorithm;

    fn try_from(alg: jws::Algorithm) -> Result<Self, Self::Error> {
        match alg {
            jws::Algorithm::Rsa(alg) => Ok(alg),
            _ => Err(error::incompatible_algorithm(alg)),
        }
    }
}

impl jws::Verifier for Rsa {
    type Algorithm = SigningAlgorithm;
    type Error = error::SignatureMismatch;

    fn can_verify(&self, _alg: Self::Algorithm) -> bool {
        true
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        self.public_key().verify(alg, data, signature)
    }
}

impl jws::Signer for Rsa {
    type Algorithm = SigningAlgorithm;
    type Error = error::SigningError;

    fn can_sign(&self, alg: Self::Algorithm) -> bool {
        if let Some(p) = self.private_key() {
            p.can_sign(alg)
        } else {
            false
        }
    }

    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        if let Some(p) = self.private_key() {
            p.sign(alg, data)
        } else {
            Err(error::missing_private_key().into())
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
        };

        f.write_str(s)
    }
}

impl From<PublicKey> for Rsa {
    fn from(key: PublicKey) -> Self {
        Self {
            key: MaybePrivate::PublicOnly(key),
        }
    }
}

impl From<PrivateKey> for Rsa {
    fn from(key: PrivateKey) -> Self {
        Self {
            key: MaybePrivate::PublicAndPrivate(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::jws::{Signer, Verifier};

    #[test]
    fn round_trips_through_jwk_components() -> Result<()> {
        let key = Rsa::generate()?;

        let json = serde_json::to_string(&key)?;
        let restored: Rsa = serde_json::from_str(&json)?;

        assert_eq!(restored, key);
        Ok(())
    }

    #[test]
    fn signs_and_verifies_pkcs1() -> Result<()> {
        let key = Rsa::generate()?;

        let signature = key.sign(SigningAlgorithm::RS256, b"message")?;
        key.verify(SigningAlgorithm::RS256, b"message", &signature)?;
        Ok(())
    }

    #[test]
    fn signs_and_verifies_pss() -> Result<()> {
        let key = Rsa::generate()?;

        let signature = key.sign(SigningAlgorithm::PS384, b"message")?;
        key.verify(SigningAlgorithm::PS384, b"message", &signature)?;
        Ok(())
    }

    #[test]
    fn rejects_signature_from_a_different_key() -> Result<()> {
        let signer = Rsa::generate()?;
        let other = Rsa::generate()?;

        let signature = signer.sign(SigningAlgorithm::RS256, b"message")?;
        let err = other.verify(SigningAlgorithm::RS256, b"message", &signature);

        assert!(err.is_err());
        Ok(())
    }

    #[test]
    fn public_only_key_cannot_sign() -> Result<()> {
        let key = Rsa::generate()?.public_only();

        assert!(!key.can_sign(SigningAlgorithm::RS256));
        let err = key.sign(SigningAlgorithm::RS256, b"message");
        assert!(matches!(
            err,
            Err(error::SigningError::MissingPrivateKey(_))
        ));
        Ok(())
    }
}
