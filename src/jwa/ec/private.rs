use std::{convert::TryFrom, fmt};

use aliri_base64::Base64Url;
use openssl::{bn::BigNum, ec::EcKey, ecdsa::EcdsaSig, pkey::Private};
use serde::{Deserialize, Serialize};

use crate::{
    error,
    jwa::ec::{public::PublicKeyDto, Curve, PublicKey, SigningAlgorithm},
};

/// ECC private key parameters
///
/// The private scalar never appears in `Debug` output; the explicit JWK
/// serialization is the sole way it leaves this type.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "PrivateKeyDto", into = "PrivateKeyDto")]
#[must_use]
pub struct PrivateKey {
    public_key: PublicKey,
    d: Base64Url,
    key: EcKey<Private>,
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && self.d == other.d
    }
}

impl Eq for PrivateKey {}

impl PrivateKey {
    /// Generates a new ECC key pair using the specified curve
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate(curve: Curve) -> Result<Self, error::Unexpected> {
        let key = EcKey::generate(curve.to_group()).map_err(error::unexpected)?;

        Self::from_openssl_eckey(key).map_err(error::unexpected)
    }

    fn from_openssl_eckey(key: EcKey<Private>) -> Result<Self, error::MalformedKey> {
        let public_key = PublicKey::from_openssl_eckey(&*key)?;

        let size = public_key.curve().coordinate_size() as i32;
        let d = Base64Url::from_raw(
            key.private_key()
                .to_vec_padded(size)
                .map_err(error::malformed_key)?,
        );

        Ok(Self {
            public_key,
            d,
            key,
        })
    }

    /// Provides access to the public key parameters
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Extracts the public key
    pub fn into_public_key(self) -> PublicKey {
        self.public_key
    }

    pub(crate) fn can_sign(&self, alg: SigningAlgorithm) -> bool {
        self.public_key.curve() == Curve::from(alg)
    }

    pub(crate) fn sign(
        &self,
        alg: SigningAlgorithm,
        data: &[u8],
    ) -> Result<Vec<u8>, error::SigningError> {
        if !self.can_sign(alg) {
            return Err(error::incompatible_algorithm(alg).into());
        }

        let digest = alg.digest_algorithm().digest(data);
        let signature = EcdsaSig::sign(digest.as_ref(), &*self.key)
            .map_err(|e| error::unexpected(e.to_string()))?;

        // JOSE wants the raw `r || s` form at the curve's fixed width, not
        // the DER structure openssl produces by default.
        let size = self.public_key.curve().coordinate_size() as i32;
        let mut out = signature
            .r()
            .to_vec_padded(size)
            .map_err(|e| error::unexpected(e.to_string()))?;
        out.extend_from_slice(
            &signature
                .s()
                .to_vec_padded(size)
                .map_err(|e| error::unexpected(e.to_string()))?,
        );

        Ok(out)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct PrivateKeyDto {
    #[serde(rename = "d")]
    key: Base64Url,

    #[serde(flatten)]
    public_key: PublicKeyDto,
}

impl From<PrivateKey> for PrivateKeyDto {
    fn from(pk: PrivateKey) -> Self {
        Self {
            key: pk.d,
            public_key: PublicKeyDto::from(pk.public_key),
        }
    }
}

impl TryFrom<PrivateKeyDto> for PrivateKey {
    type Error = error::MalformedKey;

    fn try_from(dto: PrivateKeyDto) -> Result<Self, Self::Error> {
        let group = dto.public_key.curve.to_group();
        let public = EcKey::from_public_key_affine_coordinates(
            group,
            &*BigNum::from_slice(dto.public_key.x.as_slice()).map_err(error::malformed_key)?,
            &*BigNum::from_slice(dto.public_key.y.as_slice()).map_err(error::malformed_key)?,
        )
        .map_err(error::malformed_key)?;

        let private_number =
            BigNum::from_slice(dto.key.as_slice()).map_err(error::malformed_key)?;

        let key = EcKey::from_private_components(group, &private_number, public.public_key())
            .map_err(error::malformed_key)?;

        Self::from_openssl_eckey(key)
    }
}
