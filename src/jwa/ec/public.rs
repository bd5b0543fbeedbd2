use std::{convert::TryFrom, fmt};

use aliri_base64::{Base64Url, Base64UrlRef};
use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcKey, EcKeyRef},
    ecdsa::EcdsaSig,
    pkey::{HasPublic, Public},
};
use serde::{Deserialize, Serialize};

use super::{Curve, SigningAlgorithm};
use crate::error;

/// ECC public key parameters
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyDto", into = "PublicKeyDto")]
pub struct PublicKey {
    curve: Curve,
    x: Base64Url,
    y: Base64Url,
    key: EcKey<Public>,
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.curve == other.curve && self.x == other.x && self.y == other.y
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("curve", &self.curve)
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl PublicKey {
    /// The curve underlying this key
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The x-coordinate of the public point
    pub fn x(&self) -> &Base64UrlRef {
        &self.x
    }

    /// The y-coordinate of the public point
    pub fn y(&self) -> &Base64UrlRef {
        &self.y
    }

    pub(crate) fn from_openssl_eckey<T: HasPublic>(
        key: &EcKeyRef<T>,
    ) -> Result<Self, error::MalformedKey> {
        let group = key.group();
        let curve =
            Curve::from_group(group).ok_or_else(|| error::malformed_key("unrecognized curve"))?;

        let mut ctx = BigNumContext::new().map_err(error::malformed_key)?;
        let mut x = BigNum::new().map_err(error::malformed_key)?;
        let mut y = BigNum::new().map_err(error::malformed_key)?;
        key.public_key()
            .affine_coordinates_gfp(group, &mut x, &mut y, &mut ctx)
            .map_err(error::malformed_key)?;

        // Coordinates are always emitted at the curve's fixed width.
        let size = curve.coordinate_size() as i32;
        let x = Base64Url::from_raw(x.to_vec_padded(size).map_err(error::malformed_key)?);
        let y = Base64Url::from_raw(y.to_vec_padded(size).map_err(error::malformed_key)?);

        let key = EcKey::from_public_key(group, key.public_key()).map_err(error::malformed_key)?;

        Ok(Self { curve, x, y, key })
    }

    pub(crate) fn can_verify(&self, alg: SigningAlgorithm) -> bool {
        Curve::from(alg) == self.curve
    }

    pub(crate) fn verify(
        &self,
        alg: SigningAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::SignatureMismatch> {
        if Curve::from(alg) != self.curve {
            return Err(error::signature_mismatch());
        }

        let size = self.curve.coordinate_size();
        if signature.len() != size * 2 {
            return Err(error::signature_mismatch());
        }

        let r = BigNum::from_slice(&signature[..size]).map_err(|_| error::signature_mismatch())?;
        let s = BigNum::from_slice(&signature[size..]).map_err(|_| error::signature_mismatch())?;
        let sig =
            EcdsaSig::from_private_components(r, s).map_err(|_| error::signature_mismatch())?;

        let digest = alg.digest_algorithm().digest(data);

        match sig.verify(digest.as_ref(), &self.key) {
            Ok(true) => Ok(()),
            _ => Err(error::signature_mismatch()),
        }
    }
}

impl TryFrom<PublicKeyDto> for PublicKey {
    type Error = error::MalformedKey;

    fn try_from(dto: PublicKeyDto) -> Result<Self, Self::Error> {
        let group = dto.curve.to_group();
        let public = EcKey::from_public_key_affine_coordinates(
            group,
            &*BigNum::from_slice(dto.x.as_slice()).map_err(error::malformed_key)?,
            &*BigNum::from_slice(dto.y.as_slice()).map_err(error::malformed_key)?,
        )
        .map_err(error::malformed_key)?;

        Self::from_openssl_eckey(&*public)
    }
}

impl From<PublicKey> for PublicKeyDto {
    fn from(p: PublicKey) -> Self {
        Self {
            curve: p.curve,
            x: p.x,
            y: p.y,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub(crate) struct PublicKeyDto {
    #[serde(rename = "crv")]
    pub curve: Curve,
    pub x: Base64Url,
    pub y: Base64Url,
}
