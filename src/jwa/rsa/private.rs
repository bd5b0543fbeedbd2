use std::{convert::TryFrom, fmt, sync::Arc};

use aliri_base64::Base64Url;
use openssl::{
    bn::BigNum,
    pkey::Private,
    rsa::{Rsa, RsaPrivateKeyBuilder},
};
use ring::signature::RsaKeyPair;
use serde::{Deserialize, Serialize};

use super::{PublicKey, SigningAlgorithm};
use crate::error;

/// RSA private key components
///
/// The raw components are kept only long enough to seed the signing key
/// pair; the explicit JWK serialization is the sole way private material
/// leaves this type.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "PrivateKeyDto", into = "PrivateKeyDto")]
#[must_use]
pub struct PrivateKey {
    public_key: PublicKey,
    der: Vec<u8>,
    ring_cache: Arc<RsaKeyPair>,
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for PrivateKey {}

impl PrivateKey {
    /// Generates a new 2048-bit RSA key pair
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate() -> Result<Self, error::Unexpected> {
        let rsa = Rsa::generate(2048).map_err(error::unexpected)?;
        Self::from_openssl_key(&rsa).map_err(error::unexpected)
    }

    fn from_openssl_key(rsa: &Rsa<Private>) -> Result<Self, error::MalformedKey> {
        let der = rsa.private_key_to_der().map_err(error::malformed_key)?;

        let public_key = PublicKey::from_components(
            Base64Url::from_raw(rsa.n().to_vec()),
            Base64Url::from_raw(rsa.e().to_vec()),
        )?;

        let ring_cache = Arc::new(
            RsaKeyPair::from_der(&der).map_err(|e| error::malformed_key(e.to_string()))?,
        );

        Ok(Self {
            public_key,
            der,
            ring_cache,
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

    pub(crate) fn can_sign(&self, _alg: SigningAlgorithm) -> bool {
        true
    }

    pub(crate) fn sign(
        &self,
        alg: SigningAlgorithm,
        data: &[u8],
    ) -> Result<Vec<u8>, error::SigningError> {
        let mut buf = vec![0; self.ring_cache.public().modulus_len()];
        self.ring_cache
            .sign(
                alg.into_signing_params(),
                &ring::rand::SystemRandom::new(),
                data,
                &mut buf,
            )
            .map_err(|e| error::unexpected(e.to_string()))?;
        Ok(buf)
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

impl From<PrivateKey> for PrivateKeyDto {
    fn from(pk: PrivateKey) -> Self {
        let rsa = Rsa::private_key_from_der(&pk.der).unwrap();

        let factors = match (rsa.p(), rsa.q()) {
            (Some(p), Some(q)) => Some(Factors {
                p: Base64Url::from_raw(p.to_vec()),
                q: Base64Url::from_raw(q.to_vec()),
            }),
            _ => None,
        };

        let crt = match (rsa.dmp1(), rsa.dmq1(), rsa.iqmp()) {
            (Some(dmp1), Some(dmq1), Some(iqmp)) => Some(ChineseRemainderTheorem {
                dmp1: Base64Url::from_raw(dmp1.to_vec()),
                dmq1: Base64Url::from_raw(dmq1.to_vec()),
                iqmp: Base64Url::from_raw(iqmp.to_vec()),
            }),
            _ => None,
        };

        Self {
            key: Base64Url::from_raw(rsa.d().to_vec()),
            public_key: pk.public_key,
            factors,
            crt,
        }
    }
}

impl TryFrom<PrivateKeyDto> for PrivateKey {
    type Error = error::MalformedKey;

    fn try_from(dto: PrivateKeyDto) -> Result<Self, Self::Error> {
        let mut builder = RsaPrivateKeyBuilder::new(
            BigNum::from_slice(dto.public_key.modulus().as_slice())
                .map_err(error::malformed_key)?,
            BigNum::from_slice(dto.public_key.exponent().as_slice())
                .map_err(error::malformed_key)?,
            BigNum::from_slice(dto.key.as_slice()).map_err(error::malformed_key)?,
        )
        .map_err(error::malformed_key)?;

        if let Some(f) = &dto.factors {
            builder = builder
                .set_factors(
                    BigNum::from_slice(f.p.as_slice()).map_err(error::malformed_key)?,
                    BigNum::from_slice(f.q.as_slice()).map_err(error::malformed_key)?,
                )
                .map_err(error::malformed_key)?;
        }

        if let Some(crt) = &dto.crt {
            builder = builder
                .set_crt_params(
                    BigNum::from_slice(crt.dmp1.as_slice()).map_err(error::malformed_key)?,
                    BigNum::from_slice(crt.dmq1.as_slice()).map_err(error::malformed_key)?,
                    BigNum::from_slice(crt.iqmp.as_slice()).map_err(error::malformed_key)?,
                )
                .map_err(error::malformed_key)?;
        }

        let key = builder.build();

        Self::from_openssl_key(&key)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct Factors {
    pub p: Base64Url,
    pub q: Base64Url,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct ChineseRemainderTheorem {
    #[serde(rename = "dp")]
    dmp1: Base64Url,

    #[serde(rename = "dq")]
    dmq1: Base64Url,

    #[serde(rename = "qi")]
    iqmp: Base64Url,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct PrivateKeyDto {
    #[serde(rename = "d")]
    key: Base64Url,

    #[serde(flatten)]
    public_key: PublicKey,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    factors: Option<Factors>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    crt: Option<ChineseRemainderTheorem>,
}
