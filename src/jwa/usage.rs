use serde::{Deserialize, Serialize};

/// The intended use declared by a JWK
///
/// Only signing keys can enter this engine; keys declaring `enc` fail
/// closed at import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Usage {
    /// The key is intended for signing and verification
    #[serde(rename = "sig")]
    Signing,

    /// The key is intended for encryption
    #[serde(rename = "enc")]
    Encryption,
}
