//! Implementations of the JSON Web Algorithms (JWA) standard
//!
//! The specifications for these algorithms can be found in [RFC7518][].
//! Only the asymmetric signing families are implemented; this engine has
//! no use for symmetric or encryption algorithms.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

pub mod ec;
pub mod rsa;

#[doc(inline)]
pub use ec::EllipticCurve;
#[doc(inline)]
pub use rsa::Rsa;

mod usage;

pub use usage::Usage;
