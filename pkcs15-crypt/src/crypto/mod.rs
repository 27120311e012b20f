//! Software side of the operation encoders
//!
//! Padding, hashing and secure memory used around card commands. No
//! private-key arithmetic happens here.

pub mod hash;
pub mod mechanism;
pub mod oaep;
pub mod pkcs1;
pub mod pss;
pub mod secure;

pub use self::hash::{HashAlgorithm, HashOperations};
pub use self::mechanism::{MechanismParams, OaepParams, OaepSource, PssParams};
pub use self::secure::SecureBuffer;
