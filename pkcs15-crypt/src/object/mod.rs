//! PKCS#15 key objects
//!
//! The card-independent description of a key: what it is, what it may be
//! used for and where the card keeps it. Objects are created during
//! personalization and are read-only while operations run.

pub mod path;

pub use path::Path;

use bitflags::bitflags;

bitflags! {
    /// PKCS#15 key usage bits
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeyUsage: u32 {
        const ENCRYPT = 1 << 0;
        const DECRYPT = 1 << 1;
        const SIGN = 1 << 2;
        const SIGNRECOVER = 1 << 3;
        const WRAP = 1 << 4;
        const UNWRAP = 1 << 5;
        const VERIFY = 1 << 6;
        const VERIFYRECOVER = 1 << 7;
        const DERIVE = 1 << 8;
        const NONREPUDIATION = 1 << 9;

        const ANY_SIGN = Self::SIGN.bits() | Self::SIGNRECOVER.bits() | Self::NONREPUDIATION.bits();
        const ANY_DECIPHER = Self::DECRYPT.bits() | Self::UNWRAP.bits();
    }
}

/// PKCS#15 object class of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    PrivateKey,
    SecretKey,
    PublicKey,
}

/// Secret key types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKeyType {
    Aes,
    Des,
    Des3,
    Generic,
}

/// Key algorithm together with the sizes that matter for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa { modulus_bits: usize },
    Ec { field_bits: usize },
    GostR3410 { modulus_bits: usize },
    EdDsa { field_bits: usize },
    XEdDsa { field_bits: usize },
    Secret { key_type: SecretKeyType, value_bits: usize },
}

impl KeyAlgorithm {
    pub fn is_rsa(&self) -> bool {
        matches!(self, KeyAlgorithm::Rsa { .. })
    }
}

/// Identifier linking a key to the PIN that protects it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthId(pub Vec<u8>);

/// A key managed by the token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyObject {
    pub label: String,
    /// Stable PKCS#15 identifier
    pub id: Vec<u8>,
    pub class: ObjectClass,
    pub algorithm: KeyAlgorithm,
    pub usage: KeyUsage,
    pub path: Path,
    /// Card-assigned key reference, None when the card uses its default
    pub key_reference: Option<u32>,
    /// Key material never leaves the card
    pub native: bool,
    pub auth_id: Option<AuthId>,
    /// Every use needs a fresh PIN entry
    pub user_consent: bool,
}

impl KeyObject {
    fn new(id: &[u8], class: ObjectClass, algorithm: KeyAlgorithm) -> Self {
        Self {
            label: String::new(),
            id: id.to_vec(),
            class,
            algorithm,
            usage: KeyUsage::empty(),
            path: Path::default(),
            key_reference: None,
            native: true,
            auth_id: None,
            user_consent: false,
        }
    }

    /// A private key of an asymmetric algorithm
    pub fn private(id: &[u8], algorithm: KeyAlgorithm) -> Self {
        Self::new(id, ObjectClass::PrivateKey, algorithm)
    }

    /// A public key; operations on it are refused
    pub fn public(id: &[u8], algorithm: KeyAlgorithm) -> Self {
        Self::new(id, ObjectClass::PublicKey, algorithm)
    }

    pub fn secret(id: &[u8], key_type: SecretKeyType, value_bits: usize) -> Self {
        Self::new(
            id,
            ObjectClass::SecretKey,
            KeyAlgorithm::Secret { key_type, value_bits },
        )
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_usage(mut self, usage: KeyUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    pub fn with_key_reference(mut self, reference: u32) -> Self {
        self.key_reference = Some(reference);
        self
    }

    pub fn with_auth_id(mut self, auth_id: &[u8]) -> Self {
        self.auth_id = Some(AuthId(auth_id.to_vec()));
        self
    }

    pub fn with_user_consent(mut self, user_consent: bool) -> Self {
        self.user_consent = user_consent;
        self
    }

    pub fn with_native(mut self, native: bool) -> Self {
        self.native = native;
        self
    }

    pub fn is_private(&self) -> bool {
        self.class == ObjectClass::PrivateKey
    }

    pub fn is_secret(&self) -> bool {
        self.class == ObjectClass::SecretKey
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let key = KeyObject::private(&[0x45], KeyAlgorithm::Rsa { modulus_bits: 2048 })
            .with_label("Signature key")
            .with_usage(KeyUsage::SIGN | KeyUsage::DECRYPT)
            .with_path(Path::new(&[0x3F, 0x00, 0x45, 0x01]))
            .with_key_reference(0x81)
            .with_auth_id(&[0x01]);

        assert!(key.is_private());
        assert!(key.native);
        assert!(key.algorithm.is_rsa());
        assert!(key.usage.intersects(KeyUsage::ANY_SIGN));
        assert!(key.usage.intersects(KeyUsage::ANY_DECIPHER));
        assert_eq!(key.key_reference, Some(0x81));
        assert_eq!(key.auth_id, Some(AuthId(vec![0x01])));
    }

    #[test]
    fn test_secret_key() {
        let key = KeyObject::secret(&[0x10], SecretKeyType::Aes, 256);
        assert!(key.is_secret());
        assert_eq!(
            key.algorithm,
            KeyAlgorithm::Secret { key_type: SecretKeyType::Aes, value_bits: 256 }
        );
    }
}
