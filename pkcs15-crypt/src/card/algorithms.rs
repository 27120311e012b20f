//! Card algorithm capabilities
//!
//! Each device registers the algorithm/key-size combinations it executes,
//! together with the padding, hash and mode bits it applies itself.

use bitflags::bitflags;

bitflags! {
    /// Operation and capability flag word.
    ///
    /// Used both for the flags a caller requests and for what a card
    /// advertises. ECDSA hash bits share their values with the RSA hash bits.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AlgorithmFlags: u64 {
        const RSA_RAW = 1 << 0;
        const RSA_PAD_NONE = Self::RSA_RAW.bits();
        const RSA_PAD_PKCS1_TYPE_01 = 1 << 1;
        const RSA_PAD_ANSI = 1 << 2;
        const RSA_PAD_ISO9796 = 1 << 3;
        const RSA_PAD_PSS = 1 << 4;
        const RSA_PAD_OAEP = 1 << 5;
        const RSA_PAD_PKCS1_TYPE_02 = 1 << 6;
        const RSA_PAD_PKCS1 = Self::RSA_PAD_PKCS1_TYPE_01.bits() | Self::RSA_PAD_PKCS1_TYPE_02.bits();
        const RSA_PADS = Self::RSA_PAD_NONE.bits()
            | Self::RSA_PAD_PKCS1_TYPE_01.bits()
            | Self::RSA_PAD_ANSI.bits()
            | Self::RSA_PAD_ISO9796.bits()
            | Self::RSA_PAD_PSS.bits()
            | Self::RSA_PAD_OAEP.bits()
            | Self::RSA_PAD_PKCS1_TYPE_02.bits();

        const RSA_HASH_NONE = 1 << 8;
        const RSA_HASH_SHA1 = 1 << 9;
        const RSA_HASH_MD5 = 1 << 10;
        const RSA_HASH_MD5_SHA1 = 1 << 11;
        const RSA_HASH_RIPEMD160 = 1 << 12;
        const RSA_HASH_SHA256 = 1 << 13;
        const RSA_HASH_SHA384 = 1 << 14;
        const RSA_HASH_SHA512 = 1 << 15;
        const RSA_HASH_SHA224 = 1 << 16;
        const RSA_HASHES = Self::RSA_HASH_SHA1.bits()
            | Self::RSA_HASH_MD5.bits()
            | Self::RSA_HASH_MD5_SHA1.bits()
            | Self::RSA_HASH_RIPEMD160.bits()
            | Self::RSA_HASH_SHA256.bits()
            | Self::RSA_HASH_SHA384.bits()
            | Self::RSA_HASH_SHA512.bits()
            | Self::RSA_HASH_SHA224.bits();

        const GOSTR3410_RAW = 1 << 17;
        const GOSTR3410_HASH_NONE = Self::GOSTR3410_RAW.bits();
        const GOSTR3410_HASH_GOSTR3411 = 1 << 19;
        const GOSTR3410_HASHES = Self::GOSTR3410_HASH_GOSTR3411.bits();

        const MGF1_SHA1 = 1 << 20;
        const MGF1_SHA256 = 1 << 21;
        const MGF1_SHA384 = 1 << 22;
        const MGF1_SHA512 = 1 << 23;
        const MGF1_SHA224 = 1 << 24;
        const MGF1_HASHES = Self::MGF1_SHA1.bits()
            | Self::MGF1_SHA256.bits()
            | Self::MGF1_SHA384.bits()
            | Self::MGF1_SHA512.bits()
            | Self::MGF1_SHA224.bits();

        const ECDSA_RAW = 1 << 32;
        const ECDSA_HASH_NONE = Self::RSA_HASH_NONE.bits();
        const ECDSA_HASH_SHA1 = Self::RSA_HASH_SHA1.bits();
        const ECDSA_HASH_SHA224 = Self::RSA_HASH_SHA224.bits();
        const ECDSA_HASH_SHA256 = Self::RSA_HASH_SHA256.bits();
        const ECDSA_HASH_SHA384 = Self::RSA_HASH_SHA384.bits();
        const ECDSA_HASH_SHA512 = Self::RSA_HASH_SHA512.bits();
        const ECDSA_HASHES = Self::ECDSA_HASH_SHA1.bits()
            | Self::ECDSA_HASH_SHA224.bits()
            | Self::ECDSA_HASH_SHA256.bits()
            | Self::ECDSA_HASH_SHA384.bits()
            | Self::ECDSA_HASH_SHA512.bits();
        const ECDH_CDH_RAW = 1 << 33;
        const EDDSA_RAW = 1 << 34;
        const XEDDSA_RAW = 1 << 35;

        const AES_ECB = 1 << 36;
        const AES_CBC = 1 << 37;
        const AES_CBC_PAD = 1 << 38;
        const AES_FLAGS = Self::AES_ECB.bits() | Self::AES_CBC.bits() | Self::AES_CBC_PAD.bits();

        /// Card cannot tell a signature from a decryption on one RSA key
        const NEED_USAGE = 1 << 40;
        const ONBOARD_KEY_GEN = 1 << 41;
    }
}

/// Algorithm families a security environment can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Rsa,
    Ec,
    GostR3410,
    EdDsa,
    XEdDsa,
    Aes,
}

/// A capability record registered by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmInfo {
    pub algorithm: Algorithm,
    /// Modulus length, field length or key value length in bits
    pub key_length: usize,
    pub flags: AlgorithmFlags,
    /// Named curve (DER-encoded OID body) for EC entries
    pub curve_oid: Option<Vec<u8>>,
}

impl AlgorithmInfo {
    pub fn new(algorithm: Algorithm, key_length: usize, flags: AlgorithmFlags) -> Self {
        Self {
            algorithm,
            key_length,
            flags,
            curve_oid: None,
        }
    }

    /// Attach a named curve to an EC entry
    pub fn with_curve(mut self, oid: &[u8]) -> Self {
        self.curve_oid = Some(oid.to_vec());
        self
    }
}

/// Find the first capability record for `algorithm` at `key_length` bits.
///
/// When both the record and the caller name a curve, they must match.
pub fn find_algorithm<'a>(
    algorithms: &'a [AlgorithmInfo],
    algorithm: Algorithm,
    key_length: usize,
    curve_oid: Option<&[u8]>,
) -> Option<&'a AlgorithmInfo> {
    algorithms.iter().find(|info| {
        if info.algorithm != algorithm || info.key_length != key_length {
            return false;
        }
        match (curve_oid, info.curve_oid.as_deref()) {
            (Some(wanted), Some(have)) => wanted == have,
            _ => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIME256V1: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07];
    const SECP384R1: &[u8] = &[0x2B, 0x81, 0x04, 0x00, 0x22];

    fn table() -> Vec<AlgorithmInfo> {
        vec![
            AlgorithmInfo::new(Algorithm::Rsa, 2048, AlgorithmFlags::RSA_RAW),
            AlgorithmInfo::new(Algorithm::Ec, 256, AlgorithmFlags::ECDSA_RAW).with_curve(PRIME256V1),
            AlgorithmInfo::new(Algorithm::Ec, 384, AlgorithmFlags::ECDSA_RAW).with_curve(SECP384R1),
        ]
    }

    #[test]
    fn test_find_by_family_and_size() {
        let algorithms = table();
        let info = find_algorithm(&algorithms, Algorithm::Rsa, 2048, None).unwrap();
        assert_eq!(info.flags, AlgorithmFlags::RSA_RAW);
        assert!(find_algorithm(&algorithms, Algorithm::Rsa, 4096, None).is_none());
        assert!(find_algorithm(&algorithms, Algorithm::GostR3410, 2048, None).is_none());
    }

    #[test]
    fn test_find_checks_curve_when_given() {
        let algorithms = table();
        assert!(find_algorithm(&algorithms, Algorithm::Ec, 256, Some(PRIME256V1)).is_some());
        assert!(find_algorithm(&algorithms, Algorithm::Ec, 256, Some(SECP384R1)).is_none());
        assert!(find_algorithm(&algorithms, Algorithm::Ec, 384, None).is_some());
    }

    #[test]
    fn test_ecdsa_hashes_alias_rsa_hashes() {
        assert_eq!(AlgorithmFlags::ECDSA_HASH_SHA256, AlgorithmFlags::RSA_HASH_SHA256);
        assert!(AlgorithmFlags::RSA_HASHES.contains(AlgorithmFlags::ECDSA_HASHES));
        assert!(!AlgorithmFlags::ECDSA_HASHES.contains(AlgorithmFlags::ECDSA_HASH_NONE));
        assert!(AlgorithmFlags::RSA_PADS.contains(AlgorithmFlags::RSA_PAD_OAEP));
        assert_eq!(AlgorithmFlags::RSA_RAW, AlgorithmFlags::RSA_PAD_NONE);
    }
}
