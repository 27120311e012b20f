//! Hash Operations
//!
//! Software hashing for padding schemes, and the mapping between hash
//! algorithms and their bits in the algorithm flag word.

use digest::Digest;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::card::AlgorithmFlags;

/// Hash algorithm types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    SHA1,
    SHA224,
    SHA256,
    SHA384,
    SHA512,
}

impl HashAlgorithm {
    /// Hash selected by the RSA/ECDSA hash bits of a flag word
    pub fn from_flags(flags: AlgorithmFlags) -> Option<Self> {
        if flags.contains(AlgorithmFlags::RSA_HASH_SHA1) {
            Some(Self::SHA1)
        } else if flags.contains(AlgorithmFlags::RSA_HASH_SHA224) {
            Some(Self::SHA224)
        } else if flags.contains(AlgorithmFlags::RSA_HASH_SHA256) {
            Some(Self::SHA256)
        } else if flags.contains(AlgorithmFlags::RSA_HASH_SHA384) {
            Some(Self::SHA384)
        } else if flags.contains(AlgorithmFlags::RSA_HASH_SHA512) {
            Some(Self::SHA512)
        } else {
            None
        }
    }

    /// Hash selected by the MGF1 bits of a flag word
    pub fn from_mgf1_flags(flags: AlgorithmFlags) -> Option<Self> {
        if flags.contains(AlgorithmFlags::MGF1_SHA1) {
            Some(Self::SHA1)
        } else if flags.contains(AlgorithmFlags::MGF1_SHA224) {
            Some(Self::SHA224)
        } else if flags.contains(AlgorithmFlags::MGF1_SHA256) {
            Some(Self::SHA256)
        } else if flags.contains(AlgorithmFlags::MGF1_SHA384) {
            Some(Self::SHA384)
        } else if flags.contains(AlgorithmFlags::MGF1_SHA512) {
            Some(Self::SHA512)
        } else {
            None
        }
    }

    pub fn flag(&self) -> AlgorithmFlags {
        match self {
            Self::SHA1 => AlgorithmFlags::RSA_HASH_SHA1,
            Self::SHA224 => AlgorithmFlags::RSA_HASH_SHA224,
            Self::SHA256 => AlgorithmFlags::RSA_HASH_SHA256,
            Self::SHA384 => AlgorithmFlags::RSA_HASH_SHA384,
            Self::SHA512 => AlgorithmFlags::RSA_HASH_SHA512,
        }
    }

    pub fn mgf1_flag(&self) -> AlgorithmFlags {
        match self {
            Self::SHA1 => AlgorithmFlags::MGF1_SHA1,
            Self::SHA224 => AlgorithmFlags::MGF1_SHA224,
            Self::SHA256 => AlgorithmFlags::MGF1_SHA256,
            Self::SHA384 => AlgorithmFlags::MGF1_SHA384,
            Self::SHA512 => AlgorithmFlags::MGF1_SHA512,
        }
    }
}

/// Hash Operations
pub struct HashOperations;

impl HashOperations {
    fn digest<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = D::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().to_vec()
    }

    /// Compute hash using specified algorithm
    pub fn hash(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        Self::hash_parts(algorithm, &[data])
    }

    /// Hash the concatenation of several inputs
    pub fn hash_parts(algorithm: HashAlgorithm, parts: &[&[u8]]) -> Vec<u8> {
        match algorithm {
            HashAlgorithm::SHA1 => Self::digest::<Sha1>(parts),
            HashAlgorithm::SHA224 => Self::digest::<Sha224>(parts),
            HashAlgorithm::SHA256 => Self::digest::<Sha256>(parts),
            HashAlgorithm::SHA384 => Self::digest::<Sha384>(parts),
            HashAlgorithm::SHA512 => Self::digest::<Sha512>(parts),
        }
    }

    /// Get the output size for an algorithm
    pub fn output_size(algorithm: HashAlgorithm) -> usize {
        match algorithm {
            HashAlgorithm::SHA1 => 20,
            HashAlgorithm::SHA224 => 28,
            HashAlgorithm::SHA256 => 32,
            HashAlgorithm::SHA384 => 48,
            HashAlgorithm::SHA512 => 64,
        }
    }

    /// XOR `out` with the MGF1 mask generated from `seed`
    pub fn mgf1_xor(algorithm: HashAlgorithm, seed: &[u8], out: &mut [u8]) {
        let mut counter: u32 = 0;
        for chunk in out.chunks_mut(Self::output_size(algorithm)) {
            let mask = Self::hash_parts(algorithm, &[seed, &counter.to_be_bytes()[..]]);
            for (b, m) in chunk.iter_mut().zip(mask.iter()) {
                *b ^= m;
            }
            counter = counter.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_sizes() {
        for alg in [
            HashAlgorithm::SHA1,
            HashAlgorithm::SHA224,
            HashAlgorithm::SHA256,
            HashAlgorithm::SHA384,
            HashAlgorithm::SHA512,
        ] {
            assert_eq!(HashOperations::hash(alg, b"test").len(), HashOperations::output_size(alg));
        }
    }

    #[test]
    fn test_sha256_known_value() {
        // SHA-256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        let hash = HashOperations::hash(HashAlgorithm::SHA256, b"");
        assert_eq!(
            hex::encode(&hash),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_parts_matches_concatenation() {
        assert_eq!(
            HashOperations::hash_parts(HashAlgorithm::SHA1, &[b"ab", b"c"]),
            HashOperations::hash(HashAlgorithm::SHA1, b"abc")
        );
    }

    #[test]
    fn test_flag_mapping() {
        let flags = AlgorithmFlags::RSA_PAD_OAEP | AlgorithmFlags::RSA_HASH_SHA384 | AlgorithmFlags::MGF1_SHA1;
        assert_eq!(HashAlgorithm::from_flags(flags), Some(HashAlgorithm::SHA384));
        assert_eq!(HashAlgorithm::from_mgf1_flags(flags), Some(HashAlgorithm::SHA1));
        assert_eq!(HashAlgorithm::from_flags(AlgorithmFlags::RSA_RAW), None);
        assert_eq!(HashAlgorithm::SHA256.flag(), AlgorithmFlags::RSA_HASH_SHA256);
    }

    #[test]
    fn test_mgf1_is_involution() {
        let mut data = vec![0x5A; 70];
        HashOperations::mgf1_xor(HashAlgorithm::SHA256, b"seed", &mut data);
        assert_ne!(data, vec![0x5A; 70]);
        HashOperations::mgf1_xor(HashAlgorithm::SHA256, b"seed", &mut data);
        assert_eq!(data, vec![0x5A; 70]);
    }
}
