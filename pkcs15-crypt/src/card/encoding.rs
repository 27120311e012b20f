//! Encoding flag negotiation
//!
//! Splits the flags a caller requested into the part software must apply
//! before the card sees the data and the part the card applies itself.

use log::debug;

use super::algorithms::AlgorithmFlags as F;
use crate::error::{CardError, Result};

/// Hash bits in precedence order, as scanned in a request
const HASH_ORDER: [F; 9] = [
    F::RSA_HASH_NONE,
    F::RSA_HASH_SHA1,
    F::RSA_HASH_MD5,
    F::RSA_HASH_MD5_SHA1,
    F::RSA_HASH_RIPEMD160,
    F::RSA_HASH_SHA256,
    F::RSA_HASH_SHA384,
    F::RSA_HASH_SHA512,
    F::RSA_HASH_SHA224,
];

/// Modes executed only by the card, for EC, Edwards, Montgomery and GOST keys
const CARD_ONLY_MODES: [F; 5] = [
    F::ECDSA_RAW,
    F::ECDH_CDH_RAW,
    F::EDDSA_RAW,
    F::XEDDSA_RAW,
    F::GOSTR3410_RAW,
];

/// Negotiated split of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingFlags {
    /// Encoding applied in software before or after the card command
    pub pad: F,
    /// Encoding the card performs, written into the security environment
    pub card: F,
}

/// Split `requested` against the card capabilities `caps`.
pub fn get_encoding_flags(requested: F, caps: F) -> Result<EncodingFlags> {
    let result = if requested.intersects(F::AES_FLAGS) {
        EncodingFlags {
            pad: F::empty(),
            card: requested & F::AES_FLAGS,
        }
    } else if requested.intersects(F::RSA_PADS) {
        rsa_encoding(requested, caps)?
    } else {
        card_only_encoding(requested, caps)?
    };

    debug!(
        "Encoding flags: requested {:?}, caps {:?} -> pad {:?}, card {:?}",
        requested, caps, result.pad, result.card
    );
    Ok(result)
}

fn rsa_encoding(requested: F, caps: F) -> Result<EncodingFlags> {
    let mode = requested & F::RSA_PADS;

    if mode == F::RSA_PAD_PSS || mode == F::RSA_PAD_OAEP {
        if caps.contains(mode) {
            return Ok(EncodingFlags {
                pad: F::empty(),
                card: mode | (requested & (F::RSA_HASHES | F::MGF1_HASHES)),
            });
        }
        if caps.contains(F::RSA_RAW) {
            return Ok(EncodingFlags {
                pad: requested,
                card: F::RSA_RAW,
            });
        }
        return Err(CardError::NotSupported);
    }

    let mut pad = F::empty();
    let mut card = F::empty();

    if let Some(hash) = HASH_ORDER.iter().copied().find(|h| requested.contains(*h)) {
        if hash != F::RSA_HASH_NONE && caps.contains(hash) {
            card |= hash;
        } else {
            pad |= hash;
        }
    }

    if mode == F::RSA_PAD_PKCS1_TYPE_01 || mode == F::RSA_PAD_PKCS1_TYPE_02 {
        if caps.contains(mode) {
            card |= mode;
        } else if caps.contains(F::RSA_RAW) {
            pad |= mode;
            card |= F::RSA_RAW;
        } else {
            return Err(CardError::NotSupported);
        }
    } else if mode == F::RSA_PAD_NONE || mode == F::RSA_PAD_ANSI || mode == F::RSA_PAD_ISO9796 {
        if !caps.contains(mode) {
            return Err(CardError::NotSupported);
        }
        card |= mode;
    } else {
        // more than one padding scheme at once
        return Err(CardError::NotSupported);
    }

    Ok(EncodingFlags { pad, card })
}

fn card_only_encoding(requested: F, caps: F) -> Result<EncodingFlags> {
    let mut card = F::empty();

    for mode in CARD_ONLY_MODES {
        if requested.contains(mode) {
            if !caps.contains(mode) {
                return Err(CardError::NotSupported);
            }
            card |= mode;
        }
    }

    for hash in [F::ECDSA_HASHES, F::GOSTR3410_HASHES] {
        let wanted = requested & hash;
        if !wanted.is_empty() {
            if !caps.contains(wanted) {
                return Err(CardError::NotSupported);
            }
            card |= wanted;
        }
    }

    if card.is_empty() {
        return Err(CardError::NotSupported);
    }
    Ok(EncodingFlags {
        pad: F::empty(),
        card,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkcs1_in_software_on_raw_card() {
        let flags = get_encoding_flags(
            F::RSA_PAD_PKCS1_TYPE_01 | F::RSA_HASH_SHA256,
            F::RSA_RAW | F::RSA_HASH_NONE,
        )
        .unwrap();
        assert_eq!(flags.pad, F::RSA_PAD_PKCS1_TYPE_01 | F::RSA_HASH_SHA256);
        assert_eq!(flags.card, F::RSA_RAW);
    }

    #[test]
    fn test_pkcs1_on_card_with_hash() {
        let flags = get_encoding_flags(
            F::RSA_PAD_PKCS1_TYPE_01 | F::RSA_HASH_SHA256,
            F::RSA_PAD_PKCS1_TYPE_01 | F::RSA_HASH_SHA256,
        )
        .unwrap();
        assert!(flags.pad.is_empty());
        assert_eq!(flags.card, F::RSA_PAD_PKCS1_TYPE_01 | F::RSA_HASH_SHA256);
    }

    #[test]
    fn test_card_pads_software_prefixes() {
        let flags = get_encoding_flags(
            F::RSA_PAD_PKCS1_TYPE_01 | F::RSA_HASH_SHA1,
            F::RSA_PAD_PKCS1_TYPE_01 | F::RSA_HASH_NONE,
        )
        .unwrap();
        assert_eq!(flags.pad, F::RSA_HASH_SHA1);
        assert_eq!(flags.card, F::RSA_PAD_PKCS1_TYPE_01);
    }

    #[test]
    fn test_pkcs1_unavailable() {
        assert_eq!(
            get_encoding_flags(F::RSA_PAD_PKCS1_TYPE_02, F::RSA_PAD_PKCS1_TYPE_01),
            Err(CardError::NotSupported)
        );
    }

    #[test]
    fn test_oaep_in_card_keeps_mgf() {
        let requested = F::RSA_PAD_OAEP | F::RSA_HASH_SHA256 | F::MGF1_SHA256;
        let flags = get_encoding_flags(requested, F::RSA_PAD_OAEP | F::RSA_RAW).unwrap();
        assert!(flags.pad.is_empty());
        assert_eq!(flags.card, requested);
    }

    #[test]
    fn test_pss_in_software() {
        let requested = F::RSA_PAD_PSS | F::RSA_HASH_SHA256 | F::MGF1_SHA256;
        let flags = get_encoding_flags(requested, F::RSA_RAW).unwrap();
        assert_eq!(flags.pad, requested);
        assert_eq!(flags.card, F::RSA_RAW);
    }

    #[test]
    fn test_raw_requires_card_raw() {
        let flags = get_encoding_flags(F::RSA_RAW, F::RSA_RAW).unwrap();
        assert_eq!(flags.card, F::RSA_RAW);
        assert!(flags.pad.is_empty());
        assert_eq!(
            get_encoding_flags(F::RSA_RAW, F::RSA_PAD_PKCS1_TYPE_01),
            Err(CardError::NotSupported)
        );
    }

    #[test]
    fn test_ecdsa_raw_and_hash() {
        let caps = F::ECDSA_RAW | F::ECDSA_HASH_SHA256;
        assert_eq!(get_encoding_flags(F::ECDSA_RAW, caps).unwrap().card, F::ECDSA_RAW);
        assert_eq!(
            get_encoding_flags(F::ECDSA_HASH_SHA256, caps).unwrap().card,
            F::ECDSA_HASH_SHA256
        );
        assert_eq!(
            get_encoding_flags(F::ECDSA_HASH_SHA384, caps),
            Err(CardError::NotSupported)
        );
    }

    #[test]
    fn test_aes_goes_to_card() {
        let flags = get_encoding_flags(F::AES_CBC_PAD, F::AES_CBC_PAD | F::AES_ECB).unwrap();
        assert_eq!(flags.card, F::AES_CBC_PAD);
        assert!(flags.pad.is_empty());
    }

    #[test]
    fn test_empty_request() {
        assert_eq!(
            get_encoding_flags(F::empty(), F::all()),
            Err(CardError::NotSupported)
        );
    }
}
