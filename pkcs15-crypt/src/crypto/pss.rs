//! EMSA-PSS encoding

use rand::rngs::OsRng;
use rand::RngCore;

use super::hash::{HashAlgorithm, HashOperations};
use super::mechanism::MechanismParams;
use super::secure::SecureBuffer;
use crate::card::AlgorithmFlags;
use crate::error::{CardError, Result};

/// Encode the message hash `digest` for a `mod_bits` key into `out`.
///
/// Mechanism parameters, when given, choose the hash, MGF1 hash and salt
/// length; otherwise they come from `flags` with the salt as long as the hash.
pub fn encode(
    flags: AlgorithmFlags,
    digest: &[u8],
    out: &mut [u8],
    mod_bits: usize,
    mechanism: Option<&MechanismParams>,
    lock: bool,
) -> Result<usize> {
    let (hash, mgf, salt_len) = match mechanism.and_then(MechanismParams::pss) {
        Some(params) => (params.hash, params.mgf, params.salt_len),
        None => {
            let hash = HashAlgorithm::from_flags(flags).ok_or(CardError::InvalidArguments)?;
            let mgf = HashAlgorithm::from_mgf1_flags(flags).unwrap_or(hash);
            (hash, mgf, HashOperations::output_size(hash))
        }
    };
    let h_len = HashOperations::output_size(hash);

    if digest.len() != h_len || mod_bits < 2 {
        return Err(CardError::InvalidArguments);
    }
    let mod_len = mod_bits.div_ceil(8);
    let em_bits = mod_bits - 1;
    let em_len = em_bits.div_ceil(8);
    if em_len < h_len + salt_len + 2 {
        return Err(CardError::InvalidArguments);
    }
    if out.len() < mod_len {
        return Err(CardError::BufferTooSmall);
    }

    let mut salt = SecureBuffer::with_lock(salt_len, lock)?;
    OsRng.fill_bytes(&mut salt);
    let h = HashOperations::hash_parts(hash, &[&[0u8; 8][..], digest, &salt[..]]);

    // EM = maskedDB || H || 0xbc, right-aligned in the modulus
    let offset = mod_len - em_len;
    out[..offset].fill(0);
    let em = &mut out[offset..mod_len];
    let db_len = em_len - h_len - 1;
    let (db, tail) = em.split_at_mut(db_len);

    db.fill(0);
    db[db_len - salt_len - 1] = 0x01;
    db[db_len - salt_len..].copy_from_slice(&salt);
    HashOperations::mgf1_xor(mgf, &h, db);
    db[0] &= 0xFF >> (8 * em_len - em_bits);

    tail[..h_len].copy_from_slice(&h);
    tail[h_len] = 0xBC;
    Ok(mod_len)
}
