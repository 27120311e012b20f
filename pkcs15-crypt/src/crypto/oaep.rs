//! EME-OAEP decoding
//!
//! Strips OAEP padding from a raw RSA decipher result when the card left
//! the padding to software.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use super::hash::{HashAlgorithm, HashOperations};
use super::secure::SecureBuffer;
use crate::card::AlgorithmFlags;
use crate::error::{CardError, Result};

/// Decode an OAEP block of a `mod_len` byte key into `out`.
///
/// The hash comes from the RSA hash bits of `flags` (SHA-1 when none is
/// set) and the MGF1 hash from the MGF1 bits (defaulting to the hash).
/// `lock` pins the working copy of the block in memory.
pub fn strip_oaep_padding(
    data: &[u8],
    mod_len: usize,
    flags: AlgorithmFlags,
    label: &[u8],
    out: &mut [u8],
    lock: bool,
) -> Result<usize> {
    let hash = HashAlgorithm::from_flags(flags).unwrap_or(HashAlgorithm::SHA1);
    let mgf = HashAlgorithm::from_mgf1_flags(flags).unwrap_or(hash);
    let h_len = HashOperations::output_size(hash);

    if data.len() > mod_len || mod_len < 2 * h_len + 2 {
        return Err(CardError::DecryptionFailed);
    }

    let mut em = SecureBuffer::with_lock(mod_len, lock)?;
    em[mod_len - data.len()..].copy_from_slice(data);

    let (y, rest) = em.split_at_mut(1);
    let (seed, db) = rest.split_at_mut(h_len);
    HashOperations::mgf1_xor(mgf, db, seed);
    HashOperations::mgf1_xor(mgf, seed, db);

    let l_hash = HashOperations::hash(hash, label);
    let mut good = y[0].ct_eq(&0x00) & db[..h_len].ct_eq(&l_hash[..]);

    // PS is zero bytes up to the 0x01 separator
    let mut looking = Choice::from(1);
    let mut invalid = Choice::from(0);
    let mut separator: u32 = 0;
    for (i, b) in db.iter().enumerate().skip(h_len) {
        let is_one = b.ct_eq(&0x01);
        let is_zero = b.ct_eq(&0x00);
        separator.conditional_assign(&(i as u32), looking & is_one);
        looking &= !is_one;
        invalid |= looking & !is_zero;
    }
    good &= !looking & !invalid;

    let msg_start = separator as usize + 1;
    let mlen = db.len().saturating_sub(msg_start);
    if !bool::from(good) || mlen > out.len() {
        return Err(CardError::DecryptionFailed);
    }

    out[..mlen].copy_from_slice(&db[msg_start..]);
    Ok(mlen)
}
