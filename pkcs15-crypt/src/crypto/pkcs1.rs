//! PKCS#1 v1.5 encoding
//!
//! DigestInfo prefixes, block type 01 and 02 padding, the constant-time
//! type 02 removal used after a raw RSA decipher, and the encoder that
//! applies whatever padding negotiation left to software.

use std::borrow::Cow;

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};

use super::mechanism::MechanismParams;
use super::pss;
use super::secure::SecureBuffer;
use crate::card::AlgorithmFlags;
use crate::error::{CardError, Result};

/// 00 || BT || PS (at least 8 bytes) || 00
pub const MIN_PADDING_SIZE: usize = 11;

struct DigestInfoPrefix {
    algorithm: AlgorithmFlags,
    prefix: &'static [u8],
    hash_len: usize,
}

const DIGEST_INFO_PREFIXES: &[DigestInfoPrefix] = &[
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_MD5,
        prefix: &[
            0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x05,
            0x05, 0x00, 0x04, 0x10,
        ],
        hash_len: 16,
    },
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_SHA1,
        prefix: &[
            0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04,
            0x14,
        ],
        hash_len: 20,
    },
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_SHA256,
        prefix: &[
            0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x01, 0x05, 0x00, 0x04, 0x20,
        ],
        hash_len: 32,
    },
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_SHA384,
        prefix: &[
            0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x02, 0x05, 0x00, 0x04, 0x30,
        ],
        hash_len: 48,
    },
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_SHA512,
        prefix: &[
            0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x03, 0x05, 0x00, 0x04, 0x40,
        ],
        hash_len: 64,
    },
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_SHA224,
        prefix: &[
            0x30, 0x2d, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x04, 0x05, 0x00, 0x04, 0x1c,
        ],
        hash_len: 28,
    },
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_RIPEMD160,
        prefix: &[
            0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x24, 0x03, 0x02, 0x01, 0x05, 0x00, 0x04,
            0x14,
        ],
        hash_len: 20,
    },
    // TLS-style MD5 || SHA-1 concatenation carries no DigestInfo
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_MD5_SHA1,
        prefix: &[],
        hash_len: 36,
    },
    DigestInfoPrefix {
        algorithm: AlgorithmFlags::RSA_HASH_NONE,
        prefix: &[],
        hash_len: 0,
    },
];

/// Prepend the DigestInfo header for `hash` to `digest`
pub fn add_digest_info_prefix(hash: AlgorithmFlags, digest: &[u8]) -> Result<Vec<u8>> {
    let entry = DIGEST_INFO_PREFIXES
        .iter()
        .find(|e| e.algorithm == hash)
        .ok_or(CardError::NotSupported)?;

    if entry.algorithm == AlgorithmFlags::RSA_HASH_NONE {
        return Ok(digest.to_vec());
    }
    if digest.len() != entry.hash_len {
        return Err(CardError::InvalidArguments);
    }

    let mut out = Vec::with_capacity(entry.prefix.len() + digest.len());
    out.extend_from_slice(entry.prefix);
    out.extend_from_slice(digest);
    Ok(out)
}

/// Recognise a DigestInfo and return its hash algorithm and raw hash
pub fn strip_digest_info_prefix(data: &[u8]) -> Result<(AlgorithmFlags, &[u8])> {
    DIGEST_INFO_PREFIXES
        .iter()
        .find(|e| e.prefix.len() + e.hash_len == data.len() && data.starts_with(e.prefix))
        .map(|e| (e.algorithm, &data[e.prefix.len()..]))
        .ok_or(CardError::InvalidData)
}

/// EMSA-PKCS1-v1_5 block: 00 01 FF.. 00 || data
pub fn pad_type01(data: &[u8], mod_len: usize, out: &mut [u8]) -> Result<usize> {
    if out.len() < mod_len {
        return Err(CardError::BufferTooSmall);
    }
    if data.len() + MIN_PADDING_SIZE > mod_len {
        return Err(CardError::InvalidArguments);
    }

    let ps_end = mod_len - data.len() - 1;
    out[0] = 0x00;
    out[1] = 0x01;
    out[2..ps_end].fill(0xFF);
    out[ps_end] = 0x00;
    out[ps_end + 1..mod_len].copy_from_slice(data);
    Ok(mod_len)
}

/// EME-PKCS1-v1_5 block: 00 02 random-nonzero.. 00 || data
pub fn pad_type02(data: &[u8], mod_len: usize, out: &mut [u8]) -> Result<usize> {
    if out.len() < mod_len {
        return Err(CardError::BufferTooSmall);
    }
    if data.len() + MIN_PADDING_SIZE > mod_len {
        return Err(CardError::InvalidArguments);
    }

    let ps_end = mod_len - data.len() - 1;
    out[0] = 0x00;
    out[1] = 0x02;
    OsRng.fill_bytes(&mut out[2..ps_end]);
    for b in out[2..ps_end].iter_mut() {
        while *b == 0 {
            *b = (OsRng.next_u32() & 0xFF) as u8;
        }
    }
    out[ps_end] = 0x00;
    out[ps_end + 1..mod_len].copy_from_slice(data);
    Ok(mod_len)
}

/// Remove type 02 padding from a deciphered block of a `key_len` byte key.
///
/// Runs in time independent of the padding contents. `data` may be shorter
/// than `key_len` when the card dropped leading zeros. Any failure is
/// reported as the same [`CardError::DecryptionFailed`]. `lock` pins the
/// working copy of the block in memory.
pub fn strip_type02_constant_time(data: &[u8], key_len: usize, out: &mut [u8], lock: bool) -> Result<usize> {
    let n = key_len;
    if n < MIN_PADDING_SIZE || data.len() > n || u32::try_from(n).is_err() {
        return Err(CardError::DecryptionFailed);
    }

    let mut em = SecureBuffer::with_lock(n, lock)?;
    em[n - data.len()..].copy_from_slice(data);

    let mut good = em[0].ct_eq(&0x00) & em[1].ct_eq(&0x02);

    let mut found_zero = Choice::from(0);
    let mut zero_index: u32 = 0;
    for (i, b) in em.iter().enumerate().skip(2) {
        let is_zero = b.ct_eq(&0x00);
        zero_index.conditional_assign(&(i as u32), !found_zero & is_zero);
        found_zero |= is_zero;
    }
    good &= found_zero;
    // at least 8 bytes of PS
    good &= zero_index.ct_gt(&((MIN_PADDING_SIZE - 2) as u32));

    let msg_index = zero_index.wrapping_add(1);
    let mlen = (n as u32).wrapping_sub(msg_index);

    // Move the message to em[11..] by shifting in power-of-two steps
    let shift = u32::conditional_select(
        &0,
        &msg_index.wrapping_sub(MIN_PADDING_SIZE as u32),
        good,
    );
    let max_mlen = n - MIN_PADDING_SIZE;
    let mut step = 1usize;
    let mut bit = 0u32;
    while step < max_mlen {
        let take = Choice::from(((shift >> bit) & 1) as u8);
        for i in MIN_PADDING_SIZE..n - step {
            let current = em[i];
            let next = em[i + step];
            em[i] = u8::conditional_select(&current, &next, take);
        }
        step <<= 1;
        bit += 1;
    }

    good &= !mlen.ct_gt(&(out.len() as u32));

    let copy_len = max_mlen.min(out.len());
    for i in 0..copy_len {
        out[i] = u8::conditional_select(&0, &em[MIN_PADDING_SIZE + i], good);
    }

    if bool::from(good) {
        Ok(mlen as usize)
    } else {
        Err(CardError::DecryptionFailed)
    }
}

/// Apply the software part of a negotiated encoding to `input`, writing
/// the block to be sent to the card into `out`.
pub fn encode(
    flags: AlgorithmFlags,
    input: &[u8],
    out: &mut [u8],
    mod_bits: usize,
    mechanism: Option<&MechanismParams>,
    lock: bool,
) -> Result<usize> {
    let mod_len = mod_bits.div_ceil(8);
    let pad = flags & AlgorithmFlags::RSA_PADS;

    if pad == AlgorithmFlags::RSA_PAD_PSS {
        return pss::encode(flags, input, out, mod_bits, mechanism, lock);
    }

    let hash = flags & AlgorithmFlags::RSA_HASHES;
    let data: Cow<'_, [u8]> = if hash.is_empty() {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(add_digest_info_prefix(hash, input)?)
    };

    if pad.is_empty() || pad == AlgorithmFlags::RSA_PAD_NONE {
        if out.len() < data.len() {
            return Err(CardError::BufferTooSmall);
        }
        out[..data.len()].copy_from_slice(&data);
        return Ok(data.len());
    }

    if pad == AlgorithmFlags::RSA_PAD_PKCS1_TYPE_01 {
        pad_type01(&data, mod_len, out)
    } else if pad == AlgorithmFlags::RSA_PAD_PKCS1_TYPE_02 {
        pad_type02(&data, mod_len, out)
    } else {
        Err(CardError::NotSupported)
    }
}
