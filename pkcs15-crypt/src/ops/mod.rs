//! Public entry points
//!
//! Sign, decipher, derive, wrap, unwrap and the symmetric encrypt/decrypt
//! pair, all methods on [`Token`]. Each checks key usage first, builds a
//! fresh security environment, negotiates the encoding split with the
//! card, and hands the card command to the locked executor.

pub mod decipher;
pub mod derive;
pub mod sign;
pub mod symmetric;
pub mod wrap;

pub use derive::DeriveOutcome;

use crate::card::{AlgorithmFlags, AlgorithmInfo, EncodingFlags};
use crate::crypto::SecureBuffer;
use crate::error::{CardError, Result};
use crate::object::{KeyObject, KeyUsage};
use crate::sec::{SecEnvParam, SecurityEnv};
use crate::token::Token;

/// Fail with NotAllowed unless `key` carries one of `usage`
pub(crate) fn require_usage(key: &KeyObject, usage: KeyUsage) -> Result<()> {
    if key.usage.intersects(usage) {
        Ok(())
    } else {
        Err(CardError::NotAllowed)
    }
}

/// Negotiate `requested` against `info` and record the card side in `env`
pub(crate) fn negotiate(
    env: &mut SecurityEnv,
    info: &AlgorithmInfo,
    requested: AlgorithmFlags,
) -> Result<EncodingFlags> {
    let encoding = crate::card::get_encoding_flags(requested, info.flags)?;
    env.algorithm_flags = encoding.card;
    Ok(encoding)
}

/// Attach `iv` when the card runs a chained AES mode
pub(crate) fn attach_iv(env: &mut SecurityEnv, iv: &[u8]) -> Result<()> {
    if env
        .algorithm_flags
        .intersects(AlgorithmFlags::AES_CBC | AlgorithmFlags::AES_CBC_PAD)
    {
        env.params.push(SecEnvParam::Iv(iv.to_vec()))?;
    }
    Ok(())
}

impl Token {
    /// Working buffer honouring the memory locking setting
    pub(crate) fn secure_buffer(&self, len: usize) -> Result<SecureBuffer> {
        SecureBuffer::with_lock(len, self.config.lock_secure_memory)
    }

    pub(crate) fn secure_copy(&self, bytes: &[u8]) -> Result<SecureBuffer> {
        let mut buf = self.secure_buffer(bytes.len())?;
        buf.copy_from_slice(bytes);
        Ok(buf)
    }
}
