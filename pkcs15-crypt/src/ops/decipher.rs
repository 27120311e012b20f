//! Asymmetric decipher

use super::{negotiate, require_usage};
use crate::card::{Algorithm, AlgorithmFlags, CardCommand};
use crate::crypto::{oaep, pkcs1, MechanismParams, OaepParams};
use crate::error::{CardError, Result};
use crate::object::{KeyObject, KeyUsage};
use crate::sec::SecOperation;
use crate::token::Token;

impl Token {
    /// Decipher `input` with the private `key` into `out`.
    ///
    /// Padding the card leaves in place is removed here. Padding failures
    /// all surface as [`CardError::DecryptionFailed`] and are not logged.
    pub fn decipher(
        &self,
        key: &KeyObject,
        flags: AlgorithmFlags,
        input: &[u8],
        out: &mut [u8],
        mechanism: Option<&MechanismParams>,
    ) -> Result<usize> {
        require_usage(key, KeyUsage::ANY_DECIPHER)?;
        if key.is_secret() {
            return Err(CardError::NotSupported);
        }

        let (mut env, info) = self.build_security_env(key, SecOperation::Decipher)?;
        let key_len = info.key_length.div_ceil(8);
        let encoding = negotiate(&mut env, info, flags)?;

        if encoding
            .pad
            .intersects(AlgorithmFlags::RSA_PAD_PKCS1_TYPE_02 | AlgorithmFlags::RSA_PAD_OAEP)
        {
            // the padded block never reaches the caller's buffer
            let mut block = self.secure_buffer(out.len().max(key_len))?;
            let r = self.use_key(key, &mut env, CardCommand::Decipher, input, &mut block)?;
            let lock = self.config.lock_secure_memory;
            let result = if encoding.pad.contains(AlgorithmFlags::RSA_PAD_PKCS1_TYPE_02) {
                pkcs1::strip_type02_constant_time(&block[..r], key_len, out, lock)
            } else {
                let label = mechanism
                    .and_then(MechanismParams::oaep)
                    .map(OaepParams::label)
                    .unwrap_or_default();
                oaep::strip_oaep_padding(&block[..r], key_len, flags, label, out, lock)
            };
            if result.is_err() {
                out.fill(0);
            }
            return result;
        }

        let r = self.use_key(key, &mut env, CardCommand::Decipher, input, out)?;

        // a raw result is an integer the card may have shortened
        if env.algorithm == Algorithm::Rsa
            && encoding.card & AlgorithmFlags::RSA_PADS == AlgorithmFlags::RSA_RAW
            && r < key_len
            && out.len() >= key_len
        {
            out.copy_within(0..r, key_len - r);
            out[..key_len - r].fill(0);
            return Ok(key_len);
        }
        Ok(r)
    }
}
