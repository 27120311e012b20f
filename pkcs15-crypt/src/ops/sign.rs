//! Signature computation

use log::debug;

use super::{negotiate, require_usage};
use crate::card::{Algorithm, AlgorithmFlags, CardCommand};
use crate::crypto::{pkcs1, MechanismParams};
use crate::error::{CardError, Result};
use crate::object::{KeyAlgorithm, KeyObject, KeyUsage};
use crate::sec::SecOperation;
use crate::token::Token;

/// Usage that makes a dual-purpose key a signing key when the card needs
/// signing emulated through decipher
const EMULATED_SIGN_USAGE: KeyUsage = KeyUsage::SIGN.union(KeyUsage::NONREPUDIATION);

/// Length of a signature made with `algorithm`
pub fn signature_length(algorithm: &KeyAlgorithm) -> Result<usize> {
    match *algorithm {
        KeyAlgorithm::Rsa { modulus_bits } => Ok(modulus_bits.div_ceil(8)),
        KeyAlgorithm::GostR3410 { modulus_bits } => Ok(modulus_bits.div_ceil(8) * 2),
        KeyAlgorithm::Ec { field_bits }
        | KeyAlgorithm::EdDsa { field_bits }
        | KeyAlgorithm::XEdDsa { field_bits } => Ok(field_bits.div_ceil(8) * 2),
        KeyAlgorithm::Secret { .. } => Err(CardError::NotSupported),
    }
}

impl Token {
    /// Sign `input` with `key`, writing the signature into `out`.
    ///
    /// `flags` names the padding and hash the caller wants applied. Whatever
    /// the card cannot do itself is done here before the data is sent.
    /// Returns the signature length.
    pub fn compute_signature(
        &self,
        key: &KeyObject,
        flags: AlgorithmFlags,
        input: &[u8],
        out: &mut [u8],
        mechanism: Option<&MechanismParams>,
    ) -> Result<usize> {
        require_usage(key, KeyUsage::ANY_SIGN)?;

        let (mut env, info) = self.build_security_env(key, SecOperation::Sign)?;
        let modlen = signature_length(&key.algorithm)?;
        if out.len() < modlen {
            return Err(CardError::BufferTooSmall);
        }

        let mut buf = self.secure_buffer(input.len() + modlen)?;
        let mut inlen = input.len();
        buf[..inlen].copy_from_slice(input);
        if matches!(key.algorithm, KeyAlgorithm::GostR3410 { .. }) {
            // GOST cards take the hash little-endian
            buf[..inlen].reverse();
        }

        let mut flags = flags;
        debug!(
            "Signing with card flags {:?}, key usage {:?}",
            info.flags, key.usage
        );

        if let KeyAlgorithm::Rsa { modulus_bits } = key.algorithm {
            if info.flags.contains(AlgorithmFlags::NEED_USAGE)
                && key.usage.intersects(EMULATED_SIGN_USAGE)
                && key.usage.intersects(KeyUsage::ANY_DECIPHER)
            {
                if flags.contains(AlgorithmFlags::RSA_RAW) {
                    return self.decipher(key, flags, input, out, None);
                }
                pkcs1::encode(flags, input, &mut buf, modulus_bits, mechanism, self.config.lock_secure_memory)?;
                // already padded, the card only exponentiates
                let raw = flags.difference(AlgorithmFlags::RSA_PADS) | AlgorithmFlags::RSA_RAW;
                return self.decipher(key, raw, &buf[..modlen], out, None);
            }

            if flags == AlgorithmFlags::RSA_PAD_PKCS1_TYPE_01 | AlgorithmFlags::RSA_HASH_NONE
                && !info.flags.contains(AlgorithmFlags::RSA_RAW)
                && !info.flags.contains(AlgorithmFlags::RSA_HASH_NONE)
                && info.flags.contains(AlgorithmFlags::RSA_PAD_PKCS1_TYPE_01)
            {
                // the card hashes-and-pads itself, hand it the bare hash
                let (algorithm, hash_len) = match pkcs1::strip_digest_info_prefix(&buf[..inlen]) {
                    Ok((algorithm, raw)) if algorithm != AlgorithmFlags::RSA_HASH_NONE => {
                        (algorithm, raw.len())
                    }
                    _ => return Err(CardError::InvalidData),
                };
                buf.copy_within(inlen - hash_len..inlen, 0);
                inlen = hash_len;
                flags = flags.difference(AlgorithmFlags::RSA_HASH_NONE) | algorithm;
            }
        }

        if matches!(key.algorithm, KeyAlgorithm::Ec { .. })
            && info.flags.contains(AlgorithmFlags::ECDSA_RAW)
            && !flags.intersects(AlgorithmFlags::ECDSA_HASHES & info.flags)
        {
            debug!("Card cannot hash for ECDSA, signing raw");
            flags = flags.difference(AlgorithmFlags::ECDSA_HASHES) | AlgorithmFlags::ECDSA_RAW;
        }

        let encoding = negotiate(&mut env, info, flags)?;

        if !encoding.pad.is_empty() {
            let data = self.secure_copy(&buf[..inlen])?;
            inlen = pkcs1::encode(
                encoding.pad,
                &data,
                &mut buf,
                env.key_size_bits,
                mechanism,
                self.config.lock_secure_memory,
            )?;
        } else if env.algorithm == Algorithm::Rsa
            && flags & AlgorithmFlags::RSA_PADS == AlgorithmFlags::RSA_PAD_NONE
        {
            if inlen > modlen {
                return Err(CardError::InvalidData);
            }
            if inlen < modlen {
                buf.copy_within(0..inlen, modlen - inlen);
                buf[..modlen - inlen].fill(0);
            }
            inlen = modlen;
        } else if env.algorithm == Algorithm::Ec
            && !env.algorithm_flags.intersects(AlgorithmFlags::ECDSA_HASHES)
        {
            // only the leftmost field-length bytes of the hash are signed
            inlen = inlen.min(env.key_size_bits.div_ceil(8));
        }

        let mut r = self.use_key(key, &mut env, CardCommand::ComputeSignature, &buf[..inlen], out)?;

        // cards may return the signature as an integer without leading zeros
        if key.algorithm.is_rsa() && r < modlen {
            out.copy_within(0..r, modlen - r);
            out[..modlen - r].fill(0);
            r = modlen;
        }
        Ok(r)
    }
}
