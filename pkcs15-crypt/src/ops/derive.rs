//! Key agreement

use log::debug;

use super::{negotiate, require_usage};
use crate::card::{AlgorithmFlags, CardCommand};
use crate::error::{CardError, Result};
use crate::object::{KeyAlgorithm, KeyObject, KeyUsage};
use crate::sec::SecOperation;
use crate::token::Token;

/// Result of a derive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveOutcome {
    /// Bytes written to the output buffer
    pub written: usize,
    /// Output length the caller needs to supply, or the length produced
    pub required: usize,
}

impl Token {
    /// Derive a shared secret from `key` and the peer public point `input`.
    ///
    /// Without an output buffer, or with one shorter than the field length,
    /// nothing runs on the card and the outcome only reports the length
    /// required. A card that keeps the derived key reports zero bytes.
    pub fn derive(
        &self,
        key: &KeyObject,
        flags: AlgorithmFlags,
        input: &[u8],
        out: Option<&mut [u8]>,
    ) -> Result<DeriveOutcome> {
        require_usage(key, KeyUsage::DERIVE)?;

        let field_len = match key.algorithm {
            KeyAlgorithm::Ec { field_bits } | KeyAlgorithm::XEdDsa { field_bits } => field_bits.div_ceil(8),
            _ => return Err(CardError::NotSupported),
        };
        let out = match out {
            Some(out) if out.len() >= field_len => out,
            _ => {
                debug!("Derive size query, {} bytes required", field_len);
                return Ok(DeriveOutcome {
                    written: 0,
                    required: field_len,
                });
            }
        };

        let (mut env, info) = self.build_security_env(key, SecOperation::Derive)?;
        negotiate(&mut env, info, flags)?;

        let r = self.use_key(key, &mut env, CardCommand::Decipher, input, out)?;
        Ok(DeriveOutcome {
            written: r,
            required: r,
        })
    }
}
