//! Symmetric encrypt and decrypt
//!
//! Multi-part: the call without an output buffer selects the key and
//! applies the environment, later calls with a buffer only run the command
//! against the environment already active on the card.

use log::debug;

use super::{attach_iv, negotiate, require_usage};
use crate::card::{AlgorithmFlags, CardCommand};
use crate::error::{CardError, Result};
use crate::object::{KeyObject, KeyUsage};
use crate::sec::executor::EnvSetup;
use crate::sec::{SecOperation, SecurityEnv};
use crate::token::Token;

/// Take the card algorithm reference from the token's supported-algorithm
/// entry whose mechanism is the negotiated mode
fn apply_algorithm_reference(env: &mut SecurityEnv) {
    let mode = env.algorithm_flags;
    if let Some(entry) = env
        .supported_algos
        .iter()
        .find(|a| a.mechanism.card_mode() == Some(mode))
    {
        debug!("Using algorithm reference {:#x} for {:?}", entry.algo_ref, entry.mechanism);
        env.algorithm_ref = Some(entry.algo_ref);
    }
}

impl Token {
    /// Encrypt `input` with the secret `key`. `param` carries the IV for
    /// chained modes.
    pub fn encrypt_sym(
        &self,
        key: &KeyObject,
        flags: AlgorithmFlags,
        input: &[u8],
        out: Option<&mut [u8]>,
        param: &[u8],
    ) -> Result<usize> {
        self.run_sym(key, SecOperation::EncryptSym, flags, input, out, param)
    }

    /// Decrypt `input` with the secret `key`. `param` carries the IV for
    /// chained modes.
    pub fn decrypt_sym(
        &self,
        key: &KeyObject,
        flags: AlgorithmFlags,
        input: &[u8],
        out: Option<&mut [u8]>,
        param: &[u8],
    ) -> Result<usize> {
        self.run_sym(key, SecOperation::DecryptSym, flags, input, out, param)
    }

    fn run_sym(
        &self,
        key: &KeyObject,
        operation: SecOperation,
        flags: AlgorithmFlags,
        input: &[u8],
        out: Option<&mut [u8]>,
        param: &[u8],
    ) -> Result<usize> {
        let (usage, command) = match operation {
            SecOperation::EncryptSym => (KeyUsage::ENCRYPT, CardCommand::EncryptSym),
            _ => (KeyUsage::DECRYPT, CardCommand::DecryptSym),
        };
        require_usage(key, usage)?;
        if !key.is_secret() {
            return Err(CardError::NotSupported);
        }

        let (mut env, info) = self.build_security_env(key, operation)?;
        negotiate(&mut env, info, flags)?;
        apply_algorithm_reference(&mut env);
        attach_iv(&mut env, param)?;

        let setup = if out.is_none() {
            EnvSetup::Apply
        } else {
            EnvSetup::Skip
        };
        let out = out.unwrap_or_default();
        self.run_locked(key, &mut env, command, input, out, setup)
    }
}
