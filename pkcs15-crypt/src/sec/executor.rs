//! Locked command execution
//!
//! Resolves where a key lives, then selects it, applies the security
//! environment and runs the command while holding the device lock. A
//! command refused for lost authentication is retried once after the
//! cached PIN was re-presented.

use log::debug;

use super::SecurityEnv;
use crate::card::{CardCommand, CardDevice};
use crate::error::{CardError, Result};
use crate::object::{KeyObject, Path};
use crate::token::Token;

/// Where a key is found on the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLocation {
    /// Path selected before the command, None when implicitly addressed
    pub select: Option<Path>,
    /// File reference committed into the environment
    pub file_ref: Option<Path>,
}

/// Resolve a key path against the application directory.
pub fn resolve_key_path(path: &Path, app_df: Option<&Path>) -> Result<KeyLocation> {
    if path.value.is_empty() && !path.aid.is_empty() {
        // implicitly bound to the application context
        return Ok(KeyLocation {
            select: None,
            file_ref: None,
        });
    }

    match (path.len(), app_df) {
        (2, Some(app)) => Ok(KeyLocation {
            select: Some(app.concat(path)),
            file_ref: Some(Path::new(&path.value)),
        }),
        (len, _) if len > 2 => Ok(KeyLocation {
            select: Some(path.clone()),
            file_ref: path.file_id(),
        }),
        _ => Err(CardError::InvalidArguments),
    }
}

/// Resolve the path of a wrap or unwrap target into its target file reference.
pub fn resolve_target_file(path: &Path, app_df: Option<&Path>) -> Result<Path> {
    if path.value.is_empty() && !path.aid.is_empty() {
        return Ok(path.clone());
    }

    match (path.len(), app_df) {
        (2, Some(app)) => Ok(app.concat(path)),
        (len, _) if len > 2 => path.file_id().ok_or(CardError::InvalidArguments),
        _ => Err(CardError::InvalidArguments),
    }
}

/// Progress of a locked execution
enum RetryState {
    FirstAttempt,
    Retrying,
    Done(Result<usize>),
}

/// Whether an attempt selects the key and applies the environment first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvSetup {
    Apply,
    /// The environment is already active on the card
    Skip,
}

impl Token {
    /// Run `command` with `key` under the device lock, applying `env` first.
    pub fn use_key(
        &self,
        key: &KeyObject,
        env: &mut SecurityEnv,
        command: CardCommand,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<usize> {
        self.run_locked(key, env, command, input, out, EnvSetup::Apply)
    }

    pub(crate) fn run_locked(
        &self,
        key: &KeyObject,
        env: &mut SecurityEnv,
        command: CardCommand,
        input: &[u8],
        out: &mut [u8],
        setup: EnvSetup,
    ) -> Result<usize> {
        let location = resolve_key_path(&key.path, self.app_df.as_ref())?;
        if location.file_ref.is_some() {
            env.file_ref = location.file_ref.clone();
        }

        let mut device = self.card.lock();
        let mut state = RetryState::FirstAttempt;
        loop {
            state = match state {
                RetryState::FirstAttempt => {
                    match attempt(&mut **device, &location, env, command, input, out, setup) {
                        Err(CardError::AuthenticationNotSatisfied) => {
                            debug!("Security status not satisfied, revalidating cached PIN");
                            match self.revalidator.revalidate(&mut **device, key) {
                                Ok(()) => RetryState::Retrying,
                                Err(e) => RetryState::Done(Err(e)),
                            }
                        }
                        result => RetryState::Done(result),
                    }
                }
                RetryState::Retrying => {
                    RetryState::Done(attempt(&mut **device, &location, env, command, input, out, setup))
                }
                RetryState::Done(result) => return result,
            };
        }
    }
}

fn attempt(
    device: &mut dyn CardDevice,
    location: &KeyLocation,
    env: &SecurityEnv,
    command: CardCommand,
    input: &[u8],
    out: &mut [u8],
    setup: EnvSetup,
) -> Result<usize> {
    if setup == EnvSetup::Apply {
        if let Some(path) = &location.select {
            device.select_file(path)?;
        }
        device.set_security_env(env)?;
    }

    let n = device.run_command(command, input, out)?;
    // wrap reports the cryptogram length even when it does not fit
    if command != CardCommand::Wrap && n > out.len() {
        return Err(CardError::Internal);
    }
    Ok(n)
}
