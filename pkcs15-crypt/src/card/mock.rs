//! Scripted card device for tests
//!
//! Records every primitive call together with the calling thread and
//! answers commands from a queue of prepared results.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use super::{AlgorithmInfo, Card, CardCommand, CardDevice};
use crate::config::CryptoConfig;
use crate::error::{CardError, Result};
use crate::object::Path;
use crate::pin_cache::NoPinCache;
use crate::sec::SecurityEnv;
use crate::token::Token;

/// One observed device interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Select(Path),
    SetEnv(SecurityEnv),
    Command(CardCommand, Vec<u8>),
    VerifyPin(u8, Vec<u8>),
}

/// Shared view of the calls a [`MockDevice`] received
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<(ThreadId, DeviceCall)>>>);

impl CallLog {
    fn record(&self, call: DeviceCall) {
        self.0.lock().push((thread::current().id(), call));
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.0.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn threaded_calls(&self) -> Vec<(ThreadId, DeviceCall)> {
        self.0.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Inputs of every command run, in order
    pub fn commands(&self) -> Vec<(CardCommand, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::Command(cmd, input) => Some((cmd, input)),
                _ => None,
            })
            .collect()
    }

    /// Every environment applied, in order
    pub fn envs(&self) -> Vec<SecurityEnv> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::SetEnv(env) => Some(env),
                _ => None,
            })
            .collect()
    }

    pub fn selects(&self) -> Vec<Path> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::Select(path) => Some(path),
                _ => None,
            })
            .collect()
    }
}

/// Device whose command results are prepared by the test
pub struct MockDevice {
    algorithms: Vec<AlgorithmInfo>,
    log: CallLog,
    responses: Arc<Mutex<VecDeque<Result<Vec<u8>>>>>,
    pin: Option<(u8, Vec<u8>)>,
    command_delay: Option<Duration>,
}

impl MockDevice {
    pub fn new(algorithms: Vec<AlgorithmInfo>) -> Self {
        Self {
            algorithms,
            log: CallLog::default(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            pin: None,
            command_delay: None,
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Queue the result of the next command
    pub fn respond(self, result: Result<Vec<u8>>) -> Self {
        self.responses.lock().push_back(result);
        self
    }

    /// Handle to queue results after the device was moved into a card
    pub fn responses(&self) -> Arc<Mutex<VecDeque<Result<Vec<u8>>>>> {
        self.responses.clone()
    }

    /// Accept `pin` for `reference` in verify_pin
    pub fn with_pin(mut self, reference: u8, pin: &[u8]) -> Self {
        self.pin = Some((reference, pin.to_vec()));
        self
    }

    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = Some(delay);
        self
    }
}

impl CardDevice for MockDevice {
    fn algorithms(&self) -> Vec<AlgorithmInfo> {
        self.algorithms.clone()
    }

    fn select_file(&mut self, path: &Path) -> Result<()> {
        self.log.record(DeviceCall::Select(path.clone()));
        Ok(())
    }

    fn set_security_env(&mut self, env: &SecurityEnv) -> Result<()> {
        self.log.record(DeviceCall::SetEnv(env.clone()));
        Ok(())
    }

    fn run_command(&mut self, command: CardCommand, input: &[u8], out: &mut [u8]) -> Result<usize> {
        self.log.record(DeviceCall::Command(command, input.to_vec()));
        if let Some(delay) = self.command_delay {
            thread::sleep(delay);
        }
        let response = self.responses.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))?;
        let n = response.len().min(out.len());
        out[..n].copy_from_slice(&response[..n]);
        Ok(response.len())
    }

    fn verify_pin(&mut self, reference: u8, pin: &[u8]) -> Result<()> {
        self.log.record(DeviceCall::VerifyPin(reference, pin.to_vec()));
        match &self.pin {
            Some((r, p)) if *r == reference && p.as_slice() == pin => Ok(()),
            _ => Err(CardError::PinIncorrect),
        }
    }
}

/// Token over a mock device, with cached-PIN revalidation disabled
pub fn mock_token(device: MockDevice) -> (Token, CallLog) {
    let log = device.log();
    let token = Token::new(Card::new("mock", device), CryptoConfig::default())
        .with_revalidator(Arc::new(NoPinCache));
    (token, log)
}
