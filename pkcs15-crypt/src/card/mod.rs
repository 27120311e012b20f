//! Card access
//!
//! A [`Card`] owns one device behind an exclusive lock, plus the algorithm
//! capabilities that device registered when it was attached.

pub mod algorithms;
pub mod encoding;
pub mod security_state;
pub mod soft;

#[cfg(test)]
pub(crate) mod mock;

pub use algorithms::{find_algorithm, Algorithm, AlgorithmFlags, AlgorithmInfo};
pub use encoding::{get_encoding_flags, EncodingFlags};
pub use soft::SoftCard;

use log::debug;
use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::object::Path;
use crate::sec::SecurityEnv;

/// Card commands that consume an applied security environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardCommand {
    ComputeSignature,
    Decipher,
    Wrap,
    Unwrap,
    EncryptSym,
    DecryptSym,
}

/// Primitives a card driver provides
pub trait CardDevice: Send {
    /// Capability records, read once when the device is attached
    fn algorithms(&self) -> Vec<AlgorithmInfo>;

    fn select_file(&mut self, path: &Path) -> Result<()>;

    fn set_security_env(&mut self, env: &SecurityEnv) -> Result<()>;

    /// Run `command` on `input`, writing into `out`. Returns the number of
    /// bytes produced. An empty `out` asks for the length only where the
    /// command supports it.
    fn run_command(&mut self, command: CardCommand, input: &[u8], out: &mut [u8]) -> Result<usize>;

    fn verify_pin(&mut self, reference: u8, pin: &[u8]) -> Result<()>;
}

/// A device and its capabilities
pub struct Card {
    name: String,
    algorithms: Vec<AlgorithmInfo>,
    device: Mutex<Box<dyn CardDevice>>,
}

impl Card {
    pub fn new<D: CardDevice + 'static>(name: &str, device: D) -> Self {
        let algorithms = device.algorithms();
        debug!("Attached card {} with {} algorithm entries", name, algorithms.len());
        Self {
            name: name.to_string(),
            algorithms,
            device: Mutex::new(Box::new(device)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algorithms(&self) -> &[AlgorithmInfo] {
        &self.algorithms
    }

    /// Look up the capability record for an algorithm and key size
    pub fn find_algorithm(
        &self,
        algorithm: Algorithm,
        key_length: usize,
        curve_oid: Option<&[u8]>,
    ) -> Option<&AlgorithmInfo> {
        find_algorithm(&self.algorithms, algorithm, key_length, curve_oid)
    }

    /// Take exclusive access to the device; released when the guard drops
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn CardDevice>> {
        self.device.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockDevice;
    use super::*;

    #[test]
    fn test_card_reads_capabilities_once() {
        let device = MockDevice::new(vec![AlgorithmInfo::new(
            Algorithm::Rsa,
            2048,
            AlgorithmFlags::RSA_RAW,
        )]);
        let card = Card::new("mock", device);
        assert_eq!(card.name(), "mock");
        assert_eq!(card.algorithms().len(), 1);
        assert!(card.find_algorithm(Algorithm::Rsa, 2048, None).is_some());
        assert!(card.find_algorithm(Algorithm::Rsa, 1024, None).is_none());
    }
}
