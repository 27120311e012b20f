//! Cached PIN revalidation
//!
//! Cards drop their security status after resets, timeouts or single-use
//! PIN policies. When a command fails for that reason the executor asks a
//! [`PinRevalidator`] to re-present the PIN without involving the caller.

use std::collections::HashMap;

use log::debug;
use parking_lot::Mutex;
use zeroize::Zeroizing;

use crate::card::CardDevice;
use crate::config::CryptoConfig;
use crate::error::{CardError, Result};
use crate::object::{AuthId, KeyObject};

/// Re-establishes the authentication a key needs
pub trait PinRevalidator: Send + Sync {
    /// Called with the device already locked by the running operation
    fn revalidate(&self, device: &mut dyn CardDevice, key: &KeyObject) -> Result<()>;
}

/// Never revalidates; authentication failures surface to the caller
pub struct NoPinCache;

impl PinRevalidator for NoPinCache {
    fn revalidate(&self, _device: &mut dyn CardDevice, _key: &KeyObject) -> Result<()> {
        Err(CardError::AuthenticationNotSatisfied)
    }
}

struct CachedPin {
    reference: u8,
    value: Zeroizing<Vec<u8>>,
    uses: u32,
}

/// PINs remembered per authentication object
pub struct PinCache {
    enabled: bool,
    max_uses: u32,
    ignore_user_consent: bool,
    entries: Mutex<HashMap<AuthId, CachedPin>>,
}

impl PinCache {
    pub fn new(config: &CryptoConfig) -> Self {
        Self {
            enabled: config.use_pin_caching,
            max_uses: config.pin_cache_counter,
            ignore_user_consent: config.pin_cache_ignore_user_consent,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Remember `pin` for the authentication object `auth_id`, whose card
    /// reference is `reference`. Resets the use counter.
    pub fn add(&self, auth_id: &[u8], reference: u8, pin: &[u8]) {
        if !self.enabled {
            return;
        }
        self.entries.lock().insert(
            AuthId(auth_id.to_vec()),
            CachedPin {
                reference,
                value: Zeroizing::new(pin.to_vec()),
                uses: 0,
            },
        );
    }

    pub fn remove(&self, auth_id: &[u8]) {
        self.entries.lock().remove(&AuthId(auth_id.to_vec()));
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn contains(&self, auth_id: &[u8]) -> bool {
        self.entries.lock().contains_key(&AuthId(auth_id.to_vec()))
    }
}

impl PinRevalidator for PinCache {
    fn revalidate(&self, device: &mut dyn CardDevice, key: &KeyObject) -> Result<()> {
        if !self.enabled {
            return Err(CardError::AuthenticationNotSatisfied);
        }
        if key.user_consent && !self.ignore_user_consent {
            debug!("Key requires user consent, not using cached PIN");
            return Err(CardError::AuthenticationNotSatisfied);
        }
        let auth_id = key.auth_id.as_ref().ok_or(CardError::AuthenticationNotSatisfied)?;

        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(auth_id)
            .ok_or(CardError::AuthenticationNotSatisfied)?;
        if entry.uses >= self.max_uses {
            debug!("Cached PIN use counter exhausted");
            return Err(CardError::AuthenticationNotSatisfied);
        }

        match device.verify_pin(entry.reference, &entry.value) {
            Ok(()) => {
                entry.uses += 1;
                debug!("Revalidated cached PIN ({} uses)", entry.uses);
                Ok(())
            }
            Err(e) => {
                if e == CardError::PinIncorrect {
                    entries.remove(auth_id);
                }
                Err(e)
            }
        }
    }
}
