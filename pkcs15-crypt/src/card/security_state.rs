//! Security state for the software card
//!
//! Tracks which PIN references have been verified since the last reset.

use std::collections::HashSet;

/// How long a verified PIN stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPolicy {
    /// Until the card is reset
    Session,
    /// For a single private-key command
    Once,
}

/// Verified PIN references of the current session
#[derive(Debug, Default)]
pub struct SecurityState {
    verified: HashSet<u8>,
}

impl SecurityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `reference` as verified
    pub fn set_verified(&mut self, reference: u8) {
        self.verified.insert(reference);
    }

    pub fn is_verified(&self, reference: u8) -> bool {
        self.verified.contains(&reference)
    }

    pub fn clear(&mut self, reference: u8) {
        self.verified.remove(&reference);
    }

    /// Clear all security conditions (on card reset or power cycle)
    pub fn clear_all(&mut self) {
        self.verified.clear();
    }

    /// Called after a key protected by `reference` was used
    pub fn after_use(&mut self, reference: u8, policy: PinPolicy) {
        if policy == PinPolicy::Once {
            self.clear(reference);
        }
    }
}
