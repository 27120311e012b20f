//! Secure working buffers
//!
//! Buffers for padded plaintext, digests and derived secrets. Memory is
//! zeroed on allocation, pinned in RAM where the platform allows, and wiped
//! when the guard drops on any exit path.

use std::ops::{Deref, DerefMut};

use log::debug;
use zeroize::Zeroize;

use crate::error::{CardError, Result};

/// Zeroed, optionally mlocked byte buffer that wipes itself on drop
pub struct SecureBuffer {
    data: Vec<u8>,
    locked: bool,
}

impl SecureBuffer {
    /// Allocate `len` zero bytes, pinned in memory
    pub fn new(len: usize) -> Result<Self> {
        Self::with_lock(len, true)
    }

    /// Allocate `len` zero bytes, pinning them only when `lock` is set
    pub fn with_lock(len: usize, lock: bool) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| CardError::OutOfMemory)?;
        data.resize(len, 0);

        let locked = lock && len > 0 && lock_memory(&data);
        if lock && len > 0 && !locked {
            debug!("Could not lock {} byte secure buffer in memory", len);
        }
        Ok(Self { data, locked })
    }

    /// Allocate a buffer holding a copy of `bytes`
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut buf = Self::new(bytes.len())?;
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Deref for SecureBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for SecureBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.data.as_mut_slice().zeroize();
        if self.locked {
            unlock_memory(&self.data);
        }
    }
}

#[cfg(unix)]
fn lock_memory(buf: &[u8]) -> bool {
    // SAFETY: the range is a live allocation owned by the caller
    unsafe { libc::mlock(buf.as_ptr() as *const libc::c_void, buf.len()) == 0 }
}

#[cfg(unix)]
fn unlock_memory(buf: &[u8]) {
    // SAFETY: same range that was passed to mlock
    unsafe {
        libc::munlock(buf.as_ptr() as *const libc::c_void, buf.len());
    }
}

#[cfg(not(unix))]
fn lock_memory(_buf: &[u8]) -> bool {
    false
}

#[cfg(not(unix))]
fn unlock_memory(_buf: &[u8]) {}
