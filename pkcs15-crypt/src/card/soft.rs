//! Software reference card
//!
//! A [`CardDevice`] that keeps its keys in memory and performs the raw
//! private-key primitives a real card would: RSA exponentiation, ECDSA over
//! a prehashed value, ECDH, Ed25519 signing and X25519 agreement. Padding
//! and hashing stay with the caller, the same split a raw-only card forces.

use std::collections::HashMap;

use ed25519_dalek::{Signer, SigningKey};
use log::{debug, warn};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use rand::rngs::OsRng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use subtle::ConstantTimeEq;
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use super::security_state::{PinPolicy, SecurityState};
use super::{Algorithm, AlgorithmFlags, AlgorithmInfo, CardCommand, CardDevice};
use crate::crypto::{HashAlgorithm, HashOperations};
use crate::error::{CardError, Result};
use crate::object::Path;
use crate::sec::{SecOperation, SecurityEnv};

/// DER body of the prime256v1 OID
pub const PRIME256V1_OID: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07];

const PIN_MAX_RETRIES: u8 = 3;

/// Private key material held by the software card
pub enum SoftKey {
    Rsa(RsaPrivateKey),
    EcP256(p256::SecretKey),
    Ed25519(SigningKey),
    X25519(StaticSecret),
}

impl SoftKey {
    /// Generate an RSA key of `bits` bits
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let key = RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| {
            warn!("RSA key generation failed: {}", e);
            CardError::CardCommandFailed
        })?;
        Ok(SoftKey::Rsa(key))
    }

    pub fn generate_p256() -> Self {
        SoftKey::EcP256(p256::SecretKey::random(&mut OsRng))
    }

    pub fn generate_ed25519() -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::RngCore::fill_bytes(&mut OsRng, &mut *seed);
        SoftKey::Ed25519(SigningKey::from_bytes(&seed))
    }

    pub fn generate_x25519() -> Self {
        SoftKey::X25519(StaticSecret::random_from_rng(OsRng))
    }

    /// The capability record a card holding this key registers
    pub fn algorithm_info(&self) -> AlgorithmInfo {
        match self {
            SoftKey::Rsa(key) => AlgorithmInfo::new(Algorithm::Rsa, key.size() * 8, AlgorithmFlags::RSA_RAW),
            SoftKey::EcP256(_) => AlgorithmInfo::new(
                Algorithm::Ec,
                256,
                AlgorithmFlags::ECDSA_RAW | AlgorithmFlags::ECDH_CDH_RAW,
            )
            .with_curve(PRIME256V1_OID),
            SoftKey::Ed25519(_) => AlgorithmInfo::new(Algorithm::EdDsa, 255, AlgorithmFlags::EDDSA_RAW),
            SoftKey::X25519(_) => AlgorithmInfo::new(Algorithm::XEdDsa, 255, AlgorithmFlags::XEDDSA_RAW),
        }
    }
}

struct KeySlot {
    key: SoftKey,
    pin_ref: Option<u8>,
    policy: PinPolicy,
}

struct PinRecord {
    hash: Vec<u8>,
    retries: u8,
}

/// In-memory card executing raw private-key operations
pub struct SoftCard {
    keys: HashMap<Vec<u8>, KeySlot>,
    pins: HashMap<u8, PinRecord>,
    state: SecurityState,
    selected: Option<Path>,
    env: Option<SecurityEnv>,
}

impl SoftCard {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            pins: HashMap::new(),
            state: SecurityState::new(),
            selected: None,
            env: None,
        }
    }

    /// Install a PIN under `reference`
    pub fn with_pin(mut self, reference: u8, pin: &[u8]) -> Self {
        self.pins.insert(
            reference,
            PinRecord {
                hash: HashOperations::hash(HashAlgorithm::SHA256, pin),
                retries: PIN_MAX_RETRIES,
            },
        );
        self
    }

    /// Store `key` in the file `fid`, protected by the PIN `pin_ref` if given
    pub fn with_key(mut self, fid: [u8; 2], key: SoftKey, pin_ref: Option<u8>, policy: PinPolicy) -> Self {
        self.keys.insert(fid.to_vec(), KeySlot { key, pin_ref, policy });
        self
    }

    /// Drop all verified PINs, as after a card reset
    pub fn reset_security(&mut self) {
        self.state.clear_all();
        self.env = None;
    }

    fn current_key_fid(&self, env: &SecurityEnv) -> Option<Vec<u8>> {
        env.file_ref
            .as_ref()
            .map(|p| p.value.clone())
            .or_else(|| self.selected.as_ref().and_then(Path::file_id).map(|p| p.value))
    }
}

impl Default for SoftCard {
    fn default() -> Self {
        Self::new()
    }
}

fn rsa_raw(key: &RsaPrivateKey, input: &[u8]) -> Result<Vec<u8>> {
    if input.len() > key.size() {
        return Err(CardError::InvalidData);
    }
    let m = BigUint::from_bytes_be(input);
    if &m >= key.n() {
        return Err(CardError::InvalidData);
    }
    // minimal big-endian encoding, leading zero bytes are not returned
    Ok(m.modpow(key.d(), key.n()).to_bytes_be())
}

fn ecdsa_prehash(key: &p256::SecretKey, digest: &[u8]) -> Result<Vec<u8>> {
    let signing_key = p256::ecdsa::SigningKey::from(key);
    let signature: p256::ecdsa::Signature = signing_key
        .sign_prehash(digest)
        .map_err(|_| CardError::InvalidData)?;
    Ok(signature.to_bytes().to_vec())
}

fn ecdh_p256(key: &p256::SecretKey, peer: &[u8]) -> Result<Vec<u8>> {
    let public = p256::PublicKey::from_sec1_bytes(peer).map_err(|_| CardError::InvalidData)?;
    let shared = p256::ecdh::diffie_hellman(key.to_nonzero_scalar(), public.as_affine());
    Ok(shared.raw_secret_bytes().to_vec())
}

fn x25519(key: &StaticSecret, peer: &[u8]) -> Result<Vec<u8>> {
    let peer: [u8; 32] = peer.try_into().map_err(|_| CardError::InvalidData)?;
    let shared = key.diffie_hellman(&x25519_dalek::PublicKey::from(peer));
    Ok(shared.as_bytes().to_vec())
}

impl CardDevice for SoftCard {
    fn algorithms(&self) -> Vec<AlgorithmInfo> {
        let mut algorithms: Vec<AlgorithmInfo> = Vec::new();
        for slot in self.keys.values() {
            let info = slot.key.algorithm_info();
            if !algorithms.contains(&info) {
                algorithms.push(info);
            }
        }
        algorithms
    }

    fn select_file(&mut self, path: &Path) -> Result<()> {
        debug!("Select {}", path);
        self.selected = Some(path.clone());
        Ok(())
    }

    fn set_security_env(&mut self, env: &SecurityEnv) -> Result<()> {
        self.env = Some(env.clone());
        Ok(())
    }

    fn run_command(&mut self, command: CardCommand, input: &[u8], out: &mut [u8]) -> Result<usize> {
        let env = self.env.as_ref().ok_or(CardError::NotAllowed)?;
        let fid = self.current_key_fid(env).ok_or(CardError::FileNotFound)?;
        let slot = self.keys.get(&fid).ok_or(CardError::FileNotFound)?;

        if let Some(reference) = slot.pin_ref {
            if !self.state.is_verified(reference) {
                return Err(CardError::AuthenticationNotSatisfied);
            }
        }

        let flags = env.algorithm_flags;
        let result = Zeroizing::new(match (command, &slot.key) {
            (CardCommand::ComputeSignature | CardCommand::Decipher, SoftKey::Rsa(key))
                if flags & AlgorithmFlags::RSA_PADS == AlgorithmFlags::RSA_RAW =>
            {
                rsa_raw(key, input)?
            }
            (CardCommand::ComputeSignature, SoftKey::EcP256(key)) if flags.contains(AlgorithmFlags::ECDSA_RAW) => {
                ecdsa_prehash(key, input)?
            }
            (CardCommand::Decipher, SoftKey::EcP256(key)) if env.operation == SecOperation::Derive => {
                ecdh_p256(key, input)?
            }
            (CardCommand::ComputeSignature, SoftKey::Ed25519(key)) => key.sign(input).to_bytes().to_vec(),
            (CardCommand::Decipher, SoftKey::X25519(key)) if env.operation == SecOperation::Derive => {
                x25519(key, input)?
            }
            _ => {
                debug!("{:?} not supported with flags {:?}", command, flags);
                return Err(CardError::NotSupported);
            }
        });

        if let Some(reference) = slot.pin_ref {
            self.state.after_use(reference, slot.policy);
        }

        if out.len() < result.len() {
            return Err(CardError::BufferTooSmall);
        }
        out[..result.len()].copy_from_slice(&result);
        Ok(result.len())
    }

    fn verify_pin(&mut self, reference: u8, pin: &[u8]) -> Result<()> {
        let record = self.pins.get_mut(&reference).ok_or(CardError::FileNotFound)?;
        if record.retries == 0 {
            return Err(CardError::PinIncorrect);
        }

        let hash = HashOperations::hash(HashAlgorithm::SHA256, pin);
        if bool::from(hash.ct_eq(&record.hash)) {
            record.retries = PIN_MAX_RETRIES;
            self.state.set_verified(reference);
            Ok(())
        } else {
            record.retries -= 1;
            Err(CardError::PinIncorrect)
        }
    }
}
