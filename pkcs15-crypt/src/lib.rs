//! PKCS#15 cryptographic operations on smart-card keys
//!
//! Given a key object from a PKCS#15 application, this crate builds the
//! card security environment, negotiates which part of an encoding the card
//! performs and which part runs in software, and drives the card through
//! the operation:
//! - signatures (RSA, ECDSA, GOST R 34.10, EdDSA)
//! - RSA decipher with PKCS#1 v1.5 or OAEP padding removal
//! - ECDH and X25519 key derivation
//! - key wrap and unwrap into on-card target files
//! - AES encrypt and decrypt
//!
//! Cards are reached through the [`card::CardDevice`] trait. [`SoftCard`]
//! is an in-memory implementation performing the raw primitives.

pub mod card;
pub mod config;
pub mod crypto;
pub mod error;
pub mod object;
pub mod ops;
pub mod pin_cache;
pub mod sec;
pub mod token;

pub use card::{Algorithm, AlgorithmFlags, AlgorithmInfo, Card, CardCommand, CardDevice, SoftCard};
pub use config::CryptoConfig;
pub use crypto::{HashAlgorithm, MechanismParams, OaepParams, OaepSource, PssParams};
pub use error::{CardError, Result};
pub use object::{KeyAlgorithm, KeyObject, KeyUsage, Path, SecretKeyType};
pub use ops::DeriveOutcome;
pub use pin_cache::{NoPinCache, PinCache, PinRevalidator};
pub use sec::{SecOperation, SecurityEnv};
pub use token::Token;
