//! Security environment construction
//!
//! Maps a key object to the card's capability record for it and fills in
//! the algorithm, key reference and token algorithm table.

use log::debug;

use super::{SecOperation, SecurityEnv};
use crate::card::{Algorithm, AlgorithmInfo};
use crate::error::{CardError, Result};
use crate::object::{KeyAlgorithm, KeyObject, ObjectClass, SecretKeyType};
use crate::token::Token;

impl Token {
    /// Build the environment for running `operation` with `key`.
    ///
    /// Only private and secret keys on the card qualify. No I/O happens
    /// here; the returned capability record is borrowed from the card.
    pub fn build_security_env(
        &self,
        key: &KeyObject,
        operation: SecOperation,
    ) -> Result<(SecurityEnv, &AlgorithmInfo)> {
        if !matches!(key.class, ObjectClass::PrivateKey | ObjectClass::SecretKey) {
            return Err(CardError::NotAllowed);
        }
        if !key.native {
            return Err(CardError::NotSupported);
        }

        let (algorithm, key_bits) = match (key.class, key.algorithm) {
            (ObjectClass::PrivateKey, KeyAlgorithm::Rsa { modulus_bits }) => (Algorithm::Rsa, modulus_bits),
            (ObjectClass::PrivateKey, KeyAlgorithm::GostR3410 { modulus_bits }) => {
                (Algorithm::GostR3410, modulus_bits)
            }
            (ObjectClass::PrivateKey, KeyAlgorithm::Ec { field_bits }) => (Algorithm::Ec, field_bits),
            (ObjectClass::PrivateKey, KeyAlgorithm::EdDsa { field_bits }) => (Algorithm::EdDsa, field_bits),
            (ObjectClass::PrivateKey, KeyAlgorithm::XEdDsa { field_bits }) => (Algorithm::XEdDsa, field_bits),
            (
                ObjectClass::SecretKey,
                KeyAlgorithm::Secret {
                    key_type: SecretKeyType::Aes,
                    value_bits,
                },
            ) => (Algorithm::Aes, value_bits),
            _ => {
                debug!("No security environment for {:?} {:?}", key.class, key.algorithm);
                return Err(CardError::NotSupported);
            }
        };

        let info = self.card.find_algorithm(algorithm, key_bits, None).ok_or_else(|| {
            debug!("Card does not support {:?} with key length {}", algorithm, key_bits);
            CardError::NotSupported
        })?;

        let mut env = SecurityEnv::new(operation, algorithm, key_bits);
        env.supported_algos = self.supported_algos.clone();
        if algorithm == Algorithm::Ec {
            // cards select the curve by field length
            env.algorithm_ref = Some(key_bits as u32);
        }
        if let Some(reference) = key.key_reference {
            env.key_ref = Some((reference & 0xFF) as u8);
        }

        Ok((env, info))
    }
}
