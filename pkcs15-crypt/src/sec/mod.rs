//! Security environment
//!
//! The per-operation descriptor handed to the card: which algorithm, which
//! key, which encoding, and any extra named parameters. A fresh environment
//! is built for every call and dropped when the call returns.

pub mod builder;
pub mod executor;

use bitflags::bitflags;

use crate::card::{Algorithm, AlgorithmFlags};
use crate::error::{CardError, Result};
use crate::object::Path;

/// Kind of operation an environment is set up for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecOperation {
    Sign,
    Decipher,
    Derive,
    Wrap,
    Unwrap,
    EncryptSym,
    DecryptSym,
}

bitflags! {
    /// Presence bits for the optional fields of an environment
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SecEnvFlags: u32 {
        const ALG_REF_PRESENT = 0x0001;
        const FILE_REF_PRESENT = 0x0002;
        const KEY_REF_PRESENT = 0x0004;
        const TARGET_FILE_REF_PRESENT = 0x0008;
        const ALG_PRESENT = 0x0010;
    }
}

/// Tag of an extra environment parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecEnvParamTag {
    Iv,
    TargetFile,
}

/// An extra named environment parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecEnvParam {
    /// Initialization vector for chained symmetric modes
    Iv(Vec<u8>),
    /// The key being wrapped or unwrapped
    TargetFile(Path),
}

impl SecEnvParam {
    pub fn tag(&self) -> SecEnvParamTag {
        match self {
            SecEnvParam::Iv(_) => SecEnvParamTag::Iv,
            SecEnvParam::TargetFile(_) => SecEnvParamTag::TargetFile,
        }
    }
}

/// Ordered parameter list holding at most one entry per tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecEnvParams(Vec<SecEnvParam>);

impl SecEnvParams {
    /// Append a parameter; a second parameter with the same tag is refused
    pub fn push(&mut self, param: SecEnvParam) -> Result<()> {
        let tag = param.tag();
        if self.get(tag).is_some() {
            return Err(CardError::DuplicateParam(tag));
        }
        self.0.push(param);
        Ok(())
    }

    pub fn get(&self, tag: SecEnvParamTag) -> Option<&SecEnvParam> {
        self.0.iter().find(|p| p.tag() == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecEnvParam> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Mechanisms the token info can map to a card algorithm reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    AesEcb,
    AesCbc,
    AesCbcPad,
    /// Any other PKCS#11 mechanism number
    Other(u64),
}

impl Mechanism {
    /// The card mode a mechanism corresponds to
    pub fn card_mode(&self) -> Option<AlgorithmFlags> {
        match self {
            Mechanism::AesEcb => Some(AlgorithmFlags::AES_ECB),
            Mechanism::AesCbc => Some(AlgorithmFlags::AES_CBC),
            Mechanism::AesCbcPad => Some(AlgorithmFlags::AES_CBC_PAD),
            Mechanism::Other(_) => None,
        }
    }
}

/// A supported-algorithm entry from the token info. The algorithm
/// reference is a card-specific value passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedAlgorithm {
    pub reference: u32,
    pub mechanism: Mechanism,
    pub algo_ref: u32,
}

/// The descriptor applied to the card before a command runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEnv {
    pub operation: SecOperation,
    pub algorithm: Algorithm,
    /// Key size in bits, as used for the capability lookup
    pub key_size_bits: usize,
    pub algorithm_ref: Option<u32>,
    pub key_ref: Option<u8>,
    pub file_ref: Option<Path>,
    /// Encoding the card performs
    pub algorithm_flags: AlgorithmFlags,
    pub params: SecEnvParams,
    pub supported_algos: Vec<SupportedAlgorithm>,
}

impl SecurityEnv {
    pub fn new(operation: SecOperation, algorithm: Algorithm, key_size_bits: usize) -> Self {
        Self {
            operation,
            algorithm,
            key_size_bits,
            algorithm_ref: None,
            key_ref: None,
            file_ref: None,
            algorithm_flags: AlgorithmFlags::empty(),
            params: SecEnvParams::default(),
            supported_algos: Vec::new(),
        }
    }

    /// Presence bitmask derived from the optional fields
    pub fn flags(&self) -> SecEnvFlags {
        let mut flags = SecEnvFlags::ALG_PRESENT;
        if self.algorithm_ref.is_some() {
            flags |= SecEnvFlags::ALG_REF_PRESENT;
        }
        if self.key_ref.is_some() {
            flags |= SecEnvFlags::KEY_REF_PRESENT;
        }
        if self.file_ref.is_some() {
            flags |= SecEnvFlags::FILE_REF_PRESENT;
        }
        if self.params.get(SecEnvParamTag::TargetFile).is_some() {
            flags |= SecEnvFlags::TARGET_FILE_REF_PRESENT;
        }
        flags
    }

    /// The initialization vector, if one was attached
    pub fn iv(&self) -> Option<&[u8]> {
        match self.params.get(SecEnvParamTag::Iv) {
            Some(SecEnvParam::Iv(iv)) => Some(iv),
            _ => None,
        }
    }

    /// The target file of a wrap or unwrap, if one was attached
    pub fn target_file(&self) -> Option<&Path> {
        match self.params.get(SecEnvParamTag::TargetFile) {
            Some(SecEnvParam::TargetFile(path)) => Some(path),
            _ => None,
        }
    }
}
