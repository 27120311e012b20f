//! Error types for card operations
//!
//! Every entry point returns [`CardError`]; callers that need the numeric
//! result code of the crypto-API front end use [`CardError::code`].

use thiserror::Error;

use crate::sec::SecEnvParamTag;

/// Errors surfaced by the cryptographic operation layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("Operation not allowed by key usage or object class")]
    NotAllowed,

    #[error("Algorithm, key type or feature not supported")]
    NotSupported,

    #[error("Invalid arguments")]
    InvalidArguments,

    #[error("Invalid data")]
    InvalidData,

    #[error("Output buffer too small")]
    BufferTooSmall,

    #[error("Security status not satisfied")]
    AuthenticationNotSatisfied,

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Internal error")]
    Internal,

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("File not found")]
    FileNotFound,

    #[error("Card command failed")]
    CardCommandFailed,

    #[error("PIN code incorrect")]
    PinIncorrect,

    #[error("Security environment parameter {0:?} already present")]
    DuplicateParam(SecEnvParamTag),
}

impl CardError {
    /// Negative result code reported to the crypto-API front end
    pub fn code(&self) -> i32 {
        match self {
            CardError::CardCommandFailed => -1200,
            CardError::FileNotFound => -1201,
            CardError::NotAllowed => -1209,
            CardError::AuthenticationNotSatisfied => -1211,
            CardError::PinIncorrect => -1214,
            CardError::InvalidArguments => -1300,
            CardError::BufferTooSmall => -1303,
            CardError::InvalidData => -1305,
            CardError::Internal => -1400,
            CardError::OutOfMemory => -1404,
            CardError::DuplicateParam(_) => -1405,
            CardError::NotSupported => -1408,
            CardError::DecryptionFailed => -1414,
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, CardError>;
