//! Mechanism parameters
//!
//! The parameter blocks a caller may pass with an RSA operation.

use super::hash::HashAlgorithm;

/// Where the OAEP label comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OaepSource {
    Empty,
    DataSpecified(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaepParams {
    pub hash: HashAlgorithm,
    pub mgf: HashAlgorithm,
    pub source: OaepSource,
}

impl OaepParams {
    /// The label bytes; only an explicitly specified source yields one
    pub fn label(&self) -> &[u8] {
        match &self.source {
            OaepSource::DataSpecified(data) => data,
            OaepSource::Empty => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PssParams {
    pub hash: HashAlgorithm,
    pub mgf: HashAlgorithm,
    pub salt_len: usize,
}

/// Parameter block accompanying an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MechanismParams {
    RsaOaep(OaepParams),
    RsaPss(PssParams),
}

impl MechanismParams {
    pub fn oaep(&self) -> Option<&OaepParams> {
        match self {
            MechanismParams::RsaOaep(p) => Some(p),
            _ => None,
        }
    }

    pub fn pss(&self) -> Option<&PssParams> {
        match self {
            MechanismParams::RsaPss(p) => Some(p),
            _ => None,
        }
    }
}
