//! On-card paths
//!
//! A path is a byte string of concatenated 2-byte file identifiers,
//! optionally qualified by the AID of the application it lives in.

use std::fmt;

/// Location of an object on the card
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    /// Concatenated file identifiers
    pub value: Vec<u8>,
    /// Application identifier, empty when the path is absolute
    pub aid: Vec<u8>,
}

impl Path {
    pub fn new(value: &[u8]) -> Self {
        Self {
            value: value.to_vec(),
            aid: Vec::new(),
        }
    }

    /// A path that addresses an application by AID only
    pub fn from_aid(aid: &[u8]) -> Self {
        Self {
            value: Vec::new(),
            aid: aid.to_vec(),
        }
    }

    pub fn with_aid(mut self, aid: &[u8]) -> Self {
        self.aid = aid.to_vec();
        self
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// True when neither a file path nor an AID is present
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.aid.is_empty()
    }

    /// Append `child` to this path, keeping this path's AID
    pub fn concat(&self, child: &Path) -> Path {
        let mut value = Vec::with_capacity(self.value.len() + child.value.len());
        value.extend_from_slice(&self.value);
        value.extend_from_slice(&child.value);
        Path {
            value,
            aid: self.aid.clone(),
        }
    }

    /// The trailing 2-byte file identifier, if the path has one
    pub fn file_id(&self) -> Option<Path> {
        let len = self.value.len();
        if len < 2 {
            return None;
        }
        Some(Path::new(&self.value[len - 2..]))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.aid.is_empty() {
            for b in &self.aid {
                write!(f, "{:02X}", b)?;
            }
            f.write_str("::")?;
        }
        for b in &self.value {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_keeps_parent_aid() {
        let app = Path::new(&[0x3F, 0x00, 0x50, 0x15]).with_aid(&[0xA0, 0x00, 0x00, 0x00, 0x63]);
        let full = app.concat(&Path::new(&[0x45, 0x01]));
        assert_eq!(full.value, vec![0x3F, 0x00, 0x50, 0x15, 0x45, 0x01]);
        assert_eq!(full.aid, app.aid);
    }

    #[test]
    fn test_file_id() {
        assert_eq!(
            Path::new(&[0x3F, 0x00, 0x45, 0x01]).file_id(),
            Some(Path::new(&[0x45, 0x01]))
        );
        assert_eq!(Path::new(&[0x3F]).file_id(), None);
    }

    #[test]
    fn test_display() {
        let path = Path::new(&[0x3F, 0x00]).with_aid(&[0xA0, 0x01]);
        assert_eq!(path.to_string(), "A001::3F00");
        assert!(Path::default().is_empty());
        assert!(!Path::from_aid(&[0xA0]).is_empty());
    }
}
