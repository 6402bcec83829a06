//! Content digests for cheap convergence checks between replicas.

use std::fmt;

use blake3::Hasher;
use serde::Deserialize;
use serde::Serialize;

/// A blake3 digest of a document's visible text, 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

/// Hash a document's visible text.
pub fn digest(text: &str) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    return Digest(*hasher.finalize().as_bytes());
}

impl Digest {
    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        return self.0.iter().map(|b| format!("{:02x}", b)).collect();
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "Digest({})", self.to_hex());
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to eyeball convergence in logs.
        return f.write_str(&self.to_hex()[..12]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest("hello world"), digest("hello world"));
    }

    #[test]
    fn digest_differs_for_different_text() {
        assert_ne!(digest("hello world"), digest("hello world!"));
        assert_ne!(digest(""), digest(" "));
    }

    #[test]
    fn hex_is_64_chars() {
        assert_eq!(digest("abc").to_hex().len(), 64);
        assert_eq!(format!("{}", digest("abc")).len(), 12);
    }
}
