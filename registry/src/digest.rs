//! Content digests

use std::fmt;
use std::str::FromStr;

use sha2::Digest as _;

use crate::error::RegistryError;

/// An algorithm-tagged content digest, e.g. `sha256:9f86d0…`.
///
/// Equality is by value. Parsing from a string requires exactly one `:`
/// separating a non-empty algorithm from a non-empty hex part; the hex part
/// is not checked against the algorithm's digest length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    alg: String,
    hex: String,
}

impl Digest {
    /// Build a digest from its parts, unchecked.
    pub fn new<A: Into<String>, H: Into<String>>(alg: A, hex: H) -> Self {
        Self {
            alg: alg.into(),
            hex: hex.into(),
        }
    }

    /// Compute the sha256 digest of a buffer.
    pub fn sha256(content: &[u8]) -> Self {
        Self::new("sha256", hex::encode(sha2::Sha256::digest(content)))
    }

    /// The algorithm part, e.g. `sha256`.
    pub fn alg(&self) -> &str {
        &self.alg
    }

    /// The hex part.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.alg, self.hex)
    }
}

impl FromStr for Digest {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(alg), Some(hex), None) if !alg.is_empty() && !hex.is_empty() => {
                Ok(Self::new(alg, hex))
            }
            _ => Err(RegistryError::InvalidDigest(s.to_string())),
        }
    }
}

/// Incremental sha256 digest over streamed content.
#[derive(Debug, Default)]
pub struct Digester {
    hasher: sha2::Sha256,
    size: u64,
}

impl Digester {
    /// A fresh digester with nothing fed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.size += chunk.len() as u64;
    }

    /// Total bytes fed so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Finalize into a digest.
    pub fn finish(self) -> Digest {
        Digest::new("sha256", hex::encode(self.hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        let digest: Digest = "sha256:abcd1234".parse().unwrap();
        assert_eq!(digest.alg(), "sha256");
        assert_eq!(digest.hex(), "abcd1234");
        assert_eq!(digest.to_string().parse::<Digest>().unwrap(), digest);
    }

    #[test]
    fn rejects_wrong_separator_count() {
        for s in ["latest", "sha256:ab:cd", ":abcd", "sha256:", ""] {
            assert!(s.parse::<Digest>().is_err(), "{s:?}");
        }
    }

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            Digest::sha256(b"abc").to_string(),
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn incremental_matches_oneshot() {
        let mut digester = Digester::new();
        digester.update(b"hello ");
        digester.update(b"world");
        assert_eq!(digester.size(), 11);
        assert_eq!(digester.finish(), Digest::sha256(b"hello world"));
    }
}
