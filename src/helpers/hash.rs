//! Checksum specs and file digests
//!
//! Artifacts declare their checksum as `<algorithm>:<hexdigest>`, for
//! example `sha256:b94d27b9...`. Digests are computed in 1MB chunks.

use crate::error::{CctError, Result};
use sha2::Digest;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Sha3_512,
    Blake3,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha3_256 => "sha3_256",
            Self::Sha3_512 => "sha3_512",
            Self::Blake3 => "blake3",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha224" => Some(Self::Sha224),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            "sha3_256" | "sha3-256" => Some(Self::Sha3_256),
            "sha3_512" | "sha3-512" => Some(Self::Sha3_512),
            "blake3" => Some(Self::Blake3),
            _ => None,
        }
    }
}

/// A parsed `<algorithm>:<hexdigest>` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: HashAlgorithm,
    pub digest: String,
}

impl FromStr for Checksum {
    type Err = CctError;

    fn from_str(spec: &str) -> Result<Self> {
        let (algorithm, digest) = spec
            .split_once(':')
            .ok_or_else(|| CctError::UnsupportedChecksum(spec.to_string()))?;
        let algorithm = HashAlgorithm::from_name(algorithm)
            .ok_or_else(|| CctError::UnsupportedChecksum(spec.to_string()))?;
        if digest.is_empty() {
            return Err(CctError::UnsupportedChecksum(spec.to_string()));
        }
        Ok(Self {
            algorithm,
            digest: digest.to_string(),
        })
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.name(), self.digest)
    }
}

impl Checksum {
    /// Whether the file at `path` exists and hashes to the declared digest.
    ///
    /// The comparison is an exact, case-sensitive string match.
    pub fn matches_file(&self, path: &Path) -> Result<bool> {
        if !path.is_file() {
            return Ok(false);
        }
        Ok(file_digest(path, self.algorithm)? == self.digest)
    }
}

/// Compute the lowercase hex digest of a file
pub fn file_digest(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let mut f = std::fs::File::open(path)?;
    let digest = match algorithm {
        HashAlgorithm::Sha224 => hash_reader::<sha2::Sha224>(&mut f)?,
        HashAlgorithm::Sha256 => hash_reader::<sha2::Sha256>(&mut f)?,
        HashAlgorithm::Sha384 => hash_reader::<sha2::Sha384>(&mut f)?,
        HashAlgorithm::Sha512 => hash_reader::<sha2::Sha512>(&mut f)?,
        HashAlgorithm::Sha3_256 => hash_reader::<sha3::Sha3_256>(&mut f)?,
        HashAlgorithm::Sha3_512 => hash_reader::<sha3::Sha3_512>(&mut f)?,
        HashAlgorithm::Blake3 => hash_blake3(&mut f)?,
    };
    Ok(digest)
}

/// Compute a digest with any RustCrypto hasher (SHA-2 and SHA-3 families)
fn hash_reader<D: Digest>(reader: &mut impl Read) -> Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// BLAKE3 has its own hasher API
fn hash_blake3(reader: &mut impl Read) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    const HELLO_BLAKE3: &str = "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24";

    fn hello_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();
        (temp_dir, file_path)
    }

    #[test]
    fn test_parse_checksum() {
        let checksum: Checksum = format!("sha256:{}", HELLO_SHA256).parse().unwrap();
        assert_eq!(checksum.algorithm, HashAlgorithm::Sha256);
        assert_eq!(checksum.digest, HELLO_SHA256);
        assert_eq!(checksum.to_string(), format!("sha256:{}", HELLO_SHA256));
    }

    #[test]
    fn test_parse_sha3_aliases() {
        let a: Checksum = "sha3_256:ab".parse().unwrap();
        let b: Checksum = "sha3-256:ab".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_unknown_algorithm() {
        let err = "md5:d41d8cd98f00b204e9800998ecf8427e"
            .parse::<Checksum>()
            .unwrap_err();
        assert!(matches!(err, CctError::UnsupportedChecksum(_)));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert!("sha256".parse::<Checksum>().is_err());
        assert!("sha256:".parse::<Checksum>().is_err());
    }

    #[test]
    fn test_sha256_digest() {
        let (_dir, path) = hello_file();
        assert_eq!(file_digest(&path, HashAlgorithm::Sha256).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn test_blake3_digest() {
        let (_dir, path) = hello_file();
        assert_eq!(file_digest(&path, HashAlgorithm::Blake3).unwrap(), HELLO_BLAKE3);
    }

    #[test]
    fn test_matches_file() {
        let (_dir, path) = hello_file();
        let good: Checksum = format!("sha256:{}", HELLO_SHA256).parse().unwrap();
        let bad: Checksum = "sha256:0000".parse().unwrap();
        assert!(good.matches_file(&path).unwrap());
        assert!(!bad.matches_file(&path).unwrap());
    }

    #[test]
    fn test_matches_is_case_sensitive() {
        let (_dir, path) = hello_file();
        let upper: Checksum = format!("sha256:{}", HELLO_SHA256.to_uppercase())
            .parse()
            .unwrap();
        assert!(!upper.matches_file(&path).unwrap());
    }

    #[test]
    fn test_matches_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let checksum: Checksum = format!("sha256:{}", HELLO_SHA256).parse().unwrap();
        assert!(!checksum.matches_file(&dir.path().join("absent")).unwrap());
    }
}
