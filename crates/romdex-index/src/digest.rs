//! Exact content digests used as lookup keys.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

use romdex_core::ScanError;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// MD5 of a byte stream. Independent of file names and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest(pub [u8; 16]);

impl ContentDigest {
    /// Create a digest from raw bytes.
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Digest an in-memory buffer.
    pub fn of(bytes: &[u8]) -> Self {
        Self(Md5::digest(bytes).into())
    }

    /// Lowercase hex, the form used as the store key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Stream a reader to its end, returning the digest and the number of bytes read.
pub fn digest_reader<R: Read>(reader: &mut R) -> io::Result<(ContentDigest, u64)> {
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    Ok((ContentDigest(hasher.finalize().into()), total))
}

/// Digest a file on disk.
pub fn digest_file(path: &Path) -> Result<(ContentDigest, u64), ScanError> {
    let mut file = File::open(path).map_err(|e| ScanError::io(path, e))?;
    digest_reader(&mut file).map_err(|e| ScanError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            ContentDigest::of(b"").to_hex(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            ContentDigest::of(b"abc").to_hex(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_reader_matches_buffer_digest() {
        let data: Vec<u8> = (0..200_000u32).map(|n| (n % 251) as u8).collect();
        let (digest, len) = digest_reader(&mut data.as_slice()).unwrap();
        assert_eq!(digest, ContentDigest::of(&data));
        assert_eq!(len, data.len() as u64);
    }

    #[test]
    fn test_digest_file_ignores_name() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.nes"), b"same bytes").unwrap();
        fs::write(temp.path().join("b.sfc"), b"same bytes").unwrap();

        let (a, _) = digest_file(&temp.path().join("a.nes")).unwrap();
        let (b, _) = digest_file(&temp.path().join("b.sfc")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_digest_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = digest_file(&temp.path().join("gone.nes")).unwrap_err();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }
}
