//! Streaming dual-digest hashing over a `;`-joined list of host files.

use std::fs::File;
use std::io::{self, Read};

use blake2::Blake2b;
use digest::consts::U32;
use digest::Digest;
use sha2::Sha256;

const STREAM_BUFFER_SIZE: usize = 1024;

type Blake2b256 = Blake2b<U32>;

/// Whether the signing backend in use supports BLAKE2b-256 alongside the
/// always-present SHA-256. Modeled as a runtime capability bit rather than
/// the original's compile-time `USE_TWEETNACL` switch.
#[derive(Clone, Copy, Debug)]
pub struct HashCapability {
    pub blake2b: bool,
}

pub struct StreamingHash {
    sha256: Sha256,
    blake2b: Option<Blake2b256>,
    total: u64,
}

pub struct HashOutput {
    pub length: u64,
    pub sha256_hex: String,
    pub blake2b_256_hex: Option<String>,
}

impl StreamingHash {
    pub fn new(capability: HashCapability) -> Self {
        StreamingHash {
            sha256: Sha256::new(),
            blake2b: capability.blake2b.then(Blake2b256::new),
            total: 0,
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.sha256.update(chunk);
        if let Some(blake2b) = &mut self.blake2b {
            blake2b.update(chunk);
        }
        self.total += chunk.len() as u64;
    }

    pub fn finalize(self) -> HashOutput {
        HashOutput {
            length: self.total,
            sha256_hex: hex::encode(self.sha256.finalize()),
            blake2b_256_hex: self.blake2b.map(|h| hex::encode(h.finalize())),
        }
    }
}

/// Streams `path`'s contents through `hash`, in 1KiB chunks.
pub fn hash_file(hash: &mut StreamingHash, path: &std::path::Path) -> io::Result<()> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hash.update(&buffer[..n]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn create1_concatenated_hash_and_length() {
        let mut a = NamedTempFile::new().unwrap();
        write!(a, "hello").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        write!(b, "world").unwrap();

        let mut hash = StreamingHash::new(HashCapability { blake2b: true });
        hash_file(&mut hash, a.path()).unwrap();
        hash_file(&mut hash, b.path()).unwrap();
        let output = hash.finalize();

        assert_eq!(output.length, 10);

        let mut expected = Sha256::new();
        expected.update(b"helloworld");
        assert_eq!(output.sha256_hex, hex::encode(expected.finalize()));
        assert!(output.blake2b_256_hex.is_some());
    }

    #[test]
    fn blake2b_omitted_when_capability_absent() {
        let mut hash = StreamingHash::new(HashCapability { blake2b: false });
        hash.update(b"data");
        let output = hash.finalize();
        assert!(output.blake2b_256_hex.is_none());
    }
}
