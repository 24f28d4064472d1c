use crate::error::Error;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const READ_CHUNK_SIZE: usize = 64 * 1024; // 64KB

pub const DIGEST_LEN: usize = blake3::OUT_LEN;

/// Length of the unpadded base64url encoding of a full digest (256 bits / 6).
pub const MAX_SUFFIX_CHARS: usize = (DIGEST_LEN * 8 + 5) / 6;

/// Whole-file BLAKE3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn of_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Full digest as unpadded base64url, the form written to the journal.
    pub fn to_b64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// First `chars` characters of the base64url encoding.
    ///
    /// Every character of a prefix is fully determined by the digest bits it
    /// covers, so `suffix(n)` is always a prefix of `suffix(n + 1)`.
    pub fn suffix(&self, chars: usize) -> Option<String> {
        if chars == 0 || chars > MAX_SUFFIX_CHARS {
            return None;
        }
        let n_bytes = ((3 * chars + 3) / 4).min(DIGEST_LEN);
        let mut encoded = URL_SAFE_NO_PAD.encode(&self.0[..n_bytes]);
        encoded.truncate(chars);
        Some(encoded)
    }

    /// True when `suffix` is exactly the digest prefix of its own length.
    pub fn matches_suffix(&self, suffix: &str) -> bool {
        self.suffix(suffix.len()).as_deref() == Some(suffix)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_b64url())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_b64url())
    }
}

/// Suffix of `chars` characters for in-memory content.
pub fn encode(content: &[u8], chars: usize) -> Result<String, Error> {
    Digest::of_bytes(content)
        .suffix(chars)
        .ok_or(Error::InvalidChars(chars))
}

/// Stream a file through BLAKE3.
pub fn digest_file(path: &Path) -> Result<Digest, Error> {
    read_digest(path).map_err(|source| Error::io(path, source))
}

fn read_digest(path: &Path) -> io::Result<Digest> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(Digest(*hasher.finalize().as_bytes()))
}
