//! Message digests of record content.

use std::fmt;
use std::str::FromStr;

use data_encoding::{BASE32, BASE64, HEXLOWER};

use crate::ConfigError;

/// A supported digest algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// The canonical name of the algorithm, as used in labelled digests.
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Begin computing a digest with this algorithm.
    pub fn digester(self) -> Digester {
        match self {
            DigestAlgorithm::Md5 => Digester::Md5(md5::Context::new()),
            DigestAlgorithm::Sha1 => Digester::Sha1(Default::default()),
            DigestAlgorithm::Sha256 => Digester::Sha256(Default::default()),
            DigestAlgorithm::Sha512 => Digester::Sha512(Default::default()),
        }
    }
}

/// Parse an algorithm name, ignoring case and accepting the hyphenated SHA forms.
///
/// ```
/// # use arcio::DigestAlgorithm;
/// assert_eq!("SHA-1".parse(), Ok(DigestAlgorithm::Sha1));
/// assert!("crc32".parse::<DigestAlgorithm>().is_err());
/// ```
impl FromStr for DigestAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha1" | "sha-1" => Ok(DigestAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(ConfigError::UnknownDigestAlgorithm(s.to_owned())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A running digest computation.
pub enum Digester {
    Md5(md5::Context),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl Digester {
    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            Digester::Md5(_) => DigestAlgorithm::Md5,
            Digester::Sha1(_) => DigestAlgorithm::Sha1,
            Digester::Sha256(_) => DigestAlgorithm::Sha256,
            Digester::Sha512(_) => DigestAlgorithm::Sha512,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        use sha2::Digest as _;

        match self {
            Digester::Md5(ctx) => ctx.consume(data),
            Digester::Sha1(hasher) => hasher.update(data),
            Digester::Sha256(hasher) => hasher.update(data),
            Digester::Sha512(hasher) => hasher.update(data),
        }
    }

    pub fn finalize(self) -> Digest {
        use sha2::Digest as _;

        let algorithm = self.algorithm();
        let bytes = match self {
            Digester::Md5(ctx) => ctx.compute().0.to_vec(),
            Digester::Sha1(hasher) => hasher.finalize().to_vec(),
            Digester::Sha256(hasher) => hasher.finalize().to_vec(),
            Digester::Sha512(hasher) => hasher.finalize().to_vec(),
        };
        Digest {
            algorithm,
            bytes,
            encoded: None,
        }
    }
}

impl fmt::Debug for Digester {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Digester").field(&self.algorithm()).finish()
    }
}

/// A computed digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub algorithm: DigestAlgorithm,
    /// The raw digest value.
    pub bytes: Vec<u8>,
    /// The digest in text form, if it has been encoded.
    pub encoded: Option<String>,
}

impl Digest {
    /// Encode the digest with the named encoding, returning `false` if the encoding is unknown.
    pub fn encode(&mut self, encoding: &str) -> bool {
        self.encoded = encode(&self.bytes, encoding);
        self.encoded.is_some()
    }

    /// The digest as `<algorithm>:<encoded>`, if it has been encoded.
    pub fn labelled(&self) -> Option<String> {
        self.encoded
            .as_ref()
            .map(|encoded| format!("{}:{}", self.algorithm, encoded))
    }
}

/// Encode bytes as `base16` (lower case), `base32` or `base64`.
///
/// Encoding names are matched exactly; `None` is returned for any other name.
pub fn encode(bytes: &[u8], encoding: &str) -> Option<String> {
    match encoding {
        "base16" => Some(HEXLOWER.encode(bytes)),
        "base32" => Some(BASE32.encode(bytes)),
        "base64" => Some(BASE64.encode(bytes)),
        _ => None,
    }
}
