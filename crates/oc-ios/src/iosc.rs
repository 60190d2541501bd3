//! IOSC: key storage and the AES/SHA-1 operations ES relies on
//!
//! Console keys are never bundled; they are read from a user-supplied TOML key file of
//! hex strings.

use crate::formats::TicketReader;
use aes::Aes128;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use oc_core::error::IosError;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::path::Path;
use tracing::{debug, warn};

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

pub use oc_core::config::ConsoleType;

/// Keys loaded from the user's key file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStore {
    /// Common key, hex encoded
    pub common_key: Option<String>,
    /// Korean common key, hex encoded
    pub korean_common_key: Option<String>,
}

impl KeyStore {
    /// Load a key file; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self, IosError> {
        if !path.exists() {
            debug!("No key file at {}", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            IosError::MissingKey(format!("could not parse key file {}: {}", path.display(), e))
        })
    }

    /// Common key for a ticket's key index
    pub fn common_key(&self, index: u8) -> Result<[u8; 16], IosError> {
        let (name, value) = match index {
            0 => ("common_key", &self.common_key),
            1 => ("korean_common_key", &self.korean_common_key),
            _ => return Err(IosError::MissingKey(format!("common key index {}", index))),
        };
        let value = value
            .as_deref()
            .ok_or_else(|| IosError::MissingKey(name.to_string()))?;
        let bytes = hex::decode(value.trim())
            .map_err(|e| IosError::MissingKey(format!("{} is not valid hex: {}", name, e)))?;
        bytes
            .try_into()
            .map_err(|_| IosError::MissingKey(format!("{} must be 16 bytes", name)))
    }
}

/// AES-128-CBC decrypt; `data` is zero-padded to the block size first
pub fn aes_decrypt(key: &[u8; 16], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, IosError> {
    let mut buf = data.to_vec();
    buf.resize(data.len().div_ceil(16) * 16, 0);
    Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|e| IosError::DecryptionFailed(e.to_string()))?
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|e| IosError::DecryptionFailed(e.to_string()))?;
    Ok(buf)
}

/// AES-128-CBC encrypt; `data` is zero-padded to the block size first
pub fn aes_encrypt(key: &[u8; 16], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, IosError> {
    let len = data.len();
    let mut buf = data.to_vec();
    buf.resize(len.div_ceil(16) * 16, 0);
    let padded_len = buf.len();
    Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(|e| IosError::DecryptionFailed(e.to_string()))?
        .encrypt_padded_mut::<NoPadding>(&mut buf, padded_len)
        .map_err(|e| IosError::DecryptionFailed(e.to_string()))?;
    Ok(buf)
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// IV used for the title key: title id followed by zeros
pub fn title_key_iv(title_id: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&title_id.to_be_bytes());
    iv
}

/// IV used for a content: its index followed by zeros
pub fn content_iv(index: u16) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..2].copy_from_slice(&index.to_be_bytes());
    iv
}

/// The IOSC engine
#[derive(Debug, Clone, Default)]
pub struct Iosc {
    console_type: ConsoleType,
    keys: KeyStore,
}

impl Iosc {
    pub fn new(console_type: ConsoleType, keys: KeyStore) -> Self {
        if keys.common_key.is_none() {
            warn!("No common key configured; encrypted titles cannot be installed");
        }
        Self { console_type, keys }
    }

    pub fn console_type(&self) -> ConsoleType {
        self.console_type
    }

    /// Decrypt a ticket's title key with the matching common key
    pub fn decrypt_title_key(&self, ticket: &TicketReader) -> Result<[u8; 16], IosError> {
        let common_key = self.keys.common_key(ticket.common_key_index())?;
        let decrypted = aes_decrypt(
            &common_key,
            &title_key_iv(ticket.title_id()),
            &ticket.encrypted_title_key(),
        )?;
        let mut key = [0u8; 16];
        key.copy_from_slice(&decrypted[..16]);
        Ok(key)
    }

    /// Decrypt one content of a title
    pub fn decrypt_content(
        &self,
        title_key: &[u8; 16],
        index: u16,
        data: &[u8],
    ) -> Result<Vec<u8>, IosError> {
        aes_decrypt(title_key, &content_iv(index), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::fixtures::build_ticket;
    use std::io::Write;

    const TEST_COMMON_KEY: &str = "000102030405060708090a0b0c0d0e0f";

    fn test_keys() -> KeyStore {
        KeyStore {
            common_key: Some(TEST_COMMON_KEY.to_string()),
            korean_common_key: None,
        }
    }

    #[test]
    fn test_aes_known_answer() {
        // NIST SP 800-38A F.2.1, first block
        let key: [u8; 16] = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap().try_into().unwrap();
        let iv: [u8; 16] = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap().try_into().unwrap();
        let plain = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let cipher = aes_encrypt(&key, &iv, &plain).unwrap();
        assert_eq!(hex::encode(&cipher), "7649abac8119b246cee98e9b12e9197d");
        assert_eq!(aes_decrypt(&key, &iv, &cipher).unwrap(), plain);
    }

    #[test]
    fn test_sha1() {
        assert_eq!(hex::encode(sha1(b"abc")), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_title_key_decryption() {
        let title_id = 0x0001_0001_4841_4341;
        let title_key = [0x42u8; 16];
        let common: [u8; 16] = hex::decode(TEST_COMMON_KEY).unwrap().try_into().unwrap();
        let encrypted = aes_encrypt(&common, &title_key_iv(title_id), &title_key).unwrap();
        let mut encrypted_key = [0u8; 16];
        encrypted_key.copy_from_slice(&encrypted);

        let iosc = Iosc::new(ConsoleType::Retail, test_keys());
        let ticket = TicketReader::parse(build_ticket(title_id, encrypted_key)).unwrap();
        assert_eq!(iosc.decrypt_title_key(&ticket).unwrap(), title_key);
    }

    #[test]
    fn test_missing_keys() {
        let iosc = Iosc::new(ConsoleType::Retail, KeyStore::default());
        let ticket = TicketReader::parse(build_ticket(1, [0; 16])).unwrap();
        assert!(matches!(iosc.decrypt_title_key(&ticket), Err(IosError::MissingKey(_))));
    }

    #[test]
    fn test_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "common_key = \"{}\"", TEST_COMMON_KEY).unwrap();
        file.flush().unwrap();

        let keys = KeyStore::load(file.path()).unwrap();
        assert_eq!(keys.common_key(0).unwrap()[15], 0x0f);
        assert!(keys.common_key(1).is_err());

        let empty = KeyStore::load(Path::new("/nonexistent/keys.toml")).unwrap();
        assert!(empty.common_key.is_none());
    }
}
