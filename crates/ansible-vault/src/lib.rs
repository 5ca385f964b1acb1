//! ansible-vault - The Ansible Vault `AES256` format
//!
//! A vault file is a text envelope:
//!
//! ```text
//! $ANSIBLE_VAULT;1.1;AES256
//! 6134663862383430...        (hex, 80 columns per line)
//! ```
//!
//! The hex body decodes to `hex(salt)\nhex(hmac)\nhex(ciphertext)`.
//! Keys come from PBKDF2-HMAC-SHA256 over the passphrase, the payload is
//! AES-256-CTR over PKCS#7 padded plaintext, and the HMAC-SHA256 of the
//! ciphertext authenticates the whole thing.

pub mod aes256;
pub mod envelope;

pub use envelope::{VaultHeader, HEADER_TAG};

use thiserror::Error;

/// Format and integrity errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CipherError {
    #[error("not an ansible vault (missing $ANSIBLE_VAULT header)")]
    NotVault,

    #[error("invalid vault header: {0}")]
    InvalidHeader(String),

    #[error("unsupported vault format version {0}")]
    UnsupportedVersion(String),

    #[error("unsupported vault cipher {0}")]
    UnsupportedCipher(String),

    #[error("invalid vault encoding: {0}")]
    Encoding(String),

    #[error("digests do not match - wrong passphrase or corrupted vault")]
    IntegrityCheckFailed,

    #[error("invalid padding in decrypted data")]
    InvalidPadding,

    #[error("vault passphrase is empty")]
    EmptyPassphrase,
}

/// Decrypt vault text (the full file contents) with `passphrase`
pub fn decrypt(vault_text: &[u8], passphrase: &str) -> Result<Vec<u8>, CipherError> {
    if passphrase.is_empty() {
        return Err(CipherError::EmptyPassphrase);
    }
    let (_header, payload) = envelope::open(vault_text)?;
    aes256::decrypt(&payload, passphrase.as_bytes())
}

/// Encrypt `plaintext` into a version 1.1 vault with a random salt
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<String, CipherError> {
    if passphrase.is_empty() {
        return Err(CipherError::EmptyPassphrase);
    }
    let payload = aes256::encrypt(plaintext, passphrase.as_bytes());
    Ok(envelope::seal(&VaultHeader::default(), &payload))
}

/// Whether `data` starts with a vault header
pub fn is_encrypted(data: &[u8]) -> bool {
    data.starts_with(HEADER_TAG.as_bytes())
}
