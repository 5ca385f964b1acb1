//! Decrypt, parse and extract in one step

use tracing::debug;

use crate::document::Document;
use crate::error::VaultError;

/// Turns vault text plus passphrase into plaintext
pub trait VaultCipher: Send + Sync {
    fn decrypt(&self, ciphertext: &[u8], passphrase: &str) -> Result<Vec<u8>, VaultError>;
}

/// The Ansible Vault `AES256` format
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsibleVaultCipher;

impl VaultCipher for AnsibleVaultCipher {
    fn decrypt(&self, ciphertext: &[u8], passphrase: &str) -> Result<Vec<u8>, VaultError> {
        Ok(ansible_vault::decrypt(ciphertext, passphrase)?)
    }
}

/// Stateless lookup over a pluggable cipher
pub struct LookupEngine {
    cipher: Box<dyn VaultCipher>,
}

impl Default for LookupEngine {
    fn default() -> Self {
        Self::new(AnsibleVaultCipher)
    }
}

impl LookupEngine {
    pub fn new(cipher: impl VaultCipher + 'static) -> Self {
        Self {
            cipher: Box::new(cipher),
        }
    }

    /// Value at `key_path` inside the vault.
    ///
    /// Each call decrypts and parses from scratch into its own [`Document`].
    pub fn lookup(
        &self,
        ciphertext: &[u8],
        passphrase: &str,
        key_path: &str,
    ) -> Result<String, VaultError> {
        let plaintext = self.cipher.decrypt(ciphertext, passphrase)?;
        debug!(bytes = plaintext.len(), "vault decrypted");

        let document = Document::parse(&plaintext)?;
        document.lookup(key_path)
    }
}
