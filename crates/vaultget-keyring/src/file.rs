//! Age-encrypted keyring file
//!
//! The whole keyring is one JSON object of key/value items, encrypted with
//! an age passphrase (scrypt). It is decrypted once when opened; `set` and
//! `remove` only change the in-memory copy until [`FileStore::save`].

use age::secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::store::{validate_key, CredentialStore, KeyringError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Items {
    #[serde(default)]
    items: BTreeMap<String, String>,
}

/// A keyring persisted to a single age-encrypted file
pub struct FileStore {
    path: PathBuf,
    passphrase: SecretString,
    items: BTreeMap<String, String>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("items", &self.items.len())
            .finish()
    }
}

impl FileStore {
    /// Open the keyring at `path`.
    ///
    /// A missing file is an empty keyring; it is created on the first save.
    pub fn open(path: &Path, passphrase: &str) -> Result<Self, KeyringError> {
        let passphrase = SecretString::new(passphrase.to_owned());

        let items = if path.exists() {
            let encrypted = fs::read(path)?;
            let plaintext = decrypt(&encrypted, &passphrase)?;
            let parsed: Items = serde_json::from_slice(&plaintext)?;
            debug!(path = %path.display(), items = parsed.items.len(), "keyring unlocked");
            parsed.items
        } else {
            debug!(path = %path.display(), "keyring file absent, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            passphrase,
            items,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a secret (in memory until saved)
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), KeyringError> {
        validate_key(key)?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Drop a secret (in memory until saved)
    pub fn remove(&mut self, key: &str) -> Result<(), KeyringError> {
        self.items
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| KeyringError::NotFound(key.to_string()))
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        self.items.keys().map(String::as_str).collect()
    }

    /// Encrypt and write the keyring, replacing the file atomically
    pub fn save(&self) -> Result<(), KeyringError> {
        let plaintext = serde_json::to_vec(&Items {
            items: self.items.clone(),
        })?;
        let encrypted = encrypt(&plaintext, &self.passphrase)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("age.tmp");
        let mut file = File::create(&tmp_path)?;
        file.write_all(&encrypted)?;
        file.sync_all()?;
        drop(file);
        restrict_permissions(&tmp_path)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), items = self.items.len(), "keyring saved");
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<String, KeyringError> {
        self.items
            .get(key)
            .cloned()
            .ok_or_else(|| KeyringError::NotFound(key.to_string()))
    }
}

fn encrypt(plaintext: &[u8], passphrase: &SecretString) -> Result<Vec<u8>, KeyringError> {
    let encryptor =
        age::Encryptor::with_user_passphrase(SecretString::new(passphrase.expose_secret().clone()));

    let mut encrypted = vec![];
    let mut writer = encryptor
        .wrap_output(&mut encrypted)
        .map_err(|e| KeyringError::Encryption(e.to_string()))?;
    writer
        .write_all(plaintext)
        .map_err(|e| KeyringError::Encryption(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| KeyringError::Encryption(e.to_string()))?;

    Ok(encrypted)
}

fn decrypt(encrypted: &[u8], passphrase: &SecretString) -> Result<Vec<u8>, KeyringError> {
    let decryptor = match age::Decryptor::new(encrypted)
        .map_err(|e| KeyringError::Decryption(e.to_string()))?
    {
        age::Decryptor::Passphrase(d) => d,
        _ => {
            return Err(KeyringError::Decryption(
                "keyring is not passphrase encrypted".to_string(),
            ))
        }
    };

    let mut reader = decryptor
        .decrypt(passphrase, None)
        .map_err(|e| KeyringError::Decryption(e.to_string()))?;

    let mut plaintext = vec![];
    reader
        .read_to_end(&mut plaintext)
        .map_err(|e| KeyringError::Decryption(e.to_string()))?;

    Ok(plaintext)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
