//! The `AnsibleVault(file, key)` lookup

use vaultget_keyring::CredentialStore;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::acquire::read_vault_file;
use crate::engine::{LookupEngine, VaultCipher};
use crate::error::LookupError;
use crate::resolver::PassphraseResolver;

/// Binary name shown in provisioning hints
pub const PRODUCT_NAME: &str = env!("CARGO_PKG_NAME");

/// Vault lookups against one credential store and working directory.
///
/// Holds no per-call state, so a shared reference can serve concurrent
/// lookups.
pub struct AnsibleVault<'a> {
    store: &'a dyn CredentialStore,
    work_dir: PathBuf,
    product: String,
    engine: LookupEngine,
}

impl<'a> AnsibleVault<'a> {
    pub fn new(store: &'a dyn CredentialStore, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            work_dir: work_dir.into(),
            product: PRODUCT_NAME.to_string(),
            engine: LookupEngine::default(),
        }
    }

    /// Name used in the `<product> keyring:set` hint
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn with_cipher(mut self, cipher: impl VaultCipher + 'static) -> Self {
        self.engine = LookupEngine::new(cipher);
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Decrypted value at `key_path` in the vault at `file_path`.
    ///
    /// Reads the file, resolves its passphrase, then decrypts and looks the
    /// key up. The first failing stage ends the call.
    pub fn get(&self, file_path: &str, key_path: &str) -> Result<String, LookupError> {
        debug!(file = file_path, key = key_path, "ansible vault lookup");

        let content = read_vault_file(file_path, &self.work_dir)?;

        let resolver = PassphraseResolver::new(self.store, &self.work_dir, &self.product);
        let passphrase = resolver.resolve_passphrase(file_path)?;

        self.engine
            .lookup(&content, &passphrase, key_path)
            .map_err(|source| LookupError::Vault {
                file: file_path.to_string(),
                source,
            })
    }
}
