//! vaultget - Read single values out of Ansible Vault files
//!
//! "A secret should be one lookup away, and nowhere else."
//!
//! Given a vault file and a dotted key path, vaultget resolves the file's
//! passphrase from a keyring (`ansible-vault:<path>`), decrypts the vault,
//! parses it as YAML and returns the value at that path. Every call starts
//! from scratch: the file is re-read, the passphrase re-resolved and the
//! document re-parsed, so nothing decrypted outlives the call.
//!
//! The same lookup is exposed to templates as `{{ AnsibleVault "file" "key" }}`.

pub mod acquire;
pub mod document;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod template;

pub use document::Document;
pub use engine::{AnsibleVaultCipher, LookupEngine, VaultCipher};
pub use error::{ErrorKind, LookupError, VaultError};
pub use pipeline::{AnsibleVault, PRODUCT_NAME};
pub use resolver::{store_key, PassphraseResolver, ANSIBLE_VAULT_KEY_PREFIX};
pub use template::{register_ansible_vault, Template, TemplateError, TemplateFuncs, Variables};
