//! Lookup errors
//!
//! [`VaultError`] covers the in-memory stages (decrypt, parse, extract).
//! [`LookupError`] is what callers see: every variant carries the vault
//! file it concerns, and [`LookupError::kind`] classifies it without
//! having to parse the message.

use vaultget_keyring::KeyringError;
use thiserror::Error;

/// Failure classes, one per pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Template call with the wrong number of arguments
    InvalidArgumentCount,
    /// Vault file does not exist
    FileNotFound,
    /// Vault file exists but could not be read
    FileReadError,
    /// No passphrase provisioned for the vault file
    CredentialNotFound,
    /// Credential store failed for another reason
    StoreError,
    /// Wrong passphrase or malformed vault
    DecryptionFailed,
    /// Decrypted plaintext is not YAML
    ParseFailed,
    /// Key path absent (or empty) in the document
    KeyNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgumentCount => "invalid_argument_count",
            Self::FileNotFound => "file_not_found",
            Self::FileReadError => "file_read_error",
            Self::CredentialNotFound => "credential_not_found",
            Self::StoreError => "store_error",
            Self::DecryptionFailed => "decryption_failed",
            Self::ParseFailed => "parse_failed",
            Self::KeyNotFound => "key_not_found",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from decrypting and reading a vault held in memory
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("can't decrypt the given ansible vault: {0}")]
    DecryptionFailed(#[from] ansible_vault::CipherError),

    #[error("the given ansible vault is not valid YAML: {0}")]
    ParseFailed(String),

    #[error("can't find key {0:?} in the given ansible vault")]
    KeyNotFound(String),
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DecryptionFailed(_) => ErrorKind::DecryptionFailed,
            Self::ParseFailed(_) => ErrorKind::ParseFailed,
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
        }
    }
}

/// Errors surfaced by a vault lookup
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("wrong number of args for {func}: want {want} got {got}")]
    InvalidArgumentCount {
        func: String,
        want: usize,
        got: usize,
    },

    #[error("can't find ansible vault file {file:?}")]
    FileNotFound { file: String },

    #[error("can't read ansible vault file {file:?}: {source}")]
    FileReadError {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "can't decrypt ansible vault file {file:?}. \
         Add an Ansible Vault file passphrase with `{product} keyring:set {key}`"
    )]
    CredentialNotFound {
        file: String,
        key: String,
        product: String,
    },

    #[error("can't decrypt ansible vault file {file:?}: {source}")]
    StoreError {
        file: String,
        #[source]
        source: KeyringError,
    },

    #[error("error on reading ansible vault file {file:?}: {source}")]
    Vault {
        file: String,
        #[source]
        source: VaultError,
    },
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgumentCount { .. } => ErrorKind::InvalidArgumentCount,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::FileReadError { .. } => ErrorKind::FileReadError,
            Self::CredentialNotFound { .. } => ErrorKind::CredentialNotFound,
            Self::StoreError { .. } => ErrorKind::StoreError,
            Self::Vault { source, .. } => source.kind(),
        }
    }

    /// The vault file the error concerns, if it got that far
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::InvalidArgumentCount { .. } => None,
            Self::FileNotFound { file }
            | Self::FileReadError { file, .. }
            | Self::CredentialNotFound { file, .. }
            | Self::StoreError { file, .. }
            | Self::Vault { file, .. } => Some(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_found_message() {
        let err = LookupError::Vault {
            file: "foo/vault.yaml".into(),
            source: VaultError::KeyNotFound("foo.buz".into()),
        };
        assert_eq!(
            err.to_string(),
            "error on reading ansible vault file \"foo/vault.yaml\": \
             can't find key \"foo.buz\" in the given ansible vault"
        );
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
        assert_eq!(err.file(), Some("foo/vault.yaml"));
    }

    #[test]
    fn test_credential_hint() {
        let err = LookupError::CredentialNotFound {
            file: "foo/vault2.yaml".into(),
            key: "ansible-vault:foo/vault2.yaml".into(),
            product: "vaultget".into(),
        };
        assert_eq!(
            err.to_string(),
            "can't decrypt ansible vault file \"foo/vault2.yaml\". \
             Add an Ansible Vault file passphrase with \
             `vaultget keyring:set ansible-vault:foo/vault2.yaml`"
        );
    }

    #[test]
    fn test_argument_count_message() {
        let err = LookupError::InvalidArgumentCount {
            func: "AnsibleVault".into(),
            want: 2,
            got: 3,
        };
        assert_eq!(err.to_string(), "wrong number of args for AnsibleVault: want 2 got 3");
        assert_eq!(err.kind(), ErrorKind::InvalidArgumentCount);
        assert_eq!(err.file(), None);
    }

    #[test]
    fn test_decryption_kind() {
        let err = VaultError::from(ansible_vault::CipherError::IntegrityCheckFailed);
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
        assert_ne!(err.kind(), ErrorKind::KeyNotFound);
    }
}
