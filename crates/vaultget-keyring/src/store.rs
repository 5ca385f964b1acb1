//! The credential store contract

use thiserror::Error;

/// Keyring errors
#[derive(Error, Debug)]
pub enum KeyringError {
    #[error("item not found: {0}")]
    NotFound(String),

    #[error("invalid key name: {0}")]
    InvalidKey(String),

    #[error("keyring is malformed: {0}")]
    Format(#[from] serde_json::Error),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("keyring unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyringError {
    /// Whether this error only means the key has no entry
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Read access to stored secrets.
///
/// Implementations must be safe for concurrent reads; callers hold a
/// shared reference and never mutate through it.
pub trait CredentialStore: Send + Sync {
    /// Fetch the secret stored under `key`, or [`KeyringError::NotFound`]
    fn get(&self, key: &str) -> Result<String, KeyringError>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for &T {
    fn get(&self, key: &str) -> Result<String, KeyringError> {
        (**self).get(key)
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for Box<T> {
    fn get(&self, key: &str) -> Result<String, KeyringError> {
        (**self).get(key)
    }
}

/// Reject keys that can't be addressed from the command line
pub fn validate_key(key: &str) -> Result<(), KeyringError> {
    if key.trim().is_empty() {
        return Err(KeyringError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.chars().any(char::is_control) {
        return Err(KeyringError::InvalidKey(format!(
            "control characters in key {:?}",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("ansible-vault:foo/vault.yaml").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("   ").is_err());
        assert!(validate_key("a\nb").is_err());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(KeyringError::NotFound("x".into()).is_not_found());
        assert!(!KeyringError::Decryption("bad".into()).is_not_found());
    }
}
