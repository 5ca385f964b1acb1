//! A store that is opened on its first read

use std::sync::OnceLock;
use tracing::debug;

use crate::store::{CredentialStore, KeyringError};

/// Defers opening (and unlocking) a store until a key is actually read.
///
/// The open function runs at most once. A failed open is remembered and
/// every later read reports it as [`KeyringError::Unavailable`].
pub struct LazyStore<S, F> {
    open: F,
    store: OnceLock<Result<S, String>>,
}

impl<S, F> LazyStore<S, F>
where
    S: CredentialStore,
    F: Fn() -> Result<S, KeyringError> + Send + Sync,
{
    pub fn new(open: F) -> Self {
        Self {
            open,
            store: OnceLock::new(),
        }
    }

    /// Whether the store has been opened successfully
    pub fn is_open(&self) -> bool {
        matches!(self.store.get(), Some(Ok(_)))
    }

    fn store(&self) -> Result<&S, KeyringError> {
        let opened = self.store.get_or_init(|| {
            debug!("opening credential store on first read");
            (self.open)().map_err(|e| e.to_string())
        });
        match opened {
            Ok(store) => Ok(store),
            Err(message) => Err(KeyringError::Unavailable(message.clone())),
        }
    }
}

impl<S, F> CredentialStore for LazyStore<S, F>
where
    S: CredentialStore,
    F: Fn() -> Result<S, KeyringError> + Send + Sync,
{
    fn get(&self, key: &str) -> Result<String, KeyringError> {
        self.store()?.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_opens_on_first_read_only() {
        let opens = AtomicUsize::new(0);
        let store = LazyStore::new(|| {
            opens.fetch_add(1, Ordering::SeqCst);
            Ok(MemoryStore::new().with("a", "1"))
        });

        assert_eq!(opens.load(Ordering::SeqCst), 0);
        assert!(!store.is_open());

        assert_eq!(store.get("a").unwrap(), "1");
        assert!(store.get("b").unwrap_err().is_not_found());
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert!(store.is_open());
    }

    #[test]
    fn test_failed_open_is_remembered() {
        let opens = AtomicUsize::new(0);
        let store = LazyStore::new(|| -> Result<MemoryStore, KeyringError> {
            opens.fetch_add(1, Ordering::SeqCst);
            Err(KeyringError::Decryption("bad passphrase".into()))
        });

        for _ in 0..2 {
            let err = store.get("a").unwrap_err();
            assert!(!err.is_not_found());
            assert_eq!(
                err.to_string(),
                "keyring unavailable: decryption error: bad passphrase"
            );
        }
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert!(!store.is_open());
    }
}
