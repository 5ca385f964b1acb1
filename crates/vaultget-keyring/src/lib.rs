//! vaultget-keyring - Credential store for vaultget
//!
//! A narrow read contract ([`CredentialStore`]) that the lookup pipeline
//! depends on, plus two stores implementing it: an in-memory map and an
//! age-encrypted file that persists between runs. [`LazyStore`] puts off
//! opening a store until the first key is read.

pub mod file;
pub mod lazy;
pub mod memory;
pub mod store;

pub use file::FileStore;
pub use lazy::LazyStore;
pub use memory::MemoryStore;
pub use store::{validate_key, CredentialStore, KeyringError};
