//! Passphrase resolution
//!
//! A vault's passphrase lives in the keyring under
//! `ansible-vault:<normalized path>`, so it can be provisioned ahead of
//! time by anyone who knows where the vault file sits.

use vaultget_keyring::CredentialStore;
use std::path::Path;
use tracing::debug;

use crate::error::LookupError;

/// Namespace tag for vault passphrases in the keyring
pub const ANSIBLE_VAULT_KEY_PREFIX: &str = "ansible-vault:";

/// Keyring key for `file_path`.
///
/// `foo/v.yaml`, `./foo/v.yaml`, `foo\v.yaml` and `<work_dir>/foo/v.yaml`
/// all map to `ansible-vault:foo/v.yaml`.
pub fn store_key(file_path: &str, work_dir: &Path) -> String {
    format!("{}{}", ANSIBLE_VAULT_KEY_PREFIX, normalize_path(file_path, work_dir))
}

/// Slash-separated, lexically cleaned path, relative to `work_dir` when
/// it lies beneath it
pub fn normalize_path(file_path: &str, work_dir: &Path) -> String {
    let path = clean(&file_path.replace('\\', "/"));
    let base = clean(&work_dir.to_string_lossy().replace('\\', "/"));

    if !Path::new(&path).is_absolute() && !path.starts_with('/') {
        return path;
    }

    let prefix = if base.ends_with('/') {
        base
    } else {
        format!("{}/", base)
    };
    match path.strip_prefix(&prefix) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => path,
    }
}

/// Drop `.` and empty segments, fold `a/..` pairs
fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Looks up vault passphrases in an injected credential store
pub struct PassphraseResolver<'a> {
    store: &'a dyn CredentialStore,
    work_dir: &'a Path,
    product: &'a str,
}

impl<'a> PassphraseResolver<'a> {
    /// `product` names the binary in the provisioning hint
    pub fn new(store: &'a dyn CredentialStore, work_dir: &'a Path, product: &'a str) -> Self {
        Self {
            store,
            work_dir,
            product,
        }
    }

    /// Passphrase for the vault at `file_path`
    pub fn resolve_passphrase(&self, file_path: &str) -> Result<String, LookupError> {
        let key = store_key(file_path, self.work_dir);
        debug!(file = file_path, key = %key, "resolving vault passphrase");

        self.store.get(&key).map_err(|err| {
            if err.is_not_found() {
                LookupError::CredentialNotFound {
                    file: file_path.to_string(),
                    key,
                    product: self.product.to_string(),
                }
            } else {
                LookupError::StoreError {
                    file: file_path.to_string(),
                    source: err,
                }
            }
        })
    }
}
