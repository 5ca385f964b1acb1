//! Decrypted YAML documents and dotted-path lookup

use serde_yaml::Value;

use crate::error::VaultError;

/// Separator between segments of a key path
pub const KEY_DELIMITER: char = '.';

/// A parsed vault document. Built per lookup and dropped afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    pub fn parse(plaintext: &[u8]) -> Result<Self, VaultError> {
        let text = std::str::from_utf8(plaintext)
            .map_err(|e| VaultError::ParseFailed(format!("not UTF-8: {}", e)))?;
        let root: Value =
            serde_yaml::from_str(text).map_err(|e| VaultError::ParseFailed(e.to_string()))?;
        Ok(Self { root })
    }

    /// The node at `key_path`, if every segment resolves through a mapping
    pub fn get(&self, key_path: &str) -> Option<&Value> {
        key_path
            .split(KEY_DELIMITER)
            .try_fold(&self.root, |node, segment| match untag(node) {
                Value::Mapping(map) => map.get(segment).or_else(|| {
                    map.iter()
                        .find(|(k, _)| scalar_text(k).as_deref() == Some(segment))
                        .map(|(_, v)| v)
                }),
                _ => None,
            })
    }

    /// Scalar at `key_path` as text.
    ///
    /// Absent keys, nulls, mappings and sequences all come back as the
    /// empty string, which callers treat as "not found".
    pub fn get_string(&self, key_path: &str) -> String {
        self.get(key_path)
            .and_then(scalar_text)
            .unwrap_or_default()
    }

    /// [`Document::get_string`], with the empty string reported as [`VaultError::KeyNotFound`]
    pub fn lookup(&self, key_path: &str) -> Result<String, VaultError> {
        // TODO: tell a present-but-empty value apart from a missing key once
        // template callers stop relying on the two being the same error.
        let value = self.get_string(key_path);
        if value.is_empty() {
            return Err(VaultError::KeyNotFound(key_path.to_string()));
        }
        Ok(value)
    }
}

/// Text of a string, number or bool. Mapping keys are matched the same way.
fn scalar_text(value: &Value) -> Option<String> {
    match untag(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}
