//! Vault text envelope: header line plus hex-wrapped payload

use crate::CipherError;

/// First field of every vault header
pub const HEADER_TAG: &str = "$ANSIBLE_VAULT";

/// The only cipher Ansible still writes
pub const CIPHER_AES256: &str = "AES256";

/// Hex body line width used when writing
const LINE_WIDTH: usize = 80;

/// Parsed `$ANSIBLE_VAULT;<version>;<cipher>[;<vault id>]` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHeader {
    pub version: String,
    pub cipher: String,
    /// Only present in 1.2 headers
    pub vault_id: Option<String>,
}

impl Default for VaultHeader {
    fn default() -> Self {
        Self {
            version: "1.1".to_string(),
            cipher: CIPHER_AES256.to_string(),
            vault_id: None,
        }
    }
}

impl VaultHeader {
    pub fn parse(line: &str) -> Result<Self, CipherError> {
        let fields: Vec<&str> = line.trim().split(';').map(str::trim).collect();
        if fields.first() != Some(&HEADER_TAG) {
            return Err(CipherError::NotVault);
        }
        if fields.len() < 3 {
            return Err(CipherError::InvalidHeader(line.trim().to_string()));
        }

        let version = fields[1];
        let vault_id = match (version, fields.len()) {
            ("1.1", 3) => None,
            ("1.2", 4) => Some(fields[3].to_string()),
            ("1.1", _) | ("1.2", _) => {
                return Err(CipherError::InvalidHeader(line.trim().to_string()))
            }
            (other, _) => return Err(CipherError::UnsupportedVersion(other.to_string())),
        };

        if fields[2] != CIPHER_AES256 {
            return Err(CipherError::UnsupportedCipher(fields[2].to_string()));
        }

        Ok(Self {
            version: version.to_string(),
            cipher: fields[2].to_string(),
            vault_id,
        })
    }
}

impl std::fmt::Display for VaultHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{};{};{}", HEADER_TAG, self.version, self.cipher)?;
        if let Some(id) = &self.vault_id {
            write!(f, ";{}", id)?;
        }
        Ok(())
    }
}

/// Decoded vault payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub salt: Vec<u8>,
    pub hmac: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Split vault text into its header and decoded payload
pub fn open(vault_text: &[u8]) -> Result<(VaultHeader, Payload), CipherError> {
    let text = std::str::from_utf8(vault_text)
        .map_err(|_| CipherError::Encoding("vault text is not UTF-8".to_string()))?;
    let text = text.trim_start_matches('\u{feff}');

    let mut lines = text.lines();
    let header = VaultHeader::parse(lines.next().unwrap_or_default())?;

    let body: String = lines.flat_map(|line| line.split_whitespace()).collect();
    let inner = decode_hex(&body, "body")?;
    let inner = String::from_utf8(inner)
        .map_err(|_| CipherError::Encoding("payload is not hex text".to_string()))?;

    let mut parts = inner.splitn(3, '\n');
    let (salt, hmac, ciphertext) = match (parts.next(), parts.next(), parts.next()) {
        (Some(salt), Some(hmac), Some(ciphertext)) => (salt, hmac, ciphertext),
        _ => {
            return Err(CipherError::Encoding(
                "payload must have salt, hmac and ciphertext".to_string(),
            ))
        }
    };

    Ok((
        header,
        Payload {
            salt: decode_hex(salt.trim(), "salt")?,
            hmac: decode_hex(hmac.trim(), "hmac")?,
            ciphertext: decode_hex(ciphertext.trim(), "ciphertext")?,
        },
    ))
}

/// Render a payload as vault text, newline terminated
pub fn seal(header: &VaultHeader, payload: &Payload) -> String {
    let inner = format!(
        "{}\n{}\n{}",
        hex::encode(&payload.salt),
        hex::encode(&payload.hmac),
        hex::encode(&payload.ciphertext)
    );
    let body = hex::encode(inner.as_bytes());

    let mut out = header.to_string();
    out.push('\n');
    // hex output is ASCII, so byte chunks are char boundaries
    for chunk in body.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out
}

fn decode_hex(data: &str, what: &str) -> Result<Vec<u8>, CipherError> {
    hex::decode(data).map_err(|e| CipherError::Encoding(format!("{}: {}", what, e)))
}
