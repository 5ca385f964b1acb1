//! The `AES256` vault cipher

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::envelope::Payload;
use crate::CipherError;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const SALT_LEN: usize = 32;
pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;
pub const PBKDF2_ROUNDS: u32 = 10_000;

const BLOCK_LEN: usize = 16;

/// Cipher key, HMAC key and CTR IV derived from one passphrase and salt
struct DerivedKeys {
    cipher_key: [u8; KEY_LEN],
    hmac_key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl DerivedKeys {
    fn derive(passphrase: &[u8], salt: &[u8]) -> Self {
        let mut okm = [0u8; 2 * KEY_LEN + IV_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, PBKDF2_ROUNDS, &mut okm);

        let mut keys = Self {
            cipher_key: [0u8; KEY_LEN],
            hmac_key: [0u8; KEY_LEN],
            iv: [0u8; IV_LEN],
        };
        keys.cipher_key.copy_from_slice(&okm[..KEY_LEN]);
        keys.hmac_key.copy_from_slice(&okm[KEY_LEN..2 * KEY_LEN]);
        keys.iv.copy_from_slice(&okm[2 * KEY_LEN..]);
        keys
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.hmac_key).expect("HMAC accepts any key length")
    }

    fn apply_keystream(&self, data: &mut [u8]) {
        let mut cipher = Aes256Ctr::new(&self.cipher_key.into(), &self.iv.into());
        cipher.apply_keystream(data);
    }
}

/// Encrypt with a fresh random salt
pub fn encrypt(plaintext: &[u8], passphrase: &[u8]) -> Payload {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    encrypt_with_salt(plaintext, passphrase, &salt)
}

/// Encrypt with a caller supplied salt
pub fn encrypt_with_salt(plaintext: &[u8], passphrase: &[u8], salt: &[u8]) -> Payload {
    let keys = DerivedKeys::derive(passphrase, salt);

    let mut ciphertext = pad(plaintext);
    keys.apply_keystream(&mut ciphertext);

    let mut mac = keys.mac();
    mac.update(&ciphertext);
    let hmac = mac.finalize().into_bytes().to_vec();

    Payload {
        salt: salt.to_vec(),
        hmac,
        ciphertext,
    }
}

/// Verify the payload's HMAC, then decrypt and unpad it
pub fn decrypt(payload: &Payload, passphrase: &[u8]) -> Result<Vec<u8>, CipherError> {
    let keys = DerivedKeys::derive(passphrase, &payload.salt);

    let mut mac = keys.mac();
    mac.update(&payload.ciphertext);
    mac.verify_slice(&payload.hmac)
        .map_err(|_| CipherError::IntegrityCheckFailed)?;

    let mut plaintext = payload.ciphertext.clone();
    keys.apply_keystream(&mut plaintext);
    unpad(plaintext)
}

fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_LEN - data.len() % BLOCK_LEN;
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

fn unpad(mut data: Vec<u8>) -> Result<Vec<u8>, CipherError> {
    let pad_len = match data.last() {
        Some(&n) => n as usize,
        None => return Err(CipherError::InvalidPadding),
    };
    if pad_len == 0 || pad_len > BLOCK_LEN || pad_len > data.len() {
        return Err(CipherError::InvalidPadding);
    }
    if !data[data.len() - pad_len..].iter().all(|&b| b as usize == pad_len) {
        return Err(CipherError::InvalidPadding);
    }
    data.truncate(data.len() - pad_len);
    Ok(data)
}
