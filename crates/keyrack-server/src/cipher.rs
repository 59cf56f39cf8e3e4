use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;
use zeroize::Zeroize;

/// AES block size in bytes. Padding and alignment checks are in terms of it.
pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("cipher key must be 16, 24, or 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    /// The stored value is not something this cipher ever produced.
    /// The message never contains the offending bytes.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(&'static str),
}

#[derive(Clone)]
enum AesFlavor {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

/// Deterministic password cipher: AES-ECB over PKCS#7-padded input,
/// base64-encoded for storage in a string column.
///
/// No nonce or IV is involved, so a given key and plaintext always produce
/// the same ciphertext. That determinism is load-bearing: values written by
/// earlier deployments must keep decrypting byte-for-byte, and the golden
/// test below pins the format.
#[derive(Clone)]
pub struct Cipher {
    engine: AesFlavor,
}

impl Cipher {
    /// Builds a cipher from an injected key. The key length selects the
    /// AES variant: 16 → AES-128, 24 → AES-192, 32 → AES-256.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let engine = match key.len() {
            16 => AesFlavor::Aes128(Aes128::new_from_slice(key).expect("length checked")),
            24 => AesFlavor::Aes192(Aes192::new_from_slice(key).expect("length checked")),
            32 => AesFlavor::Aes256(Aes256::new_from_slice(key).expect("length checked")),
            n => return Err(CipherError::InvalidKeyLength(n)),
        };
        Ok(Self { engine })
    }

    /// Encrypts a plaintext password to its stored form.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut buf = pad(plaintext.as_bytes());
        for chunk in buf.chunks_mut(BLOCK_SIZE) {
            let block = Block::from_mut_slice(chunk);
            match &self.engine {
                AesFlavor::Aes128(c) => c.encrypt_block(block),
                AesFlavor::Aes192(c) => c.encrypt_block(block),
                AesFlavor::Aes256(c) => c.encrypt_block(block),
            }
        }
        let encoded = BASE64.encode(&buf);
        buf.zeroize();
        encoded
    }

    /// Decrypts a stored value back to the plaintext password.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let mut buf = BASE64
            .decode(ciphertext)
            .map_err(|_| CipherError::MalformedCiphertext("invalid base64"))?;
        if buf.is_empty() || buf.len() % BLOCK_SIZE != 0 {
            buf.zeroize();
            return Err(CipherError::MalformedCiphertext("not block aligned"));
        }

        for chunk in buf.chunks_mut(BLOCK_SIZE) {
            let block = Block::from_mut_slice(chunk);
            match &self.engine {
                AesFlavor::Aes128(c) => c.decrypt_block(block),
                AesFlavor::Aes192(c) => c.decrypt_block(block),
                AesFlavor::Aes256(c) => c.decrypt_block(block),
            }
        }

        // Trailing byte is the pad length; the whole tail is padding.
        let pad_len = *buf.last().expect("non-empty") as usize;
        if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > buf.len() {
            buf.zeroize();
            return Err(CipherError::MalformedCiphertext("invalid padding"));
        }
        buf.truncate(buf.len() - pad_len);

        String::from_utf8(buf).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            CipherError::MalformedCiphertext("not valid utf-8")
        })
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

/// PKCS#7: pad to the next block boundary. Input already on a boundary
/// gets a full extra block of padding, so the pad length is always 1..=16.
fn pad(input: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - input.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(input.len() + pad_len);
    out.extend_from_slice(input);
    out.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    out
}
