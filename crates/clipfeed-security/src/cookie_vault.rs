use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::Engine;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const B64: base64::engine::general_purpose::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// AES-256-GCM vault for per-user per-platform credentials (§4.12). The key
/// is derived once from a server-wide secret and held for the process
/// lifetime; the secret itself is never stored.
pub struct CookieVault {
    cipher: Aes256Gcm,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ciphertext is too short to contain a nonce")]
    Truncated,
    #[error("invalid base64 encoding")]
    Base64(#[from] base64::DecodeError),
}

impl CookieVault {
    /// Derives the AES-256 key as SHA-256 of `secret` (§4.12). `secret`
    /// should be the server-wide credential secret from configuration.
    pub fn new(secret: &str) -> Self {
        let mut key_bytes: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
        key_bytes.zeroize();
        Self { cipher }
    }

    /// Encrypts `plaintext`, prepending a freshly generated nonce to the
    /// ciphertext and base64-encoding the result for storage.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .expect("AES-256-GCM encryption of a bounded plaintext cannot fail");

        let mut out = Vec::with_capacity(nonce.len() + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        B64.encode(out)
    }

    /// Decrypts a value produced by [`encrypt`](Self::encrypt). Per §4.12,
    /// any failure (malformed base64, truncated input, a bad GCM tag) is
    /// reported as `None` so callers treat it as "no credential" rather
    /// than surfacing a decryption error to the user.
    pub fn decrypt(&self, stored: &str) -> Option<String> {
        self.try_decrypt(stored).ok()
    }

    fn try_decrypt(&self, stored: &str) -> Result<String, Error> {
        let raw = B64.decode(stored)?;
        if raw.len() < 12 {
            return Err(Error::Truncated);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::Truncated)?;

        Ok(String::from_utf8_lossy(&plaintext).into_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_a_credential() {
        let vault = CookieVault::new("server-wide-secret");
        let stored = vault.encrypt("session=abc123; path=/");
        assert_eq!(vault.decrypt(&stored).as_deref(), Some("session=abc123; path=/"));
    }

    #[test]
    fn different_writes_use_different_nonces() {
        let vault = CookieVault::new("server-wide-secret");
        let a = vault.encrypt("same plaintext");
        let b = vault.encrypt("same plaintext");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_yields_no_credential_not_an_error() {
        let writer = CookieVault::new("secret-a");
        let reader = CookieVault::new("secret-b");
        let stored = writer.encrypt("session=abc123");
        assert_eq!(reader.decrypt(&stored), None);
    }

    #[test]
    fn truncated_ciphertext_yields_no_credential() {
        let vault = CookieVault::new("server-wide-secret");
        assert_eq!(vault.decrypt(&B64.encode(b"short")), None);
    }

    #[test]
    fn malformed_base64_yields_no_credential() {
        let vault = CookieVault::new("server-wide-secret");
        assert_eq!(vault.decrypt("not valid base64!!"), None);
    }

    #[test]
    fn tampered_ciphertext_fails_the_gcm_tag() {
        let vault = CookieVault::new("server-wide-secret");
        let stored = vault.encrypt("session=abc123");
        let mut raw = B64.decode(&stored).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        assert_eq!(vault.decrypt(&B64.encode(raw)), None);
    }
}
