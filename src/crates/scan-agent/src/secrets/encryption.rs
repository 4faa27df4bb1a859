//! AES-256-GCM encryption of configuration secrets.
//!
//! Ciphertexts are `base64(nonce[12] || ciphertext)`; the key is 32 bytes of
//! base64-encoded material obtained from a [`SecretsProvider`].

use crate::error::{Result, ScanError};
use crate::ports::{EncryptionService, SecretsProvider};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use tokio::sync::OnceCell;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

pub struct AesGcmEncryptionService {
    secrets: Arc<dyn SecretsProvider>,
    key: OnceCell<[u8; KEY_LEN]>,
}

impl AesGcmEncryptionService {
    pub fn new(secrets: Arc<dyn SecretsProvider>) -> Self {
        Self {
            secrets,
            key: OnceCell::new(),
        }
    }

    /// Generate fresh base64 key material.
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    async fn cipher(&self) -> Result<Aes256Gcm> {
        let key = self
            .key
            .get_or_try_init(|| async {
                let encoded = self
                    .secrets
                    .get_secret()
                    .await?
                    .ok_or_else(|| ScanError::Encryption("Encryption key not available".to_string()))?;
                decode_key(&encoded)
            })
            .await?;

        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
    }
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_LEN]> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| ScanError::Encryption(format!("Encryption key is not valid base64: {}", e)))?;

    <[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        ScanError::Encryption(format!(
            "Encryption key must be {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        ))
    })
}

#[async_trait]
impl EncryptionService for AesGcmEncryptionService {
    async fn encrypt(&self, value: &str) -> Result<String> {
        let cipher = self.cipher().await?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, value.as_bytes())
            .map_err(|e| ScanError::Encryption(format!("Encryption failed: {}", e)))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(combined))
    }

    async fn decrypt(&self, value: &str) -> Result<String> {
        let cipher = self.cipher().await?;

        let data = BASE64
            .decode(value.trim())
            .map_err(|e| ScanError::Encryption(format!("Ciphertext is not valid base64: {}", e)))?;
        if data.len() <= NONCE_LEN {
            return Err(ScanError::Encryption("Invalid encrypted data: too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| ScanError::Encryption("Decryption failed: wrong key or corrupted data".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| ScanError::Encryption(format!("Decrypted value is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSecretsProvider;

    fn service(key: Option<String>) -> AesGcmEncryptionService {
        AesGcmEncryptionService::new(Arc::new(StaticSecretsProvider::new(key)))
    }

    #[tokio::test]
    async fn test_encrypt_decrypt_roundtrip() {
        let svc = service(Some(AesGcmEncryptionService::generate_key()));
        let encrypted = svc.encrypt("sk-ant-secret").await.unwrap();

        assert_ne!(encrypted, "sk-ant-secret");
        assert_eq!(svc.decrypt(&encrypted).await.unwrap(), "sk-ant-secret");
    }

    #[tokio::test]
    async fn test_nonce_makes_ciphertexts_differ() {
        let svc = service(Some(AesGcmEncryptionService::generate_key()));
        let a = svc.encrypt("same").await.unwrap();
        let b = svc.encrypt("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_wrong_key_fails() {
        let encrypted = service(Some(AesGcmEncryptionService::generate_key()))
            .encrypt("value")
            .await
            .unwrap();
        let other = service(Some(AesGcmEncryptionService::generate_key()));

        let err = other.decrypt(&encrypted).await.unwrap_err();
        assert!(matches!(err, ScanError::Encryption(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_encryption_error() {
        let err = service(None).encrypt("value").await.unwrap_err();
        assert!(matches!(err, ScanError::Encryption(ref msg) if msg.contains("not available")));
    }

    #[tokio::test]
    async fn test_short_key_is_rejected() {
        let err = service(Some(BASE64.encode([1u8; 16])))
            .encrypt("value")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Encryption(ref msg) if msg.contains("32 bytes")));
    }

    #[tokio::test]
    async fn test_truncated_ciphertext_is_rejected() {
        let svc = service(Some(AesGcmEncryptionService::generate_key()));
        let err = svc.decrypt(&BASE64.encode([0u8; 8])).await.unwrap_err();
        assert!(matches!(err, ScanError::Encryption(_)));
    }
}
