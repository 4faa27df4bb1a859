//! Encryption key material and secret encryption.

pub mod encryption;
pub mod provider;

pub use encryption::AesGcmEncryptionService;
pub use provider::EnvSecretsProvider;
