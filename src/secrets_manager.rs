//! `UserSecretsManager`: the secrets collaborator interface. The only
//! object crossing the core/secrets-manager boundary is
//! `UserSecretReference` — plaintext never persists in an entity.

use async_trait::async_trait;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::core::{PolarisError, Result};

/// `urn:polaris-secret:<scheme>:<entity-id>:<ordinal>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSecretReference {
    pub urn: String,
    pub reference_payload: String,
}

#[async_trait]
pub trait UserSecretsManager: Send + Sync {
    async fn write_secret(&self, plaintext: &str, for_entity: i64) -> Result<UserSecretReference>;
    async fn read_secret(&self, reference: &UserSecretReference) -> Result<String>;
    async fn delete_secret(&self, reference: &UserSecretReference) -> Result<()>;
}

/// Reference implementation: ciphertext is base64 of the plaintext bytes
/// (no real encryption — this is the in-memory reference backend, not a
/// production secret store) with a SHA-256 digest of the base64 text
/// carried alongside as the integrity tag. A production backend should
/// use a cryptographic MAC instead of a bare hash here.
#[derive(Default)]
pub struct InMemorySecretsManager {
    store: tokio::sync::RwLock<std::collections::HashMap<String, StoredSecret>>,
}

struct StoredSecret {
    ciphertext_b64: String,
    digest_hex: String,
}

impl InMemorySecretsManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn digest(ciphertext_b64: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ciphertext_b64.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl UserSecretsManager for InMemorySecretsManager {
    async fn write_secret(&self, plaintext: &str, for_entity: i64) -> Result<UserSecretReference> {
        let ciphertext_b64 = base64::engine::general_purpose::STANDARD.encode(plaintext.as_bytes());
        let digest_hex = Self::digest(&ciphertext_b64);

        let mut store = self.store.write().await;
        let ordinal = store.len();
        let urn = format!("urn:polaris-secret:memory:{}:{}", for_entity, ordinal);
        store.insert(
            urn.clone(),
            StoredSecret {
                ciphertext_b64: ciphertext_b64.clone(),
                digest_hex: digest_hex.clone(),
            },
        );

        Ok(UserSecretReference {
            urn,
            reference_payload: digest_hex,
        })
    }

    async fn read_secret(&self, reference: &UserSecretReference) -> Result<String> {
        let store = self.store.read().await;
        let stored = store
            .get(&reference.urn)
            .ok_or_else(|| PolarisError::SecretIntegrity(reference.urn.clone()))?;

        let expected_digest = Self::digest(&stored.ciphertext_b64);
        if expected_digest != stored.digest_hex || expected_digest != reference.reference_payload {
            return Err(PolarisError::SecretIntegrity(reference.urn.clone()));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&stored.ciphertext_b64)
            .map_err(|e| PolarisError::SecretIntegrity(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| PolarisError::SecretIntegrity(e.to_string()))
    }

    async fn delete_secret(&self, reference: &UserSecretReference) -> Result<()> {
        self.store.write().await.remove(&reference.urn);
        Ok(())
    }
}

/// Test-only hook: corrupts the stored ciphertext bytes so callers can
/// exercise the integrity-check failure path.
#[cfg(any(test, feature = "test-util"))]
impl InMemorySecretsManager {
    pub async fn corrupt_for_test(&self, urn: &str) {
        if let Some(stored) = self.store.write().await.get_mut(urn) {
            stored.ciphertext_b64.push('x');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn corrupted_ciphertext_fails_the_integrity_check() {
        let manager = InMemorySecretsManager::new();
        let reference = manager.write_secret("top-secret", 7).await.unwrap();
        assert_eq!(manager.read_secret(&reference).await.unwrap(), "top-secret");

        manager.corrupt_for_test(&reference.urn).await;
        let result = manager.read_secret(&reference).await;
        assert!(matches!(result, Err(PolarisError::SecretIntegrity(_))));
    }

    #[tokio::test]
    async fn reference_payload_tampering_is_detected() {
        let manager = InMemorySecretsManager::new();
        let mut reference = manager.write_secret("another-secret", 8).await.unwrap();
        reference.reference_payload.push('0');
        let result = manager.read_secret(&reference).await;
        assert!(matches!(result, Err(PolarisError::SecretIntegrity(_))));
    }
}

