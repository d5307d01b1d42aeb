//! Principal secrets: `(clientId, mainSecretHash, secondarySecretHash,
//! principalId)`, stored in the secrets slice and referenced from a
//! principal's `internalProperties.client_id`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalSecrets {
    pub client_id: String,
    pub principal_id: i64,
    pub main_secret_hash: String,
    pub secondary_secret_hash: Option<String>,
}

impl PrincipalSecrets {
    pub fn new(
        client_id: impl Into<String>,
        principal_id: i64,
        main_secret_hash: impl Into<String>,
        secondary_secret_hash: Option<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            principal_id,
            main_secret_hash: main_secret_hash.into(),
            secondary_secret_hash,
        }
    }
}

/// Plaintext pair returned once, at generation/rotation time, to the
/// caller. Never persisted; the entity and the secrets slice only ever see
/// the hashed forms.
#[derive(Debug, Clone)]
pub struct PrincipalSecretsCredentials {
    pub client_id: String,
    pub main_secret: String,
}
