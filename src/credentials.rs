//! `StorageIntegration`: the credential vendor collaborator, consumed by
//! `getSubscopedCredsForEntity` and `validateAccessToLocations`.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::{CallContext, Result};
use crate::persistence::slices::StorageConfigInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CredentialProperty {
    AwsAccessKeyId,
    AwsSecretAccessKey,
    AwsSessionToken,
    AzureSasToken,
    GcsAccessToken,
    ExpirationTimeMillis,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialVendorError {
    #[error("storage integration rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait StorageIntegration: Send + Sync {
    async fn get_subscoped_creds(
        &self,
        ctx: &CallContext,
        config: &StorageConfigInfo,
        allow_list: &[String],
        read_locations: &[String],
        write_locations: &[String],
    ) -> std::result::Result<HashMap<CredentialProperty, String>, CredentialVendorError>;

    async fn validate_access_to_locations(
        &self,
        ctx: &CallContext,
        config: &StorageConfigInfo,
        actions: &[String],
        locations: &[String],
    ) -> Result<HashMap<String, String>>;
}

/// Reference adapter: vends a deterministic placeholder credential scoped
/// to the requested locations, and validates access by checking each
/// location is a prefix match of one of the config's allowed locations.
/// Good enough to exercise the manager's `SUBSCOPE_CREDS_ERROR` path and
/// the location-validation contract; a real adapter talks to STS/IAM.
#[derive(Default)]
pub struct ReferenceStorageIntegration;

#[async_trait]
impl StorageIntegration for ReferenceStorageIntegration {
    async fn get_subscoped_creds(
        &self,
        ctx: &CallContext,
        config: &StorageConfigInfo,
        allow_list: &[String],
        read_locations: &[String],
        write_locations: &[String],
    ) -> std::result::Result<HashMap<CredentialProperty, String>, CredentialVendorError> {
        let requested: Vec<&String> = read_locations.iter().chain(write_locations).collect();
        for loc in &requested {
            let allowed = allow_list.is_empty()
                || allow_list.iter().any(|prefix| loc.starts_with(prefix.as_str()));
            let within_config = config
                .allowed_locations
                .iter()
                .any(|prefix| loc.starts_with(prefix.as_str()));
            if !allowed || !within_config {
                return Err(CredentialVendorError::Rejected(format!(
                    "location '{}' is not within the catalog's allowed locations",
                    loc
                )));
            }
        }

        let mut creds = HashMap::new();
        creds.insert(
            CredentialProperty::AwsAccessKeyId,
            format!("ASIA-SCOPED-{}", config.storage_type),
        );
        creds.insert(
            CredentialProperty::AwsSecretAccessKey,
            "scoped-secret".to_string(),
        );
        creds.insert(
            CredentialProperty::AwsSessionToken,
            "scoped-session-token".to_string(),
        );
        creds.insert(
            CredentialProperty::ExpirationTimeMillis,
            (ctx.now_millis() + 3_600_000).to_string(),
        );
        Ok(creds)
    }

    async fn validate_access_to_locations(
        &self,
        _ctx: &CallContext,
        config: &StorageConfigInfo,
        actions: &[String],
        locations: &[String],
    ) -> Result<HashMap<String, String>> {
        let mut results = HashMap::new();
        for loc in locations {
            let allowed = config
                .allowed_locations
                .iter()
                .any(|prefix| loc.starts_with(prefix.as_str()));
            let verdict = if allowed {
                format!("ALLOWED:{}", actions.join(","))
            } else {
                "DENIED:outside_allowed_locations".to_string()
            };
            results.insert(loc.clone(), verdict);
        }
        Ok(results)
    }
}
