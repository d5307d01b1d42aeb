//! The individual persistence "slices", each its own trait so a backend
//! can compose them from distinct underlying stores.

use async_trait::async_trait;

use crate::core::{CallContext, Result};
use crate::model::{EntityType, GrantRecord, PolarisEntity, PrincipalSecrets, SubType};

#[async_trait]
pub trait ActiveNameSlice: Send + Sync {
    async fn lookup_entity_by_name(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        parent_id: i64,
        type_code: EntityType,
        name: &str,
    ) -> Result<Option<PolarisEntity>>;

    async fn lookup_entity_id_and_sub_type_by_name(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        parent_id: i64,
        type_code: EntityType,
        name: &str,
    ) -> Result<Option<(i64, SubType)>>;

    /// Lists active entities under `(catalog_id, parent_id, type_code)`, in
    /// no particular order, honoring `limit` when given (`usize::MAX` for
    /// "no limit").
    async fn list_entities(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        parent_id: i64,
        type_code: EntityType,
        limit: usize,
    ) -> Result<Vec<PolarisEntity>>;

    async fn has_children(
        &self,
        ctx: &CallContext,
        type_code: Option<EntityType>,
        catalog_id: i64,
        parent_id: i64,
    ) -> Result<bool>;
}

#[async_trait]
pub trait ChangeTrackingSlice: Send + Sync {
    async fn lookup_entity_versions(
        &self,
        ctx: &CallContext,
        ids: &[(i64, i64)],
    ) -> Result<Vec<Option<(i64, i64)>>>;

    async fn lookup_entity_grant_records_version(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
    ) -> Result<Option<i64>>;
}

#[async_trait]
pub trait GrantRecordsSlice: Send + Sync {
    async fn write_to_grant_records(&self, ctx: &CallContext, record: &GrantRecord) -> Result<()>;

    async fn delete_from_grant_records(
        &self,
        ctx: &CallContext,
        record: &GrantRecord,
    ) -> Result<bool>;

    /// Deletes every grant touching `entity`. `on_grantee`/`on_securable`
    /// select which role(s) to clear, used when dropping an entity that
    /// may be both (e.g. a catalog role).
    async fn delete_all_entity_grant_records(
        &self,
        ctx: &CallContext,
        entity: &PolarisEntity,
        on_grantee: bool,
        on_securable: bool,
    ) -> Result<Vec<GrantRecord>>;

    async fn load_all_grant_records_on_grantee(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
    ) -> Result<Vec<GrantRecord>>;

    async fn load_all_grant_records_on_securable(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
    ) -> Result<Vec<GrantRecord>>;

    async fn lookup_grant_record(
        &self,
        ctx: &CallContext,
        record: &GrantRecord,
    ) -> Result<Option<GrantRecord>>;
}

#[async_trait]
pub trait SecretsSlice: Send + Sync {
    async fn load_principal_secrets(
        &self,
        ctx: &CallContext,
        client_id: &str,
    ) -> Result<Option<PrincipalSecrets>>;

    /// Generates and stores a fresh `(clientId, secrets)` pair for a newly
    /// created principal. Returns the plaintext pair once; only the hash is
    /// retained.
    async fn generate_new_principal_secrets(
        &self,
        ctx: &CallContext,
        principal_name: &str,
        principal_id: i64,
    ) -> Result<crate::model::PrincipalSecretsCredentials>;

    /// Rotates the main secret (and, when `reset` is true, marks rotation
    /// as required going forward). `old_secret_hash` is compared against
    /// the stored hash as an optimistic-concurrency witness; a mismatch
    /// means someone rotated concurrently.
    async fn rotate_principal_secrets(
        &self,
        ctx: &CallContext,
        client_id: &str,
        principal_id: i64,
        reset: bool,
        old_secret_hash: &str,
    ) -> Result<Option<crate::model::PrincipalSecretsCredentials>>;

    async fn delete_principal_secrets(
        &self,
        ctx: &CallContext,
        client_id: &str,
        principal_id: i64,
    ) -> Result<()>;
}

/// Opaque, backend-specific storage configuration for a catalog (the JSON
/// document carried in `internalProperties.storage-configuration-info`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageConfigInfo {
    pub storage_type: String,
    pub allowed_locations: Vec<String>,
    pub config_json: String,
}

#[async_trait]
pub trait StorageIntegrationSlice: Send + Sync {
    async fn create_storage_integration(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        entity_id: i64,
        config: &StorageConfigInfo,
    ) -> Result<String>;

    /// Persists `integration` for `entity` if it is not already persisted
    /// (idempotent under retry, matching the rest of the write path).
    async fn persist_storage_integration_if_needed(
        &self,
        ctx: &CallContext,
        entity: &PolarisEntity,
        integration: Option<&StorageConfigInfo>,
    ) -> Result<()>;

    async fn load_polaris_storage_integration(
        &self,
        ctx: &CallContext,
        entity: &PolarisEntity,
    ) -> Result<Option<StorageConfigInfo>>;
}
