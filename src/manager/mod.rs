//! The Metastore Manager public contract and its two strategy
//! implementations.

pub mod atomic;
pub mod bootstrap;
pub mod support;
pub mod transactional;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::{CallContext, Result};
use crate::credentials::CredentialProperty;
use crate::model::{EntityRef, EntityType, GrantRecord, MetastoreStatus, PolarisEntity, PrincipalSecrets, PrincipalSecretsCredentials, Properties, EntityResult};
use crate::persistence::slices::StorageConfigInfo;
use crate::resolver::PathEntry;

pub use atomic::AtomicMetastoreManager;
pub use transactional::TransactionalMetastoreManager;

#[derive(Debug, Clone)]
pub struct CreatedCatalog {
    pub catalog: PolarisEntity,
    pub catalog_admin_role: PolarisEntity,
}

#[derive(Debug, Clone)]
pub struct CreatedPrincipal {
    pub entity: PolarisEntity,
    pub credentials: PrincipalSecretsCredentials,
}

#[derive(Debug, Clone)]
pub struct GrantsView {
    pub grant_records_version: i64,
    pub grants: Vec<GrantRecord>,
    pub counterparties: Vec<PolarisEntity>,
}

#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub entity: PolarisEntity,
    pub grant_records_version: i64,
    pub grants_on_securable: Vec<GrantRecord>,
    /// Present only when the entity is itself a grantee: grant records on
    /// securable are always loaded; on grantee additionally if the entity
    /// is a grantee.
    pub grants_as_grantee: Option<Vec<GrantRecord>>,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshResult {
    pub entity: Option<PolarisEntity>,
    pub grants: Option<Vec<GrantRecord>>,
}

/// The public contract every strategy implements. Every operation returns
/// an `EntityResult<T>`; programmer-error diagnostics are returned as
/// `Err` instead, never wrapped in `Success`.
#[async_trait]
pub trait MetastoreManager: Send + Sync {
    async fn bootstrap_polaris_service(&self, ctx: &CallContext) -> Result<EntityResult<()>>;

    async fn purge(&self, ctx: &CallContext) -> Result<EntityResult<()>>;

    async fn create_catalog(
        &self,
        ctx: &CallContext,
        catalog: PolarisEntity,
        principal_roles: Vec<EntityRef>,
        storage_config: Option<StorageConfigInfo>,
    ) -> Result<EntityResult<CreatedCatalog>>;

    async fn create_principal(
        &self,
        ctx: &CallContext,
        principal: PolarisEntity,
    ) -> Result<EntityResult<CreatedPrincipal>>;

    async fn load_principal_secrets(
        &self,
        ctx: &CallContext,
        client_id: &str,
    ) -> Result<EntityResult<PrincipalSecrets>>;

    async fn rotate_principal_secrets(
        &self,
        ctx: &CallContext,
        client_id: &str,
        principal_id: i64,
        reset: bool,
        old_secret_hash: &str,
    ) -> Result<EntityResult<PrincipalSecretsCredentials>>;

    async fn create_entity_if_not_exists(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entity: PolarisEntity,
    ) -> Result<EntityResult<PolarisEntity>>;

    async fn create_entities_if_not_exist(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entities: Vec<PolarisEntity>,
    ) -> Result<EntityResult<Vec<PolarisEntity>>>;

    async fn update_entity_properties_if_not_changed(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entity: PolarisEntity,
    ) -> Result<EntityResult<PolarisEntity>>;

    async fn rename_entity(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entity_to_rename: PolarisEntity,
        new_catalog_path: Option<Vec<PathEntry>>,
        renamed_entity: PolarisEntity,
    ) -> Result<EntityResult<PolarisEntity>>;

    async fn drop_entity_if_exists(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entity_to_drop: PolarisEntity,
        cleanup_properties: Option<Properties>,
        cleanup: bool,
    ) -> Result<EntityResult<Option<i64>>>;

    async fn grant_privilege_on_securable_to_role(
        &self,
        ctx: &CallContext,
        securable: EntityRef,
        securable_type: EntityType,
        grantee_role: EntityRef,
        privilege: crate::model::PrivilegeCode,
    ) -> Result<EntityResult<()>>;

    async fn revoke_privilege_on_securable_from_role(
        &self,
        ctx: &CallContext,
        securable: EntityRef,
        securable_type: EntityType,
        grantee_role: EntityRef,
        privilege: crate::model::PrivilegeCode,
    ) -> Result<EntityResult<()>>;

    async fn grant_usage_on_role_to_grantee(
        &self,
        ctx: &CallContext,
        role: EntityRef,
        role_type: EntityType,
        grantee: EntityRef,
        grantee_type: EntityType,
    ) -> Result<EntityResult<()>>;

    async fn revoke_usage_on_role_from_grantee(
        &self,
        ctx: &CallContext,
        role: EntityRef,
        role_type: EntityType,
        grantee: EntityRef,
        grantee_type: EntityType,
    ) -> Result<EntityResult<()>>;

    async fn load_grants_on_securable(
        &self,
        ctx: &CallContext,
        securable: EntityRef,
    ) -> Result<EntityResult<GrantsView>>;

    async fn load_grants_to_grantee(
        &self,
        ctx: &CallContext,
        grantee: EntityRef,
    ) -> Result<EntityResult<GrantsView>>;

    async fn load_resolved_entity_by_id(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
        type_code: EntityType,
    ) -> Result<EntityResult<ResolvedEntity>>;

    async fn load_resolved_entity_by_name(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        parent_id: i64,
        type_code: EntityType,
        name: &str,
    ) -> Result<EntityResult<ResolvedEntity>>;

    async fn refresh_resolved_entity(
        &self,
        ctx: &CallContext,
        entity_version: i64,
        grant_records_version: i64,
        type_code: EntityType,
        catalog_id: i64,
        id: i64,
    ) -> Result<EntityResult<RefreshResult>>;

    async fn load_tasks(
        &self,
        ctx: &CallContext,
        executor_id: &str,
        limit: usize,
    ) -> Result<EntityResult<Vec<PolarisEntity>>>;

    async fn get_subscoped_creds_for_entity(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
        type_code: EntityType,
        allow_list: Vec<String>,
        read_locations: Vec<String>,
        write_locations: Vec<String>,
    ) -> Result<EntityResult<HashMap<CredentialProperty, String>>>;

    async fn validate_access_to_locations(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
        type_code: EntityType,
        actions: Vec<String>,
        locations: Vec<String>,
    ) -> Result<EntityResult<HashMap<String, String>>>;
}

/// Short-circuits business logic running inside a guarded block with an
/// expected-predicate failure. See [`run_guarded`].
pub(crate) fn abort<T>(status: MetastoreStatus) -> Result<T> {
    Err(crate::core::PolarisError::StatusAbort(status))
}

/// Runs `fut` (typically a backend transaction wrapping the real business
/// logic) and converts the internal `StatusAbort` control-flow signal back
/// into an `EntityResult::failure`, so a predicate failure discovered
/// mid-transaction both rolls the transaction back *and* surfaces as a
/// normal status to the caller, never as a hard `Err`.
pub(crate) async fn run_guarded<T>(
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<EntityResult<T>> {
    match fut.await {
        Ok(value) => Ok(EntityResult::success(value)),
        Err(crate::core::PolarisError::StatusAbort(status)) => Ok(EntityResult::failure(status)),
        Err(other) => Err(other),
    }
}
