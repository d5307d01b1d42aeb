//! The atomic strategy: decomposes each public operation into one or more
//! individually-atomic backend calls instead of wrapping it in a
//! transaction. There is no commit/rollback envelope, so every write is
//! its own compare-and-swap and every multi-entity operation is piecewise
//! with idempotent retry rather than all-or-nothing — the consistency
//! this strategy offers is documented per-operation below and in
//! `DESIGN.md`.
//!
//! Every path-taking operation resolves ancestors up front (to learn
//! `(catalogId, parentId)`, same as the transactional strategy) and
//! re-validates them after its CAS sequence completes, so an ancestor
//! concurrently dropped mid-operation is still caught as
//! `CATALOG_PATH_CANNOT_BE_RESOLVED` instead of silently succeeding under a
//! now-deleted parent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{CallContext, PolarisError, Result};
use crate::credentials::{CredentialProperty, CredentialVendorError, StorageIntegration};
use crate::model::{
    property_keys, EntityRef, EntityType, GrantRecord, MetastoreStatus, PolarisEntity,
    PrincipalSecrets, PrincipalSecretsCredentials, PrivilegeCode, Properties, SubType,
};
use crate::persistence::slices::StorageConfigInfo;
use crate::persistence::{AtomicPersistence, WriteEntityResult};
use crate::resolver::{self, PathEntry, ResolvedPath};

use super::support::{
    ancestors_resolve, bump_entity_version, cas_update, create_grant, drop_single_entity,
    is_bootstrap_undroppable, is_last_catalog_admin_role, lease_tasks, load_grants, load_resolved,
    revoke_grant, role_usage_privilege, CATALOG_ADMIN_ROLE_NAME, SERVICE_ADMIN_ROLE_NAME,
};
use super::{
    abort, bootstrap, run_guarded, CreatedCatalog, CreatedPrincipal, GrantsView, MetastoreManager,
    RefreshResult, ResolvedEntity,
};

pub struct AtomicMetastoreManager<B: AtomicPersistence> {
    backend: B,
    storage_integration: Arc<dyn StorageIntegration>,
}

impl<B: AtomicPersistence> AtomicMetastoreManager<B> {
    pub fn new(backend: B, storage_integration: Arc<dyn StorageIntegration>) -> Self {
        Self {
            backend,
            storage_integration,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

async fn resolve_or_abort<B: AtomicPersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    path: &[PathEntry],
) -> Result<ResolvedPath> {
    match resolver::resolve(backend, ctx, path).await? {
        Ok(resolved) => Ok(resolved),
        Err(_) => abort(MetastoreStatus::CatalogPathCannotBeResolved),
    }
}

/// Re-resolves `path` pinned to the ancestor versions observed in
/// `before`, failing the operation if any ancestor was concurrently
/// renamed, reparented, or dropped while the CAS sequence ran.
async fn revalidate_path<B: AtomicPersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    path: &[PathEntry],
    before: &ResolvedPath,
) -> Result<()> {
    if path.is_empty() {
        return Ok(());
    }
    let pinned: Vec<PathEntry> = before
        .ancestors
        .iter()
        .zip(path.iter())
        .map(|(ancestor, original)| {
            PathEntry::new(ancestor.id, original.type_code, Some(ancestor.entity_version))
        })
        .collect();
    match resolver::resolve(backend, ctx, &pinned).await? {
        Ok(_) => Ok(()),
        Err(_) => abort(MetastoreStatus::CatalogPathCannotBeResolved),
    }
}

#[async_trait]
impl<B: AtomicPersistence + 'static> MetastoreManager for AtomicMetastoreManager<B> {
    async fn bootstrap_polaris_service(&self, ctx: &CallContext) -> Result<crate::model::EntityResult<()>> {
        run_guarded(bootstrap::bootstrap_polaris_service(&self.backend, ctx)).await
    }

    async fn purge(&self, ctx: &CallContext) -> Result<crate::model::EntityResult<()>> {
        tracing::warn!(realm = %ctx.realm_id, "purging all metastore state");
        run_guarded(self.backend.delete_all(ctx)).await
    }

    async fn create_catalog(
        &self,
        ctx: &CallContext,
        catalog: PolarisEntity,
        principal_roles: Vec<EntityRef>,
        storage_config: Option<StorageConfigInfo>,
    ) -> Result<crate::model::EntityResult<CreatedCatalog>> {
        let b = &self.backend;
        run_guarded(async move {
            let mut catalog = catalog;
            if let Some(cfg) = &storage_config {
                b.persist_storage_integration_if_needed(ctx, &catalog, Some(cfg)).await?;
                catalog.internal_properties.insert(
                    property_keys::STORAGE_CONFIGURATION_INFO.to_string(),
                    serde_json::to_string(cfg).map_err(|e| PolarisError::BackendFailure(e.to_string()))?,
                );
            }

            // Catalog creation is piecewise: the catalog entity, its admin
            // role, and the admin-role grants each land with their own CAS
            // call. A crash between steps leaves a catalog with a missing
            // admin role or grant; a retry with the same catalog id resumes
            // from wherever it stopped, since every step below is itself
            // idempotent-on-retry.
            let catalog = match b.write_entity(ctx, &catalog, true, None).await? {
                WriteEntityResult::Ok(saved) => saved,
                WriteEntityResult::EntityAlreadyExists(existing) => {
                    if existing.id != catalog.id {
                        return abort(MetastoreStatus::EntityAlreadyExists);
                    }
                    let admin_role = b
                        .lookup_entity_by_name(ctx, existing.id, existing.id, EntityType::CatalogRole, CATALOG_ADMIN_ROLE_NAME)
                        .await?
                        .ok_or(PolarisError::BootstrapEntityMissing("catalog admin role missing on retry"))?;
                    return Ok(CreatedCatalog {
                        catalog: existing,
                        catalog_admin_role: admin_role,
                    });
                }
                WriteEntityResult::RetryOnConcurrency => {
                    return abort(MetastoreStatus::TargetEntityConcurrentlyModified)
                }
            };

            let admin_role_id = b.generate_new_id(ctx).await?;
            let admin_role = PolarisEntity::new(
                catalog.id,
                admin_role_id,
                catalog.id,
                EntityType::CatalogRole,
                SubType::None,
                CATALOG_ADMIN_ROLE_NAME,
                ctx.now_millis(),
            );
            let admin_role = match b.write_entity(ctx, &admin_role, true, None).await? {
                WriteEntityResult::Ok(saved) => saved,
                WriteEntityResult::EntityAlreadyExists(existing) => existing,
                WriteEntityResult::RetryOnConcurrency => {
                    return abort(MetastoreStatus::TargetEntityConcurrentlyModified)
                }
            };

            create_grant(b, ctx, &catalog, &admin_role, PrivilegeCode::CatalogManageAccess).await?;
            create_grant(b, ctx, &catalog, &admin_role, PrivilegeCode::CatalogManageMetadata).await?;

            if principal_roles.is_empty() {
                let service_admin_role = b
                    .lookup_entity_by_name(
                        ctx,
                        crate::model::NULL_CATALOG_ID,
                        crate::model::ROOT_ENTITY_ID,
                        EntityType::PrincipalRole,
                        SERVICE_ADMIN_ROLE_NAME,
                    )
                    .await?
                    .ok_or(PolarisError::BootstrapEntityMissing("service-admin role missing; bootstrap first"))?;
                create_grant(b, ctx, &admin_role, &service_admin_role, role_usage_privilege(EntityType::PrincipalRole)).await?;
            } else {
                for role_ref in &principal_roles {
                    let Some(role) = b
                        .lookup_entity(ctx, role_ref.catalog_id, role_ref.id, EntityType::PrincipalRole)
                        .await?
                    else {
                        return abort(MetastoreStatus::EntityNotFound);
                    };
                    create_grant(b, ctx, &admin_role, &role, role_usage_privilege(EntityType::PrincipalRole)).await?;
                }
            }

            Ok(CreatedCatalog { catalog, catalog_admin_role: admin_role })
        })
        .await
    }

    async fn create_principal(
        &self,
        ctx: &CallContext,
        principal: PolarisEntity,
    ) -> Result<crate::model::EntityResult<CreatedPrincipal>> {
        let b = &self.backend;
        run_guarded(async move {
            match b.write_entity(ctx, &principal, true, None).await? {
                WriteEntityResult::Ok(saved) => {
                    let creds = b.generate_new_principal_secrets(ctx, &saved.name, saved.id).await?;
                    let client_id = creds.client_id.clone();
                    let updated = cas_update(b, ctx, saved.catalog_id, saved.id, EntityType::Principal, move |e| {
                        e.internal_properties.insert(property_keys::CLIENT_ID.to_string(), client_id.clone());
                        bump_entity_version(e);
                    })
                    .await?;
                    Ok(CreatedPrincipal { entity: updated, credentials: creds })
                }
                WriteEntityResult::EntityAlreadyExists(existing) => {
                    if existing.id != principal.id {
                        return abort(MetastoreStatus::EntityAlreadyExists);
                    }
                    Ok(CreatedPrincipal {
                        entity: existing,
                        credentials: PrincipalSecretsCredentials {
                            client_id: String::new(),
                            main_secret: String::new(),
                        },
                    })
                }
                WriteEntityResult::RetryOnConcurrency => abort(MetastoreStatus::TargetEntityConcurrentlyModified),
            }
        })
        .await
    }

    async fn load_principal_secrets(
        &self,
        ctx: &CallContext,
        client_id: &str,
    ) -> Result<crate::model::EntityResult<PrincipalSecrets>> {
        run_guarded(async move {
            match self.backend.load_principal_secrets(ctx, client_id).await? {
                Some(secrets) => Ok(secrets),
                None => abort(MetastoreStatus::EntityNotFound),
            }
        })
        .await
    }

    async fn rotate_principal_secrets(
        &self,
        ctx: &CallContext,
        client_id: &str,
        principal_id: i64,
        reset: bool,
        old_secret_hash: &str,
    ) -> Result<crate::model::EntityResult<PrincipalSecretsCredentials>> {
        let b = &self.backend;
        run_guarded(async move {
            let Some(creds) = b
                .rotate_principal_secrets(ctx, client_id, principal_id, reset, old_secret_hash)
                .await?
            else {
                return abort(MetastoreStatus::EntityNotFound);
            };

            // The secret is already durably rotated above; this bump is a
            // best-effort mirror of the rotation state onto the entity. If it
            // loses a race against a concurrent entity update the rotation
            // itself still stands — only the marker retry is skipped, and a
            // subsequent rotation call will reconcile it.
            cas_update(
                b,
                ctx,
                crate::model::NULL_CATALOG_ID,
                principal_id,
                EntityType::Principal,
                move |e| {
                    if reset {
                        e.internal_properties.insert(
                            property_keys::PRINCIPAL_CREDENTIAL_ROTATION_REQUIRED_STATE.to_string(),
                            "true".to_string(),
                        );
                    } else {
                        e.internal_properties.remove(property_keys::PRINCIPAL_CREDENTIAL_ROTATION_REQUIRED_STATE);
                    }
                    bump_entity_version(e);
                },
            )
            .await?;

            Ok(creds)
        })
        .await
    }

    async fn create_entity_if_not_exists(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entity: PolarisEntity,
    ) -> Result<crate::model::EntityResult<PolarisEntity>> {
        let b = &self.backend;
        run_guarded(async move {
            let resolved = resolve_or_abort(b, ctx, &catalog_path).await?;
            let mut entity = entity;
            entity.catalog_id = resolved.catalog_id;
            entity.parent_id = resolved.parent_id;

            let saved = match b.write_entity(ctx, &entity, true, None).await? {
                WriteEntityResult::Ok(saved) => saved,
                WriteEntityResult::EntityAlreadyExists(existing) => {
                    if existing.id == entity.id {
                        existing
                    } else {
                        return abort(MetastoreStatus::EntityAlreadyExists);
                    }
                }
                WriteEntityResult::RetryOnConcurrency => {
                    return abort(MetastoreStatus::TargetEntityConcurrentlyModified)
                }
            };

            revalidate_path(b, ctx, &catalog_path, &resolved).await?;
            Ok(saved)
        })
        .await
    }

    async fn create_entities_if_not_exist(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entities: Vec<PolarisEntity>,
    ) -> Result<crate::model::EntityResult<Vec<PolarisEntity>>> {
        let b = &self.backend;
        run_guarded(async move {
            let resolved = resolve_or_abort(b, ctx, &catalog_path).await?;

            let mut created = Vec::with_capacity(entities.len());
            for entity in entities {
                let mut entity = entity;
                entity.catalog_id = resolved.catalog_id;
                entity.parent_id = resolved.parent_id;
                match b.write_entity(ctx, &entity, true, None).await? {
                    WriteEntityResult::Ok(saved) => created.push(saved),
                    WriteEntityResult::EntityAlreadyExists(existing) => {
                        if existing.id == entity.id {
                            created.push(existing);
                        } else {
                            return abort(MetastoreStatus::EntityAlreadyExists);
                        }
                    }
                    WriteEntityResult::RetryOnConcurrency => {
                        return abort(MetastoreStatus::TargetEntityConcurrentlyModified)
                    }
                }
            }

            revalidate_path(b, ctx, &catalog_path, &resolved).await?;
            Ok(created)
        })
        .await
    }

    async fn update_entity_properties_if_not_changed(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entity: PolarisEntity,
    ) -> Result<crate::model::EntityResult<PolarisEntity>> {
        let b = &self.backend;
        run_guarded(async move {
            let resolved = resolve_or_abort(b, ctx, &catalog_path).await?;

            let Some(original) = b.lookup_entity(ctx, entity.catalog_id, entity.id, entity.type_code).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };

            // Open question resolved in DESIGN.md: compare both version
            // counters, the stronger precondition.
            if original.entity_version != entity.entity_version
                || original.grant_records_version != entity.grant_records_version
            {
                return abort(MetastoreStatus::TargetEntityConcurrentlyModified);
            }

            let mut updated = entity;
            updated.entity_version += 1;
            updated.last_update_timestamp = ctx.now_millis();

            let saved = match b.write_entity(ctx, &updated, false, Some(&original)).await? {
                WriteEntityResult::Ok(saved) => saved,
                WriteEntityResult::EntityAlreadyExists(existing) => existing,
                WriteEntityResult::RetryOnConcurrency => {
                    return abort(MetastoreStatus::TargetEntityConcurrentlyModified)
                }
            };

            revalidate_path(b, ctx, &catalog_path, &resolved).await?;
            Ok(saved)
        })
        .await
    }

    async fn rename_entity(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entity_to_rename: PolarisEntity,
        new_catalog_path: Option<Vec<PathEntry>>,
        renamed_entity: PolarisEntity,
    ) -> Result<crate::model::EntityResult<PolarisEntity>> {
        let b = &self.backend;
        run_guarded(async move {
            let resolved = resolve_or_abort(b, ctx, &catalog_path).await?;

            let Some(original) = b
                .lookup_entity(ctx, entity_to_rename.catalog_id, entity_to_rename.id, entity_to_rename.type_code)
                .await?
            else {
                return abort(MetastoreStatus::EntityNotFound);
            };

            if is_bootstrap_undroppable(&original) {
                return abort(MetastoreStatus::EntityCannotBeRenamed);
            }
            if original.entity_version != entity_to_rename.entity_version {
                return abort(MetastoreStatus::TargetEntityConcurrentlyModified);
            }

            let (new_catalog_id, new_parent_id, new_resolved) = if let Some(new_path) = &new_catalog_path {
                let r = resolve_or_abort(b, ctx, new_path).await?;
                (r.catalog_id, r.parent_id, Some(r))
            } else {
                (original.catalog_id, original.parent_id, None)
            };

            let mut updated = original.clone();
            updated.name = renamed_entity.name;
            updated.properties = renamed_entity.properties;
            updated.internal_properties = renamed_entity.internal_properties;
            updated.catalog_id = new_catalog_id;
            updated.parent_id = new_parent_id;
            updated.entity_version += 1;
            updated.last_update_timestamp = ctx.now_millis();

            let saved = match b.write_entity(ctx, &updated, true, Some(&original)).await? {
                WriteEntityResult::Ok(saved) => saved,
                WriteEntityResult::EntityAlreadyExists(_) => return abort(MetastoreStatus::EntityAlreadyExists),
                WriteEntityResult::RetryOnConcurrency => {
                    return abort(MetastoreStatus::TargetEntityConcurrentlyModified)
                }
            };

            revalidate_path(b, ctx, &catalog_path, &resolved).await?;
            if let (Some(new_path), Some(new_resolved)) = (&new_catalog_path, &new_resolved) {
                revalidate_path(b, ctx, new_path, new_resolved).await?;
            }
            Ok(saved)
        })
        .await
    }

    async fn drop_entity_if_exists(
        &self,
        ctx: &CallContext,
        catalog_path: Vec<PathEntry>,
        entity_to_drop: PolarisEntity,
        cleanup_properties: Option<Properties>,
        cleanup: bool,
    ) -> Result<crate::model::EntityResult<Option<i64>>> {
        let b = &self.backend;
        run_guarded(async move {
            let resolved = resolve_or_abort(b, ctx, &catalog_path).await?;

            let Some(entity) = b
                .lookup_entity(ctx, entity_to_drop.catalog_id, entity_to_drop.id, entity_to_drop.type_code)
                .await?
            else {
                return abort(MetastoreStatus::EntityNotFound);
            };

            if is_bootstrap_undroppable(&entity) {
                return abort(MetastoreStatus::EntityUndroppable);
            }

            let mut extra_catalog_role_to_drop: Option<PolarisEntity> = None;

            match entity.type_code {
                EntityType::Namespace => {
                    if b.has_children(ctx, None, entity.catalog_id, entity.id).await? {
                        return abort(MetastoreStatus::NamespaceNotEmpty);
                    }
                }
                EntityType::Catalog => {
                    if b.has_children(ctx, Some(EntityType::Namespace), entity.catalog_id, entity.id).await? {
                        return abort(MetastoreStatus::CatalogNotEmpty);
                    }
                    let roles = b
                        .list_entities(ctx, entity.catalog_id, entity.id, EntityType::CatalogRole, usize::MAX)
                        .await?;
                    match roles.len() {
                        0 => {}
                        1 => extra_catalog_role_to_drop = roles.into_iter().next(),
                        _ => return abort(MetastoreStatus::CatalogNotEmpty),
                    }
                }
                EntityType::CatalogRole => {
                    if is_last_catalog_admin_role(b, ctx, &entity).await? {
                        return abort(MetastoreStatus::EntityUndroppable);
                    }
                }
                _ => {}
            }

            // Each of these is its own CAS-backed mutation; a crash between
            // them leaves the admin role or the principal's secret behind
            // for a subsequent retry to finish, rather than rolling back.
            if let Some(role) = &extra_catalog_role_to_drop {
                drop_single_entity(b, ctx, role).await?;
            }
            drop_single_entity(b, ctx, &entity).await?;

            if entity.type_code == EntityType::Principal {
                if let Some(client_id) = entity.client_id() {
                    b.delete_principal_secrets(ctx, client_id, entity.id).await?;
                }
            }

            if !cleanup {
                revalidate_path(b, ctx, &catalog_path, &resolved).await?;
                return Ok(None);
            }

            let task_id = b.generate_new_id(ctx).await?;
            let mut task = PolarisEntity::new(
                crate::model::NULL_CATALOG_ID,
                task_id,
                crate::model::ROOT_ENTITY_ID,
                EntityType::Task,
                crate::model::SubType::EntityCleanupScheduler,
                format!("cleanup-{}", entity.id),
                ctx.now_millis(),
            );
            task.properties.insert(
                property_keys::CLEANUP_TASK_DATA.to_string(),
                serde_json::to_string(&entity).map_err(|e| PolarisError::BackendFailure(e.to_string()))?,
            );
            task.properties.insert(property_keys::TASK_TYPE.to_string(), "ENTITY_CLEANUP_SCHEDULER".to_string());
            task.properties.insert(property_keys::ATTEMPT_COUNT.to_string(), "0".to_string());
            if let Some(props) = cleanup_properties {
                task.internal_properties = props;
            }

            let task_id = match b.write_entity(ctx, &task, true, None).await? {
                WriteEntityResult::Ok(_) => task_id,
                WriteEntityResult::EntityAlreadyExists(existing) => existing.id,
                WriteEntityResult::RetryOnConcurrency => {
                    return abort(MetastoreStatus::TargetEntityConcurrentlyModified)
                }
            };

            revalidate_path(b, ctx, &catalog_path, &resolved).await?;
            Ok(Some(task_id))
        })
        .await
    }

    async fn grant_privilege_on_securable_to_role(
        &self,
        ctx: &CallContext,
        securable: EntityRef,
        securable_type: EntityType,
        grantee_role: EntityRef,
        privilege: PrivilegeCode,
    ) -> Result<crate::model::EntityResult<()>> {
        let b = &self.backend;
        run_guarded(async move {
            let Some(securable_entity) = b.lookup_entity(ctx, securable.catalog_id, securable.id, securable_type).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            let Some(grantee_entity) = b.lookup_entity(ctx, grantee_role.catalog_id, grantee_role.id, EntityType::CatalogRole).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            create_grant(b, ctx, &securable_entity, &grantee_entity, privilege).await?;
            Ok(())
        })
        .await
    }

    async fn revoke_privilege_on_securable_from_role(
        &self,
        ctx: &CallContext,
        securable: EntityRef,
        securable_type: EntityType,
        grantee_role: EntityRef,
        privilege: PrivilegeCode,
    ) -> Result<crate::model::EntityResult<()>> {
        let b = &self.backend;
        run_guarded(async move {
            let Some(securable_entity) = b.lookup_entity(ctx, securable.catalog_id, securable.id, securable_type).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            let Some(grantee_entity) = b.lookup_entity(ctx, grantee_role.catalog_id, grantee_role.id, EntityType::CatalogRole).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            if !revoke_grant(b, ctx, &securable_entity, &grantee_entity, privilege).await? {
                return abort(MetastoreStatus::GrantNotFound);
            }
            Ok(())
        })
        .await
    }

    async fn grant_usage_on_role_to_grantee(
        &self,
        ctx: &CallContext,
        role: EntityRef,
        role_type: EntityType,
        grantee: EntityRef,
        grantee_type: EntityType,
    ) -> Result<crate::model::EntityResult<()>> {
        let b = &self.backend;
        run_guarded(async move {
            let Some(role_entity) = b.lookup_entity(ctx, role.catalog_id, role.id, role_type).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            let Some(grantee_entity) = b.lookup_entity(ctx, grantee.catalog_id, grantee.id, grantee_type).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            let privilege = role_usage_privilege(grantee_type);
            create_grant(b, ctx, &role_entity, &grantee_entity, privilege).await?;
            Ok(())
        })
        .await
    }

    async fn revoke_usage_on_role_from_grantee(
        &self,
        ctx: &CallContext,
        role: EntityRef,
        role_type: EntityType,
        grantee: EntityRef,
        grantee_type: EntityType,
    ) -> Result<crate::model::EntityResult<()>> {
        let b = &self.backend;
        run_guarded(async move {
            let Some(role_entity) = b.lookup_entity(ctx, role.catalog_id, role.id, role_type).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            let Some(grantee_entity) = b.lookup_entity(ctx, grantee.catalog_id, grantee.id, grantee_type).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            let privilege = role_usage_privilege(grantee_type);
            if !revoke_grant(b, ctx, &role_entity, &grantee_entity, privilege).await? {
                return abort(MetastoreStatus::GrantNotFound);
            }
            Ok(())
        })
        .await
    }

    async fn load_grants_on_securable(
        &self,
        ctx: &CallContext,
        securable: EntityRef,
    ) -> Result<crate::model::EntityResult<GrantsView>> {
        run_guarded(load_grants(&self.backend, ctx, securable, true)).await
    }

    async fn load_grants_to_grantee(
        &self,
        ctx: &CallContext,
        grantee: EntityRef,
    ) -> Result<crate::model::EntityResult<GrantsView>> {
        run_guarded(load_grants(&self.backend, ctx, grantee, false)).await
    }

    async fn load_resolved_entity_by_id(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
        type_code: EntityType,
    ) -> Result<crate::model::EntityResult<ResolvedEntity>> {
        let b = &self.backend;
        run_guarded(async move {
            let Some(entity) = b.lookup_entity(ctx, catalog_id, id, type_code).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            if !ancestors_resolve(b, ctx, &entity).await? {
                return abort(MetastoreStatus::EntityCannotBeResolved);
            }
            load_resolved(b, ctx, entity).await
        })
        .await
    }

    async fn load_resolved_entity_by_name(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        parent_id: i64,
        type_code: EntityType,
        name: &str,
    ) -> Result<crate::model::EntityResult<ResolvedEntity>> {
        let b = &self.backend;
        run_guarded(async move {
            let entity = if type_code == EntityType::Root {
                bootstrap::backfill_root_if_missing(b, ctx).await?
            } else {
                let Some(found) = b.lookup_entity_by_name(ctx, catalog_id, parent_id, type_code, name).await? else {
                    return abort(MetastoreStatus::EntityNotFound);
                };
                found
            };
            if !ancestors_resolve(b, ctx, &entity).await? {
                return abort(MetastoreStatus::EntityCannotBeResolved);
            }
            load_resolved(b, ctx, entity).await
        })
        .await
    }

    async fn refresh_resolved_entity(
        &self,
        ctx: &CallContext,
        entity_version: i64,
        grant_records_version: i64,
        type_code: EntityType,
        catalog_id: i64,
        id: i64,
    ) -> Result<crate::model::EntityResult<RefreshResult>> {
        let b = &self.backend;
        run_guarded(async move {
            let Some(entity) = b.lookup_entity(ctx, catalog_id, id, type_code).await? else {
                return abort(MetastoreStatus::EntityNotFound);
            };
            let mut result = RefreshResult::default();
            if entity.entity_version != entity_version {
                result.entity = Some(entity.clone());
            }
            if entity.grant_records_version != grant_records_version {
                let grants = b.load_all_grant_records_on_securable(ctx, catalog_id, id).await?;
                result.grants = Some(grants);
            }
            Ok(result)
        })
        .await
    }

    async fn load_tasks(
        &self,
        ctx: &CallContext,
        executor_id: &str,
        limit: usize,
    ) -> Result<crate::model::EntityResult<Vec<PolarisEntity>>> {
        run_guarded(lease_tasks(&self.backend, ctx, executor_id, limit)).await
    }

    async fn get_subscoped_creds_for_entity(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
        type_code: EntityType,
        allow_list: Vec<String>,
        read_locations: Vec<String>,
        write_locations: Vec<String>,
    ) -> Result<crate::model::EntityResult<HashMap<CredentialProperty, String>>> {
        let Some(entity) = self.backend.lookup_entity(ctx, catalog_id, id, type_code).await? else {
            return Ok(crate::model::EntityResult::failure(MetastoreStatus::EntityNotFound));
        };
        let Some(config) = self.backend.load_polaris_storage_integration(ctx, &entity).await? else {
            return Ok(crate::model::EntityResult::failure(MetastoreStatus::SubscopeCredsError));
        };
        match self
            .storage_integration
            .get_subscoped_creds(ctx, &config, &allow_list, &read_locations, &write_locations)
            .await
        {
            Ok(creds) => Ok(crate::model::EntityResult::success(creds)),
            Err(CredentialVendorError::Rejected(msg)) => {
                Ok(crate::model::EntityResult::failure_with(MetastoreStatus::SubscopeCredsError, msg))
            }
        }
    }

    async fn validate_access_to_locations(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
        type_code: EntityType,
        actions: Vec<String>,
        locations: Vec<String>,
    ) -> Result<crate::model::EntityResult<HashMap<String, String>>> {
        let Some(entity) = self.backend.lookup_entity(ctx, catalog_id, id, type_code).await? else {
            return Ok(crate::model::EntityResult::failure(MetastoreStatus::EntityNotFound));
        };
        let Some(config) = self.backend.load_polaris_storage_integration(ctx, &entity).await? else {
            return Ok(crate::model::EntityResult::failure(MetastoreStatus::SubscopeCredsError));
        };
        let result = self
            .storage_integration
            .validate_access_to_locations(ctx, &config, &actions, &locations)
            .await?;
        Ok(crate::model::EntityResult::success(result))
    }
}
