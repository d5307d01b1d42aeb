//! Bootstrap & backfill: one-shot creation of ROOT, the root principal,
//! the service-admin role, and their grants; backfill of ROOT on first
//! access if missing. Both subroutines are
//! idempotent under client retries and are shared by both strategies since
//! they are expressed purely in terms of `BasePersistence`.

use crate::core::{CallContext, Result};
use crate::model::{
    new_root_entity, EntityType, PolarisEntity, PrivilegeCode, SubType, NULL_CATALOG_ID,
    ROOT_ENTITY_ID,
};
use crate::persistence::{BasePersistence, WriteEntityResult};

use super::support::{create_grant, role_usage_privilege, ROOT_PRINCIPAL_NAME, SERVICE_ADMIN_ROLE_NAME};

/// Ensures ROOT exists, creating it if this is the first call in the
/// realm. Returns the (possibly newly created) ROOT entity.
pub async fn ensure_root<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
) -> Result<PolarisEntity> {
    if let Some(root) = backend
        .lookup_entity(ctx, NULL_CATALOG_ID, ROOT_ENTITY_ID, EntityType::Root)
        .await?
    {
        return Ok(root);
    }

    let root = new_root_entity(ctx.now_millis());
    match backend.write_entity(ctx, &root, true, None).await? {
        WriteEntityResult::Ok(saved) => Ok(saved),
        WriteEntityResult::EntityAlreadyExists(existing) => Ok(existing),
        WriteEntityResult::RetryOnConcurrency => {
            // ROOT's id is well-known; a concurrent creator won the race.
            backend
                .lookup_entity(ctx, NULL_CATALOG_ID, ROOT_ENTITY_ID, EntityType::Root)
                .await?
                .ok_or_else(|| {
                    crate::core::PolarisError::BootstrapEntityMissing(
                        "ROOT vanished immediately after a concurrent create",
                    )
                })
        }
    }
}

async fn ensure_named_entity<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    parent: &PolarisEntity,
    type_code: EntityType,
    name: &str,
) -> Result<PolarisEntity> {
    if let Some(found) = backend
        .lookup_entity_by_name(ctx, parent.catalog_id, parent.id, type_code, name)
        .await?
    {
        return Ok(found);
    }

    let id = backend.generate_new_id(ctx).await?;
    let entity = PolarisEntity::new(
        parent.catalog_id,
        id,
        parent.id,
        type_code,
        SubType::None,
        name,
        ctx.now_millis(),
    );
    match backend.write_entity(ctx, &entity, true, None).await? {
        WriteEntityResult::Ok(saved) => Ok(saved),
        WriteEntityResult::EntityAlreadyExists(existing) => Ok(existing),
        WriteEntityResult::RetryOnConcurrency => backend
            .lookup_entity_by_name(ctx, parent.catalog_id, parent.id, type_code, name)
            .await?
            .ok_or_else(|| {
                crate::core::PolarisError::BootstrapEntityMissing(
                    "named bootstrap entity vanished immediately after a concurrent create",
                )
            }),
    }
}

async fn ensure_grant<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    securable: &PolarisEntity,
    grantee: &PolarisEntity,
    privilege: PrivilegeCode,
) -> Result<()> {
    let record = crate::model::GrantRecord::new(securable.entity_ref(), grantee.entity_ref(), privilege);
    if backend.lookup_grant_record(ctx, &record).await?.is_some() {
        return Ok(());
    }
    create_grant(backend, ctx, securable, grantee, privilege).await
}

/// Idempotent bootstrap. Safe to call any number of times, including
/// concurrently and after a crash partway through a previous call.
pub async fn bootstrap_polaris_service<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
) -> Result<()> {
    let root = ensure_root(backend, ctx).await?;
    let root_principal =
        ensure_named_entity(backend, ctx, &root, EntityType::Principal, ROOT_PRINCIPAL_NAME).await?;
    let service_admin_role = ensure_named_entity(
        backend,
        ctx,
        &root,
        EntityType::PrincipalRole,
        SERVICE_ADMIN_ROLE_NAME,
    )
    .await?;

    // Root principal must carry generated secrets, same as any other
    // principal — bootstrap does not special-case this away.
    if root_principal.client_id().is_none() {
        let creds = backend
            .generate_new_principal_secrets(ctx, &root_principal.name, root_principal.id)
            .await?;
        crate::manager::support::cas_update(
            backend,
            ctx,
            root_principal.catalog_id,
            root_principal.id,
            EntityType::Principal,
            move |e| {
                e.internal_properties
                    .insert(crate::model::property_keys::CLIENT_ID.to_string(), creds.client_id.clone());
                crate::manager::support::bump_entity_version(e);
            },
        )
        .await?;
    }

    // Invariant 5: service-admin role ↤ root principal usage; service-admin
    // role ↦ SERVICE_MANAGE_ACCESS on ROOT.
    ensure_grant(
        backend,
        ctx,
        &service_admin_role,
        &root_principal,
        role_usage_privilege(EntityType::Principal),
    )
    .await?;
    ensure_grant(
        backend,
        ctx,
        &root,
        &service_admin_role,
        PrivilegeCode::ServiceManageAccess,
    )
    .await?;

    Ok(())
}

/// Backfills ROOT (and its service-admin grant) if missing, used by
/// `loadResolvedEntityByName` when the caller asks for ROOT by name before
/// bootstrap has completed. Performed as one CAS-retried unit keyed on
/// ROOT's well-known id so a
/// crash between the two steps is resumed by the next caller.
pub async fn backfill_root_if_missing<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
) -> Result<PolarisEntity> {
    let root = ensure_root(backend, ctx).await?;
    let Some(service_admin_role) = backend
        .lookup_entity_by_name(ctx, NULL_CATALOG_ID, ROOT_ENTITY_ID, EntityType::PrincipalRole, SERVICE_ADMIN_ROLE_NAME)
        .await?
    else {
        // Bootstrap has not run yet at all; nothing further to backfill.
        return Ok(root);
    };
    ensure_grant(backend, ctx, &root, &service_admin_role, PrivilegeCode::ServiceManageAccess).await?;
    Ok(root)
}
