//! Shared pure-function helpers used by both strategies: entity
//! preparation and invariant checks, kept out of `transactional.rs` /
//! `atomic.rs` so neither strategy re-implements them.

use crate::core::{CallContext, PolarisError, Result};
use crate::model::{
    property_keys, EntityRef, EntityType, GrantRecord, MetastoreStatus, NULL_CATALOG_ID,
    PolarisEntity, PrivilegeCode,
};
use crate::persistence::{BasePersistence, WriteEntityResult};

use super::{abort, GrantsView, ResolvedEntity};

pub const ROOT_PRINCIPAL_NAME: &str = "root";
pub const SERVICE_ADMIN_ROLE_NAME: &str = "service_admin";
pub const CATALOG_ADMIN_ROLE_NAME: &str = "catalog_admin";

/// Internal-bookkeeping retry bound for optimistic-concurrency loops below.
/// Not a spec-level timeout; just a backstop against a pathologically hot
/// counter so a bug surfaces as an error instead of an infinite loop.
const MAX_CAS_ATTEMPTS: u32 = 32;

/// Entities that are undroppable independent of their siblings: the root
/// container, the root principal, and the service-admin principal role.
/// `CatalogRole` is not covered here because "undroppable" depends on its
/// siblings (the last remaining catalog-admin role); see
/// `is_last_catalog_admin_role`.
pub fn is_bootstrap_undroppable(entity: &PolarisEntity) -> bool {
    match entity.type_code {
        EntityType::Root => true,
        EntityType::Principal => entity.name == ROOT_PRINCIPAL_NAME && entity.parent_id == crate::model::ROOT_ENTITY_ID,
        EntityType::PrincipalRole => entity.name == SERVICE_ADMIN_ROLE_NAME,
        _ => false,
    }
}

/// Whether `entity` is the catalog-admin `CatalogRole` and it is the last
/// role remaining under its catalog. Dropping it directly would leave the
/// catalog's `CATALOG_MANAGE_ACCESS`/`CATALOG_MANAGE_METADATA` grants with
/// no admin role to exercise them; dropping the owning catalog itself is
/// still allowed to take it along (see `drop_entity_if_exists`'s
/// `extra_catalog_role_to_drop` handling).
pub async fn is_last_catalog_admin_role<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    entity: &PolarisEntity,
) -> Result<bool> {
    if entity.type_code != EntityType::CatalogRole || entity.name != CATALOG_ADMIN_ROLE_NAME {
        return Ok(false);
    }
    let roles = backend
        .list_entities(ctx, entity.catalog_id, entity.parent_id, EntityType::CatalogRole, usize::MAX)
        .await?;
    Ok(roles.len() <= 1)
}

/// Role-to-grantee usage picks privilege CATALOG_ROLE_USAGE when the
/// grantee is a principal role, else PRINCIPAL_ROLE_USAGE.
pub fn role_usage_privilege(grantee_type: EntityType) -> PrivilegeCode {
    if grantee_type == EntityType::PrincipalRole {
        PrivilegeCode::CatalogRoleUsage
    } else {
        PrivilegeCode::PrincipalRoleUsage
    }
}

/// Applies `mutate` to the current stored version of `(catalog_id, id)`
/// and retries under compare-and-swap until it lands, bounded by
/// `MAX_CAS_ATTEMPTS`. Used everywhere a grant-version bump or a property
/// change needs to survive a concurrent writer touching the same entity.
pub async fn cas_update<B, F>(
    backend: &B,
    ctx: &CallContext,
    catalog_id: i64,
    id: i64,
    type_code: EntityType,
    mutate: F,
) -> Result<PolarisEntity>
where
    B: BasePersistence + ?Sized,
    F: Fn(&mut PolarisEntity),
{
    for _ in 0..MAX_CAS_ATTEMPTS {
        let Some(original) = backend.lookup_entity(ctx, catalog_id, id, type_code).await? else {
            return Err(PolarisError::BootstrapEntityMissing("entity disappeared during CAS update"));
        };
        let mut updated = original.clone();
        mutate(&mut updated);
        updated.last_update_timestamp = ctx.now_millis();

        match backend.write_entity(ctx, &updated, false, Some(&original)).await? {
            WriteEntityResult::Ok(saved) => return Ok(saved),
            WriteEntityResult::RetryOnConcurrency => continue,
            WriteEntityResult::EntityAlreadyExists(existing) => return Ok(existing),
        }
    }
    Err(PolarisError::BackendFailure(format!(
        "CAS retry budget exhausted updating entity ({catalog_id}, {id})"
    )))
}

pub fn bump_entity_version(entity: &mut PolarisEntity) {
    entity.entity_version += 1;
}

pub fn bump_grant_records_version(entity: &mut PolarisEntity) {
    entity.grant_records_version += 1;
}

/// Writes a grant record and bumps `grantRecordsVersion` on both the
/// grantee and the securable.
pub async fn create_grant<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    securable: &PolarisEntity,
    grantee: &PolarisEntity,
    privilege: PrivilegeCode,
) -> Result<()> {
    let record = GrantRecord::new(securable.entity_ref(), grantee.entity_ref(), privilege);
    backend.write_to_grant_records(ctx, &record).await?;
    cas_update(
        backend,
        ctx,
        securable.catalog_id,
        securable.id,
        securable.type_code,
        bump_grant_records_version,
    )
    .await?;
    cas_update(
        backend,
        ctx,
        grantee.catalog_id,
        grantee.id,
        grantee.type_code,
        bump_grant_records_version,
    )
    .await?;
    Ok(())
}

/// Deletes a grant record (if present) and bumps both counters, returning
/// whether the grant existed: revoking a non-existent grant reports
/// `GRANT_NOT_FOUND`, not an error.
pub async fn revoke_grant<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    securable: &PolarisEntity,
    grantee: &PolarisEntity,
    privilege: PrivilegeCode,
) -> Result<bool> {
    let record = GrantRecord::new(securable.entity_ref(), grantee.entity_ref(), privilege);
    let existed = backend.delete_from_grant_records(ctx, &record).await?;
    if !existed {
        return Ok(false);
    }
    cas_update(
        backend,
        ctx,
        securable.catalog_id,
        securable.id,
        securable.type_code,
        bump_grant_records_version,
    )
    .await?;
    cas_update(
        backend,
        ctx,
        grantee.catalog_id,
        grantee.id,
        grantee.type_code,
        bump_grant_records_version,
    )
    .await?;
    Ok(true)
}

/// Removes `entity` and every grant touching it, bumping
/// `grantRecordsVersion` on every counterparty. Shared by both strategies'
/// `dropEntityIfExists` implementations.
pub async fn drop_single_entity<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    entity: &PolarisEntity,
) -> Result<()> {
    let grants_removed = backend.delete_all_entity_grant_records(ctx, entity, true, true).await?;
    let mut counterparties: Vec<EntityRef> = Vec::new();
    for g in &grants_removed {
        let other = if g.grantee() == entity.entity_ref() { g.securable() } else { g.grantee() };
        counterparties.push(other);
    }
    for other in counterparties {
        // The counterparty's own type isn't known here; fall back to the
        // type-agnostic id lookup so the CAS bump can locate the stored
        // record regardless of type.
        if let Some(Some(found)) = backend
            .lookup_entities(ctx, &[(other.catalog_id, other.id)])
            .await?
            .into_iter()
            .next()
        {
            cas_update(backend, ctx, found.catalog_id, found.id, found.type_code, bump_grant_records_version).await?;
        }
    }
    backend.delete_entity(ctx, entity).await?;
    Ok(())
}

/// Loads the grant records for `subject` (either as securable or as
/// grantee) together with the current counterparty entities, for
/// `loadGrantsOnSecurable`/`loadGrantsToGrantee`.
pub async fn load_grants<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    subject: EntityRef,
    on_securable: bool,
) -> Result<GrantsView> {
    let Some(version) = backend.lookup_entity_grant_records_version(ctx, subject.catalog_id, subject.id).await? else {
        return abort(MetastoreStatus::EntityNotFound);
    };
    let grants = if on_securable {
        backend.load_all_grant_records_on_securable(ctx, subject.catalog_id, subject.id).await?
    } else {
        backend.load_all_grant_records_on_grantee(ctx, subject.catalog_id, subject.id).await?
    };

    let counterparty_refs: Vec<(i64, i64)> = grants
        .iter()
        .map(|g| {
            let other = if on_securable { g.grantee() } else { g.securable() };
            (other.catalog_id, other.id)
        })
        .collect();
    let counterparties = backend
        .lookup_entities(ctx, &counterparty_refs)
        .await?
        .into_iter()
        .flatten()
        .collect();

    Ok(GrantsView {
        grant_records_version: version,
        grants,
        counterparties,
    })
}

/// Assembles a `ResolvedEntity` view: the entity plus its grant records on
/// both sides.
pub async fn load_resolved<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    entity: PolarisEntity,
) -> Result<ResolvedEntity> {
    let grants_on_securable = backend
        .load_all_grant_records_on_securable(ctx, entity.catalog_id, entity.id)
        .await?;
    let grants_as_grantee = if entity.type_code.is_grantee() {
        Some(backend.load_all_grant_records_on_grantee(ctx, entity.catalog_id, entity.id).await?)
    } else {
        None
    };
    Ok(ResolvedEntity {
        grant_records_version: entity.grant_records_version,
        entity,
        grants_on_securable,
        grants_as_grantee,
    })
}

/// Walks an entity's parent chain (catalog/namespace nesting) to confirm
/// every ancestor up to its owning catalog (or ROOT, for entities parented
/// directly under it) is still present. `Root`/`Principal`/`PrincipalRole`/
/// `Catalog`/`Task` are always parented under ROOT, which cannot be
/// dropped, so only `Namespace`/`TableLike`/`CatalogRole` need the walk.
/// Distinguishes "this row exists but hangs off a since-dropped ancestor"
/// (`ENTITY_CANNOT_BE_RESOLVED`) from "this row itself is missing"
/// (`ENTITY_NOT_FOUND`, handled by the caller before this runs).
pub async fn ancestors_resolve<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    entity: &PolarisEntity,
) -> Result<bool> {
    match entity.type_code {
        EntityType::Root
        | EntityType::Principal
        | EntityType::PrincipalRole
        | EntityType::Catalog
        | EntityType::Task => Ok(true),
        EntityType::Namespace | EntityType::TableLike | EntityType::CatalogRole => {
            let mut parent_id = entity.parent_id;
            loop {
                if parent_id == entity.catalog_id {
                    return Ok(backend
                        .lookup_entity(ctx, NULL_CATALOG_ID, parent_id, EntityType::Catalog)
                        .await?
                        .is_some());
                }
                let Some(parent) = backend.lookup_entity(ctx, entity.catalog_id, parent_id, EntityType::Namespace).await? else {
                    return Ok(false);
                };
                parent_id = parent.parent_id;
            }
        }
    }
}

/// Task leasing (`loadTasks`): at-most-`limit` TASK
/// entities whose executor is unset, or stale past the configured
/// timeout, are leased via per-task CAS. Failed CAS attempts are skipped;
/// if nothing was leased but at least one CAS failed, the caller should
/// retry — signalled here as `TargetEntityConcurrentlyModified` via the
/// `abort` control-flow path.
pub async fn lease_tasks<B: BasePersistence + ?Sized>(
    backend: &B,
    ctx: &CallContext,
    executor_id: &str,
    limit: usize,
) -> Result<Vec<PolarisEntity>> {
    let timeout = ctx.task_timeout_millis();
    let now = ctx.now_millis();
    let candidates = backend
        .list_entities(ctx, crate::model::NULL_CATALOG_ID, crate::model::ROOT_ENTITY_ID, EntityType::Task, usize::MAX)
        .await?;

    let mut leased = Vec::new();
    let mut any_conflict = false;

    for candidate in candidates {
        if leased.len() >= limit || ctx.cancellation.is_cancelled() {
            break;
        }
        let last_start: i64 = candidate
            .properties
            .get(property_keys::LAST_ATTEMPT_START_TIME)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let has_executor = candidate.properties.contains_key(property_keys::LAST_ATTEMPT_EXECUTOR_ID);
        let stale = now.saturating_sub(last_start) > timeout;
        if has_executor && !stale {
            continue;
        }

        let attempt_count: i64 = candidate
            .properties
            .get(property_keys::ATTEMPT_COUNT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let mut updated = candidate.clone();
        updated.properties.insert(property_keys::ATTEMPT_COUNT.to_string(), (attempt_count + 1).to_string());
        updated
            .properties
            .insert(property_keys::LAST_ATTEMPT_EXECUTOR_ID.to_string(), executor_id.to_string());
        updated.properties.insert(property_keys::LAST_ATTEMPT_START_TIME.to_string(), now.to_string());
        updated.entity_version += 1;
        updated.last_update_timestamp = now;

        match backend.write_entity(ctx, &updated, false, Some(&candidate)).await? {
            WriteEntityResult::Ok(saved) => leased.push(saved),
            WriteEntityResult::RetryOnConcurrency => any_conflict = true,
            WriteEntityResult::EntityAlreadyExists(_) => any_conflict = true,
        }
    }

    if leased.is_empty() && any_conflict {
        return abort(MetastoreStatus::TargetEntityConcurrentlyModified);
    }
    Ok(leased)
}
