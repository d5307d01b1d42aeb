//! Shared test fixtures: manager construction and entity builders, kept
//! out of individual test files in a `tests/common` module.

#![allow(dead_code)]

use std::sync::Arc;

use polaris_metastore::{
    AtomicMetastoreManager, CallContext, EntityType, InMemoryBackend, ManualClock, PolarisEntity,
    ReferenceStorageIntegration, SubType, TransactionalMetastoreManager, NULL_CATALOG_ID,
    ROOT_ENTITY_ID,
};

pub fn ctx() -> CallContext {
    CallContext::new("test-realm")
}

pub fn ctx_with_clock(clock: Arc<ManualClock>) -> CallContext {
    CallContext::with_clock("test-realm", clock)
}

pub fn transactional_manager() -> TransactionalMetastoreManager<InMemoryBackend> {
    TransactionalMetastoreManager::new(InMemoryBackend::new(), Arc::new(ReferenceStorageIntegration))
}

pub fn atomic_manager() -> AtomicMetastoreManager<InMemoryBackend> {
    AtomicMetastoreManager::new(InMemoryBackend::new(), Arc::new(ReferenceStorageIntegration))
}

fn next_id() -> i64 {
    polaris_metastore::model::generate_new_id()
}

pub fn new_principal(ctx: &CallContext, name: &str) -> PolarisEntity {
    PolarisEntity::new(
        NULL_CATALOG_ID,
        next_id(),
        ROOT_ENTITY_ID,
        EntityType::Principal,
        SubType::None,
        name,
        ctx.now_millis(),
    )
}

pub fn new_principal_role(ctx: &CallContext, name: &str) -> PolarisEntity {
    PolarisEntity::new(
        NULL_CATALOG_ID,
        next_id(),
        ROOT_ENTITY_ID,
        EntityType::PrincipalRole,
        SubType::None,
        name,
        ctx.now_millis(),
    )
}

pub fn new_catalog(ctx: &CallContext, name: &str) -> PolarisEntity {
    PolarisEntity::new(
        NULL_CATALOG_ID,
        next_id(),
        ROOT_ENTITY_ID,
        EntityType::Catalog,
        SubType::None,
        name,
        ctx.now_millis(),
    )
}

pub fn new_namespace(ctx: &CallContext, name: &str, catalog_id: i64, parent_id: i64) -> PolarisEntity {
    PolarisEntity::new(
        catalog_id,
        next_id(),
        parent_id,
        EntityType::Namespace,
        SubType::None,
        name,
        ctx.now_millis(),
    )
}

pub fn new_table(ctx: &CallContext, name: &str, catalog_id: i64, parent_id: i64) -> PolarisEntity {
    PolarisEntity::new(
        catalog_id,
        next_id(),
        parent_id,
        EntityType::TableLike,
        SubType::Table,
        name,
        ctx.now_millis(),
    )
}
