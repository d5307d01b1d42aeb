//! `manager::support::ancestors_resolve` and `is_last_catalog_admin_role`:
//! the helpers behind `ENTITY_CANNOT_BE_RESOLVED` and the last-admin-role
//! drop guard, exercised directly against `InMemoryBackend`.

mod common;

use polaris_metastore::manager::support::{ancestors_resolve, is_last_catalog_admin_role};
use polaris_metastore::{BasePersistence, EntityType, InMemoryBackend, MetastoreManager, MetastoreStatus, SubType};

#[tokio::test]
async fn namespace_resolves_while_its_catalog_is_present() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "present_catalog");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();
    let namespace = common::new_namespace(&ctx, "ns", catalog.id, catalog.id);
    backend.write_entity(&ctx, &namespace, true, None).await.unwrap();

    assert!(ancestors_resolve(&backend, &ctx, &namespace).await.unwrap());
}

#[tokio::test]
async fn namespace_cannot_resolve_once_its_catalog_is_gone() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "doomed_catalog");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();
    let namespace = common::new_namespace(&ctx, "ns", catalog.id, catalog.id);
    backend.write_entity(&ctx, &namespace, true, None).await.unwrap();

    backend.delete_entity(&ctx, &catalog).await.unwrap();

    assert!(!ancestors_resolve(&backend, &ctx, &namespace).await.unwrap());
}

#[tokio::test]
async fn nested_namespace_cannot_resolve_once_its_parent_namespace_is_gone() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "nested_catalog");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();
    let parent_ns = common::new_namespace(&ctx, "parent_ns", catalog.id, catalog.id);
    backend.write_entity(&ctx, &parent_ns, true, None).await.unwrap();
    let child_ns = common::new_namespace(&ctx, "child_ns", catalog.id, parent_ns.id);
    backend.write_entity(&ctx, &child_ns, true, None).await.unwrap();

    assert!(ancestors_resolve(&backend, &ctx, &child_ns).await.unwrap());

    backend.delete_entity(&ctx, &parent_ns).await.unwrap();
    assert!(!ancestors_resolve(&backend, &ctx, &child_ns).await.unwrap());
}

#[tokio::test]
async fn table_cannot_resolve_once_its_namespace_is_gone() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "table_catalog");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();
    let namespace = common::new_namespace(&ctx, "ns", catalog.id, catalog.id);
    backend.write_entity(&ctx, &namespace, true, None).await.unwrap();
    let table = common::new_table(&ctx, "events", catalog.id, namespace.id);
    backend.write_entity(&ctx, &table, true, None).await.unwrap();

    backend.delete_entity(&ctx, &namespace).await.unwrap();
    assert!(!ancestors_resolve(&backend, &ctx, &table).await.unwrap());
}

#[tokio::test]
async fn is_last_catalog_admin_role_is_false_for_non_admin_roles() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "role_catalog");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();
    let other_role = polaris_metastore::PolarisEntity::new(
        catalog.id,
        polaris_metastore::model::generate_new_id(),
        catalog.id,
        EntityType::CatalogRole,
        SubType::None,
        "read_only",
        ctx.now_millis(),
    );
    backend.write_entity(&ctx, &other_role, true, None).await.unwrap();

    assert!(!is_last_catalog_admin_role(&backend, &ctx, &other_role).await.unwrap());
}

#[tokio::test]
async fn load_resolved_entity_reports_entity_cannot_be_resolved_for_an_orphaned_row() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let catalog = common::new_catalog(&ctx, "orphan_catalog");
    let created = manager
        .create_catalog(&ctx, catalog, Vec::new(), None)
        .await
        .unwrap()
        .value
        .unwrap();
    let catalog = created.catalog;

    let namespace = common::new_namespace(&ctx, "orphan_ns", catalog.id, catalog.id);
    let catalog_path = vec![polaris_metastore::PathEntry::new(catalog.id, EntityType::Catalog, Some(catalog.entity_version))];
    let namespace = manager
        .create_entity_if_not_exists(&ctx, catalog_path, namespace)
        .await
        .unwrap()
        .value
        .unwrap();

    // Remove the catalog directly through the backend, bypassing the
    // manager's own CatalogNotEmpty guard, to simulate a structurally
    // broken ancestor chain.
    manager.backend().delete_entity(&ctx, &catalog).await.unwrap();

    let resolved = manager
        .load_resolved_entity_by_id(&ctx, namespace.catalog_id, namespace.id, EntityType::Namespace)
        .await
        .unwrap();
    assert_eq!(resolved.status, MetastoreStatus::EntityCannotBeResolved);
}

#[tokio::test]
async fn is_last_catalog_admin_role_is_true_when_it_is_the_only_role() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "solo_role_catalog");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();
    let admin_role = polaris_metastore::PolarisEntity::new(
        catalog.id,
        polaris_metastore::model::generate_new_id(),
        catalog.id,
        EntityType::CatalogRole,
        SubType::None,
        "catalog_admin",
        ctx.now_millis(),
    );
    backend.write_entity(&ctx, &admin_role, true, None).await.unwrap();

    assert!(is_last_catalog_admin_role(&backend, &ctx, &admin_role).await.unwrap());
}
