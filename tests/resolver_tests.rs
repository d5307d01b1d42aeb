//! Unit tests for catalog-path resolution, exercised directly against
//! `InMemoryBackend` rather than through a manager.

mod common;

use polaris_metastore::resolver::{self, PathEntry};
use polaris_metastore::{BasePersistence, EntityType, InMemoryBackend, NULL_CATALOG_ID, ROOT_ENTITY_ID};

#[tokio::test]
async fn empty_path_resolves_to_root() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();

    let resolved = resolver::resolve(&backend, &ctx, &[]).await.unwrap().unwrap();
    assert_eq!(resolved.catalog_id, NULL_CATALOG_ID);
    assert_eq!(resolved.parent_id, ROOT_ENTITY_ID);
    assert!(resolved.ancestors.is_empty());
}

#[tokio::test]
async fn one_level_path_resolves_to_the_catalog() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "resolve_me");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();

    let path = [PathEntry::new(catalog.id, EntityType::Catalog, None)];
    let resolved = resolver::resolve(&backend, &ctx, &path).await.unwrap().unwrap();
    assert_eq!(resolved.catalog_id, catalog.id);
    assert_eq!(resolved.parent_id, catalog.id);
    assert_eq!(resolved.ancestors.len(), 1);
    assert_eq!(resolved.ancestors[0].id, catalog.id);
}

#[tokio::test]
async fn ancestor_version_mismatch_fails_to_resolve() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "versioned_catalog");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();

    let stale_path = [PathEntry::new(catalog.id, EntityType::Catalog, Some(catalog.entity_version + 1))];
    let resolved = resolver::resolve(&backend, &ctx, &stale_path).await.unwrap();
    assert!(resolved.is_err());
}

#[tokio::test]
async fn missing_ancestor_fails_to_resolve() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();

    let path = [PathEntry::new(999_999, EntityType::Catalog, None)];
    let resolved = resolver::resolve(&backend, &ctx, &path).await.unwrap();
    assert!(resolved.is_err());
}

#[tokio::test]
async fn two_level_path_resolves_namespace_under_catalog() {
    let backend = InMemoryBackend::new();
    let ctx = common::ctx();
    let catalog = common::new_catalog(&ctx, "parent_catalog");
    backend.write_entity(&ctx, &catalog, true, None).await.unwrap();
    let namespace = common::new_namespace(&ctx, "child_ns", catalog.id, catalog.id);
    backend.write_entity(&ctx, &namespace, true, None).await.unwrap();

    let path = [
        PathEntry::new(catalog.id, EntityType::Catalog, Some(catalog.entity_version)),
        PathEntry::new(namespace.id, EntityType::Namespace, Some(namespace.entity_version)),
    ];
    let resolved = resolver::resolve(&backend, &ctx, &path).await.unwrap().unwrap();
    assert_eq!(resolved.catalog_id, catalog.id);
    assert_eq!(resolved.parent_id, namespace.id);
    assert_eq!(resolved.ancestors.len(), 2);
}
