//! Catalog creation with default/explicit principal-role grants, and the
//! namespace/table drop-ordering rules.

mod common;

use polaris_metastore::{EntityType, MetastoreManager, PathEntry, PrivilegeCode};

#[tokio::test]
async fn create_catalog_with_no_principal_roles_grants_service_admin() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let catalog = common::new_catalog(&ctx, "my_catalog");
    let created = manager
        .create_catalog(&ctx, catalog, Vec::new(), None)
        .await
        .unwrap();
    assert!(created.is_success());
    let created = created.value.unwrap();
    assert_eq!(created.catalog.name, "my_catalog");
    assert_eq!(created.catalog_admin_role.name, "catalog_admin");

    let role_grants = manager
        .load_grants_on_securable(&ctx, created.catalog_admin_role.entity_ref())
        .await
        .unwrap()
        .value
        .unwrap();
    // service_admin role was granted PRINCIPAL_ROLE_USAGE over catalog_admin.
    assert!(role_grants
        .grants
        .iter()
        .any(|g| g.privilege_code == PrivilegeCode::PrincipalRoleUsage));

    let catalog_grants = manager
        .load_grants_on_securable(&ctx, created.catalog.entity_ref())
        .await
        .unwrap()
        .value
        .unwrap();
    assert!(catalog_grants
        .grants
        .iter()
        .any(|g| g.privilege_code == PrivilegeCode::CatalogManageAccess));
    assert!(catalog_grants
        .grants
        .iter()
        .any(|g| g.privilege_code == PrivilegeCode::CatalogManageMetadata));
}

#[tokio::test]
async fn create_catalog_with_explicit_principal_roles() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let role = common::new_principal_role(&ctx, "data_engineers");
    let created_role = manager
        .create_entity_if_not_exists(&ctx, Vec::new(), role)
        .await
        .unwrap()
        .value
        .unwrap();

    let catalog = common::new_catalog(&ctx, "explicit_catalog");
    let created = manager
        .create_catalog(&ctx, catalog, vec![created_role.entity_ref()], None)
        .await
        .unwrap()
        .value
        .unwrap();

    let role_grants = manager
        .load_grants_on_securable(&ctx, created.catalog_admin_role.entity_ref())
        .await
        .unwrap()
        .value
        .unwrap();
    assert!(role_grants
        .grants
        .iter()
        .any(|g| g.grantee() == created_role.entity_ref()));
}

#[tokio::test]
async fn create_catalog_retry_with_same_id_is_idempotent() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let catalog = common::new_catalog(&ctx, "retry_catalog");
    let first = manager
        .create_catalog(&ctx, catalog.clone(), Vec::new(), None)
        .await
        .unwrap()
        .value
        .unwrap();

    let second = manager
        .create_catalog(&ctx, catalog, Vec::new(), None)
        .await
        .unwrap();
    assert!(second.is_success());
    let second = second.value.unwrap();
    assert_eq!(second.catalog.id, first.catalog.id);
    assert_eq!(second.catalog_admin_role.id, first.catalog_admin_role.id);
}

#[tokio::test]
async fn namespace_and_table_lifecycle() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let catalog = common::new_catalog(&ctx, "lifecycle_catalog");
    let created = manager
        .create_catalog(&ctx, catalog, Vec::new(), None)
        .await
        .unwrap()
        .value
        .unwrap();
    let catalog = created.catalog;

    let namespace = common::new_namespace(&ctx, "ns", catalog.id, catalog.id);
    let catalog_path = vec![PathEntry::new(catalog.id, EntityType::Catalog, Some(catalog.entity_version))];
    let namespace = manager
        .create_entity_if_not_exists(&ctx, catalog_path.clone(), namespace)
        .await
        .unwrap()
        .value
        .unwrap();

    let table_path = vec![
        PathEntry::new(catalog.id, EntityType::Catalog, Some(catalog.entity_version)),
        PathEntry::new(namespace.id, EntityType::Namespace, Some(namespace.entity_version)),
    ];
    let table = common::new_table(&ctx, "events", catalog.id, namespace.id);
    let table = manager
        .create_entity_if_not_exists(&ctx, table_path.clone(), table)
        .await
        .unwrap()
        .value
        .unwrap();

    // Dropping a non-empty namespace fails.
    let drop_ns = manager
        .drop_entity_if_exists(&ctx, catalog_path.clone(), namespace.clone(), None, false)
        .await
        .unwrap();
    assert_eq!(drop_ns.status, polaris_metastore::MetastoreStatus::NamespaceNotEmpty);

    // Drop the table first, then the namespace succeeds.
    let drop_table = manager
        .drop_entity_if_exists(&ctx, table_path, table, None, false)
        .await
        .unwrap();
    assert!(drop_table.is_success());

    let drop_ns = manager
        .drop_entity_if_exists(&ctx, catalog_path, namespace, None, false)
        .await
        .unwrap();
    assert!(drop_ns.is_success());
}

#[tokio::test]
async fn catalog_not_empty_with_two_catalog_roles() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let catalog = common::new_catalog(&ctx, "two_role_catalog");
    let created = manager
        .create_catalog(&ctx, catalog, Vec::new(), None)
        .await
        .unwrap()
        .value
        .unwrap();
    let catalog = created.catalog;

    // A second catalog role beyond the automatically created admin role.
    let extra_role = polaris_metastore::PolarisEntity::new(
        catalog.id,
        polaris_metastore::model::generate_new_id(),
        catalog.id,
        EntityType::CatalogRole,
        polaris_metastore::SubType::None,
        "read_only",
        ctx.now_millis(),
    );
    let catalog_path = vec![PathEntry::new(catalog.id, EntityType::Catalog, Some(catalog.entity_version))];
    manager
        .create_entity_if_not_exists(&ctx, catalog_path.clone(), extra_role)
        .await
        .unwrap()
        .value
        .unwrap();

    let drop_catalog = manager
        .drop_entity_if_exists(&ctx, Vec::new(), catalog, None, false)
        .await
        .unwrap();
    assert_eq!(drop_catalog.status, polaris_metastore::MetastoreStatus::CatalogNotEmpty);
}

#[tokio::test]
async fn dropping_the_last_catalog_admin_role_directly_is_undroppable() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let catalog = common::new_catalog(&ctx, "solo_role_catalog");
    let created = manager
        .create_catalog(&ctx, catalog, Vec::new(), None)
        .await
        .unwrap()
        .value
        .unwrap();
    let catalog = created.catalog;
    let admin_role = created.catalog_admin_role;

    let catalog_path = vec![PathEntry::new(catalog.id, EntityType::Catalog, Some(catalog.entity_version))];
    let drop_role = manager
        .drop_entity_if_exists(&ctx, catalog_path.clone(), admin_role.clone(), None, false)
        .await
        .unwrap();
    assert_eq!(drop_role.status, polaris_metastore::MetastoreStatus::EntityUndroppable);

    // Once a second role exists, the (no longer last) admin role becomes
    // droppable directly.
    let extra_role = polaris_metastore::PolarisEntity::new(
        catalog.id,
        polaris_metastore::model::generate_new_id(),
        catalog.id,
        EntityType::CatalogRole,
        polaris_metastore::SubType::None,
        "read_only",
        ctx.now_millis(),
    );
    manager
        .create_entity_if_not_exists(&ctx, catalog_path.clone(), extra_role)
        .await
        .unwrap()
        .value
        .unwrap();

    let drop_role = manager
        .drop_entity_if_exists(&ctx, catalog_path, admin_role, None, false)
        .await
        .unwrap();
    assert!(drop_role.is_success());
}

#[tokio::test]
async fn subscoped_creds_require_storage_integration() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let catalog = common::new_catalog(&ctx, "creds_catalog");
    let created = manager
        .create_catalog(&ctx, catalog, Vec::new(), None)
        .await
        .unwrap()
        .value
        .unwrap();

    // No storage config was attached, so vending credentials must fail with
    // SUBSCOPE_CREDS_ERROR rather than panicking.
    let creds = manager
        .get_subscoped_creds_for_entity(
            &ctx,
            created.catalog.catalog_id,
            created.catalog.id,
            EntityType::Catalog,
            Vec::new(),
            vec!["s3://bucket/data".to_string()],
            Vec::new(),
        )
        .await
        .unwrap();
    assert_eq!(creds.status, polaris_metastore::MetastoreStatus::SubscopeCredsError);
}
