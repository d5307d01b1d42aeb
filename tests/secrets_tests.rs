//! Secrets lifecycle: generation, rotation, and dropping a principal
//! cleans up its secrets and schedules an entity-cleanup task.

mod common;

use polaris_metastore::{EntityType, InMemorySecretsManager, MetastoreManager, MetastoreStatus, UserSecretsManager};

#[tokio::test]
async fn create_principal_generates_secrets_and_client_id() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let principal = common::new_principal(&ctx, "svc_account");
    let created = manager
        .create_principal(&ctx, principal)
        .await
        .unwrap()
        .value
        .unwrap();

    assert!(!created.credentials.client_id.is_empty());
    assert!(!created.credentials.main_secret.is_empty());
    assert_eq!(created.entity.client_id(), Some(created.credentials.client_id.as_str()));

    let loaded = manager
        .load_principal_secrets(&ctx, &created.credentials.client_id)
        .await
        .unwrap()
        .value
        .unwrap();
    assert_eq!(loaded.principal_id, created.entity.id);
    assert_ne!(loaded.main_secret_hash, created.credentials.main_secret);
}

#[tokio::test]
async fn rotate_principal_secrets_sets_and_clears_rotation_marker() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let principal = common::new_principal(&ctx, "rotating_account");
    let created = manager
        .create_principal(&ctx, principal)
        .await
        .unwrap()
        .value
        .unwrap();
    let secrets = manager
        .load_principal_secrets(&ctx, &created.credentials.client_id)
        .await
        .unwrap()
        .value
        .unwrap();

    manager
        .rotate_principal_secrets(&ctx, &created.credentials.client_id, created.entity.id, true, &secrets.main_secret_hash)
        .await
        .unwrap()
        .value
        .unwrap();

    let after_reset = manager
        .load_resolved_entity_by_id(&ctx, created.entity.catalog_id, created.entity.id, EntityType::Principal)
        .await
        .unwrap()
        .value
        .unwrap();
    assert!(after_reset.entity.rotation_required());

    let rotated_hash = manager
        .load_principal_secrets(&ctx, &created.credentials.client_id)
        .await
        .unwrap()
        .value
        .unwrap()
        .main_secret_hash;

    manager
        .rotate_principal_secrets(&ctx, &created.credentials.client_id, created.entity.id, false, &rotated_hash)
        .await
        .unwrap()
        .value
        .unwrap();

    let after_clear = manager
        .load_resolved_entity_by_id(&ctx, created.entity.catalog_id, created.entity.id, EntityType::Principal)
        .await
        .unwrap()
        .value
        .unwrap();
    assert!(!after_clear.entity.rotation_required());
}

#[tokio::test]
async fn dropping_a_principal_removes_its_secrets_and_schedules_cleanup() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();

    let principal = common::new_principal(&ctx, "doomed_account");
    let created = manager
        .create_principal(&ctx, principal)
        .await
        .unwrap()
        .value
        .unwrap();

    let drop_result = manager
        .drop_entity_if_exists(&ctx, Vec::new(), created.entity.clone(), None, true)
        .await
        .unwrap();
    assert!(drop_result.is_success());
    let task_id = drop_result.value.unwrap();
    assert!(task_id.is_some());

    // Secrets are gone.
    let after_drop = manager
        .load_principal_secrets(&ctx, &created.credentials.client_id)
        .await
        .unwrap();
    assert_eq!(after_drop.status, MetastoreStatus::EntityNotFound);

    // A cleanup task was scheduled and is leasable.
    let leased = manager.load_tasks(&ctx, "cleanup-executor", 10).await.unwrap().value.unwrap();
    assert!(leased.iter().any(|t| t.id == task_id.unwrap()));
}

#[tokio::test]
async fn in_memory_secrets_manager_round_trip() {
    let secrets_manager = InMemorySecretsManager::new();
    let reference = secrets_manager.write_secret("hunter2", 42).await.unwrap();
    let read_back = secrets_manager.read_secret(&reference).await.unwrap();
    assert_eq!(read_back, "hunter2");

    secrets_manager.delete_secret(&reference).await.unwrap();
    // The reference is gone; reading it again is an integrity failure, not
    // a silent None.
    assert!(secrets_manager.read_secret(&reference).await.is_err());
}
