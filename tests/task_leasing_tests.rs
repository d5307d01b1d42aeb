//! Task leasing is exclusive until the configured timeout elapses, using
//! `ManualClock` instead of real sleeps.

mod common;

use std::collections::HashMap;

use polaris_metastore::{CallContext, EntityType, ManualClock, MetastoreManager, PathEntry};

async fn create_cleanup_tasks(manager: &impl MetastoreManager, ctx: &CallContext, catalog_id: i64, n: usize) {
    for i in 0..n {
        let mut task = polaris_metastore::PolarisEntity::new(
            polaris_metastore::NULL_CATALOG_ID,
            polaris_metastore::model::generate_new_id(),
            polaris_metastore::ROOT_ENTITY_ID,
            EntityType::Task,
            polaris_metastore::SubType::EntityCleanupScheduler,
            format!("task-{i}-{catalog_id}"),
            ctx.now_millis(),
        );
        task.properties.insert(
            polaris_metastore::property_keys::TASK_TYPE.to_string(),
            "ENTITY_CLEANUP_SCHEDULER".to_string(),
        );
        manager
            .create_entity_if_not_exists(ctx, Vec::<PathEntry>::new(), task)
            .await
            .unwrap()
            .value
            .unwrap();
    }
}

#[tokio::test]
async fn tasks_are_leased_exclusively_until_timeout() {
    let manager = common::transactional_manager();
    let clock = ManualClock::new(1_000_000);
    let ctx = common::ctx_with_clock(clock.clone()).with_config(HashMap::from([(
        polaris_metastore::core::TASK_TIMEOUT_MILLIS_CONFIG.to_string(),
        "60000".to_string(),
    )]));
    manager.bootstrap_polaris_service(&ctx).await.unwrap();
    create_cleanup_tasks(&manager, &ctx, 0, 2).await;

    // E1 leases both tasks.
    let first_lease = manager.load_tasks(&ctx, "E1", 10).await.unwrap().value.unwrap();
    assert_eq!(first_lease.len(), 2);
    for task in &first_lease {
        assert_eq!(task.properties.get(polaris_metastore::property_keys::ATTEMPT_COUNT).map(String::as_str), Some("1"));
    }

    // Immediately re-querying finds nothing: both tasks are fresh leases.
    let second_lease = manager.load_tasks(&ctx, "E2", 10).await.unwrap().value.unwrap();
    assert!(second_lease.is_empty());

    // Advance past the configured timeout; the stale lease becomes eligible
    // again and attempt_count increments.
    clock.advance(120_000);
    let third_lease = manager.load_tasks(&ctx, "E2", 10).await.unwrap().value.unwrap();
    assert_eq!(third_lease.len(), 2);
    for task in &third_lease {
        assert_eq!(task.properties.get(polaris_metastore::property_keys::ATTEMPT_COUNT).map(String::as_str), Some("2"));
        assert_eq!(
            task.properties.get(polaris_metastore::property_keys::LAST_ATTEMPT_EXECUTOR_ID).map(String::as_str),
            Some("E2")
        );
    }
}

#[tokio::test]
async fn load_tasks_respects_limit() {
    let manager = common::transactional_manager();
    let ctx = common::ctx();
    manager.bootstrap_polaris_service(&ctx).await.unwrap();
    create_cleanup_tasks(&manager, &ctx, 0, 5).await;

    let leased = manager.load_tasks(&ctx, "E1", 2).await.unwrap().value.unwrap();
    assert_eq!(leased.len(), 2);
}
