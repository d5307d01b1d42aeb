// ============================================================================
// Polaris Metastore Manager
// ============================================================================

//! Metastore manager for an Iceberg-compatible catalog: a pluggable
//! persistence contract, optimistic concurrency over per-entity and
//! per-grant version counters, a hierarchical entity model, and the
//! bootstrap/backfill protocol that seeds a fresh realm.
//!
//! Two interchangeable [`manager::MetastoreManager`] strategies sit over
//! one [`persistence::BasePersistence`] contract: a transactional strategy
//! for backends that offer multi-statement transactions
//! ([`manager::TransactionalMetastoreManager`]) and an atomic strategy for
//! backends that only offer compare-and-swap
//! ([`manager::AtomicMetastoreManager`]). The reference
//! [`persistence::memory::InMemoryBackend`] satisfies both.

pub mod core;
pub mod credentials;
pub mod manager;
pub mod model;
pub mod persistence;
pub mod prelude;
pub mod resolver;
pub mod secrets_manager;

// Re-export main types for convenience
pub use core::{CallContext, Clock, ManualClock, PolarisError, Result, SystemClock};
pub use credentials::{
    CredentialProperty, CredentialVendorError, ReferenceStorageIntegration, StorageIntegration,
};
pub use manager::{
    AtomicMetastoreManager, CreatedCatalog, CreatedPrincipal, GrantsView, MetastoreManager,
    RefreshResult, ResolvedEntity, TransactionalMetastoreManager,
};
pub use model::{
    property_keys, ActiveNameKey, EntityRef, EntityResult, EntityType, GrantRecord,
    MetastoreStatus, PolarisEntity, PrincipalSecrets, PrincipalSecretsCredentials, PrivilegeCode,
    Properties, SubType, NULL_CATALOG_ID, ROOT_ENTITY_ID,
};
pub use persistence::memory::InMemoryBackend;
pub use persistence::{
    ActiveNameSlice, AtomicPersistence, BasePersistence, ChangeTrackingSlice, GrantRecordsSlice,
    SecretsSlice, StorageIntegrationSlice, TransactionalPersistence, WriteEntityResult,
};
pub use resolver::PathEntry;
pub use secrets_manager::{InMemorySecretsManager, UserSecretReference, UserSecretsManager};
