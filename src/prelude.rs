//! Recommended API entrypoints grouped by abstraction level.
//!
//! `manager` is the stable default for callers that only drive the
//! metastore contract (the REST layer, bootstrap tooling, tests).
//! `backend` is an explicit escape hatch for implementing a new
//! persistence backend or secrets/credential collaborator.

pub mod manager {
    //! Stable high-level surface: the public contract, its result types,
    //! and the two strategies that implement it.
    pub use crate::core::{CallContext, PolarisError, Result};
    pub use crate::manager::{
        AtomicMetastoreManager, CreatedCatalog, CreatedPrincipal, GrantsView, MetastoreManager,
        RefreshResult, ResolvedEntity, TransactionalMetastoreManager,
    };
    pub use crate::model::{
        EntityRef, EntityResult, EntityType, GrantRecord, MetastoreStatus, PolarisEntity,
        PrivilegeCode, Properties,
    };
    pub use crate::resolver::PathEntry;
}

pub mod backend {
    //! Escape hatch for implementing a new persistence backend.
    //!
    //! App-level callers should normally stay on `prelude::manager`.
    pub use crate::credentials::{CredentialProperty, CredentialVendorError, StorageIntegration};
    pub use crate::persistence::{
        ActiveNameSlice, AtomicPersistence, BasePersistence, ChangeTrackingSlice,
        GrantRecordsSlice, SecretsSlice, StorageIntegrationSlice, TransactionalPersistence,
        WriteEntityResult,
    };
    pub use crate::secrets_manager::{UserSecretReference, UserSecretsManager};
}
