//! The persistence backend interface: a handful of logical "slices",
//! composed into one `BasePersistence` trait, plus two refinements a
//! concrete backend can offer instead of (or alongside) one another.
//!
//! Each logical table is its own trait, composed via supertraits, so a
//! backend implementor can satisfy them with separate underlying stores
//! if it wants to.

pub mod memory;
pub mod slices;

use async_trait::async_trait;

use crate::core::{CallContext, Result};
use crate::model::PolarisEntity;

pub use slices::{
    ActiveNameSlice, ChangeTrackingSlice, GrantRecordsSlice, SecretsSlice, StorageIntegrationSlice,
};

/// Outcome of a compare-and-swap style `writeEntity`/`writeEntities` call.
/// A sum type rather than an exception: it models an operation's effect
/// as data instead of relying on control-flow side effects.
#[derive(Debug, Clone)]
pub enum WriteEntityResult {
    Ok(PolarisEntity),
    /// A same-id or same-active-name record already exists; the payload is
    /// the entity that is currently stored.
    EntityAlreadyExists(PolarisEntity),
    /// `originalEntity`'s `(entityVersion, grantRecordsVersion)` no longer
    /// matches the stored record.
    RetryOnConcurrency,
}

impl WriteEntityResult {
    pub fn into_entity(self) -> Option<PolarisEntity> {
        match self {
            WriteEntityResult::Ok(e) => Some(e),
            _ => None,
        }
    }
}

/// Identity + entities slice + the composed slices. Every backend must
/// implement this; the two refinements below add execution strategies on
/// top.
#[async_trait]
pub trait BasePersistence:
    ActiveNameSlice + ChangeTrackingSlice + GrantRecordsSlice + SecretsSlice + StorageIntegrationSlice
{
    /// Generates a realm-wide unique 64-bit id.
    async fn generate_new_id(&self, ctx: &CallContext) -> Result<i64>;

    async fn lookup_entity(
        &self,
        ctx: &CallContext,
        catalog_id: i64,
        id: i64,
        type_code: crate::model::EntityType,
    ) -> Result<Option<PolarisEntity>>;

    async fn lookup_entities(
        &self,
        ctx: &CallContext,
        ids: &[(i64, i64)],
    ) -> Result<Vec<Option<PolarisEntity>>>;

    /// `original_entity` is the witness of pre-state for optimistic
    /// concurrency; `None` means "create". `name_or_parent_changed` tells
    /// the backend whether to update the active-name index.
    async fn write_entity(
        &self,
        ctx: &CallContext,
        entity: &PolarisEntity,
        name_or_parent_changed: bool,
        original_entity: Option<&PolarisEntity>,
    ) -> Result<WriteEntityResult>;

    async fn write_entities(
        &self,
        ctx: &CallContext,
        entities: &[PolarisEntity],
        original_entities: Option<&[PolarisEntity]>,
    ) -> Result<Vec<WriteEntityResult>>;

    async fn delete_entity(&self, ctx: &CallContext, entity: &PolarisEntity) -> Result<()>;

    /// Deletes every slice in the realm. Used for tests and teardown
    /// (`purge`); the manager layer is responsible for logging this at
    /// warn level before it runs.
    async fn delete_all(&self, ctx: &CallContext) -> Result<()>;
}

/// A backend-managed transaction wrapping every public operation.
/// `run_in_transaction` may mutate;
/// `run_in_read_transaction` is a read-only pass that still benefits from
/// a consistent snapshot across the whole closure.
#[async_trait]
pub trait TransactionalPersistence: BasePersistence {
    async fn run_in_transaction<T, F, Fut>(&self, ctx: &CallContext, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: (FnOnce(&Self) -> Fut) + Send,
        Fut: std::future::Future<Output = Result<T>> + Send,
        Self: Sized;

    async fn run_in_read_transaction<T, F, Fut>(&self, ctx: &CallContext, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: (FnOnce(&Self) -> Fut) + Send,
        Fut: std::future::Future<Output = Result<T>> + Send,
        Self: Sized;

    /// Like `run_in_transaction` but for actions with no useful return
    /// value.
    async fn run_action_in_transaction<F, Fut>(&self, ctx: &CallContext, f: F) -> Result<()>
    where
        F: (FnOnce(&Self) -> Fut) + Send,
        Fut: std::future::Future<Output = Result<()>> + Send,
        Self: Sized,
    {
        self.run_in_transaction(ctx, f).await
    }
}

/// Marker refinement: every `BasePersistence` method listed above is
/// individually atomic with compare-and-swap semantics.
/// No extra methods are needed — the CAS contract is already expressed by
/// `WriteEntityResult` and by `original_entity` witnesses on the write
/// methods; this trait only asserts that a backend honors it without the
/// surrounding transaction envelope above.
pub trait AtomicPersistence: BasePersistence {}
