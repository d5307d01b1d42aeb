//! Reference in-memory backend. Backs every slice with copy-on-write maps
//! keyed by the documented tuple keys: readers clone a persistent
//! `im::HashMap` (cheap, structural sharing) instead of taking a lock for
//! the duration of a read.
//!
//! One instance satisfies both `TransactionalPersistence` (via a
//! realm-wide transaction lock plus snapshot/restore) and
//! `AtomicPersistence` (its per-call CAS checks already hold without the
//! surrounding lock) so either manager strategy can run against it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use im::{HashMap as ImHashMap, HashSet as ImHashSet};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::core::{CallContext, PolarisError, Result};
use crate::model::{
    ActiveNameKey, EntityRef, EntityType, GrantRecord, PolarisEntity, PrincipalSecrets,
    PrincipalSecretsCredentials, SubType,
};

use super::slices::{
    ActiveNameSlice, ChangeTrackingSlice, GrantRecordsSlice, SecretsSlice, StorageConfigInfo,
    StorageIntegrationSlice,
};
use super::{AtomicPersistence, BasePersistence, TransactionalPersistence, WriteEntityResult};

type EntityMap = ImHashMap<(i64, i64), PolarisEntity>;
type NameIndex = ImHashMap<ActiveNameKey, (i64, i64)>;
type GrantSet = ImHashSet<GrantRecord>;
type SecretsMap = ImHashMap<String, PrincipalSecrets>;
type StorageMap = ImHashMap<(i64, i64), StorageConfigInfo>;

#[derive(Default)]
struct Snapshot {
    entities: EntityMap,
    names: NameIndex,
    grants: GrantSet,
    secrets: SecretsMap,
    storage: StorageMap,
}

pub struct InMemoryBackend {
    entities: RwLock<EntityMap>,
    names: RwLock<NameIndex>,
    grants: RwLock<GrantSet>,
    secrets: RwLock<SecretsMap>,
    storage: RwLock<StorageMap>,
    /// Serializes transactional-strategy calls against one another; atomic
    /// calls bypass it and rely on the CAS checks below, matching the
    /// design note that the two strategies are not meant to be mixed
    /// against one live backend.
    txn_lock: Mutex<()>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(ImHashMap::new()),
            names: RwLock::new(ImHashMap::new()),
            grants: RwLock::new(ImHashSet::new()),
            secrets: RwLock::new(ImHashMap::new()),
            storage: RwLock::new(ImHashMap::new()),
            txn_lock: Mutex::new(()),
        }
    }

    async fn snapshot(&self) -> Snapshot {
        Snapshot {
            entities: self.entities.read().await.clone(),
            names: self.names.read().await.clone(),
            grants: self.grants.read().await.clone(),
            secrets: self.secrets.read().await.clone(),
            storage: self.storage.read().await.clone(),
        }
    }

    async fn restore(&self, snapshot: Snapshot) {
        *self.entities.write().await = snapshot.entities;
        *self.names.write().await = snapshot.names;
        *self.grants.write().await = snapshot.grants;
        *self.secrets.write().await = snapshot.secrets;
        *self.storage.write().await = snapshot.storage;
    }

    fn name_key(entity: &PolarisEntity) -> ActiveNameKey {
        ActiveNameKey::new(
            entity.catalog_id,
            entity.parent_id,
            entity.type_code,
            entity.name.clone(),
        )
    }
}

#[async_trait]
impl ActiveNameSlice for InMemoryBackend {
    async fn lookup_entity_by_name(
        &self,
        _ctx: &CallContext,
        catalog_id: i64,
        parent_id: i64,
        type_code: EntityType,
        name: &str,
    ) -> Result<Option<PolarisEntity>> {
        let key = ActiveNameKey::new(catalog_id, parent_id, type_code, name);
        let names = self.names.read().await;
        let Some(id_ref) = names.get(&key) else {
            return Ok(None);
        };
        Ok(self.entities.read().await.get(id_ref).cloned())
    }

    async fn lookup_entity_id_and_sub_type_by_name(
        &self,
        _ctx: &CallContext,
        catalog_id: i64,
        parent_id: i64,
        type_code: EntityType,
        name: &str,
    ) -> Result<Option<(i64, SubType)>> {
        let key = ActiveNameKey::new(catalog_id, parent_id, type_code, name);
        let names = self.names.read().await;
        let Some(id_ref) = names.get(&key) else {
            return Ok(None);
        };
        Ok(self
            .entities
            .read()
            .await
            .get(id_ref)
            .map(|e| (e.id, e.sub_type_code)))
    }

    async fn list_entities(
        &self,
        _ctx: &CallContext,
        catalog_id: i64,
        parent_id: i64,
        type_code: EntityType,
        limit: usize,
    ) -> Result<Vec<PolarisEntity>> {
        let entities = self.entities.read().await;
        Ok(entities
            .values()
            .filter(|e| {
                e.catalog_id == catalog_id && e.parent_id == parent_id && e.type_code == type_code
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn has_children(
        &self,
        _ctx: &CallContext,
        type_code: Option<EntityType>,
        catalog_id: i64,
        parent_id: i64,
    ) -> Result<bool> {
        let entities = self.entities.read().await;
        Ok(entities.values().any(|e| {
            e.catalog_id == catalog_id
                && e.parent_id == parent_id
                && type_code.map(|t| t == e.type_code).unwrap_or(true)
        }))
    }
}

#[async_trait]
impl ChangeTrackingSlice for InMemoryBackend {
    async fn lookup_entity_versions(
        &self,
        _ctx: &CallContext,
        ids: &[(i64, i64)],
    ) -> Result<Vec<Option<(i64, i64)>>> {
        let entities = self.entities.read().await;
        Ok(ids
            .iter()
            .map(|key| entities.get(key).map(|e| (e.entity_version, e.grant_records_version)))
            .collect())
    }

    async fn lookup_entity_grant_records_version(
        &self,
        _ctx: &CallContext,
        catalog_id: i64,
        id: i64,
    ) -> Result<Option<i64>> {
        Ok(self
            .entities
            .read()
            .await
            .get(&(catalog_id, id))
            .map(|e| e.grant_records_version))
    }
}

#[async_trait]
impl GrantRecordsSlice for InMemoryBackend {
    async fn write_to_grant_records(&self, _ctx: &CallContext, record: &GrantRecord) -> Result<()> {
        let mut grants = self.grants.write().await;
        grants.insert(record.clone());
        Ok(())
    }

    async fn delete_from_grant_records(
        &self,
        _ctx: &CallContext,
        record: &GrantRecord,
    ) -> Result<bool> {
        let mut grants = self.grants.write().await;
        Ok(grants.remove(record).is_some())
    }

    async fn delete_all_entity_grant_records(
        &self,
        _ctx: &CallContext,
        entity: &PolarisEntity,
        on_grantee: bool,
        on_securable: bool,
    ) -> Result<Vec<GrantRecord>> {
        let entity_ref = entity.entity_ref();
        let mut grants = self.grants.write().await;
        let matched: Vec<GrantRecord> = grants
            .iter()
            .filter(|g| {
                (on_grantee && g.grantee() == entity_ref)
                    || (on_securable && g.securable() == entity_ref)
            })
            .cloned()
            .collect();
        for g in &matched {
            grants.remove(g);
        }
        Ok(matched)
    }

    async fn load_all_grant_records_on_grantee(
        &self,
        _ctx: &CallContext,
        catalog_id: i64,
        id: i64,
    ) -> Result<Vec<GrantRecord>> {
        let target = EntityRef::new(catalog_id, id);
        let grants = self.grants.read().await;
        Ok(grants.iter().filter(|g| g.grantee() == target).cloned().collect())
    }

    async fn load_all_grant_records_on_securable(
        &self,
        _ctx: &CallContext,
        catalog_id: i64,
        id: i64,
    ) -> Result<Vec<GrantRecord>> {
        let target = EntityRef::new(catalog_id, id);
        let grants = self.grants.read().await;
        Ok(grants.iter().filter(|g| g.securable() == target).cloned().collect())
    }

    async fn lookup_grant_record(
        &self,
        _ctx: &CallContext,
        record: &GrantRecord,
    ) -> Result<Option<GrantRecord>> {
        let grants = self.grants.read().await;
        Ok(grants.get(record).cloned())
    }
}

#[async_trait]
impl SecretsSlice for InMemoryBackend {
    async fn load_principal_secrets(
        &self,
        _ctx: &CallContext,
        client_id: &str,
    ) -> Result<Option<PrincipalSecrets>> {
        Ok(self.secrets.read().await.get(client_id).cloned())
    }

    async fn generate_new_principal_secrets(
        &self,
        _ctx: &CallContext,
        _principal_name: &str,
        principal_id: i64,
    ) -> Result<PrincipalSecretsCredentials> {
        let client_id = Uuid::new_v4().to_string();
        let main_secret = Uuid::new_v4().to_string();
        let main_secret_hash = bcrypt::hash(&main_secret, bcrypt::DEFAULT_COST)
            .map_err(|e| PolarisError::BackendFailure(e.to_string()))?;

        let record = PrincipalSecrets::new(client_id.clone(), principal_id, main_secret_hash, None);
        self.secrets.write().await.insert(client_id.clone(), record);

        Ok(PrincipalSecretsCredentials { client_id, main_secret })
    }

    async fn rotate_principal_secrets(
        &self,
        _ctx: &CallContext,
        client_id: &str,
        principal_id: i64,
        reset: bool,
        old_secret_hash: &str,
    ) -> Result<Option<PrincipalSecretsCredentials>> {
        let mut secrets = self.secrets.write().await;
        let Some(current) = secrets.get(client_id) else {
            return Ok(None);
        };
        if current.principal_id != principal_id {
            return Ok(None);
        }
        if !reset && current.main_secret_hash != old_secret_hash {
            // CAS witness mismatch: someone rotated concurrently.
            return Ok(None);
        }

        let new_secret = Uuid::new_v4().to_string();
        let new_hash = bcrypt::hash(&new_secret, bcrypt::DEFAULT_COST)
            .map_err(|e| PolarisError::BackendFailure(e.to_string()))?;

        let updated = PrincipalSecrets::new(
            client_id.to_string(),
            principal_id,
            new_hash,
            Some(current.main_secret_hash.clone()),
        );
        secrets.insert(client_id.to_string(), updated);

        Ok(Some(PrincipalSecretsCredentials {
            client_id: client_id.to_string(),
            main_secret: new_secret,
        }))
    }

    async fn delete_principal_secrets(
        &self,
        _ctx: &CallContext,
        client_id: &str,
        principal_id: i64,
    ) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        if let Some(existing) = secrets.get(client_id) {
            if existing.principal_id == principal_id {
                secrets.remove(client_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageIntegrationSlice for InMemoryBackend {
    async fn create_storage_integration(
        &self,
        _ctx: &CallContext,
        catalog_id: i64,
        entity_id: i64,
        config: &StorageConfigInfo,
    ) -> Result<String> {
        let identifier = Uuid::new_v4().to_string();
        self.storage
            .write()
            .await
            .insert((catalog_id, entity_id), config.clone());
        Ok(identifier)
    }

    async fn persist_storage_integration_if_needed(
        &self,
        _ctx: &CallContext,
        entity: &PolarisEntity,
        integration: Option<&StorageConfigInfo>,
    ) -> Result<()> {
        let Some(integration) = integration else {
            return Ok(());
        };
        let key = (entity.catalog_id, entity.id);
        let mut storage = self.storage.write().await;
        if !storage.contains_key(&key) {
            storage.insert(key, integration.clone());
        }
        Ok(())
    }

    async fn load_polaris_storage_integration(
        &self,
        _ctx: &CallContext,
        entity: &PolarisEntity,
    ) -> Result<Option<StorageConfigInfo>> {
        Ok(self.storage.read().await.get(&(entity.catalog_id, entity.id)).cloned())
    }
}

#[async_trait]
impl BasePersistence for InMemoryBackend {
    async fn generate_new_id(&self, _ctx: &CallContext) -> Result<i64> {
        Ok(crate::model::generate_new_id())
    }

    async fn lookup_entity(
        &self,
        _ctx: &CallContext,
        catalog_id: i64,
        id: i64,
        type_code: EntityType,
    ) -> Result<Option<PolarisEntity>> {
        Ok(self
            .entities
            .read()
            .await
            .get(&(catalog_id, id))
            .filter(|e| e.type_code == type_code)
            .cloned())
    }

    async fn lookup_entities(
        &self,
        _ctx: &CallContext,
        ids: &[(i64, i64)],
    ) -> Result<Vec<Option<PolarisEntity>>> {
        let entities = self.entities.read().await;
        Ok(ids.iter().map(|key| entities.get(key).cloned()).collect())
    }

    async fn write_entity(
        &self,
        _ctx: &CallContext,
        entity: &PolarisEntity,
        name_or_parent_changed: bool,
        original_entity: Option<&PolarisEntity>,
    ) -> Result<WriteEntityResult> {
        let mut entities = self.entities.write().await;
        let mut names = self.names.write().await;
        let key = (entity.catalog_id, entity.id);

        match original_entity {
            None => {
                if let Some(existing) = entities.get(&key) {
                    return Ok(WriteEntityResult::EntityAlreadyExists(existing.clone()));
                }
                let name_key = InMemoryBackend::name_key(entity);
                if let Some(existing_ref) = names.get(&name_key) {
                    if let Some(existing) = entities.get(existing_ref) {
                        return Ok(WriteEntityResult::EntityAlreadyExists(existing.clone()));
                    }
                }
                names.insert(name_key, key);
                entities.insert(key, entity.clone());
                Ok(WriteEntityResult::Ok(entity.clone()))
            }
            Some(original) => {
                let Some(stored) = entities.get(&key) else {
                    return Ok(WriteEntityResult::RetryOnConcurrency);
                };
                if stored.entity_version != original.entity_version
                    || stored.grant_records_version != original.grant_records_version
                {
                    return Ok(WriteEntityResult::RetryOnConcurrency);
                }

                if name_or_parent_changed {
                    let new_key = InMemoryBackend::name_key(entity);
                    if let Some(existing_ref) = names.get(&new_key) {
                        if existing_ref != &key {
                            if let Some(existing) = entities.get(existing_ref) {
                                return Ok(WriteEntityResult::EntityAlreadyExists(existing.clone()));
                            }
                        }
                    }
                    let old_key = InMemoryBackend::name_key(original);
                    names.remove(&old_key);
                    names.insert(new_key, key);
                }

                entities.insert(key, entity.clone());
                Ok(WriteEntityResult::Ok(entity.clone()))
            }
        }
    }

    async fn write_entities(
        &self,
        ctx: &CallContext,
        entities: &[PolarisEntity],
        original_entities: Option<&[PolarisEntity]>,
    ) -> Result<Vec<WriteEntityResult>> {
        let mut results = Vec::with_capacity(entities.len());
        for (i, entity) in entities.iter().enumerate() {
            let original = original_entities.and_then(|originals| originals.get(i));
            results.push(self.write_entity(ctx, entity, true, original).await?);
        }
        Ok(results)
    }

    async fn delete_entity(&self, _ctx: &CallContext, entity: &PolarisEntity) -> Result<()> {
        let mut entities = self.entities.write().await;
        let mut names = self.names.write().await;
        entities.remove(&(entity.catalog_id, entity.id));
        names.remove(&InMemoryBackend::name_key(entity));
        Ok(())
    }

    async fn delete_all(&self, _ctx: &CallContext) -> Result<()> {
        *self.entities.write().await = ImHashMap::new();
        *self.names.write().await = ImHashMap::new();
        *self.grants.write().await = ImHashSet::new();
        *self.secrets.write().await = ImHashMap::new();
        *self.storage.write().await = ImHashMap::new();
        Ok(())
    }
}

#[async_trait]
impl TransactionalPersistence for InMemoryBackend {
    async fn run_in_transaction<T, F, Fut>(&self, _ctx: &CallContext, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: (FnOnce(&Self) -> Fut) + Send,
        Fut: Future<Output = Result<T>> + Send,
        Self: Sized,
    {
        let _guard = self.txn_lock.lock().await;
        let before = self.snapshot().await;
        match f(self).await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.restore(before).await;
                Err(err)
            }
        }
    }

    async fn run_in_read_transaction<T, F, Fut>(&self, _ctx: &CallContext, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: (FnOnce(&Self) -> Fut) + Send,
        Fut: Future<Output = Result<T>> + Send,
        Self: Sized,
    {
        let _guard = self.txn_lock.lock().await;
        f(self).await
    }
}

impl AtomicPersistence for InMemoryBackend {}
