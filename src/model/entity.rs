//! The shared entity shape described in the data model: every catalog,
//! namespace, table/view, principal, role, task and the root container
//! itself is one `PolarisEntity` distinguished by `type_code`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ids::{EntityRef, NULL_CATALOG_ID, ROOT_ENTITY_ID};

/// Top-level kind of an entity. Ordering here is containment order, root
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Root,
    Principal,
    PrincipalRole,
    Catalog,
    CatalogRole,
    Namespace,
    TableLike,
    Task,
}

impl EntityType {
    /// Entities of this type may hold privileges (appear as a grant's
    /// grantee), per the containment table's "Grantee?" column.
    pub fn is_grantee(&self) -> bool {
        matches!(
            self,
            EntityType::Principal | EntityType::PrincipalRole | EntityType::CatalogRole
        )
    }

    /// Every entity except TASK can be a securable (grant record semantics).
    pub fn is_securable(&self) -> bool {
        !matches!(self, EntityType::Task)
    }
}

/// Finer-grained distinction within a type, e.g. TABLE_LIKE carries a
/// sub-type of TABLE vs VIEW, and TASK carries the scheduled task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubType {
    Table,
    View,
    EntityCleanupScheduler,
    None,
}

/// Free-form property bag attached to an entity. A thin alias rather than a
/// newtype: callers read/write `properties`/`internalProperties` like any
/// other map.
pub type Properties = HashMap<String, String>;

/// Well-known property keys, named here rather than inlined so a typo
/// becomes a compile error at the call site instead of a silent miss.
pub mod property_keys {
    pub const CLEANUP_TASK_DATA: &str = "data";
    pub const TASK_TYPE: &str = "task_type";
    pub const LAST_ATTEMPT_EXECUTOR_ID: &str = "last_attempt_executor_id";
    pub const LAST_ATTEMPT_START_TIME: &str = "last_attempt_start_time";
    pub const ATTEMPT_COUNT: &str = "attempt_count";
    pub const CLIENT_ID: &str = "client_id";
    pub const PRINCIPAL_CREDENTIAL_ROTATION_REQUIRED_STATE: &str =
        "PRINCIPAL_CREDENTIAL_ROTATION_REQUIRED_STATE";
    pub const STORAGE_CONFIGURATION_INFO: &str = "storage-configuration-info";
    pub const STORAGE_INTEGRATION_IDENTIFIER: &str = "storage-integration-identifier";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolarisEntity {
    pub catalog_id: i64,
    pub id: i64,
    pub parent_id: i64,
    pub type_code: EntityType,
    pub sub_type_code: SubType,
    pub name: String,
    pub entity_version: i64,
    pub grant_records_version: i64,
    pub create_timestamp: i64,
    pub last_update_timestamp: i64,
    pub drop_timestamp: i64,
    pub properties: Properties,
    pub internal_properties: Properties,
}

impl PolarisEntity {
    /// Construct a fresh entity at version 1.
    pub fn new(
        catalog_id: i64,
        id: i64,
        parent_id: i64,
        type_code: EntityType,
        sub_type_code: SubType,
        name: impl Into<String>,
        now_millis: i64,
    ) -> Self {
        Self {
            catalog_id,
            id,
            parent_id,
            type_code,
            sub_type_code,
            name: name.into(),
            entity_version: 1,
            grant_records_version: 1,
            create_timestamp: now_millis,
            last_update_timestamp: now_millis,
            drop_timestamp: 0,
            properties: Properties::new(),
            internal_properties: Properties::new(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.catalog_id, self.id)
    }

    pub fn is_dropped(&self) -> bool {
        self.drop_timestamp != 0
    }

    pub fn is_root(&self) -> bool {
        matches!(self.type_code, EntityType::Root)
    }

    /// `undroppable` depends on entity state, not just type, so it is not a
    /// stored flag: root principal / service-admin role / the last catalog
    /// role are computed from the entity's own fields and the caller's
    /// knowledge of its siblings (see `manager::support::is_undroppable`).
    pub fn client_id(&self) -> Option<&str> {
        self.internal_properties
            .get(property_keys::CLIENT_ID)
            .map(|s| s.as_str())
    }

    pub fn rotation_required(&self) -> bool {
        self.internal_properties
            .get(property_keys::PRINCIPAL_CREDENTIAL_ROTATION_REQUIRED_STATE)
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

/// Build the well-known ROOT entity. `catalogId` is the null-id sentinel
/// and its own id is the well-known root entity id, so top-level entities
/// resolve to `(NULL_CATALOG_ID, ROOT_ENTITY_ID)`.
pub fn new_root_entity(now_millis: i64) -> PolarisEntity {
    PolarisEntity::new(
        NULL_CATALOG_ID,
        ROOT_ENTITY_ID,
        ROOT_ENTITY_ID,
        EntityType::Root,
        SubType::None,
        "ROOT",
        now_millis,
    )
}
