//! Identifiers used throughout the entity model.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Sentinel used for `catalogId` on entities that do not live inside a
/// catalog (principals, principal roles, the root container itself, tasks).
pub const NULL_CATALOG_ID: i64 = -1;

/// Well-known id of the single ROOT entity in a realm.
pub const ROOT_ENTITY_ID: i64 = 0;

/// Monotonic, process-wide id generator backing `generateNewId`.
///
/// The in-memory reference backend uses this; a production backend would
/// draw ids from its own sequence/keyspace instead.
static NEXT_ID: AtomicI64 = AtomicI64::new(ROOT_ENTITY_ID + 1);

pub fn generate_new_id() -> i64 {
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

/// Identifies an entity uniquely within a realm: `(catalogId, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub catalog_id: i64,
    pub id: i64,
}

impl EntityRef {
    pub fn new(catalog_id: i64, id: i64) -> Self {
        Self { catalog_id, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.catalog_id, self.id)
    }
}

/// The active-name key: `(catalogId, parentId, typeCode, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveNameKey {
    pub catalog_id: i64,
    pub parent_id: i64,
    pub type_code: super::entity::EntityType,
    pub name: String,
}

impl ActiveNameKey {
    pub fn new(
        catalog_id: i64,
        parent_id: i64,
        type_code: super::entity::EntityType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            catalog_id,
            parent_id,
            type_code,
            name: name.into(),
        }
    }
}
