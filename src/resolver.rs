//! Catalog path resolution: turns an ordered ancestor chain into
//! `(catalogId, parentId)` plus the re-validated ancestor entities, used
//! by the transactional strategy to get serializable-style reads without
//! the backend's own transaction envelope doing the revalidation for it.

use crate::core::{CallContext, Result};
use crate::model::{EntityType, PolarisEntity, MetastoreStatus, NULL_CATALOG_ID, ROOT_ENTITY_ID};
use crate::persistence::BasePersistence;

/// One link in a `catalogPath`: the ancestor's own id, its type (needed to
/// re-look-up it, since ids alone are not typed), and the version the
/// caller last observed, if any.
#[derive(Debug, Clone, Copy)]
pub struct PathEntry {
    pub id: i64,
    pub type_code: EntityType,
    pub expected_version: Option<i64>,
}

impl PathEntry {
    pub fn new(id: i64, type_code: EntityType, expected_version: Option<i64>) -> Self {
        Self {
            id,
            type_code,
            expected_version,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub catalog_id: i64,
    pub parent_id: i64,
    pub ancestors: Vec<PolarisEntity>,
}

/// Resolution failure: always `CATALOG_PATH_CANNOT_BE_RESOLVED`, carried
/// as a typed error rather than folded into the generic `Result` so
/// callers can convert it into the public `EntityResult` without guessing
/// which fatal-vs-status bucket it belongs in.
pub struct PathUnresolved;

impl From<PathUnresolved> for MetastoreStatus {
    fn from(_: PathUnresolved) -> Self {
        MetastoreStatus::CatalogPathCannotBeResolved
    }
}

/// Re-looks-up each ancestor by id and, when the caller supplied a
/// version, verifies it still matches. An ancestor's `catalogId` for the
/// lookup is the id of the previous ancestor in the chain (or the
/// null-catalog sentinel for the first entry, since catalogs live directly
/// under ROOT).
pub async fn resolve<P: BasePersistence + ?Sized>(
    backend: &P,
    ctx: &CallContext,
    path: &[PathEntry],
) -> Result<std::result::Result<ResolvedPath, PathUnresolved>> {
    if path.is_empty() {
        return Ok(Ok(ResolvedPath {
            catalog_id: NULL_CATALOG_ID,
            parent_id: ROOT_ENTITY_ID,
            ancestors: Vec::new(),
        }));
    }

    let mut ancestors = Vec::with_capacity(path.len());
    let mut lookup_catalog_id = NULL_CATALOG_ID;

    for entry in path {
        let Some(found) = backend
            .lookup_entity(ctx, lookup_catalog_id, entry.id, entry.type_code)
            .await?
        else {
            return Ok(Err(PathUnresolved));
        };

        if let Some(expected) = entry.expected_version {
            if found.entity_version != expected {
                return Ok(Err(PathUnresolved));
            }
        }

        // The catalog (first entry) establishes the catalogId every
        // descendant is looked up under; its own catalog_id field is the
        // null sentinel since it lives under ROOT.
        lookup_catalog_id = if ancestors.is_empty() {
            found.id
        } else {
            lookup_catalog_id
        };

        ancestors.push(found);
    }

    let catalog_id = ancestors[0].id;
    let parent_id = ancestors.last().map(|e| e.id).unwrap_or(ROOT_ENTITY_ID);

    Ok(Ok(ResolvedPath {
        catalog_id,
        parent_id,
        ancestors,
    }))
}
