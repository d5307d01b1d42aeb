//! Grant records: `(securable, grantee, privilege)`.

use serde::{Deserialize, Serialize};

use super::ids::EntityRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivilegeCode {
    CatalogManageAccess,
    CatalogManageMetadata,
    CatalogRoleUsage,
    PrincipalRoleUsage,
    ServiceManageAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantRecord {
    pub securable_catalog_id: i64,
    pub securable_id: i64,
    pub grantee_catalog_id: i64,
    pub grantee_id: i64,
    pub privilege_code: PrivilegeCode,
}

impl GrantRecord {
    pub fn new(securable: EntityRef, grantee: EntityRef, privilege_code: PrivilegeCode) -> Self {
        Self {
            securable_catalog_id: securable.catalog_id,
            securable_id: securable.id,
            grantee_catalog_id: grantee.catalog_id,
            grantee_id: grantee.id,
            privilege_code,
        }
    }

    pub fn securable(&self) -> EntityRef {
        EntityRef::new(self.securable_catalog_id, self.securable_id)
    }

    pub fn grantee(&self) -> EntityRef {
        EntityRef::new(self.grantee_catalog_id, self.grantee_id)
    }
}
