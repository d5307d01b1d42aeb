pub mod entity;
pub mod grant;
pub mod ids;
pub mod result;
pub mod secrets;

pub use entity::{property_keys, EntityType, Properties, PolarisEntity, SubType};
pub use grant::{GrantRecord, PrivilegeCode};
pub use ids::{generate_new_id, ActiveNameKey, EntityRef, NULL_CATALOG_ID, ROOT_ENTITY_ID};
pub use result::{EntityResult, MetastoreStatus};
pub use secrets::{PrincipalSecrets, PrincipalSecretsCredentials};
