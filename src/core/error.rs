//! Fatal diagnostics: programmer-error conditions that abort a call
//! rather than returning a status in the result envelope. One `thiserror`
//! enum, no panics.

use thiserror::Error;

use crate::model::MetastoreStatus;

#[derive(Error, Debug)]
pub enum PolarisError {
    /// Internal control-flow signal: a manager operation detected an
    /// expected predicate failure (name collision, non-empty container,
    /// concurrent modification, ...) while inside a backend transaction
    /// and needs the transaction rolled back before the caller sees the
    /// status. Never escapes the `manager` module — every public entry
    /// point converts it back into an `EntityResult::failure` (see
    /// `manager::run_guarded`).
    #[error("operation aborted with status {0}")]
    StatusAbort(MetastoreStatus),

    #[error("argument '{0}' must not be null")]
    NullArgument(&'static str),

    #[error("entity {0} is not a valid grantee")]
    InvalidGrantee(crate::model::EntityRef),

    #[error("entity {0} is not a valid securable")]
    InvalidSecurable(crate::model::EntityRef),

    #[error("bootstrap entity missing mid-operation: {0}")]
    BootstrapEntityMissing(&'static str),

    #[error("backend signalled an unexpected failure: {0}")]
    BackendFailure(String),

    #[error("secret integrity check failed for reference {0}")]
    SecretIntegrity(String),
}

pub type Result<T> = std::result::Result<T, PolarisError>;
