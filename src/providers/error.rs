//! Error types for administrative operations.

use crate::scope::ScopeError;
use thiserror::Error;

/// Errors surfaced by [`StandardAdminProvider`](crate::providers::StandardAdminProvider)
/// operations.
///
/// Mutation failures are surfaced to the initiating caller for user-visible
/// retry; nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The operation is reserved for platform operators.
    #[error("operation requires the platform role")]
    PlatformRequired,

    /// A platform viewer must select a tenant before this operation.
    #[error("a tenant must be selected for this operation")]
    TenantRequired,

    /// No resolved viewer was available to scope the query.
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// The document does not exist — or is outside the viewer's scope,
    /// which is deliberately indistinguishable.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Caller-supplied data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Two documents that must share an academy do not.
    #[error("{resource} {id} belongs to a different academy")]
    CrossTenant { resource: &'static str, id: String },

    /// Creating this academy would leave two active academies with the same
    /// admin email, breaking role resolution.
    #[error("an active academy already uses admin email {email}")]
    DuplicateAdminEmail { email: String },

    /// Failure from the underlying document store.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    pub(crate) fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }

    pub(crate) fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub(crate) fn cross_tenant(resource: &'static str, id: impl Into<String>) -> Self {
        Self::CrossTenant {
            resource,
            id: id.into(),
        }
    }
}

/// Result alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
