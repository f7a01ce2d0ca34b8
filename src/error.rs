//! Crate-wide error type.
//!
//! Each layer keeps its own error enum; this umbrella exists for callers
//! that drive several layers from one place (a demo binary, an embedding
//! application) and want a single `?`-friendly type.

use crate::providers::ProviderError;
use crate::resolver::ResolveError;
use crate::scope::ScopeError;
use crate::storage::StorageError;
use thiserror::Error;

/// Any failure the crate can produce.
#[derive(Debug, Error)]
pub enum AcademyError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias using [`AcademyError`].
pub type AcademyResult<T> = Result<T, AcademyError>;
