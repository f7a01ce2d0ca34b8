//! Role resolution: mapping a freshly authenticated principal to a viewer.
//!
//! The resolver answers one question — who is this principal allowed to be —
//! and answers it fail-closed. A platform-domain email yields the platform
//! role immediately; anything else must match exactly one active academy's
//! `adminEmail`. No match, a missing email, or any directory failure all
//! produce an error, and the session layer reacts to every error the same
//! way: forced sign-out, viewer stays `None`. A partially-resolved viewer
//! is unrepresentable.

use crate::identity::Principal;
use crate::model::{self, Academy, collections, fields};
use crate::storage::{DocumentStore, Filter};
use crate::viewer::Viewer;
use log::{debug, warn};
use thiserror::Error;

/// Email suffix that grants the platform role.
pub const DEFAULT_PLATFORM_SUFFIX: &str = "@rulemakers.co.kr";

/// Resolution failures. Every variant is terminal for the sign-in attempt.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The provider handed us a principal without an email address.
    #[error("principal has no email address")]
    MissingEmail,

    /// The principal is not an administrator of any active academy and is
    /// not platform staff.
    #[error("no active academy is administered by {email}")]
    NotAuthorized { email: String },

    /// The tenant directory could not be consulted. Treated exactly like
    /// `NotAuthorized` by callers: an ambiguous role is never granted.
    #[error("tenant directory lookup failed: {0}")]
    Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Maps principals to viewers against the academy directory.
#[derive(Clone)]
pub struct RoleResolver<S> {
    store: S,
    platform_suffix: String,
}

impl<S: DocumentStore> RoleResolver<S> {
    /// Resolver with the default platform domain suffix.
    pub fn new(store: S) -> Self {
        Self::with_platform_suffix(store, DEFAULT_PLATFORM_SUFFIX)
    }

    /// Resolver with a custom platform domain suffix.
    pub fn with_platform_suffix(store: S, suffix: impl Into<String>) -> Self {
        Self {
            store,
            platform_suffix: suffix.into(),
        }
    }

    pub fn platform_suffix(&self) -> &str {
        &self.platform_suffix
    }

    /// Resolve a principal to a viewer.
    ///
    /// The academy lookup is a case-sensitive exact match on `adminEmail`
    /// restricted to non-deleted academies. If the directory invariant is
    /// broken and several active academies share one admin email, the first
    /// by document id wins and the violation is logged.
    pub async fn resolve(&self, principal: &Principal) -> Result<Viewer, ResolveError> {
        if principal.email.is_empty() {
            return Err(ResolveError::MissingEmail);
        }

        if principal.email.ends_with(&self.platform_suffix) {
            debug!("resolved {} as platform", principal.email);
            return Ok(Viewer::Platform);
        }

        let filter = Filter::new()
            .with_eq(fields::ADMIN_EMAIL, principal.email.as_str())
            .with_eq(fields::IS_DELETED, false);
        let matches = self
            .store
            .find(collections::ACADEMIES, &filter)
            .await
            .map_err(|e| ResolveError::Lookup(Box::new(e)))?;

        if matches.len() > 1 {
            warn!(
                "data integrity: {} active academies share adminEmail {}; picking first by id",
                matches.len(),
                principal.email
            );
        }

        // `find` returns documents in stable id order, so the pick is
        // deterministic even under the duplicate-email violation.
        let Some(doc) = matches.into_iter().next() else {
            return Err(ResolveError::NotAuthorized {
                email: principal.email.clone(),
            });
        };

        let academy: Academy =
            model::from_document(&doc).map_err(|e| ResolveError::Lookup(Box::new(e)))?;
        debug!(
            "resolved {} as admin of academy {} ({})",
            principal.email, academy.id, academy.name
        );
        Ok(Viewer::tenant_admin(academy.id, academy.name))
    }
}
