//! Tenant-scoped query construction.
//!
//! Every read or subscription in the crate goes through [`TenantScope`]: the
//! single place where a viewer's role is turned into a storage predicate.
//! Scoping is pushed down into the store's filter — never applied as
//! client-side re-filtering — so the filter itself is the isolation boundary.
//!
//! The rules, in order:
//! - no viewer → no query (callers must wait for resolution to settle)
//! - tenant admins are always pinned to their own academy; a caller-supplied
//!   tenant selection cannot widen or redirect the scope
//! - platform viewers see everything unless they select a tenant explicitly

use crate::model::fields;
use crate::storage::Filter;
use crate::viewer::Viewer;
use log::debug;
use thiserror::Error;

/// Failure to derive a scope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    /// No resolved viewer is available; refusing to build a query rather
    /// than defaulting to an unscoped one.
    #[error("cannot build a query without a resolved viewer")]
    ViewerRequired,
}

/// The tenant restriction attached to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    /// Cross-tenant visibility (platform viewers only).
    Unscoped,
    /// Restricted to one academy.
    Tenant(String),
}

impl TenantScope {
    /// Derive the scope for a viewer, honoring an optional tenant selection.
    ///
    /// For a tenant admin the selection is ignored outright; the admin's own
    /// academy wins no matter what the caller passed.
    pub fn for_viewer(
        viewer: Option<&Viewer>,
        selected_tenant: Option<&str>,
    ) -> Result<Self, ScopeError> {
        let viewer = viewer.ok_or(ScopeError::ViewerRequired)?;
        Ok(match viewer {
            Viewer::Platform => match selected_tenant {
                Some(tenant) => TenantScope::Tenant(tenant.to_string()),
                None => TenantScope::Unscoped,
            },
            Viewer::TenantAdmin { tenant_id, .. } => {
                if let Some(requested) = selected_tenant {
                    if requested != tenant_id {
                        debug!(
                            "ignoring tenant selection {requested:?} from tenant admin of {tenant_id:?}"
                        );
                    }
                }
                TenantScope::Tenant(tenant_id.clone())
            }
        })
    }

    /// The academy id this scope pins queries to, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            TenantScope::Unscoped => None,
            TenantScope::Tenant(id) => Some(id),
        }
    }

    /// Whether a document belonging to `academy_id` is visible in this scope.
    pub fn permits(&self, academy_id: &str) -> bool {
        match self {
            TenantScope::Unscoped => true,
            TenantScope::Tenant(id) => id == academy_id,
        }
    }

    /// Compose the scope into a storage filter.
    pub fn apply(&self, filter: Filter) -> Filter {
        match self {
            TenantScope::Unscoped => filter,
            TenantScope::Tenant(id) => filter.with_eq(fields::ACADEMY_ID, id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_viewer_is_refused() {
        assert_eq!(
            TenantScope::for_viewer(None, None),
            Err(ScopeError::ViewerRequired)
        );
        // A tenant selection does not rescue the missing viewer.
        assert_eq!(
            TenantScope::for_viewer(None, Some("t1")),
            Err(ScopeError::ViewerRequired)
        );
    }

    #[test]
    fn platform_is_unscoped_unless_selecting() {
        let viewer = Viewer::Platform;
        assert_eq!(
            TenantScope::for_viewer(Some(&viewer), None).unwrap(),
            TenantScope::Unscoped
        );
        assert_eq!(
            TenantScope::for_viewer(Some(&viewer), Some("t2")).unwrap(),
            TenantScope::Tenant("t2".to_string())
        );
    }

    #[test]
    fn tenant_admin_selection_cannot_override_scope() {
        let viewer = Viewer::tenant_admin("t1", "Sunshine");
        for selection in [None, Some("t1"), Some("t2")] {
            assert_eq!(
                TenantScope::for_viewer(Some(&viewer), selection).unwrap(),
                TenantScope::Tenant("t1".to_string())
            );
        }
    }

    #[test]
    fn apply_pins_the_filter() {
        let scope = TenantScope::Tenant("t1".to_string());
        let filter = scope.apply(Filter::new().with_eq("isDeleted", false));
        assert!(filter
            .conditions()
            .contains(&("academyId".to_string(), json!("t1"))));

        let unscoped = TenantScope::Unscoped.apply(Filter::new());
        assert!(unscoped.conditions().is_empty());
    }

    #[test]
    fn permits_matches_scope() {
        let scope = TenantScope::Tenant("t1".to_string());
        assert!(scope.permits("t1"));
        assert!(!scope.permits("t2"));
        assert!(TenantScope::Unscoped.permits("anything"));
    }
}
