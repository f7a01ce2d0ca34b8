//! The resolved identity every query is issued on behalf of.

use serde::{Deserialize, Serialize};

/// Role-and-scope-annotated representation of the signed-in user.
///
/// Constructed fresh each session by the role resolver and never persisted.
/// The variant shape makes the scoping rules type-level facts: a platform
/// viewer carries no tenant, and a tenant admin always carries exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum Viewer {
    /// Platform operator with cross-tenant visibility.
    Platform,
    /// Administrator scoped to a single academy.
    #[serde(rename_all = "camelCase")]
    TenantAdmin {
        tenant_id: String,
        tenant_name: String,
    },
}

impl Viewer {
    pub fn tenant_admin(tenant_id: impl Into<String>, tenant_name: impl Into<String>) -> Self {
        Viewer::TenantAdmin {
            tenant_id: tenant_id.into(),
            tenant_name: tenant_name.into(),
        }
    }

    pub fn is_platform(&self) -> bool {
        matches!(self, Viewer::Platform)
    }

    /// The academy this viewer is confined to, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            Viewer::Platform => None,
            Viewer::TenantAdmin { tenant_id, .. } => Some(tenant_id),
        }
    }

    pub fn tenant_name(&self) -> Option<&str> {
        match self {
            Viewer::Platform => None,
            Viewer::TenantAdmin { tenant_name, .. } => Some(tenant_name),
        }
    }
}
