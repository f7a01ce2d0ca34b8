//! Administrative operations over academy data.
//!
//! [`StandardAdminProvider`] is the surface the screens consume: every read,
//! subscription, and mutation takes the resolved viewer and goes through the
//! tenant-scoping layer before it reaches storage.

pub mod error;
pub mod standard;

pub use error::{ProviderError, ProviderResult};
pub use standard::{
    AssignmentOutcome, AssignmentStatusRow, DashboardCounts, NewAssignment, StandardAdminProvider,
};
