//! # Academy Server
//!
//! Administration backend for a multi-tenant academy platform. Each academy
//! is a tenant with its own classes, students, assignments, and submissions;
//! platform staff operate across all of them, academy admins only inside
//! their own. The crate's job is making that boundary structural: every
//! query carries the resolved viewer's scope, pushed down into the storage
//! predicate rather than filtered after the fact.
//!
//! ## Architecture
//!
//! The crate is layered; each layer only knows the one below it:
//!
//! - [`identity`] — boundary to the external sign-in provider: a stream of
//!   auth-state events plus a sign-out operation
//! - [`resolver`] — maps a freshly authenticated principal to a [`Viewer`]
//!   role against the academy directory, fail-closed
//! - [`session`] — owns the current viewer; consumes auth events, drives
//!   resolution, forces sign-out on any resolution failure
//! - [`scope`] — turns a viewer into the tenant predicate every query and
//!   subscription must carry
//! - [`providers`] — the admin operations the screens consume
//! - [`storage`] — document-store trait and the in-memory backend
//! - [`model`] — the persisted document shapes
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use academy_server::identity::{Principal, StaticIdentityProvider};
//! use academy_server::providers::StandardAdminProvider;
//! use academy_server::resolver::RoleResolver;
//! use academy_server::session::SessionContext;
//! use academy_server::storage::InMemoryStore;
//! use academy_server::Viewer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! let admin = StandardAdminProvider::new(store.clone());
//!
//! // Platform staff register an academy and its admin email.
//! let academy = admin
//!     .create_academy(&Viewer::Platform, "Sunshine Academy", "admin@sunshine-academy.com")
//!     .await?;
//!
//! // The session context resolves sign-ins against the directory.
//! let provider = Arc::new(StaticIdentityProvider::new());
//! let session = SessionContext::spawn(Arc::clone(&provider), RoleResolver::new(store));
//! provider.sign_in(Principal::new("u1", "admin@sunshine-academy.com"));
//!
//! let viewer = session.settled().await.viewer.expect("resolved");
//! assert_eq!(viewer.tenant_id(), Some(academy.id.as_str()));
//!
//! // Every operation the admin performs is pinned to their academy.
//! let class = admin.create_class(&viewer, None, "Physics A").await?;
//! assert_eq!(class.academy_id, academy.id);
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod identity;
pub mod model;
pub mod providers;
pub mod resolver;
pub mod scope;
pub mod session;
pub mod storage;
pub mod viewer;

pub use error::{AcademyError, AcademyResult};
pub use scope::TenantScope;
pub use session::{SessionContext, SessionSnapshot};
pub use viewer::Viewer;
