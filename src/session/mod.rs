//! Session lifecycle: the single owner of the current viewer.
//!
//! [`SessionContext`] binds the identity provider's auth-state stream to the
//! role resolver and publishes one process-wide snapshot,
//! `{viewer, is_resolving}`, through a watch channel. Consumers read the
//! snapshot; only this module writes it.
//!
//! Lifecycle per session: `Unauthenticated → Resolving → {Resolved,
//! Rejected}`, with `Rejected` falling back to `Unauthenticated` after the
//! forced sign-out. Exactly one resolution is in flight at a time; an auth
//! event that arrives mid-resolution supersedes it and the stale resolution
//! is discarded (last event wins).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use academy_server::identity::{Principal, StaticIdentityProvider};
//! use academy_server::resolver::RoleResolver;
//! use academy_server::session::SessionContext;
//! use academy_server::storage::InMemoryStore;
//!
//! # async fn example() {
//! let provider = Arc::new(StaticIdentityProvider::new());
//! let resolver = RoleResolver::new(InMemoryStore::new());
//! let session = SessionContext::spawn(Arc::clone(&provider), resolver);
//!
//! provider.sign_in(Principal::new("p1", "ops@rulemakers.co.kr"));
//! let snapshot = session.settled().await;
//! assert!(snapshot.viewer.is_some());
//! session.shutdown().await;
//! # }
//! ```

use crate::identity::{AuthEvent, IdentityProvider};
use crate::resolver::RoleResolver;
use crate::storage::DocumentStore;
use crate::viewer::Viewer;
use log::warn;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// What the rest of the application sees of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub viewer: Option<Viewer>,
    pub is_resolving: bool,
}

impl SessionSnapshot {
    fn resolving() -> Self {
        Self {
            viewer: None,
            is_resolving: true,
        }
    }

    fn settled(viewer: Option<Viewer>) -> Self {
        Self {
            viewer,
            is_resolving: false,
        }
    }
}

/// Process-wide holder of the current viewer.
///
/// Owns a background task consuming auth events. Dropping the context aborts
/// the task; [`SessionContext::shutdown`] tears it down gracefully.
pub struct SessionContext {
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SessionContext {
    /// Subscribe to the provider's auth-state stream and start the event
    /// loop. Until the first event settles, the snapshot reads
    /// `{viewer: None, is_resolving: true}`.
    pub fn spawn<P, S>(provider: Arc<P>, resolver: RoleResolver<S>) -> Self
    where
        P: IdentityProvider + 'static,
        S: DocumentStore + 'static,
    {
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::resolving());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let events = provider.auth_events();
        let task = tokio::spawn(run(provider, resolver, events, snapshot_tx, shutdown_rx));
        Self {
            snapshot_rx,
            shutdown_tx,
            task: Some(task),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// The current viewer, if resolution has produced one.
    pub fn viewer(&self) -> Option<Viewer> {
        self.snapshot_rx.borrow().viewer.clone()
    }

    pub fn is_resolving(&self) -> bool {
        self.snapshot_rx.borrow().is_resolving
    }

    /// The one signal the navigation shell needs: route to the application
    /// when true, to the sign-in screen when false.
    pub fn has_resolved_viewer(&self) -> bool {
        let snapshot = self.snapshot_rx.borrow();
        !snapshot.is_resolving && snapshot.viewer.is_some()
    }

    /// A receiver for observing snapshot changes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Wait until no resolution is in flight and return the snapshot.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut rx = self.snapshot_rx.clone();
        match rx.wait_for(|s| !s.is_resolving).await {
            Ok(snapshot) => snapshot.clone(),
            // Event loop gone; the last snapshot is all there is.
            Err(_) => self.snapshot_rx.borrow().clone(),
        }
    }

    /// Stop the event loop and wait for it to finish. After teardown no
    /// subscription to the identity provider remains.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run<P, S>(
    provider: Arc<P>,
    resolver: RoleResolver<S>,
    mut events: mpsc::UnboundedReceiver<AuthEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    P: IdentityProvider,
    S: DocumentStore,
{
    'outer: loop {
        let next = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            event = events.recv() => event,
        };
        let Some(mut event) = next else {
            break;
        };

        loop {
            match event {
                AuthEvent::SignedOut => {
                    // Idempotent: repeated sign-outs land on the same state.
                    snapshot_tx.send_replace(SessionSnapshot::settled(None));
                    break;
                }
                AuthEvent::SignedIn(principal) => {
                    snapshot_tx.send_replace(SessionSnapshot::resolving());
                    let resolution = resolver.resolve(&principal);
                    tokio::pin!(resolution);
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => break 'outer,
                        newer = events.recv() => {
                            match newer {
                                // A newer auth event supersedes the in-flight
                                // resolution; dropping the future discards
                                // its result.
                                Some(e) => {
                                    event = e;
                                    continue;
                                }
                                None => break 'outer,
                            }
                        }
                        result = &mut resolution => {
                            let snapshot = match result {
                                Ok(viewer) => SessionSnapshot::settled(Some(viewer)),
                                Err(err) => {
                                    // Fail closed: no tenant data is ever
                                    // visible to an unresolved principal.
                                    warn!("role resolution failed, signing out: {err}");
                                    if let Err(e) = provider.sign_out().await {
                                        warn!("forced sign-out failed: {e}");
                                    }
                                    SessionSnapshot::settled(None)
                                }
                            };
                            snapshot_tx.send_replace(snapshot);
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Principal, StaticIdentityProvider};
    use crate::model::collections;
    use crate::storage::InMemoryStore;
    use serde_json::json;

    fn resolver_with_sunshine() -> (RoleResolver<InMemoryStore>, InMemoryStore) {
        let store = InMemoryStore::new();
        (RoleResolver::new(store.clone()), store)
    }

    async fn seed_sunshine(store: &InMemoryStore) -> String {
        store
            .insert(
                collections::ACADEMIES,
                json!({
                    "name": "Sunshine Academy",
                    "adminEmail": "admin@sunshine-academy.com",
                    "createdAt": "2025-01-01T00:00:00Z",
                    "isDeleted": false,
                }),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn starts_resolving_then_settles_signed_out() {
        let provider = Arc::new(StaticIdentityProvider::new());
        let (resolver, _) = resolver_with_sunshine();
        let session = SessionContext::spawn(Arc::clone(&provider), resolver);
        assert!(session.is_resolving());

        let snapshot = session.settled().await;
        assert_eq!(snapshot, SessionSnapshot::settled(None));
        assert!(!session.has_resolved_viewer());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn resolves_principal_signed_in_before_spawn() {
        let provider = Arc::new(StaticIdentityProvider::new());
        let (resolver, store) = resolver_with_sunshine();
        let academy_id = seed_sunshine(&store).await;
        provider.sign_in(Principal::new("p1", "admin@sunshine-academy.com"));

        let session = SessionContext::spawn(Arc::clone(&provider), resolver);
        let snapshot = session.settled().await;
        let viewer = snapshot.viewer.expect("viewer should resolve");
        assert_eq!(viewer.tenant_id(), Some(academy_id.as_str()));
        assert!(session.has_resolved_viewer());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn rejection_forces_sign_out_and_clears_viewer() {
        let provider = Arc::new(StaticIdentityProvider::new());
        let (resolver, _) = resolver_with_sunshine();
        provider.sign_in(Principal::new("p1", "random@nowhere.com"));

        let session = SessionContext::spawn(Arc::clone(&provider), resolver);
        let snapshot = session.settled().await;
        assert_eq!(snapshot.viewer, None);
        assert!(provider.sign_out_count() >= 1);
        assert_eq!(provider.current_principal(), None);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn sign_out_is_observable_and_idempotent() {
        let provider = Arc::new(StaticIdentityProvider::new());
        let (resolver, _) = resolver_with_sunshine();
        provider.sign_in(Principal::new("p1", "ops@rulemakers.co.kr"));

        let session = SessionContext::spawn(Arc::clone(&provider), resolver);
        let mut rx = session.watch();
        rx.wait_for(|s| s.viewer.is_some()).await.unwrap();

        provider.sign_out().await.unwrap();
        rx.wait_for(|s| s.viewer.is_none() && !s.is_resolving)
            .await
            .unwrap();

        // Signing out again changes nothing observable.
        provider.sign_out().await.unwrap();
        let snapshot = session.settled().await;
        assert_eq!(snapshot, SessionSnapshot::settled(None));
        session.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_terminates_event_loop() {
        let provider = Arc::new(StaticIdentityProvider::new());
        let (resolver, _) = resolver_with_sunshine();
        let session = SessionContext::spawn(Arc::clone(&provider), resolver);
        session.settled().await;
        session.shutdown().await;

        // Later auth events go nowhere; the provider simply prunes the
        // dropped listener on its next broadcast.
        provider.sign_in(Principal::new("p1", "ops@rulemakers.co.kr"));
        tokio::task::yield_now().await;
        assert!(provider.current_principal().is_some());
    }
}
