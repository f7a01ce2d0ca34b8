//! Identity-provider boundary.
//!
//! The external sign-in flow (OAuth, delegated entirely to the provider) is
//! consumed through a narrow interface: a stream of auth-state events plus a
//! sign-out operation the session layer uses to fail closed. The crate never
//! issues tokens or inspects credentials; a [`Principal`] is whatever the
//! provider says about the signed-in user.
//!
//! [`StaticIdentityProvider`] is the in-process implementation used by tests
//! and local development, mirroring the provider's observable behavior:
//! subscribers immediately receive the current auth state, then every later
//! transition in order.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;

/// The raw authenticated identity, prior to role resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Stable id assigned by the identity provider.
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Auth-state transitions, delivered in provider order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Principal),
    SignedOut,
}

/// Errors surfaced by the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Sign-in was rejected or cancelled by the user; recovered locally by
    /// re-showing the sign-in control.
    #[error("sign-in rejected: {0}")]
    SignInRejected(String),

    /// The provider could not be reached.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// The operations this crate consumes from the external identity provider.
pub trait IdentityProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Terminate the current authenticated session. Idempotent: signing out
    /// while already signed out is a no-op that still emits `SignedOut`.
    fn sign_out(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Subscribe to auth-state changes. The receiver observes the current
    /// state immediately, then each subsequent transition in order.
    fn auth_events(&self) -> mpsc::UnboundedReceiver<AuthEvent>;
}

#[derive(Default)]
struct ProviderState {
    current: Option<Principal>,
    listeners: Vec<mpsc::UnboundedSender<AuthEvent>>,
    sign_out_count: usize,
}

/// In-process identity provider.
///
/// Drives the auth-state stream directly from test or demo code:
/// `sign_in` and `sign_out` emit the corresponding events to every
/// subscriber.
#[derive(Clone, Default)]
pub struct StaticIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign a principal in and notify subscribers.
    pub fn sign_in(&self, principal: Principal) {
        let mut state = self.state.lock().expect("identity provider state poisoned");
        state.current = Some(principal.clone());
        Self::broadcast(&mut state, AuthEvent::SignedIn(principal));
    }

    /// The currently signed-in principal, if any.
    pub fn current_principal(&self) -> Option<Principal> {
        self.state
            .lock()
            .expect("identity provider state poisoned")
            .current
            .clone()
    }

    /// How many times `sign_out` has been invoked; used to observe forced
    /// sign-outs in tests.
    pub fn sign_out_count(&self) -> usize {
        self.state
            .lock()
            .expect("identity provider state poisoned")
            .sign_out_count
    }

    fn broadcast(state: &mut ProviderState, event: AuthEvent) {
        state.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl IdentityProvider for StaticIdentityProvider {
    type Error = IdentityError;

    async fn sign_out(&self) -> Result<(), Self::Error> {
        let mut state = self.state.lock().expect("identity provider state poisoned");
        state.current = None;
        state.sign_out_count += 1;
        Self::broadcast(&mut state, AuthEvent::SignedOut);
        Ok(())
    }

    fn auth_events(&self) -> mpsc::UnboundedReceiver<AuthEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().expect("identity provider state poisoned");
        // Replay current state so late subscribers converge immediately.
        let initial = match &state.current {
            Some(principal) => AuthEvent::SignedIn(principal.clone()),
            None => AuthEvent::SignedOut,
        };
        let _ = tx.send(initial);
        state.listeners.push(tx);
        rx
    }
}
