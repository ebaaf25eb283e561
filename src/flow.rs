//! Sign-in state machine shared by the federated and the email/password paths.

use crate::{adapter::SignInOutcome, profile::UserProfile};
use serde::{Deserialize, Serialize};
use std::future::Future;

pub const LOGIN_SUCCESS: &str = "Login success!";
pub const LOGIN_FAILURE: &str = "Login failure! Please, again!";

/// Where a sign-in screen instance sits once no attempt is in flight.
///
/// An attempt in flight is the pending future inside [`submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Unauthenticated,
    Authenticated,
}

impl ScreenState {
    /// State of a freshly mounted screen.
    pub fn on_mount(client: &impl ClientState) -> Self {
        if client.has_profile() {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInMethod {
    Federated,
    Credentials,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

impl NotificationKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "notice-success",
            Self::Error => "notice-error",
        }
    }
}

/// Transient message shown once on the next rendered page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Per-client state the sign-in screen reads and writes.
pub trait ClientState {
    fn has_profile(&self) -> bool;
    fn replace_profile(&mut self, profile: UserProfile);
    fn notify(&mut self, notification: Notification);
}

/// Runs one sign-in attempt and applies its outcome to `client`.
///
/// The client is only touched once `attempt` resolves, so an attempt whose
/// future is dropped mid-flight leaves no trace.
pub async fn submit<C, F>(method: SignInMethod, client: &mut C, attempt: F) -> ScreenState
where
    C: ClientState,
    F: Future<Output = SignInOutcome>,
{
    tracing::debug!(?method, "sign-in attempt started");

    let next = match attempt.await {
        SignInOutcome::Success(profile) => {
            tracing::info!(?method, user = %profile.id, "sign-in succeeded");
            client.replace_profile(profile);
            client.notify(Notification::success(LOGIN_SUCCESS));
            ScreenState::Authenticated
        }
        SignInOutcome::Failure => {
            tracing::info!(?method, "sign-in failed");
            client.notify(Notification::error(LOGIN_FAILURE));
            ScreenState::Unauthenticated
        }
    };

    tracing::debug!(?method, state = ?next, "sign-in attempt resolved");
    next
}
