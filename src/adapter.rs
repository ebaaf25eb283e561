use crate::{profile::UserProfile, validation::Credentials};
use axum::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Result of asking the identity provider to sign someone in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Success(UserProfile),
    Failure,
}

/// Query string the provider sends back to `/callback`.
#[derive(Debug, Default, Deserialize)]
pub struct FederatedCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Boundary to the external identity provider.
///
/// Implementations never surface errors: every problem, from a wrong
/// password to an unreachable provider, resolves to
/// [`SignInOutcome::Failure`].
#[async_trait]
pub trait AuthAdapter: Send + Sync + 'static {
    /// Provider page that starts the federated consent flow.
    async fn federated_authorize_url(&self) -> Url;

    async fn sign_in_with_federated_provider(&self, callback: FederatedCallback) -> SignInOutcome;

    async fn sign_in_with_credentials(&self, credentials: Credentials) -> SignInOutcome;

    /// Where to send the browser after the local session is destroyed.
    async fn sign_out_url(&self) -> Option<Url> {
        None
    }
}

pub type SharedAdapter = Arc<dyn AuthAdapter>;
