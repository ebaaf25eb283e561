use crate::{
    adapter::{AuthAdapter, FederatedCallback, SignInOutcome},
    profile::UserProfile,
    validation::Credentials,
    Auth0Config,
};
use async_lock::RwLock;
use axum::async_trait;
use openidconnect::{
    core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata, CoreTokenResponse},
    reqwest::async_http_client,
    AccessTokenHash, AuthorizationCode, ClaimsVerificationError, ClientId, ClientSecret,
    CsrfToken, IssuerUrl, Nonce, NonceVerifier, OAuth2TokenResponse, RedirectUrl,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, SigningError,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use url::Url;

type OidcStore = Arc<RwLock<HashMap<String, PendingLogin>>>;

/// How long a federated login may take between redirect and callback.
const PENDING_LOGIN_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
struct PendingLogin {
    nonce: Nonce,
    issued_at: Instant,
}

impl PendingLogin {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) < PENDING_LOGIN_TTL
    }
}

const SCOPES: [&str; 3] = ["openid", "profile", "email"];

#[derive(Debug, thiserror::Error)]
enum AuthError {
    #[error("provider reported `{error}`: {description}")]
    Provider { error: String, description: String },
    #[error("callback is missing `{0}`")]
    MissingParam(&'static str),
    #[error("unknown or already used login state")]
    UnknownState,
    #[error("login state expired")]
    ExpiredState,
    #[error("token request failed: {0}")]
    TokenRequest(String),
    #[error("token response carries no id token")]
    MissingIdToken,
    #[error("id token rejected: {0}")]
    Claims(#[from] ClaimsVerificationError),
    #[error("cannot hash access token: {0}")]
    Signing(#[from] SigningError),
    #[error("access token hash does not match the id token")]
    AccessTokenHashMismatch,
}

/// Auth0 tenant reached over OpenID Connect.
#[derive(Clone, Debug)]
pub struct Authenticator {
    config: Auth0Config,
    client: CoreClient,
    store: OidcStore,
}

impl Authenticator {
    pub async fn discover(config: Auth0Config) -> anyhow::Result<Self> {
        let auth_url = format!("https://{}/", config.domain);

        let provider_metadata =
            CoreProviderMetadata::discover_async(IssuerUrl::new(auth_url)?, async_http_client)
                .await?;

        let client = CoreClient::from_provider_metadata(
            provider_metadata,
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
        )
        .set_redirect_uri(RedirectUrl::new(format!(
            "{}/callback",
            config.base_url.trim_end_matches('/')
        ))?);

        Ok(Self::with_client(config, client))
    }

    fn with_client(config: Auth0Config, client: CoreClient) -> Self {
        Self {
            config,
            client,
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Consumes the pending login for `state`; a state is good for exactly
    /// one callback.
    async fn take_pending(&self, state: &str, now: Instant) -> Result<Nonce, AuthError> {
        let pending = self
            .store
            .write()
            .await
            .remove(state)
            .ok_or(AuthError::UnknownState)?;

        if pending.is_fresh(now) {
            Ok(pending.nonce)
        } else {
            Err(AuthError::ExpiredState)
        }
    }

    /// Forgets logins whose callback never arrived; returns how many remain.
    async fn prune_pending(&self, now: Instant) -> usize {
        let mut store = self.store.write().await;
        store.retain(|_, pending| pending.is_fresh(now));
        store.len()
    }

    async fn complete_code_flow(&self, callback: FederatedCallback) -> Result<UserProfile, AuthError> {
        if let Some(error) = callback.error {
            return Err(AuthError::Provider {
                error,
                description: callback.error_description.unwrap_or_default(),
            });
        }
        let state = callback.state.ok_or(AuthError::MissingParam("state"))?;
        let code = callback.code.ok_or(AuthError::MissingParam("code"))?;
        let nonce = self.take_pending(&state, Instant::now()).await?;

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::TokenRequest(e.to_string()))?;

        self.verified_profile(&token_response, &nonce)
    }

    async fn exchange_password(&self, credentials: Credentials) -> Result<UserProfile, AuthError> {
        let username = ResourceOwnerUsername::new(credentials.email().to_string());
        let password = ResourceOwnerPassword::new(credentials.password().to_string());
        drop(credentials);

        let token_response = SCOPES
            .iter()
            .fold(
                self.client.exchange_password(&username, &password),
                |request, scope| request.add_scope(Scope::new(scope.to_string())),
            )
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::TokenRequest(e.to_string()))?;

        self.verified_profile(&token_response, accept_missing_nonce)
    }

    fn verified_profile<N: NonceVerifier>(
        &self,
        token_response: &CoreTokenResponse,
        nonce_verifier: N,
    ) -> Result<UserProfile, AuthError> {
        let id_token_verifier = self.client.id_token_verifier();
        let id_token = token_response
            .extra_fields()
            .id_token()
            .ok_or(AuthError::MissingIdToken)?;
        let claims = id_token.claims(&id_token_verifier, nonce_verifier)?;

        if let Some(expected_access_token_hash) = claims.access_token_hash() {
            let actual = AccessTokenHash::from_token(
                token_response.access_token(),
                &id_token.signing_alg()?,
            )?;

            if actual != *expected_access_token_hash {
                return Err(AuthError::AccessTokenHashMismatch);
            }
        }

        Ok(UserProfile::from(claims))
    }
}

// The password grant issues id tokens without a nonce.
fn accept_missing_nonce(_: Option<&Nonce>) -> Result<(), String> {
    Ok(())
}

#[async_trait]
impl AuthAdapter for Authenticator {
    async fn federated_authorize_url(&self) -> Url {
        // Generate the full authorization URL.
        let (auth_url, csrf_token, nonce) = SCOPES
            .iter()
            .fold(
                self.client.authorize_url(
                    CoreAuthenticationFlow::AuthorizationCode,
                    CsrfToken::new_random,
                    Nonce::new_random,
                ),
                |request, scope| request.add_scope(Scope::new(scope.to_string())),
            )
            .url();

        let now = Instant::now();
        let pending = self.prune_pending(now).await;
        self.store.write().await.insert(
            csrf_token.secret().to_owned(),
            PendingLogin {
                nonce,
                issued_at: now,
            },
        );
        tracing::debug!(pending = pending + 1, "issued federated login state");

        auth_url
    }

    async fn sign_in_with_federated_provider(&self, callback: FederatedCallback) -> SignInOutcome {
        match self.complete_code_flow(callback).await {
            Ok(profile) => SignInOutcome::Success(profile),
            Err(err) => {
                tracing::warn!(error = %err, "federated sign-in failed");
                SignInOutcome::Failure
            }
        }
    }

    async fn sign_in_with_credentials(&self, credentials: Credentials) -> SignInOutcome {
        let email = credentials.email().to_string();
        match self.exchange_password(credentials).await {
            Ok(profile) => SignInOutcome::Success(profile),
            Err(err) => {
                tracing::warn!(error = %err, %email, "password sign-in failed");
                SignInOutcome::Failure
            }
        }
    }

    async fn sign_out_url(&self) -> Option<Url> {
        let logout_url = format!(
            "https://{}/v2/logout?returnTo={}&client_id={}",
            self.config.domain,
            utf8_percent_encode(&self.config.base_url, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.config.client_id, NON_ALPHANUMERIC),
        );

        match Url::parse(&logout_url) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(error = %err, "cannot build provider logout url");
                None
            }
        }
    }
}
