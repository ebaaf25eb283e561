use crate::{adapter::SharedAdapter, flow::ClientState, session::ClientSession, Routes};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

/// Sends the browser to the identity provider's consent page.
#[instrument(skip_all)]
pub async fn federated_login(
    State(adapter): State<SharedAdapter>,
    State(routes): State<Routes>,
    client: ClientSession,
) -> impl IntoResponse {
    if client.has_profile() {
        return Redirect::to(&routes.home);
    }

    let auth_url = adapter.federated_authorize_url().await;
    Redirect::to(auth_url.as_ref())
}
