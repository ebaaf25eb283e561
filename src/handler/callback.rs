use crate::{
    adapter::{FederatedCallback, SharedAdapter},
    flow::{self, ScreenState, SignInMethod},
    server::{InternalError, LOGIN_PATH},
    session::ClientSession,
    Routes,
};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

#[instrument(skip_all, fields(provider_error = ?query.error))]
pub async fn callback(
    Query(query): Query<FederatedCallback>,
    State(adapter): State<SharedAdapter>,
    State(routes): State<Routes>,
    mut client: ClientSession,
) -> Result<impl IntoResponse, InternalError> {
    let state = flow::submit(
        SignInMethod::Federated,
        &mut client,
        adapter.sign_in_with_federated_provider(query),
    )
    .await;

    let headers = client.save().await?;
    let target = match state {
        ScreenState::Authenticated => routes.home.as_str(),
        ScreenState::Unauthenticated => LOGIN_PATH,
    };

    Ok((headers, Redirect::to(target)))
}
