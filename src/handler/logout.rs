use crate::{adapter::SharedAdapter, server::InternalError, session::ClientSession, Routes};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

#[instrument(skip_all)]
pub async fn logout(
    State(adapter): State<SharedAdapter>,
    State(routes): State<Routes>,
    client: ClientSession,
) -> Result<impl IntoResponse, InternalError> {
    let headers = client.destroy().await?;

    let target = match adapter.sign_out_url().await {
        Some(url) => String::from(url),
        None => routes.home,
    };

    Ok((headers, Redirect::to(&target)))
}
