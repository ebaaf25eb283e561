use super::HtmlTemplate;
use crate::{
    flow::Notification,
    server::{InternalError, LOGIN_PATH},
    session::ClientSession,
    Routes,
};
use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    login_path: &'static str,
    notifications: Vec<Notification>,
}

/// "Create account" on the sign-in screen: always heads to registration.
#[instrument(skip_all)]
pub async fn create_account(State(routes): State<Routes>) -> impl IntoResponse {
    Redirect::to(&routes.register)
}

#[instrument(skip_all)]
pub async fn register(mut client: ClientSession) -> Result<impl IntoResponse, InternalError> {
    let template = RegisterTemplate {
        login_path: LOGIN_PATH,
        notifications: client.take_notifications(),
    };
    let headers = client.save().await?;

    Ok((headers, HtmlTemplate(template)))
}
