use super::HtmlTemplate;
use crate::{
    adapter::SharedAdapter,
    flow::{self, ClientState, Notification, ScreenState, SignInMethod},
    server::InternalError,
    session::ClientSession,
    validation::{CredentialsForm, FieldErrors},
    Routes,
};
use askama::Template;
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    email: String,
    email_error: Option<&'static str>,
    password_error: Option<&'static str>,
    notifications: Vec<Notification>,
    forgot_password_href: String,
}

impl LoginTemplate {
    fn new(routes: &Routes, email: String, errors: FieldErrors, client: &mut ClientSession) -> Self {
        Self {
            email,
            email_error: errors.email,
            password_error: errors.password,
            notifications: client.take_notifications(),
            forgot_password_href: routes.home.clone(),
        }
    }
}

/// Paints the form, or leaves for home when the client is already signed in.
#[instrument(skip_all)]
pub async fn login_page(
    State(routes): State<Routes>,
    mut client: ClientSession,
) -> Result<Response, InternalError> {
    if ScreenState::on_mount(&client) == ScreenState::Authenticated {
        return Ok(Redirect::to(&routes.home).into_response());
    }

    let template = LoginTemplate::new(&routes, String::new(), FieldErrors::default(), &mut client);
    let headers = client.save().await?;

    Ok((headers, HtmlTemplate(template)).into_response())
}

#[instrument(skip(adapter, routes, client))]
pub async fn login(
    State(adapter): State<SharedAdapter>,
    State(routes): State<Routes>,
    mut client: ClientSession,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, InternalError> {
    if client.has_profile() {
        return Ok(Redirect::to(&routes.home).into_response());
    }

    let email = form.email.trim().to_string();
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            tracing::debug!(?errors, "sign-in form rejected");
            let template = LoginTemplate::new(&routes, email, errors, &mut client);
            let headers = client.save().await?;
            return Ok(
                (StatusCode::UNPROCESSABLE_ENTITY, headers, HtmlTemplate(template)).into_response(),
            );
        }
    };

    let state = flow::submit(
        SignInMethod::Credentials,
        &mut client,
        adapter.sign_in_with_credentials(credentials),
    )
    .await;

    if state == ScreenState::Authenticated {
        let headers = client.save().await?;
        return Ok((headers, Redirect::to(&routes.home)).into_response());
    }

    let template = LoginTemplate::new(&routes, email, FieldErrors::default(), &mut client);
    let headers = client.save().await?;

    Ok((headers, HtmlTemplate(template)).into_response())
}
