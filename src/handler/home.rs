use super::HtmlTemplate;
use crate::{
    flow::Notification, profile::UserProfile, server::InternalError, session::ClientSession,
};
use askama::Template;
use axum::response::IntoResponse;
use tracing::instrument;

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    profile: Option<UserProfile>,
    notifications: Vec<Notification>,
}

#[instrument(skip_all)]
pub async fn home(mut client: ClientSession) -> Result<impl IntoResponse, InternalError> {
    let template = HomeTemplate {
        profile: client.profile(),
        notifications: client.take_notifications(),
    };
    let headers = client.save().await?;

    Ok((headers, HtmlTemplate(template)))
}
