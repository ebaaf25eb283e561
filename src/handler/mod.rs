use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

pub mod callback;
pub mod federated;
pub mod home;
pub mod login;
pub mod logout;
pub mod register;

pub use callback::callback;
pub use federated::federated_login;
pub use home::home;
pub use login::{login, login_page};
pub use logout::logout;
pub use register::{create_account, register};

pub(crate) struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template. Error: {}", err),
            )
                .into_response(),
        }
    }
}
