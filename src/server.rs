use crate::{
    adapter::SharedAdapter, auth::Authenticator, handler, session, Auth0Config, Routes,
    ServerConfig,
};
use async_session::MemoryStore;
use axum::{
    extract::FromRef,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use axum_extra::routing::SpaRouter;
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::Span;

pub const COOKIE_NAME: &str = "auth-session";
pub const LOGIN_PATH: &str = "/login";
pub const STATIC_PREFIX: &str = "/public";

/// Paths the sign-in screen owns; configured destinations may not reuse them.
pub const FIXED_PATHS: [&str; 5] = [
    LOGIN_PATH,
    "/login/federated",
    "/login/create-account",
    "/callback",
    "/logout",
];

const SESSION_CLEANUP_PERIOD: Duration = Duration::from_secs(10 * 60);

pub async fn start_server(auth0: Auth0Config, config: ServerConfig) -> anyhow::Result<()> {
    let routes = config.routes();
    routes.validate()?;

    let authenticator = Authenticator::discover(auth0).await?;
    let app_state = AppState::new(Arc::new(authenticator), routes);
    spawn_session_cleanup(app_state.store.clone());

    let app = app(app_state);

    // run it
    tracing::debug!("listening on {}", config.bind_addr);
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

fn spawn_session_cleanup(store: MemoryStore) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_CLEANUP_PERIOD);
        loop {
            ticker.tick().await;
            if let Err(err) = session::purge_expired(&store).await {
                tracing::warn!(error = ?err, "session cleanup failed");
            }
        }
    });
}

/// Builds the sign-in application around `state`.
pub fn app(state: AppState) -> Router {
    let routes = state.routes.clone();

    let mut router = Router::new()
        .route(LOGIN_PATH, get(handler::login_page).post(handler::login))
        .route("/login/federated", post(handler::federated_login))
        .route("/login/create-account", post(handler::create_account))
        .route("/callback", get(handler::callback))
        .route("/logout", get(handler::logout));

    // Destinations may point off-site; only local paths get a page here.
    if routes.home.starts_with('/') {
        router = router.route(&routes.home, get(handler::home));
    }
    if routes.register.starts_with('/') {
        router = router.route(&routes.register, get(handler::register));
    }

    router
        .with_state(state)
        .merge(SpaRouter::new(STATIC_PREFIX, "static"))
        .layer(
            TraceLayer::new_for_http()
                .on_request(|request: &Request<_>, _span: &Span| {
                    tracing::info!(method = %request.method(), uri = %request.uri(), "request");
                })
                .on_response(|response: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(status = %response.status(), ?latency, "response");
                }),
        )
}

#[derive(Clone)]
pub struct AppState {
    adapter: SharedAdapter,
    store: MemoryStore,
    routes: Routes,
}

impl AppState {
    pub fn new(adapter: SharedAdapter, routes: Routes) -> Self {
        Self {
            adapter,
            // `MemoryStore` keeps sessions for the life of the process only.
            store: MemoryStore::new(),
            routes,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl FromRef<AppState> for SharedAdapter {
    fn from_ref(state: &AppState) -> Self {
        state.adapter.clone()
    }
}

impl FromRef<AppState> for MemoryStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Routes {
    fn from_ref(state: &AppState) -> Self {
        state.routes.clone()
    }
}

/// Plumbing failure (session store, header encoding) answered with a 500.
pub struct InternalError(anyhow::Error);

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
    }
}

impl<E> From<E> for InternalError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
