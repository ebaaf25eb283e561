use axum::{
    async_trait,
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use sociala_signin::{
    adapter::{AuthAdapter, FederatedCallback, SignInOutcome},
    flow::{LOGIN_FAILURE, LOGIN_SUCCESS},
    profile::UserProfile,
    server::{app, AppState},
    session::SESSION_TTL,
    validation::{Credentials, EMAIL_INVALID, EMAIL_REQUIRED, PASSWORD_TOO_SHORT},
    Routes,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tower::ServiceExt;
use url::Url;

const AUTHORIZE_URL: &str = "https://id.example.com/authorize?state=xyz";

/// Adapter that answers every call with a fixed outcome and counts calls.
struct ScriptedAdapter {
    outcome: Mutex<SignInOutcome>,
    credential_calls: AtomicUsize,
    federated_calls: AtomicUsize,
    last_email: Mutex<Option<String>>,
}

impl ScriptedAdapter {
    fn new(outcome: SignInOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(outcome),
            credential_calls: AtomicUsize::new(0),
            federated_calls: AtomicUsize::new(0),
            last_email: Mutex::new(None),
        })
    }

    fn succeeding() -> Arc<Self> {
        Self::new(SignInOutcome::Success(profile()))
    }

    fn failing() -> Arc<Self> {
        Self::new(SignInOutcome::Failure)
    }

    fn answer_with(&self, outcome: SignInOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    fn outcome(&self) -> SignInOutcome {
        self.outcome.lock().unwrap().clone()
    }

    fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }

    fn federated_calls(&self) -> usize {
        self.federated_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthAdapter for ScriptedAdapter {
    async fn federated_authorize_url(&self) -> Url {
        Url::parse(AUTHORIZE_URL).unwrap()
    }

    async fn sign_in_with_federated_provider(&self, _callback: FederatedCallback) -> SignInOutcome {
        self.federated_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    async fn sign_in_with_credentials(&self, credentials: Credentials) -> SignInOutcome {
        self.credential_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_email.lock().unwrap() = Some(credentials.email().to_string());
        self.outcome()
    }
}

fn profile() -> UserProfile {
    UserProfile::new("auth0|42")
        .with_display_name("Ada Lovelace")
        .with_email("user@example.com")
}

fn router(adapter: &Arc<ScriptedAdapter>) -> Router {
    app(AppState::new(adapter.clone(), Routes::default()))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
}

/// `name=value` part of the session cookie the response sets.
fn session_cookie(response: &Response) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn anonymous_visitor_sees_the_form() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(&app, get("/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("Đăng nhập vào Sociala"));
    assert!(body.contains(r#"action="/login""#));
    assert!(body.contains("Create account"));
}

#[tokio::test]
async fn empty_email_blocks_submission() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(&app, post_form("/login", "email=&password=secret1", None)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains(EMAIL_REQUIRED));
    assert_eq!(adapter.credential_calls(), 0);
}

#[tokio::test]
async fn malformed_email_blocks_submission() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(
        &app,
        post_form("/login", "email=not-an-email&password=secret1", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_text(response).await;
    assert!(body.contains(EMAIL_INVALID));
    assert!(body.contains(r#"value="not-an-email""#));
    assert_eq!(adapter.credential_calls(), 0);
}

#[tokio::test]
async fn short_password_blocks_submission() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(
        &app,
        post_form("/login", "email=user%40example.com&password=abc", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains(PASSWORD_TOO_SHORT));
    assert_eq!(adapter.credential_calls(), 0);
}

#[tokio::test]
async fn successful_sign_in_stores_profile_and_notifies_once() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(
        &app,
        post_form("/login", "email=user%40example.com&password=secret1", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);
    assert_eq!(adapter.credential_calls(), 1);
    assert_eq!(
        adapter.last_email.lock().unwrap().as_deref(),
        Some("user@example.com")
    );

    let home = body_text(send(&app, get("/", Some(&cookie))).await).await;
    assert_eq!(home.matches(LOGIN_SUCCESS).count(), 1);
    assert!(home.contains("Ada Lovelace"));

    let again = body_text(send(&app, get("/", Some(&cookie))).await).await;
    assert_eq!(again.matches(LOGIN_SUCCESS).count(), 0);
}

#[tokio::test]
async fn failed_sign_in_keeps_the_form_and_notifies_once() {
    let adapter = ScriptedAdapter::failing();
    let app = router(&adapter);

    let response = send(
        &app,
        post_form("/login", "email=user%40example.com&password=secret1", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let body = body_text(response).await;
    assert_eq!(body.matches(LOGIN_FAILURE).count(), 1);
    assert!(body.contains(r#"name="password""#));
    assert!(body.contains(r#"value="user@example.com""#));
    assert_eq!(adapter.credential_calls(), 1);

    // No profile was stored, so the form is still offered.
    let response = send(&app, get("/login", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await.matches(LOGIN_FAILURE).count(), 0);
}

#[tokio::test]
async fn signed_in_visitor_is_redirected_home() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(
        &app,
        post_form("/login", "email=user%40example.com&password=secret1", None),
    )
    .await;
    let cookie = session_cookie(&response);

    let response = send(&app, get("/login", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn federated_sign_in_round_trip() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(&app, post_form("/login/federated", "", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), AUTHORIZE_URL);

    let response = send(&app, get("/callback?code=abc&state=xyz", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);

    let home = body_text(send(&app, get("/", Some(&cookie))).await).await;
    assert_eq!(home.matches(LOGIN_SUCCESS).count(), 1);
    assert!(home.contains("user@example.com"));
    assert_eq!(adapter.federated_calls(), 1);
    assert_eq!(adapter.credential_calls(), 0);
}

#[tokio::test]
async fn failed_federated_sign_in_returns_to_the_form() {
    let adapter = ScriptedAdapter::failing();
    let app = router(&adapter);

    let response = send(&app, get("/callback?error=access_denied", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let cookie = session_cookie(&response);

    let response = send(&app, get("/login", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await.matches(LOGIN_FAILURE).count(), 1);
}

#[tokio::test]
async fn create_account_always_goes_to_registration() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    for body in ["", "email=not-an-email&password=abc"] {
        let response = send(&app, post_form("/login/create-account", body, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/register");
    }
    assert_eq!(adapter.credential_calls(), 0);

    let response = send(&app, get("/register", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_forgets_the_profile() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(
        &app,
        post_form("/login", "email=user%40example.com&password=secret1", None),
    )
    .await;
    let cookie = session_cookie(&response);

    let response = send(&app, get("/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = send(&app, get("/login", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn redirects_follow_configured_routes() {
    let adapter = ScriptedAdapter::succeeding();
    let routes = Routes {
        home: "/feed".to_string(),
        register: "/signup".to_string(),
    };
    let app = app(AppState::new(adapter.clone(), routes));

    let response = send(
        &app,
        post_form("/login", "email=user%40example.com&password=secret1", None),
    )
    .await;
    assert_eq!(location(&response), "/feed");

    let response = send(&app, post_form("/login/create-account", "", None)).await;
    assert_eq!(location(&response), "/signup");
}

#[tokio::test]
async fn signing_in_issues_a_new_session_cookie() {
    let adapter = ScriptedAdapter::failing();
    let app = router(&adapter);

    // A cookie obtained before signing in, e.g. planted by someone else.
    let response = send(&app, get("/callback?error=access_denied", None)).await;
    let planted = session_cookie(&response);

    adapter.answer_with(SignInOutcome::Success(profile()));
    let response = send(
        &app,
        post_form(
            "/login",
            "email=user%40example.com&password=secret1",
            Some(&planted),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let issued = session_cookie(&response);
    assert_ne!(issued, planted);

    // The old cookie is not signed in.
    let response = send(&app, get("/login", Some(&planted))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let home = body_text(send(&app, get("/", Some(&planted))).await).await;
    assert!(!home.contains("Ada Lovelace"));

    // The new one is, and still shows the success notice once.
    let home = body_text(send(&app, get("/", Some(&issued))).await).await;
    assert!(home.contains("Ada Lovelace"));
    assert_eq!(home.matches(LOGIN_SUCCESS).count(), 1);
}

#[tokio::test]
async fn federated_sign_in_also_rotates_the_session() {
    let adapter = ScriptedAdapter::failing();
    let app = router(&adapter);

    let response = send(&app, get("/callback?error=access_denied", None)).await;
    let planted = session_cookie(&response);

    adapter.answer_with(SignInOutcome::Success(profile()));
    let response = send(&app, get("/callback?code=abc&state=xyz", Some(&planted))).await;
    assert_eq!(location(&response), "/");
    assert_ne!(session_cookie(&response), planted);

    let response = send(&app, get("/login", Some(&planted))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_cookie_expires_with_the_session() {
    let adapter = ScriptedAdapter::failing();
    let app = router(&adapter);

    let response = send(&app, get("/callback?error=access_denied", None)).await;
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(raw.contains(&format!("Max-Age={}", SESSION_TTL.as_secs())));
}

#[tokio::test]
async fn signed_in_submissions_go_home() {
    let adapter = ScriptedAdapter::succeeding();
    let app = router(&adapter);

    let response = send(
        &app,
        post_form("/login", "email=user%40example.com&password=secret1", None),
    )
    .await;
    let cookie = session_cookie(&response);
    assert_eq!(adapter.credential_calls(), 1);

    let response = send(
        &app,
        post_form(
            "/login",
            "email=user%40example.com&password=secret1",
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(adapter.credential_calls(), 1);

    let response = send(&app, post_form("/login/federated", "", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(adapter.federated_calls(), 0);
}
