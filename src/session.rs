use crate::{
    flow::{ClientState, Notification},
    profile::UserProfile,
    server::COOKIE_NAME,
};
use async_session::{MemoryStore, Session, SessionStore};
use axum::{
    async_trait,
    extract::{rejection::TypedHeaderRejectionReason, FromRef, FromRequestParts, TypedHeader},
    http::{header::SET_COOKIE, request::Parts, HeaderMap},
    RequestPartsExt,
};
use serde::Serialize;
use std::{convert::Infallible, time::Duration};

const PROFILE_KEY: &str = "profile";
const NOTIFICATIONS_KEY: &str = "notifications";

/// Lifetime of a session, counted from its creation.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cookie-keyed state of one browser: the signed-in profile and any
/// notifications waiting to be shown.
pub struct ClientSession {
    store: MemoryStore,
    session: Session,
    // Pre-sign-in session replaced by `replace_profile`, dropped on save.
    retired: Option<Session>,
}

impl ClientSession {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            session: fresh_session(),
            retired: None,
        }
    }

    /// Loads the session named by `cookie_value`, or starts a fresh one when
    /// the cookie is absent, malformed, unknown or expired.
    pub async fn load(store: MemoryStore, cookie_value: Option<&str>) -> Self {
        let existing = match cookie_value {
            Some(value) => store
                .load_session(value.to_string())
                .await
                .unwrap_or_else(|err| {
                    tracing::debug!(error = %err, "discarding unusable session cookie");
                    None
                }),
            None => None,
        };

        match existing {
            Some(session) => Self {
                store,
                session,
                retired: None,
            },
            None => Self::new(store),
        }
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.session.get(PROFILE_KEY)
    }

    /// Removes and returns every pending notification.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let pending = self
            .session
            .get::<Vec<Notification>>(NOTIFICATIONS_KEY)
            .unwrap_or_default();
        if !pending.is_empty() {
            self.session.remove(NOTIFICATIONS_KEY);
        }
        pending
    }

    fn put<T: Serialize>(&mut self, key: &str, value: T) {
        if let Err(err) = self.session.insert(key, value) {
            tracing::error!(error = %err, key, "cannot serialize session value");
        }
    }

    /// Persists pending changes and returns the `Set-Cookie` header a new
    /// session needs.
    pub async fn save(self) -> anyhow::Result<HeaderMap> {
        if let Some(retired) = self.retired {
            self.store.destroy_session(retired).await?;
        }

        let mut headers = HeaderMap::new();
        if !self.session.data_changed() {
            return Ok(headers);
        }

        // Store session and get corresponding cookie
        if let Some(cookie) = self.store.store_session(self.session).await? {
            let cookie = format!(
                "{}={}; SameSite=Lax; Path=/; HttpOnly; Max-Age={}",
                COOKIE_NAME,
                cookie,
                SESSION_TTL.as_secs()
            );
            headers.insert(SET_COOKIE, cookie.parse()?);
        }

        Ok(headers)
    }

    /// Drops the session from the store and expires the cookie.
    pub async fn destroy(self) -> anyhow::Result<HeaderMap> {
        self.store.destroy_session(self.session).await?;

        let cookie = format!("{}=; SameSite=Lax; Path=/; HttpOnly; Max-Age=0", COOKIE_NAME);
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, cookie.parse()?);

        Ok(headers)
    }
}

impl ClientState for ClientSession {
    fn has_profile(&self) -> bool {
        self.profile().is_some()
    }

    /// Signing in always moves the client to a new session id, carrying
    /// over any pending notifications.
    fn replace_profile(&mut self, profile: UserProfile) {
        let pending = self.take_notifications();
        let previous = std::mem::replace(&mut self.session, fresh_session());
        if self.retired.is_none() {
            self.retired = Some(previous);
        }

        self.put(PROFILE_KEY, profile);
        if !pending.is_empty() {
            self.put(NOTIFICATIONS_KEY, pending);
        }
    }

    fn notify(&mut self, notification: Notification) {
        let mut pending = self
            .session
            .get::<Vec<Notification>>(NOTIFICATIONS_KEY)
            .unwrap_or_default();
        pending.push(notification);
        self.put(NOTIFICATIONS_KEY, pending);
    }
}

fn fresh_session() -> Session {
    let mut session = Session::new();
    session.expire_in(SESSION_TTL);
    session
}

/// Drops expired sessions from `store`.
pub async fn purge_expired(store: &MemoryStore) -> anyhow::Result<()> {
    let before = store.count().await;
    store.cleanup().await?;
    let removed = before.saturating_sub(store.count().await);
    if removed > 0 {
        tracing::debug!(removed, "purged expired sessions");
    }
    Ok(())
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientSession
where
    MemoryStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = MemoryStore::from_ref(state);

        let cookies = match parts.extract::<TypedHeader<headers::Cookie>>().await {
            Ok(TypedHeader(cookies)) => Some(cookies),
            Err(e) => {
                if !matches!(e.reason(), TypedHeaderRejectionReason::Missing) {
                    tracing::debug!(error = %e, "ignoring unreadable cookie header");
                }
                None
            }
        };
        let session_cookie = cookies.as_ref().and_then(|c| c.get(COOKIE_NAME));

        Ok(Self::load(store, session_cookie).await)
    }
}
