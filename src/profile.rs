use openidconnect::core::CoreIdTokenClaims;
use serde::{Deserialize, Serialize};

/// Normalized identity record held in the client session after sign-in.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            email: None,
            avatar_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Best available label for greeting the user.
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

impl From<&CoreIdTokenClaims> for UserProfile {
    fn from(claims: &CoreIdTokenClaims) -> Self {
        let display_name = claims
            .name()
            .and_then(|n| n.get(None))
            .map(|n| n.to_string())
            .or_else(|| {
                claims
                    .nickname()
                    .and_then(|n| n.get(None))
                    .map(|n| n.to_string())
            });

        Self {
            id: claims.subject().to_string(),
            display_name,
            email: claims.email().map(|e| e.to_string()),
            avatar_url: claims
                .picture()
                .and_then(|p| p.get(None))
                .map(|url| url.to_string()),
        }
    }
}
