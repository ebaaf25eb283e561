use serde::Deserialize;
use std::{fmt, net::SocketAddr};

pub mod adapter;
pub mod auth;
pub mod flow;
pub mod handler;
pub mod profile;
pub mod server;
pub mod session;
pub mod validation;

/// Auth0 tenant settings, read from `AUTH0_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct Auth0Config {
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    /// Public origin of this server, e.g. `http://localhost:3000`.
    pub base_url: String,
}

impl fmt::Debug for Auth0Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth0Config")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Listener and route settings, read from `APP_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_home_route")]
    pub home_route: String,
    #[serde(default = "default_register_route")]
    pub register_route: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            home_route: default_home_route(),
            register_route: default_register_route(),
        }
    }
}

impl ServerConfig {
    pub fn routes(&self) -> Routes {
        Routes {
            home: self.home_route.clone(),
            register: self.register_route.clone(),
        }
    }
}

/// Navigation targets the sign-in screen redirects to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Routes {
    pub home: String,
    pub register: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteConfigError {
    #[error("{name} route `{path}` collides with a path the sign-in screen serves")]
    Reserved { name: &'static str, path: String },
    #[error("{name} route is empty")]
    Empty { name: &'static str },
    #[error("home and register routes are both `{0}`")]
    Duplicate(String),
}

impl Routes {
    /// Rejects destinations that would clash with the router's own paths.
    pub fn validate(&self) -> Result<(), RouteConfigError> {
        for (name, path) in [("home", &self.home), ("register", &self.register)] {
            let trimmed = path.trim();
            if trimmed.is_empty() {
                return Err(RouteConfigError::Empty { name });
            }
            let reserved = server::FIXED_PATHS.contains(&trimmed)
                || trimmed == server::STATIC_PREFIX
                || trimmed.starts_with(&format!("{}/", server::STATIC_PREFIX));
            if reserved {
                return Err(RouteConfigError::Reserved {
                    name,
                    path: path.clone(),
                });
            }
        }

        if self.home.starts_with('/') && self.home == self.register {
            return Err(RouteConfigError::Duplicate(self.home.clone()));
        }

        Ok(())
    }
}

impl Default for Routes {
    fn default() -> Self {
        ServerConfig::default().routes()
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_home_route() -> String {
    "/".to_string()
}

fn default_register_route() -> String {
    "/register".to_string()
}
