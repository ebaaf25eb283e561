use anyhow::Context;
use sociala_signin::{server::start_server, Auth0Config, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sociala_signin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let auth0_config = envy::prefixed("AUTH0_")
        .from_env::<Auth0Config>()
        .context("failed getting envs of Auth0")?;
    let server_config = envy::prefixed("APP_")
        .from_env::<ServerConfig>()
        .context("failed getting envs of the server")?;

    start_server(auth0_config, server_config).await?;

    Ok(())
}
