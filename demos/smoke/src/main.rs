//! Start a development backend, talk to it, and shut it down.
//!
//! Run with: cargo run -p harness-smoke
//!
//! Needs the backend's interpreter and launcher on `PATH`, or the launcher
//! path in `APPENGINE_DEV_APPSERVER`. Extra launcher flags may be given in
//! `HARNESS_EXTRA_ARGS`.

use harness_session::{Options, SessionContext, User};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut options = Options::new().with_app_id("smoke");
    if let Ok(extra) = std::env::var("HARNESS_EXTRA_ARGS") {
        options = options.with_extra_args_str(&extra)?;
    }

    let mut session = SessionContext::new(options).await?;
    tracing::info!(
        api = %session.endpoints().api(),
        admin = %session.endpoints().admin(),
        token = %session.session_token(),
        "Backend is up"
    );

    let namespace = session.call("__go__", "GetNamespace", &b""[..]).await?;
    tracing::info!(len = namespace.len(), "Namespace lookup answered");

    session.login(&User::new("smoke@example.com").with_admin(true));
    tracing::info!(headers = ?session.request().headers, "Signed in");
    session.logout();

    session.close().await?;
    tracing::info!("Backend stopped");
    Ok(())
}
