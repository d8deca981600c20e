//! `pagewatch` - check the watched page once, then print or alert.
//!
//! Meant to be run by an external scheduler (cron, a systemd timer, a CI
//! schedule). Takes no arguments; see `pagewatch_core::config` for the
//! environment it reads. Exits non-zero on any fetch, notification or
//! configuration error.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagewatch_core::{
    Config, HttpPageSource, Monitor, Outcome, PageClassifier, SmtpNotifier, StateStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG from it applies
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pagewatch=info,pagewatch_core=info,pagewatch_smtp=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {e}"),
    }

    let config = Config::from_env().context("invalid configuration")?;
    info!(url = %config.rules.target_url, "Checking page");

    let source = HttpPageSource::new(config.rules.target_url.clone(), config.timeout)
        .context("failed to build HTTP client")?;
    let notifier = SmtpNotifier::new(config.smtp, config.alert, config.timeout);

    let mut monitor = Monitor::new(PageClassifier::new(config.rules), source, notifier);
    if let Some(path) = config.state_path {
        info!(path = %path.display(), "Transition-only alerts enabled");
        monitor = monitor.with_state(StateStore::new(path));
    }

    match monitor.run_once().await? {
        Outcome::Printed(line) => println!("{line}"),
        Outcome::Notified { decision, status } => {
            info!(%decision, %status, "Alert delivered");
        }
    }

    Ok(())
}
