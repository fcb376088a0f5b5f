//! kraken - Entry point for the check-in harvester

use std::sync::Arc;

use anyhow::Context;
use kraken::providers::checkin::HttpDispatcher;
use kraken::providers::mailbox::ImapConnector;
use kraken::{PollService, Scheduler, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let settings = Settings::from_env();
    tracing::info!(
        server = %settings.imap_config().address(),
        mailbox = %settings.imap.mailbox,
        user = %settings.credentials.email,
        strategy = %settings.poll.scan_strategy,
        "Starting kraken"
    );

    let connector = ImapConnector::new(settings.imap_config(), settings.imap_credentials())
        .context("failed to set up IMAP connector")?;
    let extractor = settings
        .link_extractor()
        .context("invalid check-in origin")?;

    let service = PollService::new(
        Arc::new(connector),
        Arc::new(HttpDispatcher::new()),
        settings.cycle_settings(),
    )
    .with_extractor(extractor);
    let scheduler = Arc::new(Scheduler::new(Arc::new(service), settings.poll_interval()));

    let runner = Arc::clone(&scheduler);
    let mut task = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            tracing::info!("Shutdown requested, finishing current cycle");
            scheduler.stop();
            task.await.context("scheduler task failed")?;
        }
        result = &mut task => {
            result.context("scheduler task failed")?;
        }
    }

    tracing::info!("kraken stopped");
    Ok(())
}
