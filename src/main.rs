use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use globalping::cli::Args;
use globalping::config::{Config, TOKEN_ENV};
use globalping::history_log::FileMeasurementLog;
use globalping::measurement::{ApiClient, Location};
use globalping::prefs::Prefs;
use globalping::session::ContinuousSession;
use globalping::share::ShareLinkBuilder;
use globalping::view::{AnyView, Printer};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let prefs = Prefs::load();
    let config = Config::new(&args, &prefs, std::env::var(TOKEN_ENV).ok());

    let log_path = FileMeasurementLog::default_path()
        .context("Could not determine a cache directory for the measurement log")?;
    let log = FileMeasurementLog::new(log_path);
    let locations = resolve_locations(&config.locations, &log)?;

    let client = ApiClient::new(&config.api_url, config.token.clone())
        .context("Failed to create API client")?;
    let view = AnyView::for_kind(
        config.command,
        client.clone(),
        Printer::stdio(config.styled),
        config.poll_interval,
    );

    // Ctrl+C ends a continuous session after the current run; one-shot runs
    // keep the default interrupt behaviour
    let cancel = CancellationToken::new();
    if config.continuous {
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            cancel_clone.cancel();
        });
    }

    let ctx = config.session_context(locations);
    let mut session = ContinuousSession::new(ctx, client, view, log, cancel)
        .with_share_builder(ShareLinkBuilder::new(config.share_url.as_str()));
    session.run().await?;

    Ok(())
}

/// Replace measurement references (`last`, `@1`, ...) with logged IDs
fn resolve_locations(locations: &[String], log: &FileMeasurementLog) -> Result<Vec<Location>> {
    locations
        .iter()
        .map(|loc| -> Result<Location> {
            let resolved = log
                .resolve(loc)
                .with_context(|| format!("Invalid location '{}'", loc))?;
            Ok(Location::new(resolved.unwrap_or_else(|| loc.clone())))
        })
        .collect()
}
