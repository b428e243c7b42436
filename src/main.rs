use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use divar_scout::blacklist::BlacklistStore;
use divar_scout::models::BlacklistReason;
use divar_scout::scrapers::{ChromeSession, RenderSession};
use divar_scout::sender::CollectorClient;
use divar_scout::{Config, Monitor};
use reqwest::Client;
use std::fmt::Write as _;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the listing page and forward new ads (default)
    Run,
    /// Inspect or edit the local blacklist
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },
}

#[derive(Subcommand)]
enum BlacklistAction {
    /// Print every blacklisted ad
    List,
    /// Blacklist an ad by hand
    Add { ad_id: String },
    /// Remove an ad from the blacklist
    Remove { ad_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("divar_scout=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run().await,
        Command::Blacklist { action } => blacklist(action).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    info!("🏠 Divar Scout - listing monitor");
    info!("==========================================");

    let config = Config::from_env()?;

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let sink = Arc::new(CollectorClient::new(
        client.clone(),
        config.remote.collector_url.clone(),
        config.remote.collector_token.clone(),
    ));

    let session: Arc<dyn RenderSession> = Arc::new(
        ChromeSession::launch(&config.browser, &config.discovery.site_origin).await?,
    );

    let mut monitor = match Monitor::initialize(config, Arc::clone(&session), sink, client).await {
        Ok(monitor) => monitor,
        Err(e) => {
            if let Err(close_err) = session.close().await {
                error!("Failed to close browser: {close_err:#}");
            }
            return Err(e);
        }
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, finishing current ad...");
        let _ = stop_tx.send(true);
        // A dropped sender also reads as a stop request
        std::future::pending::<()>().await;
    });

    monitor.run(stop_rx).await;
    monitor.statistics().log_summary();
    monitor.shutdown().await
}

async fn blacklist(action: BlacklistAction) -> Result<()> {
    let config = Config::from_env()?;
    let store = BlacklistStore::new(&config.blacklist_path);
    print!("{}", blacklist_report(&store, action).await?);
    Ok(())
}

/// Apply a blacklist subcommand and render what it did.
async fn blacklist_report(store: &BlacklistStore, action: BlacklistAction) -> Result<String> {
    let mut out = String::new();

    match action {
        BlacklistAction::List => {
            let entries = store.entries().await?;
            for entry in &entries {
                writeln!(out, "{}\t{}\t{}", entry.ad_id, entry.reason, entry.added_at.to_rfc3339())?;
            }
            writeln!(out, "Total: {}", entries.len())?;
        }
        BlacklistAction::Add { ad_id } => {
            if store.add(&ad_id, BlacklistReason::Manual).await? {
                writeln!(out, "Added {ad_id}")?;
            } else {
                writeln!(out, "{ad_id} is already blacklisted")?;
            }
        }
        BlacklistAction::Remove { ad_id } => {
            if store.remove(&ad_id).await? {
                writeln!(out, "Removed {ad_id}")?;
            } else {
                writeln!(out, "{ad_id} was not blacklisted")?;
            }
        }
    }

    Ok(out)
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(args: &[&str]) -> BlacklistAction {
        let argv = ["divar-scout", "blacklist"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Command::Blacklist { action }) => action,
            _ => panic!("expected a blacklist subcommand"),
        }
    }

    #[test]
    fn run_is_the_default_command() {
        let cli = Cli::try_parse_from(["divar-scout"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(
            Cli::try_parse_from(["divar-scout", "run"]).unwrap().command,
            Some(Command::Run)
        ));
        assert!(Cli::try_parse_from(["divar-scout", "blacklist", "add"]).is_err());
    }

    #[tokio::test]
    async fn blacklist_subcommands_edit_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlacklistStore::new(dir.path().join("blacklist.json"));

        let out = blacklist_report(&store, action(&["add", "AbC1"])).await.unwrap();
        assert_eq!(out, "Added AbC1\n");
        let out = blacklist_report(&store, action(&["add", "AbC1"])).await.unwrap();
        assert_eq!(out, "AbC1 is already blacklisted\n");

        let out = blacklist_report(&store, action(&["list"])).await.unwrap();
        assert!(out.starts_with("AbC1\tmanual\t"));
        assert!(out.ends_with("Total: 1\n"));

        let out = blacklist_report(&store, action(&["remove", "AbC1"])).await.unwrap();
        assert_eq!(out, "Removed AbC1\n");
        let out = blacklist_report(&store, action(&["remove", "AbC1"])).await.unwrap();
        assert_eq!(out, "AbC1 was not blacklisted\n");

        let out = blacklist_report(&store, action(&["list"])).await.unwrap();
        assert_eq!(out, "Total: 0\n");
    }

    #[tokio::test]
    async fn corrupt_blacklist_is_reported_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blacklist.json");
        std::fs::write(&path, "{ broken").unwrap();
        let store = BlacklistStore::new(&path);

        assert!(blacklist_report(&store, action(&["add", "X"])).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ broken");
    }
}
