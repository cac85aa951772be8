//! Operator CLI for the geotag agent.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use geoverify::cache::{EventCache, FileEventCache, flush_cache};
use geoverify::credentials::{
    CredentialStore, Credentials, FileCredentialStore, KeyringCredentialStore,
};
use geoverify::providers::{ConnectivityProbe, TcpConnectivityProbe};
use geoverify::remote::{RemoteClient, VerificationBackend};
use geoverify::{AgentConfig, planner};
use geoverify_api::ApiClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Inspect and operate the background geotag agent.
#[derive(Parser)]
#[command(name = "geoverify-agent", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep credentials in the OS keyring instead of the data directory.
    #[arg(long)]
    keyring: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show stored credentials (without secrets) and cache depth.
    Status,

    /// Deliver cached geotags now.
    Flush,

    /// Print the upcoming capture instants for the pending verification.
    Plan {
        /// Maximum number of instants to print.
        #[arg(long, default_value_t = 24)]
        limit: usize,
    },

    /// Store credentials for a customer session.
    Login {
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        auth_token: String,
        #[arg(long)]
        refresh_token: String,
        #[arg(long)]
        customer_id: String,
    },

    /// Remove stored credentials.
    Logout {
        /// Also drop undelivered geotags.
        #[arg(long)]
        purge_cache: bool,
    },
}

struct Stores {
    credentials: Arc<dyn CredentialStore>,
    cache: FileEventCache,
}

impl Stores {
    fn open(cli: &Cli, config: &AgentConfig) -> Self {
        let data_dir = config.storage.resolved_data_dir();
        let credentials: Arc<dyn CredentialStore> = if cli.keyring {
            Arc::new(KeyringCredentialStore::default())
        } else {
            Arc::new(FileCredentialStore::new(geoverify::dirs::credentials_file(
                &data_dir,
            )))
        };
        let cache = FileEventCache::new(geoverify::dirs::cache_file(&data_dir));
        Self { credentials, cache }
    }

    fn remote(&self, config: &AgentConfig) -> anyhow::Result<RemoteClient> {
        let api = ApiClient::new(config.api.clone()).context("invalid [api] configuration")?;
        Ok(RemoteClient::new(api, Arc::clone(&self.credentials)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("geoverify=info,geoverify_api=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(geoverify::dirs::config_file);
    let config = AgentConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    config.validate()?;

    let stores = Stores::open(&cli, &config);
    match &cli.command {
        Command::Status => status(&stores).await,
        Command::Flush => flush(&stores, &config).await,
        Command::Plan { limit } => plan(&stores, &config, *limit).await,
        Command::Login {
            api_key,
            auth_token,
            refresh_token,
            customer_id,
        } => {
            let credentials = Credentials::new(api_key, auth_token, refresh_token, customer_id);
            if !credentials.is_complete() {
                anyhow::bail!("all four credential fields are required");
            }
            stores.credentials.save(&credentials)?;
            info!(customer_id = %credentials.customer_id, "credentials stored");
            Ok(())
        }
        Command::Logout { purge_cache } => {
            stores.credentials.clear()?;
            if *purge_cache {
                stores.cache.clear().await?;
            }
            info!(purge_cache, "credentials removed");
            Ok(())
        }
    }
}

async fn status(stores: &Stores) -> anyhow::Result<()> {
    match stores.credentials.load()? {
        Some(credentials) => println!("customer: {}", credentials.customer_id),
        None => println!("customer: <not logged in>"),
    }
    println!("cached geotags: {}", stores.cache.len().await?);
    println!("cache file: {}", stores.cache.path().display());
    Ok(())
}

async fn flush(stores: &Stores, config: &AgentConfig) -> anyhow::Result<()> {
    let (host, port) = config.probe_target()?;
    let probe = TcpConnectivityProbe::new(host, port, config.tracking.connectivity_timeout());
    if !probe.is_online().await {
        anyhow::bail!("verification service unreachable; cached geotags kept");
    }

    let remote = stores.remote(config)?;
    let report = flush_cache(&stores.cache, &remote).await?;
    println!("delivered: {}", report.delivered);
    println!("remaining: {}", report.remaining);
    if let Some(failure) = report.failure {
        anyhow::bail!("flush stopped early: {failure}");
    }
    Ok(())
}

async fn plan(stores: &Stores, config: &AgentConfig, limit: usize) -> anyhow::Result<()> {
    let remote = stores.remote(config)?;
    let policy = remote.fetch_policy().await?;
    println!(
        "policy: every {}h for {} day(s)",
        policy.polling_interval_hours(),
        policy.session_timeout_days()
    );

    let Some(record) = remote.fetch_pending_record().await? else {
        println!("no pending verification");
        return Ok(());
    };

    let now = chrono::Utc::now();
    let anchor = record.latest_sample_at().unwrap_or(now);
    let schedule = planner::plan(anchor, &policy, now);
    println!("record: {} ({} samples)", record.id, record.samples.len());
    println!("session ends: {}", schedule.end());
    println!("captures left: {}", schedule.len());
    for at in schedule.take(limit) {
        println!("  {at}");
    }
    Ok(())
}
