mod banner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use roster_config::{AppConfig, ConfigLoader};
use roster_db::{MigrationRunner, MigrationState};
use roster_gateway::{GatewayServer, open_store};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roster", version, about = "Employee records service")]
struct Cli {
    /// Path to a YAML or TOML config file
    #[arg(long, global = true, env = "ROSTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Apply pending migrations and serve the HTTP API
    Start {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Apply pending migrations and exit
    Migrate {
        /// Override the migrations directory
        #[arg(long, global = true)]
        dir: Option<PathBuf>,

        #[command(subcommand)]
        action: Option<MigrateAction>,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum MigrateAction {
    /// List discovered migrations and whether each has been applied
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = ConfigLoader::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Start { host, port } => {
            let config = with_server_overrides(config, host, port);
            let store = open_store(&config).context("failed to open employee store")?;
            banner::print_banner(&config, cli.config.as_deref());
            GatewayServer::new(config)
                .with_repository(Arc::new(store))
                .run()
                .await
                .context("gateway server failed")?;
        }
        Commands::Migrate { dir, action } => {
            let dir = dir.unwrap_or_else(|| config.database.migrations_dir.clone());
            match action {
                None => migrate(&config, &dir)?,
                Some(MigrateAction::Status) => migrate_status(&config, &dir)?,
            }
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn with_server_overrides(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> AppConfig {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
}

fn open_connection(config: &AppConfig) -> Result<rusqlite::Connection> {
    let path = &config.database.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    rusqlite::Connection::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))
}

fn migrate(config: &AppConfig, dir: &Path) -> Result<()> {
    let mut conn = open_connection(config)?;
    let report = MigrationRunner::new(&mut conn)
        .run_migrations(dir)
        .with_context(|| format!("migrations in {} failed", dir.display()))?;

    if report.is_noop() {
        info!(skipped = report.skipped.len(), "database is up to date");
    } else {
        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "migrations applied"
        );
    }
    for version in &report.applied {
        println!("applied  {version}");
    }
    Ok(())
}

fn migrate_status(config: &AppConfig, dir: &Path) -> Result<()> {
    let mut conn = open_connection(config)?;
    let statuses = MigrationRunner::new(&mut conn)
        .status(dir)
        .with_context(|| format!("failed to read migration status from {}", dir.display()))?;

    if statuses.is_empty() {
        println!("no migrations found in {}", dir.display());
        return Ok(());
    }
    for status in statuses {
        match status.state {
            MigrationState::Applied {
                applied_at: Some(applied_at),
            } => println!("applied  {}  {}", status.version, applied_at.to_rfc3339()),
            MigrationState::Applied { applied_at: None } => {
                println!("applied  {}  (unknown time)", status.version)
            }
            MigrationState::Pending => println!("pending  {}", status.version),
        }
    }
    Ok(())
}
