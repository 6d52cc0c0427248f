//! Command-line front-end.
//!
//! # Responsibilities
//! - Parse subcommands, `--config` and one flag per configuration key
//! - Build the container and run the selected command
//!
//! # Design Decisions
//! - Flags are generated from the key list, so every key an environment
//!   variable can set is also a flag (`--server.port` ↔ `SERVER_PORT`)
//! - Container errors end the process with a non-zero exit

use clap::{Arg, ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::loader::{env_var_name, KEYS};
use crate::config::{AppConfig, ConfigError, ConfigLoader, ServerConfig};
use crate::container::ContainerError;
use crate::http::HttpServer;
use crate::lifecycle::{build_container, serve_until, shutdown_signal, LifecycleError};
use crate::observability::logging::{self, LoggingError};
use crate::observability::metrics::{self, MetricsError};
use crate::repository::{OperationContext, RepositoryError, UserRepository};

/// Time allowed for `migrate` and `health`.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "user-api", version)]
#[command(about = "User CRUD service assembled by a dependency-injection container", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,

    /// `--<key> <value>` overrides, in key order
    #[arg(skip)]
    pub overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start the API server and block until SIGINT/SIGTERM
    Serve,
    /// Run storage migrations
    Migrate,
    /// Query the running service's /health endpoint
    Health,
    /// Print name and version
    Version,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("container: {0}")]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("migration failed: {0}")]
    Migration(#[from] RepositoryError),

    #[error("health request failed: {0}")]
    HealthRequest(#[from] reqwest::Error),

    #[error("service unhealthy: HTTP {0}")]
    Unhealthy(u16),
}

impl Cli {
    /// The clap command, extended with a global flag per configuration key.
    pub fn command_with_overrides() -> clap::Command {
        KEYS.iter().fold(Cli::command(), |command, key| {
            command.arg(
                Arg::new(*key)
                    .long(*key)
                    .global(true)
                    .value_name("VALUE")
                    .help(format!("Override `{key}` (env {})", env_var_name(key))),
            )
        })
    }

    /// Parse the process arguments, exiting on usage errors.
    pub fn parse_args() -> Self {
        let matches = Self::command_with_overrides().get_matches();
        Self::from_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command_with_overrides().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let mut cli = <Self as FromArgMatches>::from_arg_matches(matches)?;
        cli.overrides = KEYS
            .iter()
            .filter_map(|key| flag_value(matches, key).map(|value| (key.to_string(), value)))
            .collect();
        Ok(cli)
    }

    /// Defaults, then `--config`, then environment, then flags.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }
        self.overrides
            .iter()
            .fold(loader, |loader, (key, value)| loader.set(key.as_str(), value.as_str()))
            .load()
    }
}

/// A global flag's value, whether given before or after the subcommand.
fn flag_value(matches: &ArgMatches, key: &str) -> Option<String> {
    let get = |m: &ArgMatches| m.try_get_one::<String>(key).ok().flatten().cloned();
    get(matches).or_else(|| matches.subcommand().and_then(|(_, sub)| get(sub)))
}

/// Run the parsed command.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.load_config()?;

    if cli.command == Command::Version {
        println!("{} version {}", config.app.name, config.app.version);
        return Ok(());
    }

    logging::init(&config)?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(config).await,
        Command::Health => health(&config.server).await,
        Command::Version => Ok(()),
    }
}

async fn serve(config: AppConfig) -> Result<(), CliError> {
    if config.metrics.enabled {
        metrics::init_exporter(&config.metrics)?;
    }

    tracing::info!(
        app = %config.app.name,
        version = %config.app.version,
        environment = %config.app.environment,
        "Starting"
    );

    let grace = config.server.shutdown_timeout();
    let container = build_container(config)?;
    let server = container.resolve::<HttpServer>()?;

    let exit = serve_until(&server, shutdown_signal(), grace).await?;
    tracing::info!(?exit, "Shutdown complete");
    Ok(())
}

async fn migrate(config: AppConfig) -> Result<(), CliError> {
    let container = build_container(config)?;
    let repository = container.resolve::<dyn UserRepository>()?;

    tracing::info!(backend = repository.backend(), "Running migrations");
    repository
        .migrate(&OperationContext::with_timeout(COMMAND_TIMEOUT))
        .await?;
    println!("Migrations applied ({})", repository.backend());
    Ok(())
}

async fn health(server: &ServerConfig) -> Result<(), CliError> {
    let url = health_url(server);
    let client = reqwest::Client::builder().timeout(COMMAND_TIMEOUT).build()?;
    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        eprintln!("Error: {url} returned status {status}");
        return Err(CliError::Unhealthy(status.as_u16()));
    }

    let body: serde_json::Value = response.json().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
    );
    Ok(())
}

/// `/health` URL of the configured server; wildcard hosts map to loopback.
pub fn health_url(server: &ServerConfig) -> String {
    let host = match server.host.as_str() {
        "" | "0.0.0.0" => "127.0.0.1",
        "::" | "[::]" => "[::1]",
        host => host,
    };
    format!("http://{host}:{}/health", server.port)
}
