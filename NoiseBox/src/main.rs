//! Point d'entrée multi-outils de NoiseBox.
//!
//! Un seul binaire, trois sous-outils :
//! - `mediaplayer` : le processus hôte (serveur de commandes + console)
//! - `buildschema` : écrit les schémas JSON des types wire
//! - `apitool` : envoie une commande à un serveur en marche

use anyhow::Context;
use clap::{Parser, Subcommand};
use nbconfig::Config;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod apitool;
mod commands;
mod console;
mod host;

#[derive(Parser)]
#[command(name = "noisebox", about = "NoiseBox - local networked media player")]
struct Cli {
    /// Run the server in debug mode. Provides messy-but-debug-friendly
    /// output. Not recommended for end users.
    #[arg(long, global = true)]
    debug: bool,

    /// Listen/connect host for the command server.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Listen/connect port for the command server.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// The log level at which the command server starts printing messages.
    #[arg(long = "server_log_level", global = true)]
    server_log_level: Option<String>,

    /// Optional YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    tool: Tool,
}

#[derive(Subcommand)]
enum Tool {
    /// Run the media player: command server plus local console.
    Mediaplayer,

    /// Emit the JSON schemas for the wire types.
    Buildschema {
        /// Output directory for the schema files.
        #[arg(long)]
        out: PathBuf,
    },

    /// Connect to a running server and send one command.
    Apitool {
        /// Command name, e.g. TOGGLE_PLAY or LIST_SONGS.
        command_name: String,

        /// Arguments forwarded to the command.
        args: Vec<String>,
    },
}

/// Fusionne fichier, environnement et flags CLI en une config immuable.
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.debug {
        config.debug = true;
    }
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(level) = &cli.server_log_level {
        config.server_log_level = Some(level.clone());
    }
    Ok(config)
}

/// Filtre de logs : `LOGLEVEL` pour le niveau global, la config pour la
/// verbosité du transport.
fn log_filter(config: &Config) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::try_from_env("LOGLEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(level) = &config.server_log_level {
        filter = filter.add_directive(
            format!("nbserver={}", level)
                .parse()
                .with_context(|| format!("invalid --server_log_level '{}'", level))?,
        );
    }
    Ok(filter)
}

/// Initialise les logs du mediaplayer : console + fichier horodaté.
fn init_host_logging(config: &Config) -> anyhow::Result<()> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("creating log dir '{}'", config.log_dir.display()))?;
    let log_path = config.log_dir.join(format!(
        "{}-debug.log",
        chrono::Local::now().format("%Y-%m-%d %H.%M.%S")
    ));
    let log_file = fs::File::create(&log_path)
        .with_context(|| format!("creating log file '{}'", log_path.display()))?;

    tracing_subscriber::registry()
        .with(log_filter(config)?)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();
    Ok(())
}

fn init_tool_logging(config: &Config) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(log_filter(config)?)
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    match cli.tool {
        Tool::Mediaplayer => {
            init_host_logging(&config)?;
            host::run(config).await
        }
        Tool::Buildschema { out } => {
            init_tool_logging(&config)?;
            nbprotocol::write_schemas(&out).context("writing schemas")?;
            println!("Schemas written to {}", out.join(nbprotocol::VERSION).display());
            Ok(())
        }
        Tool::Apitool { command_name, args } => {
            init_tool_logging(&config)?;
            apitool::run(&config, &command_name, &args).await
        }
    }
}
