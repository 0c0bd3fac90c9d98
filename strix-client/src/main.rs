//! strix - GameStream host control from the command line.
//!
//! ```text
//! strix info                         Host details and display modes
//! strix apps                         List the host's apps
//! strix box-art --app <id> --out f   Save an app's box art
//! strix quit                         Quit the running app
//! strix --host <addr> ...            Override the configured host
//! strix --gen-config                 Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use strix_client::commands::{self, Command, CommandError};
use strix_client::config::{ClientConfig, ConfigSource};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "strix", about = "GameStream host control")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "strix.toml")]
    config: PathBuf,

    /// Host address (overrides config). Example: 192.168.1.20
    #[arg(long)]
    host: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ClientConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let (mut config, source) = ClientConfig::load(&cli.config);
    if let Some(addr) = cli.host {
        config.host.address = addr;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    info!("strix v{}", env!("CARGO_PKG_VERSION"));
    match source {
        ConfigSource::File => info!("config: {}", cli.config.display()),
        ConfigSource::Missing => info!("no config at {}; using defaults", cli.config.display()),
        ConfigSource::Invalid(reason) => {
            warn!("invalid config {}: {reason}; using defaults", cli.config.display())
        }
    }
    info!("host: {}", config.host.address);

    let command = cli.command.unwrap_or(Command::Info);

    // The control plane is blocking; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || -> Result<(), CommandError> {
        let client = commands::connect(&config.host)?;
        commands::run(&command, &client, &mut std::io::stdout().lock())
    })
    .await?;

    if let Err(e) = result {
        error!("{e}");
        return Err(e.into());
    }
    Ok(())
}
