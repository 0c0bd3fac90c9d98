//! Subcommands of the `strix` binary.
//!
//! Each command is a synchronous control-plane call; `main` runs them on
//! the blocking pool.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use tracing::info;

use strix_core::control::{PairState, ReqwestTransport};
use strix_core::{ControlPlaneClient, RequestLogLevel, ServerDescriptor, StrixError};

use crate::config::HostConfig;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show host details and display modes.
    Info,
    /// List the host's apps.
    Apps,
    /// Save an app's box art.
    BoxArt {
        /// App id, as listed by `apps`.
        #[arg(long)]
        app: u32,
        /// Output image file.
        #[arg(long)]
        out: PathBuf,
    },
    /// Quit the app running on the host.
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Host(#[from] StrixError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the control-plane client for `host`, presenting its client
/// certificate when one is configured.
pub fn connect(host: &HostConfig) -> Result<ControlPlaneClient, CommandError> {
    let transport = if host.identity.is_empty() {
        ReqwestTransport::new().map_err(StrixError::from)?
    } else {
        let pem = std::fs::read(&host.identity)?;
        info!(identity = %host.identity, "using client certificate");
        ReqwestTransport::with_identity(&pem).map_err(StrixError::from)?
    };
    let mut client = ControlPlaneClient::for_host(&host.address, host.unique_id.clone(), Arc::new(transport))?;
    client.set_request_timeout(host.request_timeout());
    Ok(client)
}

/// Run `command` against `client`, writing results to `out`.
pub fn run(command: &Command, client: &ControlPlaneClient, out: &mut dyn Write) -> Result<(), CommandError> {
    match command {
        Command::Info => {
            let server = client.get_server_info(RequestLogLevel::Verbose)?;
            write_server_info(&server, out)?;
        }
        Command::Apps => {
            let apps = client.get_app_list()?;
            if apps.is_empty() {
                writeln!(out, "no apps")?;
            }
            for app in apps {
                let hdr = if app.hdr_supported { "  [HDR]" } else { "" };
                writeln!(out, "{:>10}  {}{hdr}", app.id, app.name)?;
            }
        }
        Command::BoxArt { app, out: path } => {
            let image = client.get_box_art(*app)?;
            std::fs::write(path, &image)?;
            info!(app, bytes = image.len(), path = %path.display(), "box art saved");
            writeln!(out, "saved {} bytes to {}", image.len(), path.display())?;
        }
        Command::Quit => match client.quit_app() {
            Ok(()) => writeln!(out, "app quit")?,
            Err(StrixError::ControlPlane(e)) if e.is_not_session_owner() => {
                writeln!(
                    out,
                    "the running app belongs to another client; quit it from that device"
                )?;
                return Err(StrixError::ControlPlane(e).into());
            }
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

fn write_server_info(server: &ServerDescriptor, out: &mut dyn Write) -> std::io::Result<()> {
    let pairing = match server.pair_state {
        PairState::Paired => "paired",
        PairState::NotPaired => "not paired",
        PairState::Unknown => "unknown",
    };
    writeln!(out, "host:        {} ({})", server.hostname, server.address)?;
    writeln!(out, "app version: {}", server.app_version)?;
    writeln!(
        out,
        "gfe version: {}",
        server.gfe_version_text.as_deref().unwrap_or("none")
    )?;
    writeln!(out, "state:       {}", server.state)?;
    writeln!(out, "pairing:     {pairing}")?;
    if server.current_game != 0 {
        writeln!(out, "running app: {}", server.current_game)?;
    }
    writeln!(
        out,
        "codecs:      {}",
        if server.supports_hevc() { "H.264, HEVC" } else { "H.264" }
    )?;
    for mode in &server.display_modes {
        writeln!(out, "mode:        {}x{}@{}", mode.width, mode.height, mode.refresh_rate)?;
    }
    Ok(())
}
