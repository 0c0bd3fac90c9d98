//! GameStream control-plane client.
//!
//! Synchronous request/response calls against a host's HTTP(S) endpoints.
//! Each call builds one URL, issues one GET through the [`Transport`] and
//! verifies the reply envelope before trusting its payload.
//!
//! ```text
//!  serverinfo ──► https:47984 ──401──► http:47989
//!  launch / resume / cancel / applist / appasset ──► https:47984
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Url;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::control::server_info::{AppDescriptor, DisplayMode, ServerDescriptor};
use crate::control::transport::{HttpReply, ReqwestTransport, Transport};
use crate::control::xml::{self, Envelope};
use crate::error::{ControlPlaneError, StrixError, TransportError};
use crate::stream::config::StreamConfiguration;

pub const HTTP_PORT: u16 = 47989;
pub const HTTPS_PORT: u16 = 47984;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// HDR capability parameters sent with a launch when HDR is enabled.
const HDR_LAUNCH_PARAMS: [(&str, &str); 5] = [
    ("hdrMode", "1"),
    ("clientHdrCapVersion", "0"),
    ("clientHdrCapSupportedFlagsInUint32", "0"),
    ("clientHdrCapMetaDataId", "NV_STATIC_METADATA_TYPE_1"),
    ("clientHdrCapDisplayData", "0x0x0x0x0x0x0x0x0x0x0"),
];

/// How loudly a request is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum RequestLogLevel {
    Silent,
    /// Failures only.
    #[default]
    Error,
    /// Every URL plus failures.
    Verbose,
}

// ── ControlPlaneClient ───────────────────────────────────────────

pub struct ControlPlaneClient {
    address: String,
    http_base: Url,
    https_base: Url,
    unique_id: String,
    request_timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl ControlPlaneClient {
    /// Client for `address` on the standard ports, using a fresh
    /// [`ReqwestTransport`].
    pub fn new(address: &str, unique_id: impl Into<String>) -> Result<Self, StrixError> {
        Self::for_host(address, unique_id, Arc::new(ReqwestTransport::new()?))
    }

    /// Client on the host's standard ports over `transport`.
    pub fn for_host(
        address: &str,
        unique_id: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, StrixError> {
        let host = if address.contains(':') && !address.starts_with('[') {
            format!("[{address}]")
        } else {
            address.to_string()
        };
        let http_base = parse_base(&format!("http://{host}:{HTTP_PORT}/"))?;
        let https_base = parse_base(&format!("https://{host}:{HTTPS_PORT}/"))?;
        Ok(Self::with_transport(address, http_base, https_base, unique_id, transport))
    }

    /// Client with explicit endpoints and transport.
    pub fn with_transport(
        address: &str,
        http_base: Url,
        https_base: Url,
        unique_id: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            address: address.to_string(),
            http_base,
            https_base,
            unique_id: unique_id.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            transport,
        }
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    // ── Operations ───────────────────────────────────────────────

    /// Query the host, secure endpoint first. A 401 there (certificate not
    /// accepted) retries once over plain HTTP.
    pub fn get_server_info(&self, log_level: RequestLogLevel) -> Result<ServerDescriptor, StrixError> {
        let xml = match self.fetch_verified(&self.https_base, "serverinfo", &[], true, log_level) {
            Err(StrixError::ControlPlane(e)) if e.is_unauthorized() => {
                info!(address = %self.address, "secure serverinfo unauthorized, retrying over HTTP");
                self.fetch_verified(&self.http_base, "serverinfo", &[], true, log_level)?
            }
            other => other?,
        };
        Ok(ServerDescriptor::parse(&self.address, &xml)?)
    }

    /// Launch `app_id` with the session's stream parameters.
    pub fn launch_app(
        &self,
        app_id: u32,
        config: &StreamConfiguration,
        sops: bool,
        local_audio: bool,
        gamepad_mask: u16,
    ) -> Result<(), StrixError> {
        let mut args: Vec<(&str, String)> = vec![
            ("appid", app_id.to_string()),
            ("mode", config.launch_mode()),
            ("additionalStates", "1".into()),
            ("sops", bool_flag(sops)),
            ("rikey", config.remote_input.rikey_hex()),
            ("rikeyid", config.remote_input.rikey_id().to_string()),
        ];
        if config.enable_hdr {
            args.extend(HDR_LAUNCH_PARAMS.iter().map(|(k, v)| (*k, v.to_string())));
        }
        args.extend([
            ("localAudioPlayMode", bool_flag(local_audio)),
            ("surroundAudioInfo", config.audio.surround_audio_info().to_string()),
            ("remoteControllersBitmap", gamepad_mask.to_string()),
            ("gcmap", gamepad_mask.to_string()),
        ]);

        self.fetch_verified(&self.https_base, "launch", &args, false, RequestLogLevel::Error)?;
        info!(app_id, mode = %config.launch_mode(), hdr = config.enable_hdr, "app launched");
        Ok(())
    }

    /// Resume the app already running on the host.
    pub fn resume_app(&self, config: &StreamConfiguration) -> Result<(), StrixError> {
        let args = [
            ("rikey", config.remote_input.rikey_hex()),
            ("rikeyid", config.remote_input.rikey_id().to_string()),
            ("surroundAudioInfo", config.audio.surround_audio_info().to_string()),
        ];
        self.fetch_verified(&self.https_base, "resume", &args, false, RequestLogLevel::Error)?;
        info!("app resumed");
        Ok(())
    }

    /// Quit the running app.
    ///
    /// Some hosts acknowledge a cancel they did not perform when the
    /// session belongs to another client, so the running app is re-read
    /// afterwards and a still-running app fails with status 599.
    pub fn quit_app(&self) -> Result<(), StrixError> {
        self.fetch_verified(&self.https_base, "cancel", &[], false, RequestLogLevel::Error)?;

        let info = self.get_server_info(RequestLogLevel::Error)?;
        if info.current_game != 0 {
            warn!(current_game = info.current_game, "app still running after cancel");
            return Err(ControlPlaneError::not_session_owner().into());
        }
        info!("app quit");
        Ok(())
    }

    pub fn get_app_list(&self) -> Result<Vec<AppDescriptor>, StrixError> {
        let xml = self.fetch_verified(&self.https_base, "applist", &[], true, RequestLogLevel::Error)?;
        Ok(Envelope::parse(&xml)?.apps()?)
    }

    /// Raw box-art image bytes for `app_id`.
    pub fn get_box_art(&self, app_id: u32) -> Result<Bytes, StrixError> {
        let args = [
            ("appid", app_id.to_string()),
            ("AssetType", "2".into()),
            ("AssetIdx", "0".into()),
        ];
        let reply = self.request(&self.https_base, "appasset", &args, true, RequestLogLevel::Verbose)?;

        // Hosts answer a bad request with an envelope instead of an image.
        if looks_like_xml(&reply.body) {
            xml::verify_status(&String::from_utf8_lossy(&reply.body))?;
        }
        if !reply.is_success() {
            return Err(http_status_error(reply.status).into());
        }
        Ok(reply.body)
    }

    /// Display modes of a server-info reply, ascending.
    pub fn get_display_mode_list(server_info_xml: &str) -> Vec<DisplayMode> {
        xml::display_modes(server_info_xml)
    }

    // ── Plumbing ─────────────────────────────────────────────────

    fn build_url(&self, base: &Url, command: &str, args: &[(&str, String)]) -> Url {
        let mut url = base.clone();
        url.set_path(command);
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            query.append_pair("uniqueid", &self.unique_id);
            query.append_pair("uuid", &Uuid::new_v4().simple().to_string());
            for (key, value) in args {
                query.append_pair(key, value);
            }
        }
        url
    }

    fn request(
        &self,
        base: &Url,
        command: &str,
        args: &[(&str, String)],
        enable_timeout: bool,
        log_level: RequestLogLevel,
    ) -> Result<HttpReply, TransportError> {
        let url = self.build_url(base, command, args);
        if log_level >= RequestLogLevel::Verbose {
            info!(target: "strix::control", url = %url, "executing request");
        }

        let timeout = enable_timeout.then_some(self.request_timeout);
        match self.transport.get(&url, timeout) {
            Ok(reply) => {
                debug!(command, status = reply.status, "request complete");
                Ok(reply)
            }
            Err(e) => {
                if log_level >= RequestLogLevel::Error {
                    error!(target: "strix::control", command, error = %e, "request failed");
                }
                Err(e)
            }
        }
    }

    /// Issue a request and verify its envelope; returns the body text.
    fn fetch_verified(
        &self,
        base: &Url,
        command: &str,
        args: &[(&str, String)],
        enable_timeout: bool,
        log_level: RequestLogLevel,
    ) -> Result<String, StrixError> {
        let reply = self.request(base, command, args, enable_timeout, log_level)?;
        let text = String::from_utf8_lossy(&reply.body).into_owned();

        let verified = match Envelope::parse(&text) {
            Ok(envelope) => envelope.verify().map_err(StrixError::from),
            // A bare HTTP error with no envelope still carries a usable code.
            Err(_) if !reply.is_success() => Err(http_status_error(reply.status).into()),
            Err(e) => Err(e.into()),
        };

        if let Err(StrixError::ControlPlane(e)) = &verified {
            // 401 is the expected outcome of an unpaired secure request.
            if !e.is_unauthorized() && log_level >= RequestLogLevel::Error {
                warn!(target: "strix::control", command, code = e.status_code, message = %e.message, "request rejected");
            }
        }
        verified.map(|()| text)
    }
}

fn parse_base(text: &str) -> Result<Url, StrixError> {
    Url::parse(text).map_err(|e| StrixError::Other(format!("invalid host address {text}: {e}")))
}

fn bool_flag(value: bool) -> String {
    String::from(if value { "1" } else { "0" })
}

fn http_status_error(status: u16) -> ControlPlaneError {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("");
    ControlPlaneError::new(i32::from(status), reason)
}

fn looks_like_xml(body: &[u8]) -> bool {
    let trimmed = body.trim_ascii_start();
    trimmed.starts_with(b"<?xml") || trimmed.starts_with(b"<root")
}

// ── Tests ────────────────────────────────────────────────────────
