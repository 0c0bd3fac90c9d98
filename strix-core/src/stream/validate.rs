//! Launch validation against host and client capabilities.
//!
//! Never blocks a launch. Anything unsupported is downgraded in the
//! configuration and reported as a [`LaunchWarning`].

use std::fmt;

use tracing::{debug, warn};

use crate::control::server_info::{AppDescriptor, GpuCodecSupport, ServerDescriptor};
use crate::stream::config::StreamConfiguration;
use crate::stream::preferences::{StreamingPreferences, VideoCodecPreference};
use crate::video::codec::VideoFormat;

/// Resolution 4K requests fall back to.
pub const FALLBACK_RESOLUTION: (u32, u32) = (1920, 1080);

/// Can this client hardware-decode a format at a given size and rate?
pub trait HardwareProbe {
    fn hardware_decode_available(&self, format: VideoFormat, width: u32, height: u32, fps: u32) -> bool;
}

/// A capability downgrade applied before launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchWarning {
    /// HEVC was forced but the host GPU cannot encode it.
    HostLacksHevc,
    /// The app does not advertise HDR.
    AppLacksHdr { app: String },
    HostLacksHdr,
    /// No local hardware decoder for HEVC Main10.
    ClientLacksMain10,
    /// GeForce Experience 2.x (or unknown) cannot stream 4K.
    GfeTooOldFor4k,
    HostLacks4k,
}

impl fmt::Display for LaunchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostLacksHevc => f.write_str(
                "Your host PC GPU doesn't support HEVC. \
                 A GeForce GTX 900-series (Maxwell) or later GPU is required for HEVC streaming.",
            ),
            Self::AppLacksHdr { app } => write!(f, "{app} doesn't support HDR10."),
            Self::HostLacksHdr => f.write_str(
                "Your host PC GPU doesn't support HDR streaming. \
                 A GeForce GTX 1000-series (Pascal) or later GPU is required for HDR streaming.",
            ),
            Self::ClientLacksMain10 => {
                f.write_str("Your client PC GPU doesn't support HEVC Main10 decoding for HDR streaming.")
            }
            Self::GfeTooOldFor4k => f.write_str("GeForce Experience 3.0 or higher is required for 4K streaming."),
            Self::HostLacks4k => f.write_str(
                "Your host PC GPU doesn't support 4K streaming. \
                 A GeForce GTX 900-series (Maxwell) or later GPU is required for 4K streaming.",
            ),
        }
    }
}

/// Check `config` against the host and the local decoders, downgrading
/// HEVC, HDR and 4K in place as needed.
pub fn validate_launch(
    config: &mut StreamConfiguration,
    prefs: &StreamingPreferences,
    server: &ServerDescriptor,
    app: &AppDescriptor,
    probe: &dyn HardwareProbe,
) -> Vec<LaunchWarning> {
    let mut warnings = Vec::new();

    if config.supports_hevc {
        let forced = matches!(
            prefs.video_codec,
            VideoCodecPreference::ForceHevc | VideoCodecPreference::ForceHevcHdr
        );
        if forced {
            if server.max_luma_pixels_hevc == 0 {
                warnings.push(LaunchWarning::HostLacksHevc);
            }
        } else if !probe.hardware_decode_available(VideoFormat::H265, config.width, config.height, config.fps) {
            // HEVC is single-sliced, which is too slow for software decode.
            debug!("no hardware HEVC decoder; using H.264");
            config.supports_hevc = false;
        }
    }

    if config.enable_hdr {
        config.enable_hdr = false;

        if !app.hdr_supported {
            warnings.push(LaunchWarning::AppLacksHdr { app: app.name.clone() });
        } else if !server.codec_support.contains(GpuCodecSupport::HEVC_MAIN10) {
            warnings.push(LaunchWarning::HostLacksHdr);
        } else if !probe.hardware_decode_available(
            VideoFormat::H265Main10,
            config.width,
            config.height,
            config.fps,
        ) {
            warnings.push(LaunchWarning::ClientLacksMain10);
        } else {
            config.enable_hdr = true;
        }
    }

    if config.is_4k() {
        let gfe_ok = server
            .gfe_version_text
            .as_deref()
            .is_some_and(|v| !v.starts_with("2."));
        let downgrade = if !gfe_ok {
            Some(LaunchWarning::GfeTooOldFor4k)
        } else if !server.supports_4k_at(config.fps) {
            Some(LaunchWarning::HostLacks4k)
        } else {
            None
        };
        if let Some(warning) = downgrade {
            (config.width, config.height) = FALLBACK_RESOLUTION;
            warnings.push(warning);
        }
    }

    for warning in &warnings {
        warn!(%warning, "launch downgraded");
    }
    warnings
}
