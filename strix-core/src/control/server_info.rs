//! Host descriptors parsed from control-plane replies.
//!
//! A [`ServerDescriptor`] is rebuilt from scratch on every server-info
//! query and never patched in place.

use std::fmt;

use bitflags::bitflags;

use crate::control::xml::Envelope;
use crate::error::TransportError;

// ── VersionQuad ──────────────────────────────────────────────────

/// A `major.minor.patch.build` version as reported by the host.
///
/// Legacy hosts omit the field entirely; anything that is not exactly
/// four unsigned integers parses to [`VersionQuad::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionQuad {
    #[default]
    Unknown,
    Known([u32; 4]),
}

impl VersionQuad {
    pub fn parse(text: &str) -> Self {
        let mut quad = [0u32; 4];
        let mut parts = text.trim().split('.');
        for slot in quad.iter_mut() {
            match parts.next().map(str::parse::<u32>) {
                Some(Ok(v)) => *slot = v,
                _ => return Self::Unknown,
            }
        }
        if parts.next().is_some() {
            return Self::Unknown;
        }
        Self::Known(quad)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn major(&self) -> Option<u32> {
        match self {
            Self::Known(q) => Some(q[0]),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for VersionQuad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known([a, b, c, d]) => write!(f, "{a}.{b}.{c}.{d}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ── GpuCodecSupport ──────────────────────────────────────────────

bitflags! {
    /// `ServerCodecModeSupport` bits of the host GPU encoder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GpuCodecSupport: u32 {
        const H264 = 0x0001;
        const HEVC = 0x0100;
        const HEVC_MAIN10 = 0x0200;
    }
}

// ── DisplayMode ──────────────────────────────────────────────────

/// A host display mode. Orders by width, then height, then refresh rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

// ── PairState ────────────────────────────────────────────────────

/// Only the secure endpoint reports pairing; plain HTTP leaves it unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairState {
    #[default]
    Unknown,
    Paired,
    NotPaired,
}

// ── AppDescriptor ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppDescriptor {
    pub id: u32,
    pub name: String,
    pub hdr_supported: bool,
}

impl AppDescriptor {
    pub fn is_initialized(&self) -> bool {
        self.id != 0 && !self.name.is_empty()
    }
}

// ── ServerDescriptor ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerDescriptor {
    /// Address the descriptor was fetched from.
    pub address: String,
    pub hostname: String,
    pub unique_id: String,
    pub mac_address: Option<String>,
    pub local_address: Option<String>,
    pub external_address: Option<String>,
    pub app_version: VersionQuad,
    pub gfe_version: VersionQuad,
    /// `appversion` exactly as reported; the streaming engine needs it
    /// verbatim even when it is not a clean quad.
    pub app_version_text: String,
    /// `GfeVersion` as reported; absent on legacy hosts.
    pub gfe_version_text: Option<String>,
    /// Raw `state` element, e.g. `SUNSHINE_SERVER_BUSY`.
    pub state: String,
    pub pair_state: PairState,
    /// Running app id, 0 when the host is not in a session.
    pub current_game: u32,
    pub codec_support: GpuCodecSupport,
    pub max_luma_pixels_hevc: u64,
    /// Ascending.
    pub display_modes: Vec<DisplayMode>,
}

impl ServerDescriptor {
    /// Build a descriptor from a verified server-info reply.
    pub fn parse(address: &str, xml: &str) -> Result<Self, TransportError> {
        let env = Envelope::parse(xml)?;
        let text = |tag: &str| env.text(tag).map(str::to_string);
        let number = |tag: &str| env.text(tag).and_then(|s| s.parse::<u64>().ok());

        let state = text("state").unwrap_or_default();

        Ok(Self {
            address: address.to_string(),
            hostname: text("hostname").unwrap_or_default(),
            unique_id: text("uniqueid").unwrap_or_default(),
            mac_address: text("mac").filter(|s| !s.is_empty()),
            local_address: text("LocalIP").filter(|s| !s.is_empty()),
            external_address: text("ExternalIP").filter(|s| !s.is_empty()),
            app_version: env.text("appversion").map(VersionQuad::parse).unwrap_or_default(),
            gfe_version: env.text("GfeVersion").map(VersionQuad::parse).unwrap_or_default(),
            app_version_text: text("appversion").unwrap_or_default(),
            gfe_version_text: text("GfeVersion").filter(|s| !s.is_empty()),
            pair_state: match env.text("PairStatus") {
                Some("1") => PairState::Paired,
                Some(_) => PairState::NotPaired,
                None => PairState::Unknown,
            },
            current_game: current_game(&env),
            codec_support: GpuCodecSupport::from_bits_truncate(
                number("ServerCodecModeSupport").unwrap_or(0) as u32,
            ),
            max_luma_pixels_hevc: number("MaxLumaPixelsHEVC").unwrap_or(0),
            display_modes: env.display_modes(),
            state,
        })
    }

    /// The largest display mode, if the host listed any.
    pub fn best_display_mode(&self) -> Option<DisplayMode> {
        self.display_modes.last().copied()
    }

    pub fn supports_hevc(&self) -> bool {
        self.max_luma_pixels_hevc > 0 || self.codec_support.contains(GpuCodecSupport::HEVC)
    }

    /// Whether the host's largest mode is 4K and, for 60 fps and above,
    /// refreshes at 60 Hz or better. Slower requests only need the width.
    pub fn supports_4k_at(&self, fps: u32) -> bool {
        self.best_display_mode()
            .is_some_and(|m| m.width >= 3840 && (m.refresh_rate >= 60 || fps < 60))
    }
}

/// Hosts keep `currentgame` set to the last app played, so it only counts
/// while the host is not advertising itself as available.
fn current_game(env: &Envelope<'_>) -> u32 {
    match env.text("state") {
        Some(state) if !state.ends_with("_SERVER_AVAILABLE") => env
            .text("currentgame")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        _ => 0,
    }
}

// ── Tests ────────────────────────────────────────────────────────
