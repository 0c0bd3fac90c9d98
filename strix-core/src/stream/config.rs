//! Per-session stream configuration.
//!
//! Built once when a session is constructed. Validation may downgrade it
//! before launch; after the engine starts it is read-only.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::control::server_info::ServerDescriptor;
use crate::stream::preferences::{StreamingPreferences, VideoCodecPreference};
use crate::video::codec::VideoFormat;

/// Packet size on the host's own network segment.
pub const LOCAL_PACKET_SIZE: u32 = 1392;
/// Packet size everywhere else.
pub const REMOTE_PACKET_SIZE: u32 = 1024;
/// HEVC needs this percentage of the H.264 bitrate for equal quality.
pub const HEVC_BITRATE_PERCENTAGE: u32 = 75;

// ── RemoteInputKey ───────────────────────────────────────────────

/// AES key and IV shared with the host for input encryption.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteInputKey {
    key: [u8; 16],
    iv: [u8; 16],
}

impl RemoteInputKey {
    /// Fresh key material from the OS random source.
    pub fn generate() -> Self {
        let mut key = [0u8; 16];
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut key);
        OsRng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    pub fn from_parts(key: [u8; 16], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    pub fn key(&self) -> &[u8; 16] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    /// `rikey` query value.
    pub fn rikey_hex(&self) -> String {
        hex::encode(self.key)
    }

    /// `rikeyid` query value: the first four IV bytes, big endian, signed.
    pub fn rikey_id(&self) -> i32 {
        i32::from_be_bytes([self.iv[0], self.iv[1], self.iv[2], self.iv[3]])
    }
}

impl fmt::Debug for RemoteInputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteInputKey")
            .field("key", &"<redacted>")
            .field("rikey_id", &self.rikey_id())
            .finish()
    }
}

// ── AudioConfiguration ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioConfiguration {
    #[default]
    Stereo,
    Surround51,
}

impl AudioConfiguration {
    pub fn channel_count(self) -> u32 {
        match self {
            Self::Stereo => 2,
            Self::Surround51 => 6,
        }
    }

    pub fn channel_mask(self) -> u32 {
        match self {
            Self::Stereo => 0x3,
            Self::Surround51 => 0xFC,
        }
    }

    /// `surroundAudioInfo` query value.
    pub fn surround_audio_info(self) -> u32 {
        (self.channel_mask() << 16) | self.channel_count()
    }
}

// ── StreamConfiguration ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfiguration {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub packet_size: u32,
    pub streaming_remotely: bool,
    pub audio: AudioConfiguration,
    pub supports_hevc: bool,
    pub enable_hdr: bool,
    pub hevc_bitrate_percentage_multiplier: u32,
    pub remote_input: RemoteInputKey,
}

impl StreamConfiguration {
    /// Build the configuration for a session against `server`.
    ///
    /// `hevc_hardware` reports whether HEVC can be hardware decoded here;
    /// it decides the `Auto` codec preference.
    pub fn from_preferences(
        prefs: &StreamingPreferences,
        server: &ServerDescriptor,
        hevc_hardware: bool,
        audio: AudioConfiguration,
    ) -> Self {
        let (supports_hevc, enable_hdr) = match prefs.video_codec {
            VideoCodecPreference::Auto => (hevc_hardware, false),
            VideoCodecPreference::ForceH264 => (false, false),
            VideoCodecPreference::ForceHevc => (true, false),
            VideoCodecPreference::ForceHevcHdr => (true, true),
        };

        let is_local = server.local_address.as_deref() == Some(server.address.as_str());
        let is_remote = server.external_address.as_deref() == Some(server.address.as_str());

        Self {
            width: prefs.width,
            height: prefs.height,
            fps: prefs.fps,
            bitrate_kbps: prefs.bitrate_kbps,
            packet_size: if is_local {
                LOCAL_PACKET_SIZE
            } else {
                REMOTE_PACKET_SIZE
            },
            streaming_remotely: is_remote,
            audio,
            supports_hevc,
            enable_hdr,
            hevc_bitrate_percentage_multiplier: HEVC_BITRATE_PERCENTAGE,
            remote_input: RemoteInputKey::generate(),
        }
    }

    /// `mode` query value, `WxHxFPS`.
    pub fn launch_mode(&self) -> String {
        format!("{}x{}x{}", self.width, self.height, self.fps)
    }

    /// The video format the host will be asked to encode.
    pub fn video_format(&self) -> VideoFormat {
        match (self.supports_hevc, self.enable_hdr) {
            (false, _) => VideoFormat::H264,
            (true, false) => VideoFormat::H265,
            (true, true) => VideoFormat::H265Main10,
        }
    }

    pub fn is_4k(&self) -> bool {
        self.width >= 3840
    }
}
