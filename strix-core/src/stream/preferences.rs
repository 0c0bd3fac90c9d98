//! User-facing streaming preferences.
//!
//! These are what the user asked for; [`StreamConfiguration`] is what the
//! session actually negotiates after validation.
//!
//! [`StreamConfiguration`]: crate::stream::config::StreamConfiguration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioPreference {
    /// Probe a 5.1 renderer and fall back to stereo.
    #[default]
    Auto,
    Stereo,
    Surround51,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodecPreference {
    /// HEVC when hardware HEVC decode is available, else H.264.
    #[default]
    Auto,
    ForceH264,
    ForceHevc,
    ForceHevcHdr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderSelection {
    #[default]
    Auto,
    ForceSoftware,
    ForceHardware,
}

/// Streaming settings as stored in the client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingPreferences {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub audio: AudioPreference,
    pub video_codec: VideoCodecPreference,
    pub decoder: DecoderSelection,
    pub fullscreen: bool,
    /// Let the host apply per-game optimisations (`sops`).
    pub game_optimizations: bool,
    pub play_audio_on_host: bool,
    pub multi_controller: bool,
}

impl Default for StreamingPreferences {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 60,
            bitrate_kbps: default_bitrate(1280, 720, 60),
            audio: AudioPreference::Auto,
            video_codec: VideoCodecPreference::Auto,
            decoder: DecoderSelection::Auto,
            fullscreen: false,
            game_optimizations: true,
            play_audio_on_host: false,
            multi_controller: true,
        }
    }
}

/// Suggested bitrate in kbps for a resolution and frame rate.
///
/// 720p30 gets 5 Mbps; everything scales with pixel count and frame rate.
pub fn default_bitrate(width: u32, height: u32, fps: u32) -> u32 {
    let base = match width as u64 * height as u64 {
        p if p <= 1280 * 720 => 5_000,
        p if p <= 1920 * 1080 => 10_000,
        p if p <= 2560 * 1440 => 20_000,
        _ => 40_000,
    };
    base * fps.max(30) / 30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bitrates() {
        assert_eq!(default_bitrate(1280, 720, 30), 5_000);
        assert_eq!(default_bitrate(1280, 720, 60), 10_000);
        assert_eq!(default_bitrate(1920, 1080, 60), 20_000);
        assert_eq!(default_bitrate(3840, 2160, 60), 80_000);
    }

    #[test]
    fn defaults_are_720p60() {
        let prefs = StreamingPreferences::default();
        assert_eq!((prefs.width, prefs.height, prefs.fps), (1280, 720, 60));
        assert_eq!(prefs.bitrate_kbps, 10_000);
        assert_eq!(prefs.video_codec, VideoCodecPreference::Auto);
    }
}
