//! Audio decode and playback.
//!
//! The Opus decoder and the output device are platform collaborators
//! behind [`AudioBackend`]. [`AudioPipeline`] glues them to the engine's
//! audio callbacks.

pub mod pipeline;

pub use pipeline::{AudioPipeline, REINIT_INTERVAL};

use tracing::info;

use crate::error::AudioError;
use crate::stream::config::AudioConfiguration;

pub const SAMPLE_RATE: u32 = 48_000;
/// 5 ms frames.
pub const SAMPLES_PER_FRAME: u32 = 240;

/// Opus multistream layout of the audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpusConfig {
    pub sample_rate: u32,
    pub channel_count: u32,
    pub streams: u32,
    pub coupled_streams: u32,
    pub mapping: [u8; 6],
    pub samples_per_frame: u32,
}

impl OpusConfig {
    pub fn stereo() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channel_count: 2,
            streams: 1,
            coupled_streams: 1,
            mapping: [0, 1, 0, 0, 0, 0],
            samples_per_frame: SAMPLES_PER_FRAME,
        }
    }

    pub fn surround51() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channel_count: 6,
            streams: 4,
            coupled_streams: 2,
            mapping: [0, 4, 1, 5, 2, 3],
            samples_per_frame: SAMPLES_PER_FRAME,
        }
    }

    pub fn for_configuration(audio: AudioConfiguration) -> Self {
        match audio {
            AudioConfiguration::Stereo => Self::stereo(),
            AudioConfiguration::Surround51 => Self::surround51(),
        }
    }
}

// ── Collaborators ────────────────────────────────────────────────

/// Opus multistream decoder.
pub trait AudioDecoder: Send {
    /// Decode one packet to interleaved PCM.
    fn decode(&mut self, packet: &[u8]) -> Result<Vec<i16>, AudioError>;
}

/// Audio output device.
pub trait AudioRenderer: Send {
    fn prepare_for_playback(&mut self, config: &OpusConfig) -> Result<(), AudioError>;

    fn submit_audio(&mut self, pcm: &[i16]) -> Result<(), AudioError>;
}

pub trait AudioBackend: Send + Sync {
    fn create_decoder(&self, config: &OpusConfig) -> Result<Box<dyn AudioDecoder>, AudioError>;

    fn create_renderer(&self) -> Box<dyn AudioRenderer>;
}

/// Create a renderer and prepare it for `config`.
pub fn open_renderer(backend: &dyn AudioBackend, config: &OpusConfig) -> Result<Box<dyn AudioRenderer>, AudioError> {
    let mut renderer = backend.create_renderer();
    renderer.prepare_for_playback(config)?;
    Ok(renderer)
}

/// Result of [`crate::stream::engine::AudioSink::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioInitStatus {
    Ok,
    DecoderInitFailed,
    RendererInitFailed,
}

impl AudioInitStatus {
    /// The engine's numeric convention.
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::DecoderInitFailed => -1,
            Self::RendererInitFailed => -2,
        }
    }
}

/// Pick 5.1 if the output device accepts six channels, else stereo.
pub fn detect_audio_configuration(backend: &dyn AudioBackend) -> AudioConfiguration {
    match open_renderer(backend, &OpusConfig::surround51()) {
        Ok(_) => {
            info!("audio device supports 5.1 surround");
            AudioConfiguration::Surround51
        }
        Err(e) => {
            info!(error = %e, "falling back to stereo audio");
            AudioConfiguration::Stereo
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Device {
        max_channels: u32,
    }

    impl AudioRenderer for Device {
        fn prepare_for_playback(&mut self, config: &OpusConfig) -> Result<(), AudioError> {
            if config.channel_count > self.max_channels {
                return Err(AudioError::Renderer("too many channels".into()));
            }
            Ok(())
        }

        fn submit_audio(&mut self, _pcm: &[i16]) -> Result<(), AudioError> {
            Ok(())
        }
    }

    struct Backend(u32);

    impl AudioBackend for Backend {
        fn create_decoder(&self, _config: &OpusConfig) -> Result<Box<dyn AudioDecoder>, AudioError> {
            Err(AudioError::Decoder("unused".into()))
        }

        fn create_renderer(&self) -> Box<dyn AudioRenderer> {
            Box::new(Device { max_channels: self.0 })
        }
    }

    #[test]
    fn detects_surround() {
        assert_eq!(detect_audio_configuration(&Backend(8)), AudioConfiguration::Surround51);
        assert_eq!(detect_audio_configuration(&Backend(2)), AudioConfiguration::Stereo);
    }

    #[test]
    fn init_status_codes() {
        assert_eq!(AudioInitStatus::Ok.code(), 0);
        assert_eq!(AudioInitStatus::DecoderInitFailed.code(), -1);
        assert_eq!(AudioInitStatus::RendererInitFailed.code(), -2);
    }

    #[test]
    fn opus_layouts() {
        assert_eq!(OpusConfig::for_configuration(AudioConfiguration::Stereo).channel_count, 2);
        let s = OpusConfig::surround51();
        assert_eq!(s.streams + s.coupled_streams, 6);
    }
}
