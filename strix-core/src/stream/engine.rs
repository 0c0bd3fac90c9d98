//! Streaming engine seam.
//!
//! The real-time transport (RTSP handshake, RTP video/audio, input
//! encryption) lives in an external engine. The session drives it through
//! [`StreamEngine`] and the engine calls back into the client through three
//! small capability interfaces:
//!
//! ```text
//!  StreamEngine::start(host, config, callbacks)
//!        │
//!        ├─► StageObserver   stage_starting / stage_failed / connection_terminated / log
//!        ├─► FrameSink       setup / submit_decode_unit / cleanup      (engine decode thread)
//!        └─► AudioSink       init / start / stop / cleanup / decode_and_play (audio thread)
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::audio::{AudioInitStatus, OpusConfig};
use crate::error::{DecoderInitError, SessionError};
use crate::stream::config::StreamConfiguration;
use crate::stream::event::InputEvent;
use crate::video::codec::VideoFormat;

/// What the engine needs to know about the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub address: String,
    /// `appversion` exactly as the host reported it.
    pub app_version: String,
    /// `GfeVersion`, absent on older hosts.
    pub gfe_version: Option<String>,
}

/// One compressed access unit, as a list of buffers owned by the engine.
///
/// The buffers are only valid for the duration of the submit call.
#[derive(Debug, Clone)]
pub struct DecodeUnit<'a> {
    pub frame_number: u64,
    /// Total length of all buffers.
    pub full_length: usize,
    pub buffers: Vec<&'a [u8]>,
}

impl<'a> DecodeUnit<'a> {
    /// A unit made of one contiguous buffer.
    pub fn single(frame_number: u64, data: &'a [u8]) -> Self {
        Self {
            frame_number,
            full_length: data.len(),
            buffers: vec![data],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    Ok,
    /// Decode failed; ask the host for an IDR frame.
    NeedKeyframe,
}

/// Decoder capabilities reported to the engine before the stream starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoCapabilities {
    /// Decode units are submitted on the engine's receive thread.
    pub direct_submit: bool,
    pub slices_per_frame: u32,
}

// ── Capability interfaces ────────────────────────────────────────

pub trait StageObserver: Send + Sync {
    fn stage_starting(&self, stage: &str);

    fn stage_failed(&self, stage: &str, error_code: i64);

    /// The established connection died.
    fn connection_terminated(&self, error_code: i64);

    fn log(&self, message: &str) {
        info!(target: "strix::engine", "{}", message.trim_end());
    }
}

pub trait FrameSink: Send + Sync {
    /// Called once the video format is known.
    fn setup(&self, format: VideoFormat, width: u32, height: u32, fps: u32) -> Result<(), DecoderInitError>;

    fn submit_decode_unit(&self, unit: &DecodeUnit<'_>) -> DecodeStatus;

    fn cleanup(&self);

    fn capabilities(&self) -> VideoCapabilities;
}

pub trait AudioSink: Send + Sync {
    fn init(&self, config: &OpusConfig) -> AudioInitStatus;

    fn start(&self) {}

    fn stop(&self) {}

    fn cleanup(&self);

    fn decode_and_play(&self, sample: &[u8]);
}

/// The callback tables handed to [`StreamEngine::start`].
#[derive(Clone)]
pub struct EngineCallbacks {
    pub stage: Arc<dyn StageObserver>,
    pub video: Arc<dyn FrameSink>,
    pub audio: Arc<dyn AudioSink>,
}

// ── Engine ───────────────────────────────────────────────────────

/// Non-zero result of [`StreamEngine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("engine start failed with code {code}")]
pub struct EngineStartError {
    pub code: i32,
}

impl From<EngineStartError> for SessionError {
    fn from(e: EngineStartError) -> Self {
        SessionError::EngineStart { code: e.code }
    }
}

pub trait StreamEngine: Send + Sync {
    /// Run the connection handshake. Blocks until the stream is up or a
    /// stage failed. Video setup happens on the calling thread.
    fn start(
        &self,
        host: &HostInfo,
        config: &StreamConfiguration,
        callbacks: EngineCallbacks,
    ) -> Result<(), EngineStartError>;

    /// Tear the connection down. May block.
    fn stop(&self);

    fn send_input(&self, event: &InputEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_buffer_unit() {
        let data = [0u8, 0, 0, 1, 0x65];
        let unit = DecodeUnit::single(7, &data);
        assert_eq!(unit.full_length, 5);
        assert_eq!(unit.buffers.len(), 1);
        assert_eq!(unit.frame_number, 7);
    }

    #[test]
    fn start_error_maps_to_session_error() {
        let err: SessionError = EngineStartError { code: -1 }.into();
        assert!(matches!(err, SessionError::EngineStart { code: -1 }));
    }
}
