//! Domain-specific error types for the streaming client.
//!
//! Every layer below the session controller returns one of these typed
//! errors. Only [`crate::stream::session`] turns them into user-visible
//! text.

use std::time::Duration;
use thiserror::Error;

use crate::stream::state::SessionState;
use crate::video::codec::VideoFormat;

/// Status code reported when the host claims a successful quit but the
/// app is still running (someone else's session).
pub const NOT_SESSION_OWNER: i32 = 599;

/// The canonical umbrella error.
#[derive(Debug, Error)]
pub enum StrixError {
    /// The host rejected a control-plane request.
    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),

    /// The request never produced a usable reply.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No renderer backend could be brought up.
    #[error(transparent)]
    DecoderInit(#[from] DecoderInitError),

    /// Session establishment or teardown failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Audio decode or playback failed.
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl StrixError {
    /// The host status code, if this is a control-plane rejection.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            Self::ControlPlane(e) => Some(e.status_code),
            _ => None,
        }
    }
}

// ── ControlPlaneError ────────────────────────────────────────────

/// The host answered, but the reply envelope carried a non-200 status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host returned status {status_code}: {message}")]
pub struct ControlPlaneError {
    pub status_code: i32,
    pub message: String,
}

impl ControlPlaneError {
    pub fn new(status_code: i32, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// The synthetic error raised when a quit request was acknowledged
    /// but the app kept running.
    pub fn not_session_owner() -> Self {
        Self::new(NOT_SESSION_OWNER, "")
    }

    pub fn is_not_session_owner(&self) -> bool {
        self.status_code == NOT_SESSION_OWNER
    }

    /// Certificate/authorization failure on the secure endpoint.
    pub fn is_unauthorized(&self) -> bool {
        self.status_code == 401
    }
}

// ── TransportError ───────────────────────────────────────────────

/// Timeout or connection failure. Never retried inside the client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{command} request timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("{command} request failed: {reason}")]
    Connection { command: String, reason: String },

    /// The body was not a well-formed reply envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

// ── DecoderInitError ─────────────────────────────────────────────

/// A renderer backend (or the whole negotiation) failed to initialise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderInitError {
    /// The codec library has no decoder for this format at all.
    #[error("no decoder available for {0}")]
    NoDecoder(VideoFormat),

    #[error("{backend} does not support this stream: {reason}")]
    Unsupported { backend: &'static str, reason: String },

    #[error("{backend} is blacklisted for {format}")]
    Blacklisted {
        backend: &'static str,
        format: VideoFormat,
    },

    #[error("{backend} failed to decode the test frame")]
    TestFrameFailed { backend: &'static str },

    #[error("{backend} device creation failed: {reason}")]
    Device { backend: &'static str, reason: String },

    #[error("{backend} could not open the decoder: {reason}")]
    CodecOpen { backend: &'static str, reason: String },

    /// Hardware decoding was forced but no hardware backend worked.
    #[error("hardware decoding required but unavailable")]
    HardwareRequired,

    /// Every candidate, software included, failed.
    #[error("no renderer could be initialised for {0}")]
    Exhausted(VideoFormat),
}

// ── SessionError ─────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    /// Validation or control-plane failure before the engine started.
    #[error("session aborted: {0}")]
    Abort(String),

    /// The streaming engine refused to start.
    #[error("streaming engine failed to start (error {code})")]
    EngineStart { code: i32 },

    /// The connection died after establishment.
    #[error("stream terminated (error {code})")]
    StreamTerminated { code: i64 },

    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

// ── AudioError ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("audio decoder failed: {0}")]
    Decoder(String),

    #[error("audio renderer failed: {0}")]
    Renderer(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for StrixError {
    fn from(s: String) -> Self {
        StrixError::Other(s)
    }
}

impl From<&str> for StrixError {
    fn from(s: &str) -> Self {
        StrixError::Other(s.to_string())
    }
}

impl From<roxmltree::Error> for TransportError {
    fn from(e: roxmltree::Error) -> Self {
        TransportError::MalformedResponse(e.to_string())
    }
}
