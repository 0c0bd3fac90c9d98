//! # strix-core
//!
//! Core library of the strix game-streaming client.
//!
//! This crate contains:
//! - **Control plane**: `ControlPlaneClient` for the host's HTTP(S)/XML API
//!   (server info, launch, resume, quit, app list, box art)
//! - **Session**: `Session` state machine, process-wide `SessionLease`,
//!   deferred teardown, launch validation
//! - **Video**: `DecoderNegotiator` with the `RendererBackend` family and the
//!   latest-wins `FramePipeline`
//! - **Audio**: `AudioPipeline` with periodic renderer recovery
//! - **Error**: `StrixError`, a typed, `thiserror`-based error hierarchy
//!
//! The streaming engine, codec library, audio device and window system
//! are external; each is reached through a trait so platforms (and tests)
//! plug in their own.

pub mod audio;
pub mod control;
pub mod error;
pub mod stream;
pub mod util;
pub mod video;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use audio::{AudioBackend, AudioDecoder, AudioInitStatus, AudioPipeline, AudioRenderer, OpusConfig};
pub use control::{
    AppDescriptor, ControlPlaneClient, DisplayMode, RequestLogLevel, ServerDescriptor, Transport,
    VersionQuad,
};
pub use error::{
    AudioError, ControlPlaneError, DecoderInitError, NOT_SESSION_OWNER, SessionError, StrixError,
    TransportError,
};
pub use stream::{
    Session, SessionComponents, SessionManager, SessionObserver, SessionState, StreamConfiguration,
    StreamEngine, StreamingPreferences, WindowSystem,
};
pub use video::{
    BackendRegistry, CodecLibrary, DecoderNegotiator, FramePipeline, RendererBackend,
    RendererCapabilityRecord, VideoFormat,
};
