//! Session lifecycle.
//!
//! - [`session`] - the controller that drives a session end to end
//! - [`state`] - its validated state machine
//! - [`validate`] - pre-launch capability downgrades
//! - [`lease`] / [`teardown`] - single-session exclusivity and deferred cleanup
//! - [`engine`] - the external streaming engine and its callback interfaces
//! - [`config`] / [`preferences`] - what the user asked for and what is negotiated
//! - [`event`] - the session thread's event queue

pub mod config;
pub mod engine;
pub mod event;
pub mod lease;
pub mod preferences;
pub mod session;
pub mod state;
pub mod teardown;
pub mod validate;

pub use config::{AudioConfiguration, RemoteInputKey, StreamConfiguration};
pub use engine::{
    AudioSink, DecodeStatus, DecodeUnit, EngineCallbacks, EngineStartError, FrameSink, HostInfo,
    StageObserver, StreamEngine, VideoCapabilities,
};
pub use event::{EventReceiver, EventSender, InputEvent, KeyAction, MouseButton, SessionEvent};
pub use lease::{LeasePermit, SessionLease};
pub use preferences::{AudioPreference, DecoderSelection, StreamingPreferences, VideoCodecPreference};
pub use session::{
    LogObserver, Session, SessionComponents, SessionManager, SessionObserver, SessionOutcome,
    TerminationReason, WindowRequest, WindowSystem,
};
pub use state::SessionState;
pub use teardown::{CleanupHandle, TeardownWorker};
pub use validate::{HardwareProbe, LaunchWarning, validate_launch};
