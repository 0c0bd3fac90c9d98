//! Session controller.
//!
//! Drives one streaming session from validation to teardown on the calling
//! thread:
//!
//! ```text
//!  validate ─► lease ─► launch/resume ─► window ─► engine.start ─► event pump
//!                                                                     │
//!   lease released ◄── engine.stop + window destroyed ◄── decoder destroyed
//!   (teardown worker)                                     (session thread)
//! ```
//!
//! This is the only module that turns typed errors into user-visible text.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioBackend, AudioPipeline, detect_audio_configuration};
use crate::control::client::ControlPlaneClient;
use crate::control::server_info::{AppDescriptor, ServerDescriptor};
use crate::error::SessionError;
use crate::stream::config::{AudioConfiguration, StreamConfiguration};
use crate::stream::engine::{EngineCallbacks, HostInfo, StageObserver, StreamEngine};
use crate::stream::event::{self, EventReceiver, EventSender, SessionEvent};
use crate::stream::lease::{LeasePermit, SessionLease};
use crate::stream::preferences::{AudioPreference, StreamingPreferences, VideoCodecPreference};
use crate::stream::state::SessionState;
use crate::stream::teardown::{CleanupHandle, TeardownWorker};
use crate::stream::validate::{HardwareProbe, LaunchWarning, validate_launch};
use crate::util::priority::raise_current_thread_priority;
use crate::video::backend::DisplaySurface;
use crate::video::codec::{CodecLibrary, VideoFormat};
use crate::video::negotiator::DecoderNegotiator;
use crate::video::pipeline::{FramePipeline, PipelineStats};
use crate::video::registry::BackendRegistry;

pub const WINDOW_TITLE: &str = "Strix";

// ── Observer ─────────────────────────────────────────────────────

/// User-visible session notifications.
pub trait SessionObserver: Send + Sync {
    fn state_changed(&self, _state: SessionState) {}
    fn stage_starting(&self, _stage: &str) {}
    fn stage_failed(&self, _stage: &str, _error_code: i64) {}
    fn connection_started(&self) {}
    fn launch_warning(&self, _warning: &LaunchWarning) {}
    fn launch_error(&self, _message: &str) {}
    fn stream_error(&self, _message: &str) {}
}

/// Reports everything through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn state_changed(&self, state: SessionState) {
        debug!(%state, "session state");
    }

    fn stage_starting(&self, stage: &str) {
        info!("Starting {stage}...");
    }

    fn connection_started(&self) {
        info!("connection established");
    }

    fn launch_warning(&self, warning: &LaunchWarning) {
        warn!("{warning}");
    }

    fn launch_error(&self, message: &str) {
        error!("{message}");
    }

    fn stream_error(&self, message: &str) {
        error!("{message}");
    }
}

// ── Windowing ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub maximized: bool,
}

/// The platform window system.
pub trait WindowSystem: Send + Sync {
    /// Size of the current display mode, if known.
    fn current_display_size(&self) -> Option<(u32, u32)>;

    /// Closest fullscreen mode to the requested one.
    fn closest_display_mode(&self, width: u32, height: u32, fps: u32) -> Option<(u32, u32)>;

    /// Create a hidden window. Input and quit events go to `events`.
    fn create_window(
        &self,
        request: &WindowRequest,
        events: EventSender,
    ) -> Result<Arc<dyn DisplaySurface>, String>;

    /// Controllers currently plugged in.
    fn attached_gamepads(&self) -> u8 {
        0
    }
}

/// Decide the streaming window's geometry.
pub fn window_request(config: &StreamConfiguration, fullscreen: bool, windows: &dyn WindowSystem) -> WindowRequest {
    let stream = (config.width, config.height);
    let (width, height, maximized) = if fullscreen {
        let (w, h) = windows
            .closest_display_mode(config.width, config.height, config.fps)
            .or_else(|| {
                warn!("no closest display mode; using current mode");
                windows.current_display_size()
            })
            .unwrap_or(stream);
        (w, h, false)
    } else {
        // Fill the screen if the stream is at least as large as the display.
        let maximized = windows
            .current_display_size()
            .is_some_and(|(w, h)| w <= config.width || h <= config.height);
        (config.width, config.height, maximized)
    };

    WindowRequest {
        title: WINDOW_TITLE.to_string(),
        width,
        height,
        fullscreen,
        maximized,
    }
}

/// `remoteControllersBitmap` for the launch request. Player one is always
/// present so the host creates at least one virtual controller.
pub fn gamepad_mask(attached: u8, multi_controller: bool) -> u16 {
    if !multi_controller {
        return 0x1;
    }
    let count = attached.clamp(1, 4);
    (1u16 << count) - 1
}

// ── Manager ──────────────────────────────────────────────────────

/// Owns the lease and the teardown worker shared by every session of the
/// process.
#[derive(Debug, Clone)]
pub struct SessionManager {
    lease: SessionLease,
    worker: TeardownWorker,
    handle: Handle,
}

impl SessionManager {
    pub fn new(handle: Handle) -> Self {
        Self {
            lease: SessionLease::new(),
            worker: TeardownWorker::new(handle.clone()),
            handle,
        }
    }

    pub fn lease(&self) -> &SessionLease {
        &self.lease
    }

    /// No session holds the lease.
    pub fn is_idle(&self) -> bool {
        self.lease.is_available()
    }
}

/// Platform collaborators a session runs against.
#[derive(Clone)]
pub struct SessionComponents {
    pub control: Arc<ControlPlaneClient>,
    pub engine: Arc<dyn StreamEngine>,
    pub codec: Arc<dyn CodecLibrary>,
    pub registry: Arc<BackendRegistry>,
    pub audio: Arc<dyn AudioBackend>,
    pub windows: Arc<dyn WindowSystem>,
    pub observer: Arc<dyn SessionObserver>,
}

// ── Engine relay ─────────────────────────────────────────────────

/// Turns engine connection callbacks into observer calls and pump events.
struct StageRelay {
    observer: Arc<dyn SessionObserver>,
    events: EventSender,
}

impl StageObserver for StageRelay {
    fn stage_starting(&self, stage: &str) {
        self.observer.stage_starting(stage);
    }

    fn stage_failed(&self, stage: &str, error_code: i64) {
        error!(stage, error_code, "connection stage failed");
        self.observer.stage_failed(stage, error_code);
        self.observer
            .launch_error(&format!("Starting {stage} failed: Error {error_code}"));
    }

    fn connection_terminated(&self, error_code: i64) {
        if self.events.send(SessionEvent::ConnectionTerminated(error_code)).is_err() {
            debug!(error_code, "connection terminated after the event pump exited");
        }
    }
}

// ── Session ──────────────────────────────────────────────────────

/// Why the event pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    UserQuit,
    ConnectionTerminated(i64),
    /// Every event sender was dropped.
    EventQueueClosed,
}

/// Result of a session that reached the event pump.
#[derive(Debug)]
pub struct SessionOutcome {
    pub reason: TerminationReason,
    pub stats: PipelineStats,
    /// Completes when the lease has been released.
    pub cleanup: CleanupHandle,
}

pub struct Session {
    manager: SessionManager,
    components: SessionComponents,
    negotiator: Arc<DecoderNegotiator>,
    server: ServerDescriptor,
    app: AppDescriptor,
    preferences: StreamingPreferences,
    config: StreamConfiguration,
    state: SessionState,
}

impl Session {
    /// Prepare a session for `app` on `server`. Generates the session's
    /// input key and resolves the automatic codec and audio choices.
    pub fn new(
        manager: SessionManager,
        components: SessionComponents,
        server: ServerDescriptor,
        app: AppDescriptor,
        preferences: StreamingPreferences,
    ) -> Self {
        let negotiator = Arc::new(DecoderNegotiator::new(
            Arc::clone(&components.codec),
            Arc::clone(&components.registry),
        ));

        let audio = match preferences.audio {
            AudioPreference::Auto => detect_audio_configuration(&*components.audio),
            AudioPreference::Stereo => AudioConfiguration::Stereo,
            AudioPreference::Surround51 => AudioConfiguration::Surround51,
        };

        let hevc_hardware = preferences.video_codec == VideoCodecPreference::Auto
            && negotiator.hardware_decode_available(
                VideoFormat::H265,
                preferences.width,
                preferences.height,
                preferences.fps,
            );

        let config = StreamConfiguration::from_preferences(&preferences, &server, hevc_hardware, audio);

        Self {
            manager,
            components,
            negotiator,
            server,
            app,
            preferences,
            config,
            state: SessionState::Idle,
        }
    }

    pub fn config(&self) -> &StreamConfiguration {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        self.state.advance(next)?;
        debug!(state = %next, "session transition");
        self.components.observer.state_changed(next);
        Ok(())
    }

    /// Abort before the engine streams: release everything synchronously.
    fn abort(&mut self, permit: Option<LeasePermit>, message: String) -> SessionError {
        self.components.observer.launch_error(&message);
        drop(permit);
        if let Err(e) = self.transition(SessionState::Cleaned) {
            warn!(error = %e, "abort from unexpected state");
        }
        SessionError::Abort(message)
    }

    /// Run the session to completion on the calling thread.
    ///
    /// Returns once the event pump stops. Engine shutdown continues in the
    /// background; the returned [`CleanupHandle`] resolves when the lease is
    /// free again. Must not be called from inside the tokio runtime.
    pub fn exec(mut self) -> Result<SessionOutcome, SessionError> {
        self.transition(SessionState::Validating)?;
        let warnings = validate_launch(
            &mut self.config,
            &self.preferences,
            &self.server,
            &self.app,
            &*self.negotiator,
        );
        for warning in &warnings {
            self.components.observer.launch_warning(warning);
        }

        self.transition(SessionState::AwaitingSlot)?;
        let permit = self.manager.lease.acquire_blocking(&self.manager.handle)?;

        self.transition(SessionState::ControlPlaneLaunching)?;
        let current_game = self.server.current_game;
        if current_game != 0 && current_game != self.app.id {
            let message = format!(
                "{} is already running another app; quit it before starting {}",
                self.server.hostname, self.app.name
            );
            return Err(self.abort(Some(permit), message));
        }

        let launched = if current_game != 0 {
            self.components.control.resume_app(&self.config)
        } else {
            let mask = gamepad_mask(
                self.components.windows.attached_gamepads(),
                self.preferences.multi_controller,
            );
            self.components.control.launch_app(
                self.app.id,
                &self.config,
                self.preferences.game_optimizations,
                self.preferences.play_audio_on_host,
                mask,
            )
        };
        if let Err(e) = launched {
            return Err(self.abort(Some(permit), e.to_string()));
        }

        self.transition(SessionState::EngineStarting)?;
        let (events_tx, events_rx) = event::channel();

        let request = window_request(&self.config, self.preferences.fullscreen, &*self.components.windows);
        let surface = match self.components.windows.create_window(&request, events_tx.clone()) {
            Ok(surface) => surface,
            Err(e) => {
                error!(error = %e, "window creation failed");
                return Err(self.abort(Some(permit), format!("Failed to create window: {e}")));
            }
        };

        let video = Arc::new(FramePipeline::new(
            Arc::clone(&self.negotiator),
            Arc::clone(&surface),
            self.preferences.decoder,
            self.preferences.fullscreen,
            events_tx.clone(),
        ));
        let audio = Arc::new(AudioPipeline::new(Arc::clone(&self.components.audio)));
        let callbacks = EngineCallbacks {
            stage: Arc::new(StageRelay {
                observer: Arc::clone(&self.components.observer),
                events: events_tx,
            }),
            video: video.clone(),
            audio,
        };

        let host = HostInfo {
            address: self.server.address.clone(),
            app_version: self.server.app_version_text.clone(),
            gfe_version: self.server.gfe_version_text.clone(),
        };

        if let Err(e) = self.components.engine.start(&host, &self.config, callbacks) {
            // The stage-failure callback already reported the cause.
            error!(code = e.code, "streaming engine failed to start");
            video.shutdown();
            drop(surface);
            drop(permit);
            self.transition(SessionState::Cleaned)?;
            return Err(e.into());
        }

        self.transition(SessionState::Active)?;
        self.components.observer.connection_started();
        surface.show();
        if let Err(e) = raise_current_thread_priority() {
            warn!(error = %e, "unable to raise session thread priority");
        }

        let reason = self.pump(&events_rx, &video);

        self.transition(SessionState::Terminating)?;
        surface.hide();
        // Decoder and renderer belong to this thread.
        video.shutdown();
        let stats = video.stats();
        info!(?reason, ?stats, "session ended");

        let engine = Arc::clone(&self.components.engine);
        let observer = Arc::clone(&self.components.observer);
        let cleanup = self.manager.worker.dispatch(Some(permit), move || {
            engine.stop();
            drop(surface);
            observer.state_changed(SessionState::Cleaned);
        });

        Ok(SessionOutcome {
            reason,
            stats,
            cleanup,
        })
    }

    fn pump(&self, events: &EventReceiver, video: &FramePipeline) -> TerminationReason {
        loop {
            let event = match events.recv() {
                Ok(event) => event,
                Err(_) => {
                    error!("session event queue closed");
                    return TerminationReason::EventQueueClosed;
                }
            };

            match event {
                SessionEvent::Quit => {
                    info!("quit event received");
                    return TerminationReason::UserQuit;
                }
                // The slot only ever holds the newest frame.
                SessionEvent::FrameReady => {
                    video.render_latest();
                }
                SessionEvent::Input(input) => self.components.engine.send_input(&input),
                SessionEvent::Overlay(kind) => video.notify_overlay(kind),
                SessionEvent::ConnectionTerminated(code) => {
                    let err = SessionError::StreamTerminated { code };
                    self.components.observer.stream_error(&err.to_string());
                    return TerminationReason::ConnectionTerminated(code);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::config::RemoteInputKey;

    struct Display {
        current: Option<(u32, u32)>,
        closest: Option<(u32, u32)>,
    }

    impl WindowSystem for Display {
        fn current_display_size(&self) -> Option<(u32, u32)> {
            self.current
        }

        fn closest_display_mode(&self, _w: u32, _h: u32, _fps: u32) -> Option<(u32, u32)> {
            self.closest
        }

        fn create_window(
            &self,
            _request: &WindowRequest,
            _events: EventSender,
        ) -> Result<Arc<dyn DisplaySurface>, String> {
            Err("headless".into())
        }
    }

    fn config(width: u32, height: u32) -> StreamConfiguration {
        StreamConfiguration {
            width,
            height,
            fps: 60,
            bitrate_kbps: 20_000,
            packet_size: 1392,
            streaming_remotely: false,
            audio: AudioConfiguration::Stereo,
            supports_hevc: false,
            enable_hdr: false,
            hevc_bitrate_percentage_multiplier: 75,
            remote_input: RemoteInputKey::generate(),
        }
    }

    #[test]
    fn windowed_maximises_on_small_display() {
        let display = Display {
            current: Some((1920, 1080)),
            closest: None,
        };
        assert!(window_request(&config(1920, 1080), false, &display).maximized);
        assert!(!window_request(&config(1280, 720), false, &display).maximized);
    }

    #[test]
    fn fullscreen_uses_closest_mode() {
        let display = Display {
            current: Some((2560, 1440)),
            closest: Some((1920, 1200)),
        };
        let req = window_request(&config(1920, 1080), true, &display);
        assert_eq!((req.width, req.height), (1920, 1200));
        assert!(req.fullscreen);

        let display = Display {
            current: None,
            closest: None,
        };
        let req = window_request(&config(1280, 720), true, &display);
        assert_eq!((req.width, req.height), (1280, 720));
    }

    #[test]
    fn gamepad_masks() {
        assert_eq!(gamepad_mask(3, false), 0x1);
        assert_eq!(gamepad_mask(0, true), 0x1);
        assert_eq!(gamepad_mask(2, true), 0x3);
        assert_eq!(gamepad_mask(9, true), 0xF);
    }
}
