//! In-process stand-ins for the platform pieces a session talks to.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use strix_core::audio::{AudioBackend, AudioDecoder, AudioRenderer, OpusConfig};
use strix_core::control::{HttpReply, Transport, Url};
use strix_core::stream::{
    EngineCallbacks, EngineStartError, EventSender, HostInfo, InputEvent, SessionEvent, SessionObserver,
    SessionState, StreamConfiguration, StreamEngine, WindowRequest, WindowSystem,
};
use strix_core::video::{
    CodecContext, CodecLibrary, DecoderContextParams, DisplaySurface, Frame, FrameData, HwConfig, HwDevice,
    HwDeviceType, VideoFormat, VideoFormats, WindowSystemKind,
};
use strix_core::{AudioError, ControlPlaneClient, DecoderInitError, TransportError};
use strix_core::stream::{DecodeUnit, LaunchWarning};

// ── Codec ────────────────────────────────────────────────────────

/// Turns every packet into a CPU frame. Packets starting with `bad` fail.
#[derive(Default)]
pub struct EchoContext {
    pending: VecDeque<Frame>,
}

impl CodecContext for EchoContext {
    fn send_packet(&mut self, data: &[u8]) -> Result<(), String> {
        if data.starts_with(b"bad") {
            return Err("corrupt access unit".into());
        }
        self.pending.push_back(Frame {
            frame_number: 0,
            width: 1920,
            height: 1080,
            data: FrameData::Cpu(Bytes::copy_from_slice(data)),
        });
        Ok(())
    }

    fn receive_frame(&mut self) -> Option<Frame> {
        self.pending.pop_front()
    }
}

#[derive(Default)]
pub struct FakeCodec {
    pub hw_configs: Vec<HwConfig>,
}

impl FakeCodec {
    pub fn software_only() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_devices(types: &[HwDeviceType]) -> Arc<Self> {
        Arc::new(Self {
            hw_configs: types.iter().copied().map(HwConfig::device_ctx).collect(),
        })
    }
}

impl CodecLibrary for FakeCodec {
    fn has_decoder(&self, _format: VideoFormat) -> bool {
        true
    }

    fn hw_configs(&self, _format: VideoFormat) -> Vec<HwConfig> {
        self.hw_configs.clone()
    }

    fn create_hw_device(&self, device_type: HwDeviceType) -> Result<HwDevice, DecoderInitError> {
        Ok(HwDevice::new(device_type, VideoFormats::all()))
    }

    fn open_decoder(
        &self,
        _format: VideoFormat,
        _params: &DecoderContextParams,
    ) -> Result<Box<dyn CodecContext>, DecoderInitError> {
        Ok(Box::new(EchoContext::default()))
    }

    fn test_frame(&self, _format: VideoFormat) -> Option<Bytes> {
        Some(Bytes::from_static(b"idr"))
    }
}

// ── Display ──────────────────────────────────────────────────────

/// Records presented frame numbers.
#[derive(Default)]
pub struct RecordingSurface {
    pub presented: Mutex<Vec<u64>>,
    pub visible: Mutex<bool>,
}

impl DisplaySurface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (1920, 1080)
    }

    fn show(&self) {
        *self.visible.lock() = true;
    }

    fn hide(&self) {
        *self.visible.lock() = false;
    }

    fn present(&self, frame: &Frame) -> Result<(), String> {
        self.presented.lock().push(frame.frame_number);
        Ok(())
    }

    fn window_system(&self) -> WindowSystemKind {
        WindowSystemKind::Headless
    }
}

#[derive(Default)]
pub struct FakeWindows {
    pub surface: Arc<RecordingSurface>,
    pub events: Mutex<Option<EventSender>>,
    pub requests: Mutex<Vec<WindowRequest>>,
    pub gamepads: u8,
    pub fail: bool,
}

impl FakeWindows {
    /// Push an event as if the window produced it.
    pub fn send(&self, event: SessionEvent) {
        if let Some(tx) = self.events.lock().as_ref() {
            let _ = tx.send(event);
        }
    }
}

impl WindowSystem for FakeWindows {
    fn current_display_size(&self) -> Option<(u32, u32)> {
        Some((2560, 1440))
    }

    fn closest_display_mode(&self, width: u32, height: u32, _fps: u32) -> Option<(u32, u32)> {
        Some((width, height))
    }

    fn create_window(
        &self,
        request: &WindowRequest,
        events: EventSender,
    ) -> Result<Arc<dyn DisplaySurface>, String> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err("no display".into());
        }
        *self.events.lock() = Some(events);
        Ok(self.surface.clone())
    }

    fn attached_gamepads(&self) -> u8 {
        self.gamepads
    }
}

// ── Engine ───────────────────────────────────────────────────────

/// How the fake engine ends the stream once frames are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    UserQuit,
    Terminate(i64),
}

pub struct FakeEngine {
    pub windows: Arc<FakeWindows>,
    pub frames: u64,
    pub audio_samples: usize,
    pub ending: Ending,
    pub start_error: Option<i32>,
    /// How long `stop` blocks before counting itself done.
    pub stop_delay: Duration,
    pub starts: AtomicUsize,
    /// Completed stops observed by each `start`.
    pub stops_seen_at_start: Mutex<Vec<usize>>,
    pub stops: AtomicUsize,
    pub inputs: Mutex<Vec<InputEvent>>,
    pub host: Mutex<Option<HostInfo>>,
    pub config: Mutex<Option<StreamConfiguration>>,
}

impl FakeEngine {
    pub fn new(windows: Arc<FakeWindows>, frames: u64, ending: Ending) -> Arc<Self> {
        Arc::new(Self {
            windows,
            frames,
            audio_samples: 0,
            ending,
            start_error: None,
            stop_delay: Duration::ZERO,
            starts: AtomicUsize::new(0),
            stops_seen_at_start: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
            host: Mutex::new(None),
            config: Mutex::new(None),
        })
    }
}

impl StreamEngine for FakeEngine {
    fn start(
        &self,
        host: &HostInfo,
        config: &StreamConfiguration,
        callbacks: EngineCallbacks,
    ) -> Result<(), EngineStartError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.stops_seen_at_start.lock().push(self.stops.load(Ordering::SeqCst));
        *self.host.lock() = Some(host.clone());
        *self.config.lock() = Some(config.clone());

        if let Some(code) = self.start_error {
            callbacks.stage.stage_starting("RTSP handshake");
            callbacks.stage.stage_failed("RTSP handshake", i64::from(code));
            return Err(EngineStartError { code });
        }

        callbacks.stage.stage_starting("video stream");
        callbacks
            .video
            .setup(config.video_format(), config.width, config.height, config.fps)
            .map_err(|_| EngineStartError { code: -1 })?;
        callbacks.audio.init(&OpusConfig::for_configuration(config.audio));

        for n in 1..=self.frames {
            let payload = format!("frame-{n}");
            callbacks.video.submit_decode_unit(&DecodeUnit::single(n, payload.as_bytes()));
        }
        for _ in 0..self.audio_samples {
            callbacks.audio.decode_and_play(b"opus");
        }

        self.windows.send(SessionEvent::Input(InputEvent::Scroll { amount: 120 }));
        match self.ending {
            Ending::UserQuit => self.windows.send(SessionEvent::Quit),
            Ending::Terminate(code) => callbacks.stage.connection_terminated(code),
        }
        Ok(())
    }

    fn stop(&self) {
        std::thread::sleep(self.stop_delay);
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn send_input(&self, event: &InputEvent) {
        self.inputs.lock().push(*event);
    }
}

// ── Audio ────────────────────────────────────────────────────────

pub struct SilentDecoder;

impl AudioDecoder for SilentDecoder {
    fn decode(&mut self, _packet: &[u8]) -> Result<Vec<i16>, AudioError> {
        Ok(vec![0; 480])
    }
}

/// Renderer whose submissions fail once `fail_after` samples went through.
pub struct FlakyRenderer {
    submitted: usize,
    fail_after: Option<usize>,
}

impl AudioRenderer for FlakyRenderer {
    fn prepare_for_playback(&mut self, _config: &OpusConfig) -> Result<(), AudioError> {
        Ok(())
    }

    fn submit_audio(&mut self, _pcm: &[i16]) -> Result<(), AudioError> {
        if self.fail_after.is_some_and(|limit| self.submitted >= limit) {
            return Err(AudioError::Renderer("device lost".into()));
        }
        self.submitted += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAudio {
    /// First renderer fails after this many samples; later ones never do.
    pub fail_first_after: Option<usize>,
    pub renderers_created: AtomicUsize,
}

impl AudioBackend for FakeAudio {
    fn create_decoder(&self, _config: &OpusConfig) -> Result<Box<dyn AudioDecoder>, AudioError> {
        Ok(Box::new(SilentDecoder))
    }

    fn create_renderer(&self) -> Box<dyn AudioRenderer> {
        let index = self.renderers_created.fetch_add(1, Ordering::SeqCst);
        Box::new(FlakyRenderer {
            submitted: 0,
            fail_after: if index == 0 { self.fail_first_after } else { None },
        })
    }
}

// ── Control plane ────────────────────────────────────────────────

pub const OK_REPLY: &str = r#"<root status_code="200"/>"#;

/// Replies in order and records each request URL.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<String>>,
    pub urls: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn with_replies(bodies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(bodies.iter().map(|b| b.to_string()).collect()),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn paths(&self) -> Vec<String> {
        self.urls.lock().iter().map(|u| u.path().to_string()).collect()
    }

    pub fn query(&self, index: usize, key: &str) -> Option<String> {
        self.urls.lock()[index]
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &Url, _timeout: Option<Duration>) -> Result<HttpReply, TransportError> {
        self.urls.lock().push(url.clone());
        self.replies
            .lock()
            .pop_front()
            .map(HttpReply::ok)
            .ok_or_else(|| TransportError::Connection {
                command: url.path().to_string(),
                reason: "connection refused".into(),
            })
    }
}

pub fn control_client(transport: Arc<ScriptedTransport>) -> Arc<ControlPlaneClient> {
    Arc::new(ControlPlaneClient::with_transport(
        "10.0.0.2",
        Url::parse("http://10.0.0.2:47989/").unwrap(),
        Url::parse("https://10.0.0.2:47984/").unwrap(),
        "0123456789ABCDEF",
        transport,
    ))
}

// ── Observer ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<SessionState>>,
    pub warnings: Mutex<Vec<LaunchWarning>>,
    pub launch_errors: Mutex<Vec<String>>,
    pub stream_errors: Mutex<Vec<String>>,
    pub started: AtomicUsize,
}

impl SessionObserver for RecordingObserver {
    fn state_changed(&self, state: SessionState) {
        self.states.lock().push(state);
    }

    fn connection_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn launch_warning(&self, warning: &LaunchWarning) {
        self.warnings.lock().push(warning.clone());
    }

    fn launch_error(&self, message: &str) {
        self.launch_errors.lock().push(message.to_string());
    }

    fn stream_error(&self, message: &str) {
        self.stream_errors.lock().push(message.to_string());
    }
}
