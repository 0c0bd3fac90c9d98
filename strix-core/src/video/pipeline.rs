//! Latest-wins frame hand-off between the engine's decode thread and the
//! session thread.
//!
//! ```text
//!  engine decode thread                        session thread
//!  ────────────────────                        ──────────────
//!  submit_decode_unit ─► decoder ─► FrameSlot ─► render_latest ─► backend
//!                                      │
//!                                      └─ FrameReady (only when the slot
//!                                         was empty)
//! ```
//!
//! The slot holds one frame. A newer frame replaces an unconsumed older one,
//! which is released without being drawn.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::DecoderInitError;
use crate::stream::engine::{DecodeStatus, DecodeUnit, FrameSink, VideoCapabilities};
use crate::stream::event::{EventSender, SessionEvent};
use crate::stream::preferences::DecoderSelection;
use crate::video::backend::{DisplaySurface, OverlayKind, RendererBackend};
use crate::video::codec::{Frame, VideoFormat};
use crate::video::decoder::VideoDecoder;
use crate::video::negotiator::{DecoderNegotiator, NegotiationRequest};
use crate::video::renderers::software::slice_count;

// ── FrameSlot ────────────────────────────────────────────────────

/// Single pending frame.
#[derive(Default)]
pub struct FrameSlot {
    pending: Mutex<Option<Frame>>,
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame`, releasing any older occupant. Returns true if the
    /// slot was empty, i.e. the consumer needs a notification.
    pub fn publish(&self, frame: Frame) -> bool {
        let mut pending = self.pending.lock();
        match pending.as_ref() {
            None => {
                *pending = Some(frame);
                true
            }
            Some(current) if frame.frame_number < current.frame_number => {
                // Never step backwards.
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Some(_) => {
                *pending = Some(frame);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn take(&self) -> Option<Frame> {
        self.pending.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_none()
    }

    /// Frames released without being rendered.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ── FramePipeline ────────────────────────────────────────────────

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub submitted: u64,
    pub decoded: u64,
    pub rendered: u64,
    pub dropped: u64,
    pub need_keyframe: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    decoded: AtomicU64,
    rendered: AtomicU64,
    need_keyframe: AtomicU64,
}

pub struct FramePipeline {
    negotiator: Arc<DecoderNegotiator>,
    surface: Arc<dyn DisplaySurface>,
    selection: DecoderSelection,
    fullscreen: bool,
    /// `None` before setup and after shutdown.
    decoder: Mutex<Option<VideoDecoder>>,
    renderer: Mutex<Option<Box<dyn RendererBackend>>>,
    hardware: AtomicBool,
    slot: FrameSlot,
    events: EventSender,
    counters: Counters,
}

impl FramePipeline {
    pub fn new(
        negotiator: Arc<DecoderNegotiator>,
        surface: Arc<dyn DisplaySurface>,
        selection: DecoderSelection,
        fullscreen: bool,
        events: EventSender,
    ) -> Self {
        Self {
            negotiator,
            surface,
            selection,
            fullscreen,
            decoder: Mutex::new(None),
            renderer: Mutex::new(None),
            hardware: AtomicBool::new(false),
            slot: FrameSlot::new(),
            events,
            counters: Counters::default(),
        }
    }

    /// Draw the most recent decoded frame, if any. Session thread only.
    pub fn render_latest(&self) -> bool {
        let Some(frame) = self.slot.take() else {
            return false;
        };
        let mut renderer = self.renderer.lock();
        match renderer.as_mut() {
            Some(backend) => {
                backend.render_frame(frame);
                self.counters.rendered.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn notify_overlay(&self, kind: OverlayKind) {
        if let Some(backend) = self.renderer.lock().as_mut() {
            backend.notify_overlay_updated(kind);
        }
    }

    /// Destroy the decoder and renderer. Must run on the thread that ran
    /// [`FrameSink::setup`]. Later submissions become no-ops.
    pub fn shutdown(&self) {
        let decoder = self.decoder.lock().take();
        drop(decoder);
        let renderer = self.renderer.lock().take();
        if let Some(backend) = &renderer {
            debug!(backend = backend.name(), "destroying renderer");
        }
        drop(renderer);
        drop(self.slot.take());
    }

    pub fn is_active(&self) -> bool {
        self.decoder.lock().is_some()
    }

    pub fn is_hardware_accelerated(&self) -> bool {
        self.hardware.load(Ordering::Relaxed)
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.renderer.lock().as_ref().map(|b| b.name())
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            decoded: self.counters.decoded.load(Ordering::Relaxed),
            rendered: self.counters.rendered.load(Ordering::Relaxed),
            dropped: self.slot.dropped(),
            need_keyframe: self.counters.need_keyframe.load(Ordering::Relaxed),
        }
    }
}

impl FrameSink for FramePipeline {
    fn setup(&self, format: VideoFormat, width: u32, height: u32, fps: u32) -> Result<(), DecoderInitError> {
        let request = NegotiationRequest {
            format,
            width,
            height,
            fps,
            selection: self.selection,
            fullscreen: self.fullscreen,
            surface: Arc::clone(&self.surface),
        };
        let negotiated = self.negotiator.negotiate(&request)?;
        let hardware = negotiated.is_hardware_accelerated();
        info!(
            backend = negotiated.backend.name(),
            hardware,
            %format,
            "video pipeline ready"
        );

        self.hardware.store(hardware, Ordering::Relaxed);
        *self.renderer.lock() = Some(negotiated.backend);
        *self.decoder.lock() = Some(negotiated.decoder);
        Ok(())
    }

    fn submit_decode_unit(&self, unit: &DecodeUnit<'_>) -> DecodeStatus {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let frame = {
            let mut guard = self.decoder.lock();
            let Some(decoder) = guard.as_mut() else {
                // Torn down underneath us.
                return DecodeStatus::Ok;
            };
            match decoder.decode(unit) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(frame = unit.frame_number, error = %e, "decode failed; requesting IDR");
                    self.counters.need_keyframe.fetch_add(1, Ordering::Relaxed);
                    return DecodeStatus::NeedKeyframe;
                }
            }
        };

        if let Some(frame) = frame {
            self.counters.decoded.fetch_add(1, Ordering::Relaxed);
            if self.slot.publish(frame) && self.events.send(SessionEvent::FrameReady).is_err() {
                debug!("event pump gone; frame will not be drawn");
            }
        }
        DecodeStatus::Ok
    }

    fn cleanup(&self) {
        debug!(stats = ?self.stats(), "video stream ended");
    }

    fn capabilities(&self) -> VideoCapabilities {
        VideoCapabilities {
            direct_submit: true,
            slices_per_frame: slice_count(),
        }
    }
}
