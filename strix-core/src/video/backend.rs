//! Renderer backend contract.
//!
//! One backend per acceleration technology. A backend owns its GPU device
//! for the lifetime of a session, configures the decoder context to decode
//! into that device, and presents decoded frames on the display surface.
//!
//! ```text
//!  factory ──► initialize(params) ──► prepare_decoder_context(ctx)
//!                                            │
//!                          render_frame(frame) ◄── frame slot
//! ```

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::DecoderInitError;
use crate::video::codec::{DecoderContextParams, Frame, VideoFormat};

// ── Attributes ───────────────────────────────────────────────────

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RendererAttributes: u32 {
        /// Can only draw in a fullscreen window.
        const FULLSCREEN_ONLY = 0x01;
        /// Cannot go above 1920x1080.
        const MAX_1080P = 0x02;
        /// Can present 10-bit HDR content.
        const HDR_SUPPORT = 0x04;
    }
}

/// Static facts about a backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererCapabilityRecord {
    pub name: &'static str,
    pub attributes: RendererAttributes,
    /// Driver support claims cannot be trusted without decoding a frame.
    pub needs_test_frame: bool,
    /// Uses a hardware device.
    pub hardware: bool,
}

impl RendererCapabilityRecord {
    pub fn supports_hdr(&self) -> bool {
        self.attributes.contains(RendererAttributes::HDR_SUPPORT)
    }

    pub fn fullscreen_only(&self) -> bool {
        self.attributes.contains(RendererAttributes::FULLSCREEN_ONLY)
    }

    /// Largest `(width, height)` the backend can decode, if capped.
    pub fn max_resolution(&self) -> Option<(u32, u32)> {
        self.attributes
            .contains(RendererAttributes::MAX_1080P)
            .then_some((1920, 1080))
    }
}

// ── Display surface ──────────────────────────────────────────────

/// Windowing system behind a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSystemKind {
    X11,
    Wayland,
    Windows,
    Cocoa,
    KmsDrm,
    /// No real window (probe surfaces, tests).
    Headless,
}

/// Something frames can be presented on.
pub trait DisplaySurface: Send + Sync {
    /// Drawable size in pixels.
    fn size(&self) -> (u32, u32);
    fn show(&self);
    fn hide(&self);
    fn present(&self, frame: &Frame) -> Result<(), String>;
    fn window_system(&self) -> WindowSystemKind;
}

/// A zero-sized, never shown surface for probing backends without a
/// visible side effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct HiddenSurface;

impl DisplaySurface for HiddenSurface {
    fn size(&self) -> (u32, u32) {
        (0, 0)
    }

    fn show(&self) {}

    fn hide(&self) {}

    fn present(&self, _frame: &Frame) -> Result<(), String> {
        Ok(())
    }

    fn window_system(&self) -> WindowSystemKind {
        WindowSystemKind::Headless
    }
}

// ── Backend ──────────────────────────────────────────────────────

/// On-screen overlays a renderer may draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// Performance statistics.
    Debug,
    /// Connection status warnings.
    Status,
}

/// What the session asks a backend to decode and present.
#[derive(Clone)]
pub struct DecoderParameters {
    pub format: VideoFormat,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub fullscreen: bool,
    pub surface: Arc<dyn DisplaySurface>,
}

impl DecoderParameters {
    /// The same stream on a hidden probe surface.
    pub fn for_probe(&self) -> Self {
        Self {
            surface: Arc::new(HiddenSurface),
            ..self.clone()
        }
    }
}

impl fmt::Debug for DecoderParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderParameters")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fps", &self.fps)
            .field("fullscreen", &self.fullscreen)
            .field("surface", &self.surface.window_system())
            .finish()
    }
}

pub trait RendererBackend: Send {
    fn capabilities(&self) -> &'static RendererCapabilityRecord;

    /// Acquire the device and check the stream is supported.
    fn initialize(&mut self, params: &DecoderParameters) -> Result<(), DecoderInitError>;

    /// Attach the device (if any) to the decoder context about to be opened.
    fn prepare_decoder_context(&self, params: &mut DecoderContextParams) -> Result<(), DecoderInitError>;

    /// Present one decoded frame. Only called on the surface's thread.
    fn render_frame(&mut self, frame: Frame);

    fn notify_overlay_updated(&mut self, _kind: OverlayKind) {}

    fn name(&self) -> &'static str {
        self.capabilities().name
    }
}
