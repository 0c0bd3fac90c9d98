//! CPU decode with the frame uploaded to the window as a texture.
//!
//! Always available. Last in the negotiation order.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::DecoderInitError;
use crate::video::backend::{
    DecoderParameters, DisplaySurface, OverlayKind, RendererAttributes, RendererBackend,
    RendererCapabilityRecord,
};
use crate::video::codec::{DecoderContextParams, Frame, FrameData};

/// Slice threads used for software decode.
pub const MAX_SLICES: u32 = 4;

pub static CAPABILITIES: RendererCapabilityRecord = RendererCapabilityRecord {
    name: "software",
    attributes: RendererAttributes::empty(),
    needs_test_frame: false,
    hardware: false,
};

#[derive(Default)]
pub struct SoftwareRenderer {
    surface: Option<Arc<dyn DisplaySurface>>,
    overlays: Vec<OverlayKind>,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays the next frame will be drawn with.
    pub fn pending_overlays(&self) -> &[OverlayKind] {
        &self.overlays
    }
}

/// `min(MAX_SLICES, cpu count)`.
pub fn slice_count() -> u32 {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);
    cpus.min(MAX_SLICES)
}

impl RendererBackend for SoftwareRenderer {
    fn capabilities(&self) -> &'static RendererCapabilityRecord {
        &CAPABILITIES
    }

    fn initialize(&mut self, params: &DecoderParameters) -> Result<(), DecoderInitError> {
        self.surface = Some(Arc::clone(&params.surface));
        Ok(())
    }

    fn prepare_decoder_context(&self, params: &mut DecoderContextParams) -> Result<(), DecoderInitError> {
        params.hw_device = None;
        params.thread_count = slice_count();
        info!(threads = params.thread_count, "using software decoding");
        Ok(())
    }

    fn render_frame(&mut self, frame: Frame) {
        let Some(surface) = &self.surface else {
            return;
        };
        match frame.data {
            FrameData::Cpu(_) => {
                if let Err(e) = surface.present(&frame) {
                    warn!(error = %e, "software present failed");
                }
            }
            FrameData::Surface { .. } => {
                warn!(frame = frame.frame_number, "software renderer got a GPU frame");
            }
        }
    }

    fn notify_overlay_updated(&mut self, kind: OverlayKind) {
        if !self.overlays.contains(&kind) {
            self.overlays.push(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::backend::HiddenSurface;
    use crate::video::codec::VideoFormat;

    #[test]
    fn slices_bounded() {
        let n = slice_count();
        assert!((1..=MAX_SLICES).contains(&n));
    }

    #[test]
    fn no_device_attached() {
        let mut renderer = SoftwareRenderer::new();
        renderer
            .initialize(&DecoderParameters {
                format: VideoFormat::H264,
                width: 1280,
                height: 720,
                fps: 60,
                fullscreen: false,
                surface: Arc::new(HiddenSurface),
            })
            .unwrap();
        let mut ctx = DecoderContextParams::default();
        renderer.prepare_decoder_context(&mut ctx).unwrap();
        assert!(ctx.hw_device.is_none());
        assert!(ctx.thread_count >= 1);
        assert!(!renderer.capabilities().hardware);
    }

    #[test]
    fn overlays_recorded_once() {
        let mut renderer = SoftwareRenderer::new();
        renderer.notify_overlay_updated(OverlayKind::Debug);
        renderer.notify_overlay_updated(OverlayKind::Debug);
        assert_eq!(renderer.pending_overlays(), &[OverlayKind::Debug]);
    }
}
