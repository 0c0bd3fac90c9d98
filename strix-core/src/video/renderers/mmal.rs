//! Broadcom MMAL decode straight to the display plane (Raspberry Pi).
//!
//! H.264 only, fullscreen only, 1080p at most.

use std::sync::Arc;

use crate::error::DecoderInitError;
use crate::video::backend::{
    DecoderParameters, DisplaySurface, RendererAttributes, RendererBackend, RendererCapabilityRecord,
};
use crate::video::codec::{CodecLibrary, DecoderContextParams, Frame, HwDevice, HwDeviceType, VideoFormat};
use crate::video::renderers::{open_device, present_surface};

pub static CAPABILITIES: RendererCapabilityRecord = RendererCapabilityRecord {
    name: "mmal",
    attributes: RendererAttributes::FULLSCREEN_ONLY.union(RendererAttributes::MAX_1080P),
    needs_test_frame: true,
    hardware: true,
};

pub struct MmalRenderer {
    codec: Arc<dyn CodecLibrary>,
    device: Option<Arc<HwDevice>>,
    surface: Option<Arc<dyn DisplaySurface>>,
}

impl MmalRenderer {
    pub fn new(codec: Arc<dyn CodecLibrary>) -> Self {
        Self {
            codec,
            device: None,
            surface: None,
        }
    }
}

impl RendererBackend for MmalRenderer {
    fn capabilities(&self) -> &'static RendererCapabilityRecord {
        &CAPABILITIES
    }

    fn initialize(&mut self, params: &DecoderParameters) -> Result<(), DecoderInitError> {
        if params.format != VideoFormat::H264 {
            return Err(DecoderInitError::Unsupported {
                backend: CAPABILITIES.name,
                reason: format!("{} is not supported", params.format),
            });
        }
        let device = open_device(&*self.codec, HwDeviceType::Mmal, CAPABILITIES.name, params.format)?;
        self.device = Some(device);
        self.surface = Some(Arc::clone(&params.surface));
        Ok(())
    }

    fn prepare_decoder_context(&self, params: &mut DecoderContextParams) -> Result<(), DecoderInitError> {
        params.hw_device = self.device.clone();
        params.thread_count = 1;
        Ok(())
    }

    fn render_frame(&mut self, frame: Frame) {
        present_surface(CAPABILITIES.name, self.device.as_ref(), self.surface.as_ref(), &frame);
    }
}
