//! VideoToolbox decode with Metal presentation (macOS).

use std::sync::Arc;

use crate::error::DecoderInitError;
use crate::video::backend::{
    DecoderParameters, DisplaySurface, RendererAttributes, RendererBackend, RendererCapabilityRecord,
};
use crate::video::codec::{CodecLibrary, DecoderContextParams, Frame, HwDevice, HwDeviceType};
use crate::video::renderers::{open_device, present_surface};

pub static CAPABILITIES: RendererCapabilityRecord = RendererCapabilityRecord {
    name: "videotoolbox",
    attributes: RendererAttributes::HDR_SUPPORT,
    needs_test_frame: false,
    hardware: true,
};

pub struct VideoToolboxRenderer {
    codec: Arc<dyn CodecLibrary>,
    device: Option<Arc<HwDevice>>,
    surface: Option<Arc<dyn DisplaySurface>>,
}

impl VideoToolboxRenderer {
    pub fn new(codec: Arc<dyn CodecLibrary>) -> Self {
        Self {
            codec,
            device: None,
            surface: None,
        }
    }
}

impl RendererBackend for VideoToolboxRenderer {
    fn capabilities(&self) -> &'static RendererCapabilityRecord {
        &CAPABILITIES
    }

    fn initialize(&mut self, params: &DecoderParameters) -> Result<(), DecoderInitError> {
        let device = open_device(
            &*self.codec,
            HwDeviceType::VideoToolbox,
            CAPABILITIES.name,
            params.format,
        )?;
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
