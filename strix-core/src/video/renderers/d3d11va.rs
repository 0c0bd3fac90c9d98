//! Direct3D 11 video decode (Windows). The only Windows path for HDR.

use std::sync::Arc;

use tracing::info;

use crate::error::DecoderInitError;
use crate::video::backend::{
    DecoderParameters, DisplaySurface, RendererAttributes, RendererBackend, RendererCapabilityRecord,
};
use crate::video::codec::{CodecLibrary, DecoderContextParams, Frame, HwDevice, HwDeviceType};
use crate::video::renderers::{hybrid, open_device, present_surface};

pub static CAPABILITIES: RendererCapabilityRecord = RendererCapabilityRecord {
    name: "d3d11va",
    attributes: RendererAttributes::HDR_SUPPORT,
    needs_test_frame: false,
    hardware: true,
};

pub struct D3d11vaRenderer {
    codec: Arc<dyn CodecLibrary>,
    device: Option<Arc<HwDevice>>,
    surface: Option<Arc<dyn DisplaySurface>>,
}

impl D3d11vaRenderer {
    pub fn new(codec: Arc<dyn CodecLibrary>) -> Self {
        Self {
            codec,
            device: None,
            surface: None,
        }
    }
}

impl RendererBackend for D3d11vaRenderer {
    fn capabilities(&self) -> &'static RendererCapabilityRecord {
        &CAPABILITIES
    }

    fn initialize(&mut self, params: &DecoderParameters) -> Result<(), DecoderInitError> {
        let device = open_device(&*self.codec, HwDeviceType::D3d11va, CAPABILITIES.name, params.format)?;

        if let Some(adapter) = &device.adapter {
            if hybrid::is_hybrid_decoded(params.format, adapter.vendor_id, adapter.device_id) {
                return Err(DecoderInitError::Blacklisted {
                    backend: CAPABILITIES.name,
                    format: params.format,
                });
            }
        }

        info!(format = %params.format, "D3D11VA decoder ready");
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
