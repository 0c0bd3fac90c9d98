//! Direct3D 9 DXVA2 decode and presentation (Windows).

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::DecoderInitError;
use crate::video::backend::{
    DecoderParameters, DisplaySurface, RendererAttributes, RendererBackend, RendererCapabilityRecord,
};
use crate::video::codec::{CodecLibrary, DecoderContextParams, Frame, HwDevice, HwDeviceType};
use crate::video::renderers::{env_flag, hybrid, open_device, present_surface};

/// Set to `1` to skip the HEVC adapter blacklist.
pub const DISABLE_BLACKLIST_ENV: &str = "DXVA2_DISABLE_DECODER_BLACKLIST";

pub static CAPABILITIES: RendererCapabilityRecord = RendererCapabilityRecord {
    name: "dxva2",
    attributes: RendererAttributes::empty(),
    // Decoder profiles are validated during initialisation.
    needs_test_frame: false,
    hardware: true,
};

pub struct Dxva2Renderer {
    codec: Arc<dyn CodecLibrary>,
    device: Option<Arc<HwDevice>>,
    surface: Option<Arc<dyn DisplaySurface>>,
}

impl Dxva2Renderer {
    pub fn new(codec: Arc<dyn CodecLibrary>) -> Self {
        Self {
            codec,
            device: None,
            surface: None,
        }
    }
}

/// HEVC surfaces are aligned to 32 pixels (128 draws a green line on Intel
/// at 720p/1080p); everything else to 16.
pub fn surface_alignment(params: &DecoderParameters) -> u32 {
    if params.format.is_hevc() { 32 } else { 16 }
}

impl RendererBackend for Dxva2Renderer {
    fn capabilities(&self) -> &'static RendererCapabilityRecord {
        &CAPABILITIES
    }

    fn initialize(&mut self, params: &DecoderParameters) -> Result<(), DecoderInitError> {
        let device = open_device(&*self.codec, HwDeviceType::Dxva2, CAPABILITIES.name, params.format)?;

        if let Some(adapter) = &device.adapter {
            info!(
                vendor = format_args!("{:#06x}", adapter.vendor_id),
                device = format_args!("{:#06x}", adapter.device_id),
                build = hybrid::driver_build(adapter),
                "DXVA2 adapter"
            );
            if env_flag(DISABLE_BLACKLIST_ENV) {
                warn!("DXVA2 decoder blacklist is disabled");
            } else if hybrid::is_hevc_blacklisted(params.format, adapter) {
                return Err(DecoderInitError::Blacklisted {
                    backend: CAPABILITIES.name,
                    format: params.format,
                });
            }
        }

        info!(alignment = surface_alignment(params), "DXVA2 decoder ready");
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
