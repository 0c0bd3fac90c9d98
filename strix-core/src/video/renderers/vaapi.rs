//! VA-API decode (Linux).
//!
//! Presents either directly through the VA video processor or indirectly
//! through the window's GL path. Direct rendering needs X11 and a driver
//! with video processing; 10-bit content always goes indirect.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::DecoderInitError;
use crate::video::backend::{
    DecoderParameters, DisplaySurface, RendererAttributes, RendererBackend, RendererCapabilityRecord,
    WindowSystemKind,
};
use crate::video::codec::{CodecLibrary, DecoderContextParams, Frame, HwDevice, HwDeviceType, VideoFormat};
use crate::video::renderers::{env_flag, open_device, present_surface};

pub const FORCE_DIRECT_ENV: &str = "VAAPI_FORCE_DIRECT";
pub const FORCE_INDIRECT_ENV: &str = "VAAPI_FORCE_INDIRECT";
/// Use VA-API even on drivers it is normally avoided on.
pub const FORCE_VAAPI_ENV: &str = "FORCE_VAAPI";

pub static CAPABILITIES: RendererCapabilityRecord = RendererCapabilityRecord {
    name: "vaapi",
    attributes: RendererAttributes::empty(),
    // Drivers report profiles they cannot actually decode.
    needs_test_frame: true,
    hardware: true,
};

pub struct VaapiRenderer {
    codec: Arc<dyn CodecLibrary>,
    device: Option<Arc<HwDevice>>,
    surface: Option<Arc<dyn DisplaySurface>>,
    direct_rendering: bool,
}

impl VaapiRenderer {
    pub fn new(codec: Arc<dyn CodecLibrary>) -> Self {
        Self {
            codec,
            device: None,
            surface: None,
            direct_rendering: false,
        }
    }

    pub fn is_direct_rendering(&self) -> bool {
        self.direct_rendering
    }
}

/// Inputs of the direct-versus-indirect decision.
#[derive(Debug, Clone, Copy)]
pub struct DirectRenderingInputs {
    pub force_direct: bool,
    pub force_indirect: bool,
    pub window_system: WindowSystemKind,
    pub blacklisted: bool,
    pub format: VideoFormat,
    pub video_processing: bool,
}

pub fn use_direct_rendering(inputs: DirectRenderingInputs) -> bool {
    if inputs.force_direct {
        return true;
    }
    if inputs.force_indirect {
        return false;
    }
    if inputs.window_system != WindowSystemKind::X11 || inputs.blacklisted {
        return false;
    }
    if inputs.format == VideoFormat::H265Main10 {
        return false;
    }
    // Without a video processor the driver crashes presenting surfaces.
    inputs.video_processing
}

/// Pre-1.0 Gallium drivers leak memory per frame on AMD; let another
/// backend take those unless the user insists. Wayland has no alternative.
pub fn avoid_legacy_driver(device: &HwDevice, force: bool, wayland: bool) -> bool {
    if device.api_version.0 != 0 || force || wayland {
        return false;
    }
    device
        .driver
        .as_deref()
        .map(|d| {
            let d = d.to_ascii_lowercase();
            d.contains("amd") || d.contains("radeon")
        })
        .unwrap_or(false)
}

/// The iHD driver crashes presenting directly under XWayland.
pub fn blacklisted_for_direct(device: &HwDevice, wayland: bool) -> bool {
    wayland && device.driver.as_deref().is_some_and(|d| d.contains("iHD"))
}

fn running_wayland() -> bool {
    std::env::var_os("WAYLAND_DISPLAY").is_some()
}

impl RendererBackend for VaapiRenderer {
    fn capabilities(&self) -> &'static RendererCapabilityRecord {
        &CAPABILITIES
    }

    fn initialize(&mut self, params: &DecoderParameters) -> Result<(), DecoderInitError> {
        let device = open_device(&*self.codec, HwDeviceType::Vaapi, CAPABILITIES.name, params.format)?;
        let wayland = running_wayland();

        info!(
            version = format_args!("{}.{}", device.api_version.0, device.api_version.1),
            driver = device.driver.as_deref().unwrap_or("<unknown>"),
            "initialized VA-API"
        );

        if avoid_legacy_driver(&device, env_flag(FORCE_VAAPI_ENV), wayland) {
            warn!("avoiding VA-API on legacy AMD driver");
            return Err(DecoderInitError::Unsupported {
                backend: CAPABILITIES.name,
                reason: "legacy AMD driver".into(),
            });
        }

        self.direct_rendering = use_direct_rendering(DirectRenderingInputs {
            force_direct: env_flag(FORCE_DIRECT_ENV),
            force_indirect: env_flag(FORCE_INDIRECT_ENV),
            window_system: params.surface.window_system(),
            blacklisted: blacklisted_for_direct(&device, wayland),
            format: params.format,
            video_processing: device.video_processing,
        });
        info!(direct = self.direct_rendering, "VA-API rendering path");

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
