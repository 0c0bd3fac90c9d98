//! Renderer backends, one per acceleration technology.
//!
//! Every backend compiles on every platform; [`BackendRegistry`] decides
//! which ones are offered where.
//!
//! [`BackendRegistry`]: crate::video::registry::BackendRegistry

pub mod d3d11va;
pub mod dxva2;
pub mod hybrid;
pub mod mmal;
pub mod software;
pub mod vaapi;
pub mod videotoolbox;

use std::sync::Arc;

use tracing::warn;

use crate::error::DecoderInitError;
use crate::video::backend::DisplaySurface;
use crate::video::codec::{CodecLibrary, Frame, FrameData, HwDevice, HwDeviceType, VideoFormat};

pub use d3d11va::D3d11vaRenderer;
pub use dxva2::Dxva2Renderer;
pub use mmal::MmalRenderer;
pub use software::SoftwareRenderer;
pub use vaapi::VaapiRenderer;
pub use videotoolbox::VideoToolboxRenderer;

/// Create the hardware device for `device_type` and check it has a decode
/// profile for `format`.
fn open_device(
    codec: &dyn CodecLibrary,
    device_type: HwDeviceType,
    backend: &'static str,
    format: VideoFormat,
) -> Result<Arc<HwDevice>, DecoderInitError> {
    let device = codec.create_hw_device(device_type)?;
    if !device.supports(format) {
        return Err(DecoderInitError::Unsupported {
            backend,
            reason: format!("device has no {format} decode profile"),
        });
    }
    Ok(Arc::new(device))
}

/// Present a GPU frame decoded on `device`. Frames from anywhere else are
/// dropped.
fn present_surface(
    backend: &'static str,
    device: Option<&Arc<HwDevice>>,
    surface: Option<&Arc<dyn DisplaySurface>>,
    frame: &Frame,
) {
    let (Some(device), Some(surface)) = (device, surface) else {
        return;
    };
    match &frame.data {
        FrameData::Surface { device: owner, .. } if Arc::ptr_eq(owner, device) => {
            if let Err(e) = surface.present(frame) {
                warn!(backend, error = %e, "present failed");
            }
        }
        _ => warn!(backend, frame = frame.frame_number, "dropping frame from a foreign device"),
    }
}

/// Whether an environment switch is set to `1`.
fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}
