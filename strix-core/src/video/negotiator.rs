//! Decoder/renderer negotiation.
//!
//! First fit, in the order the codec library reports its hardware
//! configurations:
//!
//! ```text
//!  hw_configs(format) ──► [cfg₀, cfg₁, …]
//!      │ skip: no device-context method, no registered backend
//!      ▼
//!  attributes ok? ─► test frame ok? ─► initialize ─► open decoder ──► accept
//!      │ any failure: next config
//!      ▼
//!  software backend (unless hardware was forced) ──► accept or Exhausted
//! ```
//!
//! There is no scoring: later candidates are never constructed once one
//! succeeds.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::DecoderInitError;
use crate::stream::preferences::DecoderSelection;
use crate::stream::validate::HardwareProbe;
use crate::video::backend::{
    DecoderParameters, DisplaySurface, HiddenSurface, RendererBackend, RendererCapabilityRecord,
};
use crate::video::codec::{CodecLibrary, HwConfigMethods, VideoFormat};
use crate::video::decoder::VideoDecoder;
use crate::video::registry::{BackendFactory, BackendRegistry};

/// What the session wants decoded.
#[derive(Clone)]
pub struct NegotiationRequest {
    pub format: VideoFormat,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub selection: DecoderSelection,
    pub fullscreen: bool,
    pub surface: Arc<dyn DisplaySurface>,
}

impl NegotiationRequest {
    fn decoder_parameters(&self) -> DecoderParameters {
        DecoderParameters {
            format: self.format,
            width: self.width,
            height: self.height,
            fps: self.fps,
            fullscreen: self.fullscreen,
            surface: Arc::clone(&self.surface),
        }
    }
}

/// The winning backend with its open decoder.
pub struct NegotiatedDecoder {
    pub backend: Box<dyn RendererBackend>,
    pub decoder: VideoDecoder,
}

impl fmt::Debug for NegotiatedDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiatedDecoder")
            .field("backend", &self.backend.name())
            .field("hardware", &self.is_hardware_accelerated())
            .finish_non_exhaustive()
    }
}

impl NegotiatedDecoder {
    pub fn is_hardware_accelerated(&self) -> bool {
        self.backend.capabilities().hardware
    }
}

/// Reject a backend whose static attributes rule out this stream.
pub fn check_attributes(
    caps: &RendererCapabilityRecord,
    params: &DecoderParameters,
) -> Result<(), DecoderInitError> {
    if let Some((max_w, max_h)) = caps.max_resolution() {
        if params.width > max_w || params.height > max_h {
            return Err(DecoderInitError::Unsupported {
                backend: caps.name,
                reason: format!(
                    "{}x{} exceeds the {}x{} ceiling",
                    params.width, params.height, max_w, max_h
                ),
            });
        }
    }
    if caps.fullscreen_only() && !params.fullscreen {
        return Err(DecoderInitError::Unsupported {
            backend: caps.name,
            reason: "windowed mode is not supported".into(),
        });
    }
    if params.format.is_10bit() && !caps.supports_hdr() {
        return Err(DecoderInitError::Unsupported {
            backend: caps.name,
            reason: "cannot present 10-bit content".into(),
        });
    }
    Ok(())
}

pub struct DecoderNegotiator {
    codec: Arc<dyn CodecLibrary>,
    registry: Arc<BackendRegistry>,
}

impl DecoderNegotiator {
    pub fn new(codec: Arc<dyn CodecLibrary>, registry: Arc<BackendRegistry>) -> Self {
        Self { codec, registry }
    }

    pub fn codec(&self) -> &Arc<dyn CodecLibrary> {
        &self.codec
    }

    /// Produce exactly one initialised backend for `request`, or fail.
    pub fn negotiate(&self, request: &NegotiationRequest) -> Result<NegotiatedDecoder, DecoderInitError> {
        let format = request.format;
        if !self.codec.has_decoder(format) {
            error!(%format, "no decoder available");
            return Err(DecoderInitError::NoDecoder(format));
        }

        let params = request.decoder_parameters();

        if request.selection != DecoderSelection::ForceSoftware {
            for config in self.codec.hw_configs(format) {
                if !config.methods.contains(HwConfigMethods::HW_DEVICE_CTX) {
                    debug!(device = %config.device_type, "skipping config without device context");
                    continue;
                }
                let Some(factory) = self.registry.hardware_factory(config.device_type) else {
                    debug!(device = %config.device_type, "no backend registered");
                    continue;
                };

                match self.try_backend(factory, &params) {
                    Ok(negotiated) => {
                        info!(
                            backend = negotiated.backend.name(),
                            %format,
                            width = params.width,
                            height = params.height,
                            "hardware decoder selected"
                        );
                        return Ok(negotiated);
                    }
                    Err(e) => warn!(device = %config.device_type, error = %e, "backend rejected"),
                }
            }

            if request.selection == DecoderSelection::ForceHardware {
                error!(%format, "hardware decoding forced but unavailable");
                return Err(DecoderInitError::HardwareRequired);
            }
        }

        match self.try_backend(self.registry.software_factory(), &params) {
            Ok(negotiated) => {
                info!(%format, "software decoder selected");
                Ok(negotiated)
            }
            Err(e) => {
                error!(%format, error = %e, "software decoder failed");
                Err(DecoderInitError::Exhausted(format))
            }
        }
    }

    fn try_backend(
        &self,
        factory: &BackendFactory,
        params: &DecoderParameters,
    ) -> Result<NegotiatedDecoder, DecoderInitError> {
        let mut backend = factory(Arc::clone(&self.codec));
        let caps = backend.capabilities();
        check_attributes(caps, params)?;

        if caps.needs_test_frame {
            self.probe_test_frame(factory, caps.name, params)?;
        }

        backend.initialize(params)?;
        let decoder = VideoDecoder::open(&*self.codec, &*backend, params.format)?;
        Ok(NegotiatedDecoder { backend, decoder })
    }

    /// Decode the library's test frame on a throwaway instance bound to a
    /// hidden surface.
    fn probe_test_frame(
        &self,
        factory: &BackendFactory,
        name: &'static str,
        params: &DecoderParameters,
    ) -> Result<(), DecoderInitError> {
        let Some(data) = self.codec.test_frame(params.format) else {
            warn!(backend = name, format = %params.format, "no test frame available");
            return Err(DecoderInitError::TestFrameFailed { backend: name });
        };

        let mut probe = factory(Arc::clone(&self.codec));
        probe.initialize(&params.for_probe())?;
        let mut decoder = VideoDecoder::open(&*self.codec, &*probe, params.format)?;
        if decoder.probe(&data) {
            debug!(backend = name, "test frame decoded");
            Ok(())
        } else {
            warn!(backend = name, format = %params.format, "test frame failed to decode");
            Err(DecoderInitError::TestFrameFailed { backend: name })
        }
    }
}

impl HardwareProbe for DecoderNegotiator {
    fn hardware_decode_available(&self, format: VideoFormat, width: u32, height: u32, fps: u32) -> bool {
        let request = NegotiationRequest {
            format,
            width,
            height,
            fps,
            selection: DecoderSelection::ForceHardware,
            fullscreen: true,
            surface: Arc::new(HiddenSurface),
        };
        self.negotiate(&request)
            .map(|n| n.is_hardware_accelerated())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::backend::RendererAttributes;

    fn params(width: u32, height: u32, fullscreen: bool, format: VideoFormat) -> DecoderParameters {
        DecoderParameters {
            format,
            width,
            height,
            fps: 60,
            fullscreen,
            surface: Arc::new(HiddenSurface),
        }
    }

    const PI: RendererCapabilityRecord = RendererCapabilityRecord {
        name: "pi",
        attributes: RendererAttributes::FULLSCREEN_ONLY.union(RendererAttributes::MAX_1080P),
        needs_test_frame: true,
        hardware: true,
    };

    #[test]
    fn ceiling_enforced() {
        assert!(check_attributes(&PI, &params(1920, 1080, true, VideoFormat::H264)).is_ok());
        assert!(matches!(
            check_attributes(&PI, &params(3840, 2160, true, VideoFormat::H264)),
            Err(DecoderInitError::Unsupported { backend: "pi", .. })
        ));
    }

    #[test]
    fn fullscreen_only_rejects_windowed() {
        assert!(check_attributes(&PI, &params(1280, 720, false, VideoFormat::H264)).is_err());
    }

    #[test]
    fn ten_bit_needs_hdr_backend() {
        assert!(check_attributes(&PI, &params(1280, 720, true, VideoFormat::H265Main10)).is_err());
        assert!(
            check_attributes(
                &crate::video::renderers::d3d11va::CAPABILITIES,
                &params(3840, 2160, false, VideoFormat::H265Main10),
            )
            .is_ok()
        );
    }
}
