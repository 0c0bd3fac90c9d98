//! Video decode and presentation.
//!
//! - [`codec`] - the external codec library seam
//! - [`backend`] - the renderer backend contract
//! - [`renderers`] - one backend per acceleration technology
//! - [`registry`] - which backends are offered on this platform
//! - [`negotiator`] - first-fit backend selection
//! - [`pipeline`] - latest-wins delivery to the session thread

pub mod backend;
pub mod codec;
pub mod decoder;
pub mod negotiator;
pub mod pipeline;
pub mod registry;
pub mod renderers;

pub use backend::{
    DecoderParameters, DisplaySurface, HiddenSurface, OverlayKind, RendererAttributes, RendererBackend,
    RendererCapabilityRecord, WindowSystemKind,
};
pub use codec::{
    AdapterInfo, CodecContext, CodecLibrary, DecoderContextParams, Frame, FrameData, HwConfig, HwConfigMethods,
    HwDevice, HwDeviceType, VideoFormat, VideoFormats,
};
pub use decoder::VideoDecoder;
pub use negotiator::{DecoderNegotiator, NegotiatedDecoder, NegotiationRequest};
pub use pipeline::{FramePipeline, FrameSlot, PipelineStats};
pub use registry::{BackendFactory, BackendRegistry};
