//! Codec library seam.
//!
//! The decode engine itself (an FFmpeg-like library) is external. This
//! module describes what the negotiator and the frame pipeline need from
//! it: which hardware configurations exist for a format, how to make a
//! device, and how to open a decoder context that turns packets into
//! frames.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use bytes::Bytes;

use crate::error::DecoderInitError;

// ── VideoFormat ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    H264,
    H265,
    /// HEVC Main10, the only HDR format.
    H265Main10,
}

impl VideoFormat {
    pub fn is_hevc(self) -> bool {
        matches!(self, Self::H265 | Self::H265Main10)
    }

    pub fn is_10bit(self) -> bool {
        matches!(self, Self::H265Main10)
    }

    pub fn as_flag(self) -> VideoFormats {
        match self {
            Self::H264 => VideoFormats::H264,
            Self::H265 => VideoFormats::H265,
            Self::H265Main10 => VideoFormats::H265_MAIN10,
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "H.264"),
            Self::H265 => write!(f, "HEVC"),
            Self::H265Main10 => write!(f, "HEVC Main10"),
        }
    }
}

bitflags! {
    /// A set of video formats.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VideoFormats: u32 {
        const H264 = 0x0001;
        const H265 = 0x0100;
        const H265_MAIN10 = 0x0200;
    }
}

// ── Hardware configurations ──────────────────────────────────────

/// Acceleration technologies the codec library may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HwDeviceType {
    Vaapi,
    Vdpau,
    Dxva2,
    D3d11va,
    VideoToolbox,
    Mmal,
    Cuda,
}

impl fmt::Display for HwDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vaapi => "vaapi",
            Self::Vdpau => "vdpau",
            Self::Dxva2 => "dxva2",
            Self::D3d11va => "d3d11va",
            Self::VideoToolbox => "videotoolbox",
            Self::Mmal => "mmal",
            Self::Cuda => "cuda",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// How a hardware configuration hands frames to the decoder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HwConfigMethods: u32 {
        /// Decoder needs a device context created up front.
        const HW_DEVICE_CTX = 0x01;
        const HW_FRAMES_CTX = 0x02;
        const INTERNAL = 0x04;
    }
}

/// One hardware configuration, in the order the library reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwConfig {
    pub device_type: HwDeviceType,
    pub methods: HwConfigMethods,
}

impl HwConfig {
    pub fn device_ctx(device_type: HwDeviceType) -> Self {
        Self {
            device_type,
            methods: HwConfigMethods::HW_DEVICE_CTX,
        }
    }
}

/// PCI identity of the adapter behind a hardware device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterInfo {
    pub vendor_id: u32,
    pub device_id: u32,
    /// Driver build; only the low 16 bits of the low part are meaningful.
    pub driver_version: u64,
}

/// A created hardware device. Shared between the backend that owns it and
/// the decoder context that decodes into it.
#[derive(Debug, Clone)]
pub struct HwDevice {
    pub device_type: HwDeviceType,
    pub adapter: Option<AdapterInfo>,
    /// Formats the device's decoder profiles cover.
    pub formats: VideoFormats,
    /// Driver vendor string, e.g. `Intel iHD driver` or `Mesa Gallium`.
    pub driver: Option<String>,
    /// Acceleration API version `(major, minor)`.
    pub api_version: (u32, u32),
    /// The device can scale and present surfaces itself.
    pub video_processing: bool,
    /// Opaque handle from the codec library.
    pub handle: u64,
}

impl HwDevice {
    pub fn new(device_type: HwDeviceType, formats: VideoFormats) -> Self {
        Self {
            device_type,
            adapter: None,
            formats,
            driver: None,
            api_version: (1, 0),
            video_processing: false,
            handle: 0,
        }
    }

    pub fn supports(&self, format: VideoFormat) -> bool {
        self.formats.contains(format.as_flag())
    }
}

// ── Frames ───────────────────────────────────────────────────────

/// Where a decoded frame's pixels live.
#[derive(Debug, Clone)]
pub enum FrameData {
    /// System memory (software decode).
    Cpu(Bytes),
    /// A GPU surface owned by `device`.
    Surface { device: Arc<HwDevice>, surface: u64 },
}

/// A decoded picture.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_number: u64,
    pub width: u32,
    pub height: u32,
    pub data: FrameData,
}

// ── Decoder contexts ─────────────────────────────────────────────

/// What the negotiated backend asks of the decoder context.
#[derive(Debug, Clone, Default)]
pub struct DecoderContextParams {
    pub hw_device: Option<Arc<HwDevice>>,
    /// Threads for slice decoding; 1 means the library's own choice.
    pub thread_count: u32,
    pub low_delay: bool,
}

/// An open decoder.
pub trait CodecContext: Send {
    /// Feed one complete access unit.
    fn send_packet(&mut self, data: &[u8]) -> Result<(), String>;

    /// The next decoded frame, if one is ready.
    fn receive_frame(&mut self) -> Option<Frame>;
}

/// The codec library.
pub trait CodecLibrary: Send + Sync {
    fn has_decoder(&self, format: VideoFormat) -> bool;

    /// Hardware configurations for `format`, in the library's order.
    fn hw_configs(&self, format: VideoFormat) -> Vec<HwConfig>;

    fn create_hw_device(&self, device_type: HwDeviceType) -> Result<HwDevice, DecoderInitError>;

    fn open_decoder(
        &self,
        format: VideoFormat,
        params: &DecoderContextParams,
    ) -> Result<Box<dyn CodecContext>, DecoderInitError>;

    /// A short, known-good bitstream for probing a decoder.
    fn test_frame(&self, format: VideoFormat) -> Option<Bytes>;
}
