//! GPUs that advertise HEVC decode but do part of it in shaders.
//!
//! Hybrid decode claims hardware support and then performs badly, so the
//! Windows backends refuse HEVC on these adapters.

use crate::video::codec::{AdapterInfo, VideoFormat};

pub const VENDOR_INTEL: u32 = 0x8086;
pub const VENDOR_NVIDIA: u32 = 0x10DE;
pub const VENDOR_AMD: u32 = 0x1002;

/// Intel encodes the series in the high byte of the device id.
const INTEL_HYBRID_SERIES: [u32; 5] = [
    0x0400, // Haswell
    0x0A00, // Haswell
    0x0D00, // Haswell
    0x1600, // Broadwell
    0x2200, // Cherry Trail, Braswell
];

/// Kepler and Maxwell parts with Feature Set E (hybrid) HEVC.
const NVIDIA_HYBRID_RANGES: [(u32, u32); 11] = [
    (0x1180, 0x11BF), // GK104
    (0x11C0, 0x11FF), // GK106
    (0x0FC0, 0x0FFF), // GK107
    (0x1000, 0x103F), // GK110/GK110B
    (0x1280, 0x12BF), // GK208
    (0x1340, 0x137F), // GM108
    (0x1380, 0x13BF), // GM107
    (0x13C0, 0x13FF), // GM204
    (0x1617, 0x161A), // GM204
    (0x1667, 0x1667), // GM204
    (0x17C0, 0x17FF), // GM200
];

/// Intel drivers before this build corrupt HEVC output.
pub const MIN_INTEL_HEVC_DRIVER_BUILD: u16 = 4836;

/// Whether `format` is hybrid-decoded on this vendor/device pair.
pub fn is_hybrid_decoded(format: VideoFormat, vendor_id: u32, device_id: u32) -> bool {
    if !format.is_hevc() {
        return false;
    }
    match vendor_id {
        VENDOR_INTEL => INTEL_HYBRID_SERIES.contains(&(device_id & 0xFF00)),
        VENDOR_NVIDIA => NVIDIA_HYBRID_RANGES
            .iter()
            .any(|&(lo, hi)| (lo..=hi).contains(&device_id)),
        _ => false,
    }
}

/// The build number Windows drivers carry in the low word of the low part.
pub fn driver_build(adapter: &AdapterInfo) -> u16 {
    (adapter.driver_version & 0xFFFF) as u16
}

/// Full HEVC blacklist decision for an adapter: hybrid series, or an Intel
/// driver older than [`MIN_INTEL_HEVC_DRIVER_BUILD`].
pub fn is_hevc_blacklisted(format: VideoFormat, adapter: &AdapterInfo) -> bool {
    if !format.is_hevc() {
        return false;
    }
    if is_hybrid_decoded(format, adapter.vendor_id, adapter.device_id) {
        return true;
    }
    adapter.vendor_id == VENDOR_INTEL && driver_build(adapter) < MIN_INTEL_HEVC_DRIVER_BUILD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(vendor_id: u32, device_id: u32, build: u16) -> AdapterInfo {
        AdapterInfo {
            vendor_id,
            device_id,
            driver_version: (26u64 << 48) | (20u64 << 32) | (100u64 << 16) | build as u64,
        }
    }

    #[test]
    fn intel_hybrid_series() {
        assert!(is_hybrid_decoded(VideoFormat::H265, VENDOR_INTEL, 0x0416));
        assert!(is_hybrid_decoded(VideoFormat::H265, VENDOR_INTEL, 0x1616));
        assert!(!is_hybrid_decoded(VideoFormat::H265, VENDOR_INTEL, 0x5916));
        // H.264 is never affected.
        assert!(!is_hybrid_decoded(VideoFormat::H264, VENDOR_INTEL, 0x0416));
    }

    #[test]
    fn nvidia_feature_set_e() {
        assert!(is_hybrid_decoded(VideoFormat::H265, VENDOR_NVIDIA, 0x13C2)); // GTX 970
        assert!(is_hybrid_decoded(VideoFormat::H265, VENDOR_NVIDIA, 0x1667));
        assert!(!is_hybrid_decoded(VideoFormat::H265, VENDOR_NVIDIA, 0x1668));
        assert!(!is_hybrid_decoded(VideoFormat::H265, VENDOR_NVIDIA, 0x1B80)); // GTX 1080
    }

    #[test]
    fn amd_never_blacklisted() {
        assert!(!is_hevc_blacklisted(VideoFormat::H265, &adapter(VENDOR_AMD, 0x67DF, 0)));
    }

    #[test]
    fn old_intel_driver() {
        assert!(is_hevc_blacklisted(VideoFormat::H265, &adapter(VENDOR_INTEL, 0x5916, 4835)));
        assert!(!is_hevc_blacklisted(VideoFormat::H265, &adapter(VENDOR_INTEL, 0x5916, 4836)));
        assert!(!is_hevc_blacklisted(VideoFormat::H264, &adapter(VENDOR_INTEL, 0x5916, 100)));
        assert_eq!(driver_build(&adapter(VENDOR_INTEL, 0, 4836)), 4836);
    }
}
