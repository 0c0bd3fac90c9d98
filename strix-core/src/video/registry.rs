//! Runtime registry of renderer backend factories.
//!
//! The negotiator maps each hardware configuration the codec library
//! reports to a factory registered here. Types without a factory are
//! skipped. Software is always available.

use std::collections::HashMap;
use std::sync::Arc;

use crate::video::backend::RendererBackend;
use crate::video::codec::{CodecLibrary, HwDeviceType};
use crate::video::renderers::SoftwareRenderer;

/// Builds a fresh, uninitialised backend.
pub type BackendFactory = Arc<dyn Fn(Arc<dyn CodecLibrary>) -> Box<dyn RendererBackend> + Send + Sync>;

pub struct BackendRegistry {
    hardware: HashMap<HwDeviceType, BackendFactory>,
    software: BackendFactory,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// A registry offering only the software backend.
    pub fn new() -> Self {
        Self {
            hardware: HashMap::new(),
            software: Arc::new(|_: Arc<dyn CodecLibrary>| -> Box<dyn RendererBackend> {
                Box::new(SoftwareRenderer::new())
            }),
        }
    }

    /// Every backend valid for the platform this was compiled for.
    pub fn platform_default() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(target_os = "linux")]
        {
            use crate::video::renderers::VaapiRenderer;
            registry.register(HwDeviceType::Vaapi, |codec| Box::new(VaapiRenderer::new(codec)));
        }
        #[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
        {
            use crate::video::renderers::MmalRenderer;
            registry.register(HwDeviceType::Mmal, |codec| Box::new(MmalRenderer::new(codec)));
        }
        #[cfg(target_os = "windows")]
        {
            use crate::video::renderers::{D3d11vaRenderer, Dxva2Renderer};
            registry.register(HwDeviceType::D3d11va, |codec| Box::new(D3d11vaRenderer::new(codec)));
            registry.register(HwDeviceType::Dxva2, |codec| Box::new(Dxva2Renderer::new(codec)));
        }
        #[cfg(target_os = "macos")]
        {
            use crate::video::renderers::VideoToolboxRenderer;
            registry.register(HwDeviceType::VideoToolbox, |codec| {
                Box::new(VideoToolboxRenderer::new(codec))
            });
        }

        registry
    }

    /// Register (or replace) the backend for a hardware device type.
    pub fn register<F>(&mut self, device_type: HwDeviceType, factory: F) -> &mut Self
    where
        F: Fn(Arc<dyn CodecLibrary>) -> Box<dyn RendererBackend> + Send + Sync + 'static,
    {
        self.hardware.insert(device_type, Arc::new(factory));
        self
    }

    /// Replace the software fallback.
    pub fn set_software<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(Arc<dyn CodecLibrary>) -> Box<dyn RendererBackend> + Send + Sync + 'static,
    {
        self.software = Arc::new(factory);
        self
    }

    pub fn hardware_factory(&self, device_type: HwDeviceType) -> Option<&BackendFactory> {
        self.hardware.get(&device_type)
    }

    pub fn software_factory(&self) -> &BackendFactory {
        &self.software
    }

    pub fn has_hardware(&self, device_type: HwDeviceType) -> bool {
        self.hardware.contains_key(&device_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::renderers::Dxva2Renderer;

    #[test]
    fn empty_registry_has_only_software() {
        let registry = BackendRegistry::new();
        assert!(!registry.has_hardware(HwDeviceType::Vaapi));
        assert!(registry.hardware_factory(HwDeviceType::Dxva2).is_none());
    }

    #[test]
    fn register_replaces() {
        let mut registry = BackendRegistry::new();
        registry.register(HwDeviceType::Dxva2, |codec| Box::new(Dxva2Renderer::new(codec)));
        assert!(registry.has_hardware(HwDeviceType::Dxva2));
        registry.register(HwDeviceType::Dxva2, |codec| Box::new(Dxva2Renderer::new(codec)));
        assert!(registry.hardware_factory(HwDeviceType::Dxva2).is_some());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_offers_vaapi() {
        assert!(BackendRegistry::platform_default().has_hardware(HwDeviceType::Vaapi));
    }
}
