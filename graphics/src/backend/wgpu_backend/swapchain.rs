//! wgpu surface implementation.
//!
//! This module contains the wgpu-specific surface and surface texture handling.

use std::sync::Arc;

use parking_lot::Mutex;

use super::WgpuBackend;
use super::conversion::{convert_present_mode, convert_texture_format};
use crate::backend::GpuTexture;
use crate::error::GraphicsError;
use crate::swapchain::Surface;
use crate::types::{PresentParams, SwapChainDescriptor, present_mode_to_buffer_count};

/// A configured wgpu surface and its in-flight surface texture.
pub struct WgpuSwapChain {
    surface: wgpu::Surface<'static>,
    config: Mutex<wgpu::SurfaceConfiguration>,
    current: Mutex<Option<wgpu::SurfaceTexture>>,
}

impl WgpuSwapChain {
    pub(super) fn new(
        backend: &WgpuBackend,
        surface: &Surface,
        descriptor: &SwapChainDescriptor,
    ) -> Result<Self, GraphicsError> {
        let window = surface.window().ok_or_else(|| {
            GraphicsError::InvalidParameter("wgpu cannot present to a headless surface".into())
        })?;
        let wgpu_surface = backend
            .instance()
            .create_surface(Arc::clone(window))
            .map_err(|e| GraphicsError::ResourceCreationFailed(format!("surface creation failed: {e}")))?;

        let format = convert_texture_format(descriptor.color_format).ok_or_else(|| {
            GraphicsError::InvalidParameter("swap chain format must not be Undefined".into())
        })?;
        let caps = wgpu_surface.get_capabilities(backend.adapter());
        if !caps.formats.contains(&format) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "surface does not support {:?}",
                descriptor.color_format
            )));
        }

        let mut present_mode = convert_present_mode(descriptor.present_mode);
        if !caps.present_modes.contains(&present_mode) {
            log::warn!(
                "Present mode {:?} unsupported by surface, falling back to Fifo",
                descriptor.present_mode
            );
            present_mode = wgpu::PresentMode::Fifo;
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: descriptor.width,
            height: descriptor.height,
            present_mode,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: present_mode_to_buffer_count(descriptor.present_mode)
                .saturating_sub(1)
                .max(1),
        };
        wgpu_surface.configure(backend.device(), &config);
        log::info!(
            "Configured wgpu surface {}x{} ({:?})",
            config.width,
            config.height,
            config.present_mode
        );

        Ok(Self {
            surface: wgpu_surface,
            config: Mutex::new(config),
            current: Mutex::new(None),
        })
    }

    pub(super) fn extent(&self) -> (u32, u32) {
        let config = self.config.lock();
        (config.width, config.height)
    }

    pub(super) fn resize(&self, device: &wgpu::Device, width: u32, height: u32) {
        // The old surface texture must be released before reconfiguring.
        self.current.lock().take();
        let mut config = self.config.lock();
        config.width = width;
        config.height = height;
        self.surface.configure(device, &config);
    }

    pub(super) fn acquire(&self) -> Result<Option<GpuTexture>, GraphicsError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("wgpu surface outdated or timed out, skipping frame");
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Lost) => return Err(GraphicsError::SurfaceLost),
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(GraphicsError::OutOfMemory),
            Err(e) => {
                return Err(GraphicsError::Backend(format!(
                    "failed to acquire surface texture: {e}"
                )));
            }
        };
        if surface_texture.suboptimal {
            log::debug!("wgpu surface texture is suboptimal");
        }

        let texture = GpuTexture::Wgpu(Arc::new(surface_texture.texture.clone()));
        *self.current.lock() = Some(surface_texture);
        Ok(Some(texture))
    }

    pub(super) fn present(&self, params: PresentParams) -> Result<(), GraphicsError> {
        let surface_texture = self.current.lock().take().ok_or_else(|| {
            GraphicsError::InvalidOperation("no surface texture acquired".into())
        })?;
        // Sync interval and tearing are fixed by the configured present mode.
        log::trace!("wgpu present {params:?}");
        surface_texture.present();
        Ok(())
    }
}

impl Drop for WgpuSwapChain {
    fn drop(&mut self) {
        self.current.get_mut().take();
    }
}
