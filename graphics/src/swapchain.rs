//! Swap chain and surface management.
//!
//! This module provides abstractions for presenting rendered frames to a window.
//!
//! # Overview
//!
//! - [`Surface`] - A presentable target: a window handle source, or headless
//! - [`SwapChain`] - Back buffers of a surface, resize tracking and presentation
//!
//! # Example
//!
//! ```ignore
//! use vortice_graphics::{Surface, SwapChainDescriptor, PresentMode};
//!
//! let surface = Surface::from_window(window.clone(), width, height);
//! let swap_chain = device.create_swap_chain(
//!     &surface,
//!     &SwapChainDescriptor::new(width, height).with_present_mode(PresentMode::Mailbox),
//! )?;
//!
//! // In render loop:
//! let mut commands = device.begin_command_buffer("Frame")?;
//! if let Some(back_buffer) = commands.acquire_swap_chain_texture(&swap_chain)? {
//!     // ... render to back_buffer.view()? ...
//! }
//! commands.end()?;
//! device.submit(commands)?; // presents the swap chain
//! ```

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::{GpuObjectRef, GpuSwapChain};
use crate::device::{Feature, GraphicsDevice};
use crate::error::GraphicsError;
use crate::object::{GraphicsObject, GraphicsResource, ObjectState};
use crate::resources::Texture;
use crate::types::{
    PixelFormat, PresentMode, PresentParams, SwapChainDescriptor, TextureDescriptor,
    TextureUsage, present_mode_to_buffer_count,
};

/// Anything that can hand out raw window and display handles.
pub trait WindowSource: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T: HasWindowHandle + HasDisplayHandle + Send + Sync> WindowSource for T {}

/// A surface for presenting rendered frames.
///
/// The windowing layer owns the surface and reports client-area changes
/// through [`Surface::resize`]. Swap chains only hold a weak reference.
pub struct Surface {
    window: Option<Arc<dyn WindowSource>>,
    size: Mutex<(u32, u32)>,
}

impl Surface {
    /// Create a surface with no window, for offscreen and test rendering.
    pub fn headless(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            window: None,
            size: Mutex::new((width, height)),
        })
    }

    /// Create a surface for a window.
    pub fn from_window<W: WindowSource + 'static>(window: Arc<W>, width: u32, height: u32) -> Arc<Self> {
        log::info!("Creating surface from window ({width}x{height})");
        let window: Arc<dyn WindowSource> = window;
        Arc::new(Self {
            window: Some(window),
            size: Mutex::new((width, height)),
        })
    }

    /// Current client size in pixels. Zero when minimized.
    pub fn size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    /// Record a new client size.
    pub fn resize(&self, width: u32, height: u32) {
        *self.size.lock() = (width, height);
    }

    /// Check whether the surface has no window.
    pub fn is_headless(&self) -> bool {
        self.window.is_none()
    }

    /// The window handle source, if any.
    pub fn window(&self) -> Option<&Arc<dyn WindowSource>> {
        self.window.as_ref()
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("size", &self.size())
            .field("headless", &self.is_headless())
            .finish()
    }
}

/// Back buffers attached to a [`Surface`].
///
/// Created by [`GraphicsDevice::create_swap_chain`]. Back buffers are acquired
/// through [`CommandBuffer::acquire_swap_chain_texture`] and presented when
/// that command buffer is submitted.
///
/// [`CommandBuffer::acquire_swap_chain_texture`]: crate::CommandBuffer::acquire_swap_chain_texture
pub struct SwapChain {
    state: ObjectState,
    device: Arc<GraphicsDevice>,
    surface: Weak<Surface>,
    color_format: PixelFormat,
    present_mode: PresentMode,
    is_fullscreen: bool,
    auto_resize_drawable: bool,
    drawable_size: Mutex<(u32, u32)>,
    native: RwLock<Option<GpuSwapChain>>,
    current_texture: Mutex<Option<Arc<Texture>>>,
}

impl SwapChain {
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        surface: &Arc<Surface>,
        descriptor: SwapChainDescriptor,
        native: GpuSwapChain,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: ObjectState::new(descriptor.label.as_deref(), "SwapChain"),
            device,
            surface: Arc::downgrade(surface),
            color_format: descriptor.color_format,
            present_mode: descriptor.present_mode,
            is_fullscreen: descriptor.is_fullscreen,
            auto_resize_drawable: descriptor.auto_resize_drawable,
            drawable_size: Mutex::new((descriptor.width, descriptor.height)),
            native: RwLock::new(Some(native)),
            current_texture: Mutex::new(None),
        })
    }

    /// The surface, if it is still alive.
    pub fn surface(&self) -> Option<Arc<Surface>> {
        self.surface.upgrade()
    }

    /// Back buffer format.
    pub fn color_format(&self) -> PixelFormat {
        self.color_format
    }

    /// Presentation mode.
    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    /// Number of back buffers.
    pub fn buffer_count(&self) -> u32 {
        present_mode_to_buffer_count(self.present_mode)
    }

    /// Whether exclusive fullscreen was requested.
    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    /// Whether back buffers follow the surface size automatically.
    pub fn auto_resize_drawable(&self) -> bool {
        self.auto_resize_drawable
    }

    /// Current back buffer size.
    pub fn drawable_size(&self) -> (u32, u32) {
        *self.drawable_size.lock()
    }

    /// The back buffer acquired for the current frame, if any.
    pub fn current_texture(&self) -> Option<Arc<Texture>> {
        self.current_texture.lock().clone()
    }

    /// Check whether the native back buffers or the surface disagree with
    /// [`drawable_size`](Self::drawable_size).
    ///
    /// A zero-sized (minimized) surface never requests a resize.
    pub fn needs_resize(&self) -> bool {
        let drawable = self.drawable_size();
        if let Some(native) = self.native.read().as_ref()
            && self.device.backend().swap_chain_extent(native) != drawable
        {
            return true;
        }
        match self.surface.upgrade() {
            Some(surface) => {
                let size = surface.size();
                size.0 != 0 && size.1 != 0 && size != drawable
            }
            None => false,
        }
    }

    /// Recreate the back buffers at `width` x `height`.
    ///
    /// Waits for the device to go idle and releases the current back buffer first.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "swap chain extent must be non-zero, got {width}x{height}"
            )));
        }

        self.device.wait_idle()?;
        self.release_current_texture();

        let native = self.native.read();
        let native = native
            .as_ref()
            .ok_or_else(|| GraphicsError::ObjectDisposed(self.label()))?;
        self.device.backend().resize_swap_chain(native, width, height)?;
        *self.drawable_size.lock() = (width, height);

        log::info!("Resized swap chain '{}' to {width}x{height}", self.label());
        Ok(())
    }

    /// Acquire the back buffer for this frame.
    ///
    /// `Ok(None)` means the frame should not be presented: the surface is
    /// zero-sized, a resize is pending without `auto_resize_drawable`, or the
    /// native swap chain is out of date.
    pub(crate) fn acquire_next_texture(&self) -> Result<Option<Arc<Texture>>, GraphicsError> {
        self.state.ensure_alive()?;
        if let Some(texture) = self.current_texture() {
            return Ok(Some(texture));
        }

        let surface = self.surface.upgrade().ok_or(GraphicsError::SurfaceLost)?;
        let (surface_width, surface_height) = surface.size();
        if surface_width == 0 || surface_height == 0 {
            log::trace!("SwapChain '{}': surface is zero-sized, skipping frame", self.label());
            return Ok(None);
        }

        if self.needs_resize() {
            if !self.auto_resize_drawable {
                log::trace!("SwapChain '{}': resize pending, skipping frame", self.label());
                return Ok(None);
            }
            self.resize(surface_width, surface_height)?;
        }

        let acquired = {
            let native = self.native.read();
            let native = native
                .as_ref()
                .ok_or_else(|| GraphicsError::ObjectDisposed(self.label()))?;
            self.device.backend().acquire_next_texture(native)
        };
        let native_texture = match acquired {
            Ok(Some(texture)) => texture,
            Ok(None) => return Ok(None),
            Err(GraphicsError::SurfaceOutdated) => {
                log::warn!("SwapChain '{}' is out of date, skipping frame", self.label());
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let (width, height) = self.drawable_size();
        let descriptor =
            TextureDescriptor::new_2d(width, height, self.color_format, TextureUsage::RENDER_TARGET)
                .with_label(format!("{} Back Buffer", self.label()));
        let texture = Texture::new(Arc::clone(&self.device), descriptor, native_texture);
        *self.current_texture.lock() = Some(Arc::clone(&texture));
        Ok(Some(texture))
    }

    /// Present the acquired back buffer.
    ///
    /// Immediate and Mailbox present with sync interval 0 (tearing allowed when
    /// the device supports it); Fifo waits for one vertical blank.
    pub fn present(&self) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        let texture = self.current_texture.lock().take().ok_or_else(|| {
            GraphicsError::InvalidOperation(format!(
                "swap chain '{}' has no acquired back buffer",
                self.label()
            ))
        })?;

        let params =
            PresentParams::for_mode(self.present_mode, self.device.query_feature(Feature::Tearing));
        let result = {
            let native = self.native.read();
            let native = native
                .as_ref()
                .ok_or_else(|| GraphicsError::ObjectDisposed(self.label()))?;
            self.device.backend().present(native, params)
        };
        texture.dispose();

        match result {
            Err(GraphicsError::SurfaceOutdated) => {
                log::warn!("SwapChain '{}' went out of date during present", self.label());
                Ok(())
            }
            other => other,
        }
    }

    fn release_current_texture(&self) {
        if let Some(texture) = self.current_texture.lock().take() {
            texture.dispose();
        }
    }
}

impl GraphicsObject for SwapChain {
    fn object_state(&self) -> &ObjectState {
        &self.state
    }

    fn on_label_changed(&self, label: &str) {
        if let Some(native) = self.native.read().as_ref() {
            self.device
                .backend()
                .set_object_label(GpuObjectRef::SwapChain(native), label);
        }
    }

    fn destroy(&self) {
        self.release_current_texture();
        if let Some(native) = self.native.write().take() {
            log::info!("Destroying swap chain '{}'", self.label());
            self.device.backend().destroy_swap_chain(native);
        }
    }
}

impl GraphicsResource for SwapChain {
    fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for SwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapChain")
            .field("label", &self.label())
            .field("drawable_size", &self.drawable_size())
            .field("color_format", &self.color_format)
            .field("present_mode", &self.present_mode)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// Ensure SwapChain and Surface are Send + Sync
static_assertions::assert_impl_all!(SwapChain: Send, Sync);
static_assertions::assert_impl_all!(Surface: Send, Sync);
