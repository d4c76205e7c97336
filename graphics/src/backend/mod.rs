//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction for GPU backends,
//! allowing the graphics crate to work with different GPU APIs.
//!
//! # Available Backends
//!
//! - `dummy` (default): Recording no-op backend for testing and development
//! - `wgpu-backend`: Cross-platform backend using wgpu
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait. The [`GraphicsDevice`]
//! validates every request before it reaches the backend, so backends only
//! translate descriptors into native objects and native errors into
//! [`GraphicsError`]. Native objects travel through the `Gpu*` handle enums.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

pub mod dummy;

#[cfg(feature = "wgpu-backend")]
use std::sync::Arc;

use crate::command::CommandList;
use crate::device::DeviceCapabilities;
use crate::error::GraphicsError;
use crate::instance::{AdapterInfo, BackendType};
use crate::swapchain::Surface;
use crate::types::{
    BufferDescriptor, PresentParams, SwapChainDescriptor, TextureDescriptor,
    TextureViewDescriptor,
};

/// Handle to a GPU buffer resource.
pub enum GpuBuffer {
    /// Dummy backend buffer
    Dummy { id: u64 },
    /// wgpu backend buffer
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::Buffer>),
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy { id } => write!(f, "GpuBuffer::Dummy({id})"),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(buffer) => f.debug_tuple("GpuBuffer::Wgpu").field(buffer).finish(),
        }
    }
}

impl Clone for GpuBuffer {
    fn clone(&self) -> Self {
        match self {
            Self::Dummy { id } => Self::Dummy { id: *id },
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(buffer) => Self::Wgpu(buffer.clone()),
        }
    }
}

/// Handle to a GPU texture resource.
pub enum GpuTexture {
    /// Dummy backend texture. `back_buffer` marks swap chain images.
    Dummy { id: u64, back_buffer: bool },
    /// wgpu backend texture
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::Texture>),
}

impl std::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy { id, back_buffer } => f
                .debug_struct("GpuTexture::Dummy")
                .field("id", id)
                .field("back_buffer", back_buffer)
                .finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(texture) => f.debug_tuple("GpuTexture::Wgpu").field(texture).finish(),
        }
    }
}

impl Clone for GpuTexture {
    fn clone(&self) -> Self {
        match self {
            Self::Dummy { id, back_buffer } => Self::Dummy {
                id: *id,
                back_buffer: *back_buffer,
            },
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(texture) => Self::Wgpu(texture.clone()),
        }
    }
}

/// Handle to a GPU texture view.
pub enum GpuTextureView {
    /// Dummy backend view
    Dummy { id: u64 },
    /// wgpu backend view
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::TextureView>),
}

impl std::fmt::Debug for GpuTextureView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy { id } => write!(f, "GpuTextureView::Dummy({id})"),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(view) => f.debug_tuple("GpuTextureView::Wgpu").field(view).finish(),
        }
    }
}

impl Clone for GpuTextureView {
    fn clone(&self) -> Self {
        match self {
            Self::Dummy { id } => Self::Dummy { id: *id },
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(view) => Self::Wgpu(view.clone()),
        }
    }
}

/// Handle to a native swap chain.
pub enum GpuSwapChain {
    /// Dummy backend swap chain
    Dummy(dummy::DummySwapChain),
    /// wgpu backend swap chain
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu_backend::WgpuSwapChain),
}

impl std::fmt::Debug for GpuSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(swap_chain) => f
                .debug_tuple("GpuSwapChain::Dummy")
                .field(swap_chain)
                .finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(_) => write!(f, "GpuSwapChain::Wgpu"),
        }
    }
}

/// Borrowed reference to any native object that can carry a debug name.
#[derive(Debug, Clone, Copy)]
pub enum GpuObjectRef<'a> {
    Buffer(&'a GpuBuffer),
    Texture(&'a GpuTexture),
    TextureView(&'a GpuTextureView),
    SwapChain(&'a GpuSwapChain),
}

/// Interface every GPU backend implements.
///
/// Descriptors reaching these methods are already validated. Implementations
/// translate native failures into [`GraphicsError`] and never panic on them.
pub trait GpuBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Which backend this is.
    fn backend_type(&self) -> BackendType;

    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Information about the adapter in use.
    fn adapter_info(&self) -> AdapterInfo;

    /// Limits and optional features of the device.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Create a buffer, optionally filled with `initial_data`.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuBuffer, GraphicsError>;

    /// Write `data` into `buffer` at `offset` through the queue.
    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Create a texture, optionally uploading `initial_data` into mip 0 of every layer.
    ///
    /// `descriptor.mip_level_count` is already resolved.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuTexture, GraphicsError>;

    /// Create a view of `texture`.
    fn create_texture_view(
        &self,
        texture: &GpuTexture,
        texture_descriptor: &TextureDescriptor,
        descriptor: &TextureViewDescriptor,
    ) -> Result<GpuTextureView, GraphicsError>;

    /// Create a swap chain presenting to `surface`.
    fn create_swap_chain(
        &self,
        surface: &Surface,
        descriptor: &SwapChainDescriptor,
    ) -> Result<GpuSwapChain, GraphicsError>;

    /// Recreate the back buffers of `swap_chain` at a new size.
    fn resize_swap_chain(
        &self,
        swap_chain: &GpuSwapChain,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError>;

    /// Current back buffer extent of `swap_chain`.
    fn swap_chain_extent(&self, swap_chain: &GpuSwapChain) -> (u32, u32);

    /// Acquire the next back buffer. `Ok(None)` means nothing can be presented
    /// this frame.
    fn acquire_next_texture(
        &self,
        swap_chain: &GpuSwapChain,
    ) -> Result<Option<GpuTexture>, GraphicsError>;

    /// Present the most recently acquired back buffer.
    fn present(&self, swap_chain: &GpuSwapChain, params: PresentParams)
    -> Result<(), GraphicsError>;

    /// Execute finished command lists in order.
    fn submit_command_lists(&self, lists: &[CommandList]) -> Result<(), GraphicsError>;

    /// Block until all submitted work has completed.
    fn wait_idle(&self) -> Result<(), GraphicsError>;

    /// Notification that the application finished a frame.
    fn frame_committed(&self, _frame_index: u64) {}

    /// Forward a debug label to a native object. Must not fail.
    fn set_object_label(&self, object: GpuObjectRef<'_>, label: &str);

    /// Release a native buffer.
    fn destroy_buffer(&self, buffer: GpuBuffer) {
        drop(buffer);
    }

    /// Release a native texture.
    fn destroy_texture(&self, texture: GpuTexture) {
        drop(texture);
    }

    /// Release a native texture view.
    fn destroy_texture_view(&self, view: GpuTextureView) {
        drop(view);
    }

    /// Release a native swap chain.
    fn destroy_swap_chain(&self, swap_chain: GpuSwapChain) {
        drop(swap_chain);
    }
}

static_assertions::assert_obj_safe!(GpuBackend);
