//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the graphics system.

mod buffer;
mod common;
mod swapchain;
mod texture;
mod view;

pub use buffer::{BufferDescriptor, BufferUsage, CpuAccessMode, IndexFormat, MIN_BUFFER_SIZE};
pub use common::{Color, LoadAction, ScissorRect, StoreAction, Viewport};
pub use swapchain::{PresentMode, PresentParams, SwapChainDescriptor, present_mode_to_buffer_count};
pub use texture::{
    PixelFormat, TextureDescriptor, TextureDimension, TextureSampleCount, TextureUsage,
    mip_level_count_for_extent,
};
pub use view::{TextureViewDescriptor, TextureViewDimension};
