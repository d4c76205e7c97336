//! # Vortice Graphics
//!
//! Backend-agnostic GPU resource, device and command layer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsDevice`] - Creates resources, records command buffers and commits frames
//! - [`Buffer`], [`Texture`], [`TextureView`] - Device-owned GPU resources
//! - [`CommandBuffer`] - Render/compute pass recording with a strict encoder state machine
//! - [`SwapChain`] - Presentation to a [`Surface`] with present-mode policy
//! - Multiple backend support: wgpu and Dummy (for testing)
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vortice_graphics::*;
//!
//! let device = GraphicsDevice::from_backend(Arc::new(DummyBackend::new()), Some("Main"));
//! let surface = Surface::headless(640, 480);
//! let swap_chain = device
//!     .create_swap_chain(&surface, &SwapChainDescriptor::new(640, 480))
//!     .unwrap();
//!
//! let cb = device.begin_command_buffer("Frame").unwrap();
//! if let Some(back_buffer) = cb.acquire_swap_chain_texture(&swap_chain).unwrap() {
//!     let pass = RenderPassDescriptor::new()
//!         .with_color(ColorAttachment::new(back_buffer.view().unwrap()).with_clear(Color::BLACK));
//!     cb.begin_render_pass(&pass).unwrap().end();
//! }
//! cb.end().unwrap();
//! device.submit(cb).unwrap();
//! device.commit_frame().unwrap();
//! ```

pub mod backend;
pub mod command;
pub mod device;
pub mod error;
pub mod instance;
pub mod object;
pub mod resources;
pub mod swapchain;
pub mod types;

// Re-export main types for convenience
pub use backend::GpuBackend;
pub use backend::dummy::{DummyBackend, DummyStats, PresentRecord, SubmittedList};
pub use command::{
    ColorAttachment, CommandBuffer, CommandBufferStatus, CommandKind, CommandList,
    ComputePassEncoder, DepthStencilAttachment, RecordedCommand, RenderPassDescriptor,
    RenderPassEncoder,
};
pub use device::{DeviceCapabilities, Feature, Features, GraphicsDevice};
pub use error::GraphicsError;
pub use instance::{
    AdapterInfo, AdapterType, BackendRegistry, BackendType, DeviceParameters, PowerPreference,
};
pub use object::{GraphicsObject, GraphicsResource, ObjectState};
pub use resources::{Buffer, Texture, TextureView};
pub use swapchain::{Surface, SwapChain, WindowSource};
pub use types::*;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Vortice Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
    }

    #[test]
    fn test_dummy_device() {
        let device = GraphicsDevice::from_backend(Arc::new(DummyBackend::new()), None);
        assert_eq!(device.backend_type(), BackendType::Dummy);
    }
}
