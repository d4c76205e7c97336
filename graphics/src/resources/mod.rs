//! GPU resources.
//!
//! This module contains the GPU resource types that are created by [`GraphicsDevice`]:
//! - [`Buffer`] - GPU memory buffer
//! - [`Texture`] - GPU texture/image with its view cache
//! - [`TextureView`] - Subresource range of a texture
//!
//! Resources are reference-counted with [`Arc`] and can be shared across threads.
//! Each resource holds a strong reference to its parent device and releases its
//! native object exactly once, on `dispose()` or drop.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice
//! [`Arc`]: std::sync::Arc

mod buffer;
mod texture;
mod view;

pub use buffer::Buffer;
pub use texture::Texture;
pub use view::TextureView;
