//! Texture view resource.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::Texture;
use crate::backend::{GpuObjectRef, GpuTextureView};
use crate::device::GraphicsDevice;
use crate::object::{GraphicsObject, GraphicsResource, ObjectState};
use crate::types::{
    PixelFormat, TextureDescriptor, TextureUsage, TextureViewDescriptor, TextureViewDimension,
};

/// A view of a subresource range of a [`Texture`].
///
/// Views are obtained from [`Texture::view`] / [`Texture::view_with`] and are
/// owned by the texture's view cache. A view only holds a weak link back to
/// its texture and is disposed together with it.
pub struct TextureView {
    state: ObjectState,
    device: Arc<GraphicsDevice>,
    texture: Weak<Texture>,
    descriptor: TextureViewDescriptor,
    format: PixelFormat,
    usage: TextureUsage,
    width: u32,
    height: u32,
    native: RwLock<Option<GpuTextureView>>,
}

impl TextureView {
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        texture: Weak<Texture>,
        texture_descriptor: &TextureDescriptor,
        descriptor: TextureViewDescriptor,
        native: GpuTextureView,
        label: &str,
    ) -> Self {
        let base = descriptor.base_mip_level;
        Self {
            state: ObjectState::new(Some(label), "TextureView"),
            device,
            texture,
            descriptor,
            format: texture_descriptor.format,
            usage: texture_descriptor.usage,
            width: texture_descriptor.width.checked_shr(base).unwrap_or(0).max(1),
            height: texture_descriptor.height.checked_shr(base).unwrap_or(0).max(1),
            native: RwLock::new(Some(native)),
        }
    }

    /// The viewed texture, if it is still alive.
    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.texture.upgrade()
    }

    /// Get the view descriptor.
    pub fn descriptor(&self) -> &TextureViewDescriptor {
        &self.descriptor
    }

    /// Get the view dimension.
    pub fn dimension(&self) -> TextureViewDimension {
        self.descriptor.dimension
    }

    /// Get the format of the viewed texture.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Get the usage flags of the viewed texture.
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    /// Width of the view's base mip level.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the view's base mip level.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Native handle, or `None` once disposed.
    pub fn native_handle(&self) -> Option<GpuTextureView> {
        self.native.read().clone()
    }
}

impl GraphicsObject for TextureView {
    fn object_state(&self) -> &ObjectState {
        &self.state
    }

    fn on_label_changed(&self, label: &str) {
        if let Some(native) = self.native.read().as_ref() {
            self.device
                .backend()
                .set_object_label(GpuObjectRef::TextureView(native), label);
        }
    }

    fn destroy(&self) {
        if let Some(native) = self.native.write().take() {
            self.device.backend().destroy_texture_view(native);
        }
    }
}

impl GraphicsResource for TextureView {
    fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }
}

impl Drop for TextureView {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for TextureView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureView")
            .field("label", &self.label())
            .field("descriptor", &self.descriptor)
            .field("format", &self.format)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// Ensure TextureView is Send + Sync
static_assertions::assert_impl_all!(TextureView: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_view_properties() {
        let device = GraphicsDevice::from_backend(Arc::new(DummyBackend::new()), None);
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(64, 32, PixelFormat::Rgba16Float, TextureUsage::RENDER_TARGET)
                    .with_label("HDR")
                    .with_mip_levels(0),
            )
            .unwrap();
        let view = texture
            .view_with(&TextureViewDescriptor::full(texture.descriptor()).with_mip_range(2, 1))
            .unwrap();
        assert_eq!(view.width(), 16);
        assert_eq!(view.height(), 8);
        assert_eq!(view.format(), PixelFormat::Rgba16Float);
        assert_eq!(view.dimension(), TextureViewDimension::D2);
        assert_eq!(view.label(), "HDR View");
        assert!(Arc::ptr_eq(&view.texture().unwrap(), &texture));
        assert!(Arc::ptr_eq(view.device(), &device));
    }

    #[test]
    fn test_view_label() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::from_backend(backend.clone(), None);
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                4,
                4,
                PixelFormat::R8Unorm,
                TextureUsage::SHADER_READ,
            ))
            .unwrap();
        let view = texture.view().unwrap();
        view.set_label("Mask SRV").unwrap();
        assert_eq!(backend.label_history().last().unwrap().1, "Mask SRV");
    }
}
