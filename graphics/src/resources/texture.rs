//! GPU texture resource.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::TextureView;
use crate::backend::{GpuObjectRef, GpuTexture};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::object::{GraphicsObject, GraphicsResource, ObjectState};
use crate::types::{
    CpuAccessMode, PixelFormat, TextureDescriptor, TextureDimension, TextureSampleCount,
    TextureUsage, TextureViewDescriptor,
};

/// A GPU texture resource.
///
/// Textures are created by [`GraphicsDevice::create_texture`] and are reference-counted.
/// They hold a strong reference to their parent device, keeping it alive.
///
/// Each texture owns a cache of [`TextureView`]s keyed by
/// [`TextureViewDescriptor`]: asking twice for the same subresource range
/// returns the same view. Disposing the texture disposes every cached view
/// before the native texture is released.
///
/// # Example
///
/// ```ignore
/// let texture = device.create_texture(&TextureDescriptor::new_2d(
///     1920, 1080,
///     PixelFormat::Rgba8Unorm,
///     TextureUsage::RENDER_TARGET,
/// ))?;
/// let view = texture.view()?;
/// ```
pub struct Texture {
    state: ObjectState,
    device: Arc<GraphicsDevice>,
    descriptor: TextureDescriptor,
    native: RwLock<Option<GpuTexture>>,
    views: Mutex<HashMap<TextureViewDescriptor, Arc<TextureView>>>,
    self_ref: Weak<Texture>,
}

impl Texture {
    /// Create a new texture (called by GraphicsDevice and SwapChain).
    ///
    /// `descriptor.mip_level_count` must already be resolved.
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        descriptor: TextureDescriptor,
        native: GpuTexture,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            state: ObjectState::new(descriptor.label.as_deref(), "Texture"),
            device,
            descriptor,
            native: RwLock::new(Some(native)),
            views: Mutex::new(HashMap::new()),
            self_ref: self_ref.clone(),
        })
    }

    /// Get the texture descriptor (with the mip level count resolved).
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the texture dimension.
    pub fn dimension(&self) -> TextureDimension {
        self.descriptor.dimension
    }

    /// Get the texture width.
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    /// Get the texture height.
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    /// Depth for 3D textures, array layer count otherwise.
    pub fn depth_or_array_layers(&self) -> u32 {
        self.descriptor.depth_or_array_layers
    }

    /// Number of array layers (1 for 3D textures).
    pub fn array_layer_count(&self) -> u32 {
        self.descriptor.array_layer_count()
    }

    /// Get the texture format.
    pub fn format(&self) -> PixelFormat {
        self.descriptor.format
    }

    /// Get the usage flags.
    pub fn usage(&self) -> TextureUsage {
        self.descriptor.usage
    }

    /// Get the mip level count.
    pub fn mip_level_count(&self) -> u32 {
        self.descriptor.mip_level_count
    }

    /// Get the sample count.
    pub fn sample_count(&self) -> TextureSampleCount {
        self.descriptor.sample_count
    }

    /// Get the CPU access mode.
    pub fn cpu_access(&self) -> CpuAccessMode {
        self.descriptor.cpu_access
    }

    fn extent_at(&self, extent: u32, mip_level: u32) -> u32 {
        if mip_level == 0 || mip_level < self.descriptor.mip_level_count {
            extent.checked_shr(mip_level).unwrap_or(0).max(1)
        } else {
            0
        }
    }

    /// Width of `mip_level`, or 0 past the last level.
    pub fn width_at(&self, mip_level: u32) -> u32 {
        self.extent_at(self.descriptor.width, mip_level)
    }

    /// Height of `mip_level`, or 0 past the last level.
    pub fn height_at(&self, mip_level: u32) -> u32 {
        self.extent_at(self.descriptor.height, mip_level)
    }

    /// Depth of `mip_level` for 3D textures, or 0 past the last level.
    /// Always 1 for other dimensions.
    pub fn depth_at(&self, mip_level: u32) -> u32 {
        match self.descriptor.dimension {
            TextureDimension::D3 => self.extent_at(self.descriptor.depth_or_array_layers, mip_level),
            _ => 1,
        }
    }

    /// Flat subresource index of (`mip_level`, `array_slice`, `plane_slice`),
    /// or `None` if the index does not fit in a `u32`.
    pub fn calculate_subresource(
        &self,
        mip_level: u32,
        array_slice: u32,
        plane_slice: u32,
    ) -> Option<u32> {
        let mip_levels = self.descriptor.mip_level_count;
        let plane_stride = mip_levels.checked_mul(self.descriptor.depth_or_array_layers)?;
        array_slice
            .checked_mul(mip_levels)?
            .checked_add(plane_slice.checked_mul(plane_stride)?)?
            .checked_add(mip_level)
    }

    /// Native handle, or `None` once disposed.
    pub fn native_handle(&self) -> Option<GpuTexture> {
        self.native.read().clone()
    }

    /// View covering every mip level and layer.
    pub fn view(&self) -> Result<Arc<TextureView>, GraphicsError> {
        self.view_with(&TextureViewDescriptor::full(&self.descriptor))
    }

    /// View of the subresource range in `descriptor`, created on first use.
    ///
    /// Structurally equal descriptors always return the same view.
    pub fn view_with(
        &self,
        descriptor: &TextureViewDescriptor,
    ) -> Result<Arc<TextureView>, GraphicsError> {
        self.state.ensure_alive()?;
        descriptor.validate_against(&self.descriptor)?;

        let mut views = self.views.lock();
        if let Some(view) = views.get(descriptor) {
            return Ok(Arc::clone(view));
        }

        let native = self.native.read();
        let native = native
            .as_ref()
            .ok_or_else(|| GraphicsError::ObjectDisposed(self.label()))?;
        let native_view =
            self.device
                .backend()
                .create_texture_view(native, &self.descriptor, descriptor)?;

        let view = Arc::new(TextureView::new(
            Arc::clone(&self.device),
            self.self_ref.clone(),
            &self.descriptor,
            *descriptor,
            native_view,
            &format!("{} View", self.label()),
        ));
        views.insert(*descriptor, Arc::clone(&view));

        log::trace!(
            "Texture: created view of '{}' ({:?}, mips {}+{}, layers {}+{})",
            self.label(),
            descriptor.dimension,
            descriptor.base_mip_level,
            descriptor.mip_level_count,
            descriptor.base_array_layer,
            descriptor.array_layer_count
        );

        Ok(view)
    }

    /// Number of views currently cached.
    pub fn cached_view_count(&self) -> usize {
        self.views.lock().len()
    }
}

impl GraphicsObject for Texture {
    fn object_state(&self) -> &ObjectState {
        &self.state
    }

    fn on_label_changed(&self, label: &str) {
        if let Some(native) = self.native.read().as_ref() {
            self.device
                .backend()
                .set_object_label(GpuObjectRef::Texture(native), label);
        }
    }

    fn destroy(&self) {
        let views: Vec<Arc<TextureView>> = self.views.lock().drain().map(|(_, view)| view).collect();
        for view in &views {
            view.dispose();
        }
        if let Some(native) = self.native.write().take() {
            log::trace!(
                "Texture: releasing '{}' ({} cached views)",
                self.label(),
                views.len()
            );
            self.device.backend().destroy_texture(native);
        }
    }
}

impl GraphicsResource for Texture {
    fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("label", &self.label())
            .field("dimension", &self.descriptor.dimension)
            .field("width", &self.descriptor.width)
            .field("height", &self.descriptor.height)
            .field("depth_or_array_layers", &self.descriptor.depth_or_array_layers)
            .field("format", &self.descriptor.format)
            .field("usage", &self.descriptor.usage)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::types::TextureViewDimension;

    fn create_test_device() -> (Arc<GraphicsDevice>, Arc<DummyBackend>) {
        let backend = Arc::new(DummyBackend::new());
        (GraphicsDevice::from_backend(backend.clone(), None), backend)
    }

    fn texture_2d(device: &Arc<GraphicsDevice>, size: u32, mips: u32) -> Arc<Texture> {
        device
            .create_texture(
                &TextureDescriptor::new_2d(size, size, PixelFormat::Rgba8Unorm, TextureUsage::SHADER_READ)
                    .with_mip_levels(mips),
            )
            .unwrap()
    }

    #[test]
    fn test_texture_debug() {
        let (device, _) = create_test_device();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                1920,
                1080,
                PixelFormat::Rgba8Unorm,
                TextureUsage::RENDER_TARGET,
            ))
            .unwrap();
        let debug = format!("{:?}", texture);
        assert!(debug.contains("Texture"));
        assert!(debug.contains("1920"));
    }

    #[test]
    fn test_texture_dimensions() {
        let (device, _) = create_test_device();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                800,
                600,
                PixelFormat::Rgba8Unorm,
                TextureUsage::SHADER_READ,
            ))
            .unwrap();
        assert_eq!(texture.width(), 800);
        assert_eq!(texture.height(), 600);
        assert_eq!(texture.depth_at(0), 1);
        assert_eq!(texture.label(), "Texture");
    }

    #[test]
    fn test_width_at_clamps() {
        let (device, _) = create_test_device();
        let texture = texture_2d(&device, 16, 3);
        assert_eq!(texture.width_at(0), 16);
        assert_eq!(texture.width_at(1), 8);
        assert_eq!(texture.width_at(2), 4);
        assert_eq!(texture.width_at(3), 0);
        assert_eq!(texture.height_at(40), 0);
        assert_eq!(texture.depth_at(40), 1);
    }

    #[test]
    fn test_small_mips_clamp_to_one() {
        let (device, _) = create_test_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(8, 2, PixelFormat::R8Unorm, TextureUsage::SHADER_READ)
                    .with_mip_levels(0),
            )
            .unwrap();
        assert_eq!(texture.mip_level_count(), 4);
        assert_eq!(texture.height_at(3), 1);
        assert_eq!(texture.width_at(3), 1);
    }

    #[test]
    fn test_volume_depth_at() {
        let (device, _) = create_test_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_3d(8, 8, 8, PixelFormat::R8Unorm, TextureUsage::SHADER_READ)
                    .with_mip_levels(0),
            )
            .unwrap();
        assert_eq!(texture.depth_at(0), 8);
        assert_eq!(texture.depth_at(2), 2);
        assert_eq!(texture.depth_at(4), 0);
    }

    #[test]
    fn test_calculate_subresource() {
        let (device, _) = create_test_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(8, 8, PixelFormat::R8Unorm, TextureUsage::SHADER_READ)
                    .with_mip_levels(4)
                    .with_array_layers(6),
            )
            .unwrap();
        assert_eq!(texture.calculate_subresource(2, 3, 0), Some(14));
        assert_eq!(texture.calculate_subresource(0, 0, 1), Some(24));
        assert_eq!(texture.calculate_subresource(0, 0, 0), Some(0));
    }

    #[test]
    fn test_calculate_subresource_overflow() {
        let (device, _) = create_test_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(8, 8, PixelFormat::R8Unorm, TextureUsage::SHADER_READ)
                    .with_mip_levels(4)
                    .with_array_layers(2048),
            )
            .unwrap();
        assert_eq!(texture.calculate_subresource(3, 2047, 0), Some(8191));
        assert_eq!(texture.calculate_subresource(0, 0, 600_000), None);
        assert_eq!(texture.calculate_subresource(0, u32::MAX, 0), None);
    }

    #[test]
    fn test_view_cache() {
        let (device, backend) = create_test_device();
        let texture = texture_2d(&device, 64, 0);

        let full = texture.view().unwrap();
        assert!(Arc::ptr_eq(&full, &texture.view().unwrap()));
        let explicit = texture
            .view_with(&TextureViewDescriptor::full(texture.descriptor()))
            .unwrap();
        assert!(Arc::ptr_eq(&full, &explicit));

        let top = TextureViewDescriptor::full(texture.descriptor()).with_mip_range(0, 1);
        let top_view = texture.view_with(&top).unwrap();
        assert!(!Arc::ptr_eq(&full, &top_view));
        assert!(Arc::ptr_eq(&top_view, &texture.view_with(&top).unwrap()));

        assert_eq!(texture.cached_view_count(), 2);
        assert_eq!(backend.stats().views_created, 2);
    }

    #[test]
    fn test_invalid_view_range() {
        let (device, _) = create_test_device();
        let texture = texture_2d(&device, 16, 3);
        let desc = TextureViewDescriptor::full(texture.descriptor()).with_mip_range(2, 2);
        assert!(matches!(
            texture.view_with(&desc),
            Err(GraphicsError::InvalidParameter(_))
        ));
        let desc = TextureViewDescriptor::full(texture.descriptor())
            .with_dimension(TextureViewDimension::Cube);
        assert!(texture.view_with(&desc).is_err());
        assert_eq!(texture.cached_view_count(), 0);
    }

    #[test]
    fn test_dispose_cascades_to_views() {
        let (device, backend) = create_test_device();
        let texture = texture_2d(&device, 32, 0);
        let full = texture.view().unwrap();
        let top = texture
            .view_with(&TextureViewDescriptor::full(texture.descriptor()).with_mip_range(0, 1))
            .unwrap();

        texture.dispose();
        texture.dispose();
        assert!(full.is_disposed());
        assert!(top.is_disposed());
        assert_eq!(texture.cached_view_count(), 0);

        let stats = backend.stats();
        assert_eq!(stats.views_destroyed, 2);
        assert_eq!(stats.textures_destroyed, 1);
        assert!(matches!(texture.view(), Err(GraphicsError::ObjectDisposed(_))));
        assert!(texture.set_label("gone").is_err());

        drop(texture);
        assert_eq!(backend.stats().textures_destroyed, 1);
    }

    #[test]
    fn test_view_outlives_texture_handle() {
        let (device, backend) = create_test_device();
        let texture = texture_2d(&device, 32, 1);
        let view = texture.view().unwrap();
        assert!(view.texture().is_some());
        drop(texture);
        assert!(view.texture().is_none());
        assert!(view.is_disposed());
        assert_eq!(backend.stats().views_destroyed, 1);
    }
}
