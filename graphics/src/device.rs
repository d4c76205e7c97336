//! Graphics device: validating front end of a GPU backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::backend::GpuBackend;
use crate::command::CommandBuffer;
use crate::error::GraphicsError;
use crate::instance::{AdapterInfo, BackendRegistry, BackendType, DeviceParameters};
use crate::object::{GraphicsObject, ObjectState};
use crate::resources::{Buffer, Texture};
use crate::swapchain::{Surface, SwapChain};
use crate::types::{BufferDescriptor, SwapChainDescriptor, TextureDescriptor};

bitflags! {
    /// Optional device features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        const TEARING = 1 << 0;
        const COMPUTE_SHADERS = 1 << 1;
        const INDIRECT_FIRST_INSTANCE = 1 << 2;
        const TEXTURE_COMPRESSION_BC = 1 << 3;
        const MULTI_VIEWPORT = 1 << 4;
        const SHADER_FLOAT16 = 1 << 5;
        const DEPTH_CLIP_CONTROL = 1 << 6;
    }
}

/// A single optional feature, as passed to [`GraphicsDevice::query_feature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Presenting with tearing when vsync is off.
    Tearing,
    /// Compute pipelines and dispatch.
    ComputeShaders,
    /// Non-zero `first_instance` in indirect draws.
    IndirectFirstInstance,
    /// BC1 to BC7 compressed textures.
    TextureCompressionBc,
    /// More than one viewport per pass.
    MultiViewport,
    /// 16-bit floats in shaders.
    ShaderFloat16,
    /// Disabling depth clipping.
    DepthClipControl,
}

impl Feature {
    /// The flag representing this feature.
    pub fn flag(self) -> Features {
        match self {
            Self::Tearing => Features::TEARING,
            Self::ComputeShaders => Features::COMPUTE_SHADERS,
            Self::IndirectFirstInstance => Features::INDIRECT_FIRST_INSTANCE,
            Self::TextureCompressionBc => Features::TEXTURE_COMPRESSION_BC,
            Self::MultiViewport => Features::MULTI_VIEWPORT,
            Self::ShaderFloat16 => Features::SHADER_FLOAT16,
            Self::DepthClipControl => Features::DEPTH_CLIP_CONTROL,
        }
    }
}

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_dimension: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
    /// Supported optional features.
    pub features: Features,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            max_buffer_size: 1 << 30, // 1 GB
            features: Features::COMPUTE_SHADERS,
        }
    }
}

impl DeviceCapabilities {
    /// Default limits with every optional feature.
    pub fn all_features() -> Self {
        Self::default().with_features(Features::all())
    }

    /// Replace the feature set.
    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }
}

/// A graphics device for creating GPU resources and submitting work.
///
/// The device validates every request and forwards it to the [`GpuBackend`]
/// chosen at creation. Resources keep the device alive through an `Arc`;
/// the device itself does not track them.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be safely shared across threads.
///
/// # Example
///
/// ```ignore
/// let device = GraphicsDevice::new(&DeviceParameters::from_env())?;
///
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))?;
/// let texture = device.create_texture(&TextureDescriptor::new_2d(
///     1920, 1080,
///     PixelFormat::Rgba8Unorm,
///     TextureUsage::RENDER_TARGET,
/// ))?;
/// ```
#[derive(Debug)]
pub struct GraphicsDevice {
    state: ObjectState,
    backend: Arc<dyn GpuBackend>,
    adapter_info: AdapterInfo,
    capabilities: DeviceCapabilities,
    frame_count: AtomicU64,
}

impl GraphicsDevice {
    /// Create a device using the backends compiled into this crate.
    pub fn new(params: &DeviceParameters) -> Result<Arc<Self>, GraphicsError> {
        Self::with_registry(&BackendRegistry::with_default_backends(), params)
    }

    /// Create a device using the backend `registry` selects for `params`.
    pub fn with_registry(
        registry: &BackendRegistry,
        params: &DeviceParameters,
    ) -> Result<Arc<Self>, GraphicsError> {
        let backend = registry.create(params)?;
        Ok(Self::from_backend(backend, params.label.as_deref()))
    }

    /// Wrap an already created backend.
    pub fn from_backend(backend: Arc<dyn GpuBackend>, label: Option<&str>) -> Arc<Self> {
        let adapter_info = backend.adapter_info();
        let capabilities = backend.capabilities();
        log::info!(
            "Created graphics device on {} ({}, {:?})",
            adapter_info.name,
            backend.name(),
            adapter_info.device_type
        );
        Arc::new(Self {
            state: ObjectState::new(label, "GraphicsDevice"),
            backend,
            adapter_info,
            capabilities,
            frame_count: AtomicU64::new(0),
        })
    }

    pub(crate) fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Get the backend type.
    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Get the adapter information.
    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.adapter_info
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Check whether an optional feature is supported.
    pub fn query_feature(&self, feature: Feature) -> bool {
        self.capabilities.features.contains(feature.flag())
    }

    /// Number of frames committed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }

    /// Finish the current frame. Returns the new frame count.
    pub fn commit_frame(&self) -> Result<u64, GraphicsError> {
        self.state.ensure_alive()?;
        let frame = self.frame_count.fetch_add(1, Ordering::AcqRel) + 1;
        self.backend.frame_committed(frame);
        log::trace!("GraphicsDevice: committed frame {frame}");
        Ok(frame)
    }

    /// Block until all submitted work has completed.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        self.backend.wait_idle()
    }

    fn validate_buffer(&self, descriptor: &BufferDescriptor) -> Result<(), GraphicsError> {
        descriptor.validate()?;
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }
        Ok(())
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is invalid, exceeds device limits or
    /// allocation fails.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        self.create_buffer_impl(descriptor, None)
    }

    /// Create a GPU buffer whose first `data.len()` bytes are `data`.
    pub fn create_buffer_with_data(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<Arc<Buffer>, GraphicsError> {
        if data.len() as u64 > descriptor.size {
            return Err(GraphicsError::InvalidParameter(format!(
                "initial data of {} bytes exceeds buffer size {}",
                data.len(),
                descriptor.size
            )));
        }
        self.create_buffer_impl(descriptor, Some(data))
    }

    fn create_buffer_impl(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        self.state.ensure_alive()?;
        self.validate_buffer(descriptor)?;

        let native = self.backend.create_buffer(descriptor, data)?;
        let buffer = Arc::new(Buffer::new(Arc::clone(self), descriptor.clone(), native));

        log::trace!(
            "GraphicsDevice: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );

        Ok(buffer)
    }

    fn validate_texture(&self, descriptor: &TextureDescriptor) -> Result<(), GraphicsError> {
        descriptor.validate()?;
        let max_dim = self.capabilities.max_texture_dimension;
        if descriptor.width > max_dim || descriptor.height > max_dim || descriptor.depth() > max_dim
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension exceeds maximum {max_dim}"
            )));
        }
        if descriptor.format.is_compressed() && !self.query_feature(Feature::TextureCompressionBc) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "{:?} requires BC texture compression",
                descriptor.format
            )));
        }
        Ok(())
    }

    /// Create a GPU texture. A `mip_level_count` of 0 allocates the full chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is invalid, exceeds device limits or
    /// allocation fails.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> Result<Arc<Texture>, GraphicsError> {
        self.create_texture_impl(descriptor, None)
    }

    /// Create a GPU texture with initial contents.
    ///
    /// `data` holds mip 0 of every layer (or every slice of a volume), tightly
    /// packed, and must cover it exactly.
    pub fn create_texture_with_data(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<Arc<Texture>, GraphicsError> {
        self.state.ensure_alive()?;
        self.validate_texture(descriptor)?;
        let expected = descriptor.initial_data_size().ok_or_else(|| {
            GraphicsError::InvalidParameter("initial texture data size overflows".into())
        })?;
        if data.len() as u64 != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "initial texture data is {} bytes, expected {expected}",
                data.len()
            )));
        }
        self.create_texture_impl(descriptor, Some(data))
    }

    fn create_texture_impl(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Arc<Texture>, GraphicsError> {
        self.state.ensure_alive()?;
        self.validate_texture(descriptor)?;

        let mut resolved = descriptor.clone();
        resolved.mip_level_count = descriptor.resolved_mip_level_count();

        let native = self.backend.create_texture(&resolved, data)?;
        let texture = Texture::new(Arc::clone(self), resolved, native);

        log::trace!(
            "GraphicsDevice: created texture {:?}, size={}x{}x{}, mips={}",
            descriptor.label,
            texture.width(),
            texture.height(),
            texture.depth_or_array_layers(),
            texture.mip_level_count()
        );

        Ok(texture)
    }

    /// Create a swap chain presenting to `surface`.
    pub fn create_swap_chain(
        self: &Arc<Self>,
        surface: &Arc<Surface>,
        descriptor: &SwapChainDescriptor,
    ) -> Result<Arc<SwapChain>, GraphicsError> {
        self.state.ensure_alive()?;
        descriptor.validate()?;

        let native = self.backend.create_swap_chain(surface, descriptor)?;
        let swap_chain = SwapChain::new(Arc::clone(self), surface, descriptor.clone(), native);

        log::info!(
            "Created swap chain {:?} ({}x{}, {:?})",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.present_mode
        );

        Ok(swap_chain)
    }

    /// Begin recording a new command buffer.
    pub fn begin_command_buffer(
        self: &Arc<Self>,
        label: &str,
    ) -> Result<CommandBuffer, GraphicsError> {
        self.state.ensure_alive()?;
        Ok(CommandBuffer::new(Arc::clone(self), label))
    }

    /// Submit one ended command buffer.
    pub fn submit(&self, command_buffer: CommandBuffer) -> Result<(), GraphicsError> {
        self.submit_all([command_buffer])
    }

    /// Submit ended command buffers in order, then present every swap chain
    /// they acquired.
    ///
    /// Every buffer is checked before anything reaches the backend; a single
    /// buffer that is still recording rejects the whole batch.
    pub fn submit_all<I>(&self, command_buffers: I) -> Result<(), GraphicsError>
    where
        I: IntoIterator<Item = CommandBuffer>,
    {
        self.state.ensure_alive()?;
        let command_buffers: Vec<CommandBuffer> = command_buffers.into_iter().collect();
        for command_buffer in &command_buffers {
            command_buffer.check_submittable(self)?;
        }

        let mut lists = Vec::with_capacity(command_buffers.len());
        let mut presentables: Vec<Arc<SwapChain>> = Vec::new();
        for command_buffer in &command_buffers {
            let (list, swap_chains) = command_buffer.take_submission();
            lists.push(list);
            for swap_chain in swap_chains {
                if !presentables.iter().any(|p| Arc::ptr_eq(p, &swap_chain)) {
                    presentables.push(swap_chain);
                }
            }
        }

        self.backend.submit_command_lists(&lists)?;
        log::trace!(
            "GraphicsDevice: submitted {} command list(s), presenting {} swap chain(s)",
            lists.len(),
            presentables.len()
        );

        let mut result = Ok(());
        for swap_chain in presentables {
            if let Err(err) = swap_chain.present() {
                log::error!("Failed to present '{}': {err}", swap_chain.label());
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }
}

impl GraphicsObject for GraphicsDevice {
    fn object_state(&self) -> &ObjectState {
        &self.state
    }

    fn destroy(&self) {
        log::info!("Destroying graphics device '{}'", self.label());
        if let Err(err) = self.backend.wait_idle() {
            log::error!("wait_idle failed during device teardown: {err}");
        }
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        self.dispose();
    }
}

// Ensure GraphicsDevice is Send + Sync
static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::object::GraphicsResource;
    use crate::types::{BufferUsage, PixelFormat, TextureUsage};

    fn create_test_device() -> (Arc<GraphicsDevice>, Arc<DummyBackend>) {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::from_backend(backend.clone(), Some("Test Device"));
        (device, backend)
    }

    #[test]
    fn test_device_info() {
        let (device, _) = create_test_device();
        assert_eq!(device.adapter_info().name, "Dummy Adapter");
        assert_eq!(device.backend_type(), BackendType::Dummy);
        assert_eq!(device.label(), "Test Device");
    }

    #[test]
    fn test_create_buffer() {
        let (device, backend) = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
            .unwrap();
        assert_eq!(buffer.size(), 1024);
        assert!(Arc::ptr_eq(buffer.device(), &device));
        assert_eq!(backend.stats().buffers_created, 1);
    }

    #[test]
    fn test_create_buffer_too_small() {
        let (device, backend) = create_test_device();
        let result = device.create_buffer(&BufferDescriptor::new(2, BufferUsage::VERTEX));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert_eq!(backend.stats().buffers_created, 0);
    }

    #[test]
    fn test_create_buffer_with_oversized_data() {
        let (device, backend) = create_test_device();
        let result = device
            .create_buffer_with_data(&BufferDescriptor::new(4, BufferUsage::UNIFORM), &[0; 8]);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert_eq!(backend.stats().buffers_created, 0);
    }

    #[test]
    fn test_create_texture_resolves_mips() {
        let (device, _) = create_test_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(256, 256, PixelFormat::Rgba8Unorm, TextureUsage::SHADER_READ)
                    .with_mip_levels(0),
            )
            .unwrap();
        assert_eq!(texture.mip_level_count(), 9);
        assert_eq!(texture.descriptor().mip_level_count, 9);
    }

    #[test]
    fn test_create_texture_exceeds_limits() {
        let (device, backend) = create_test_device();
        let result = device.create_texture(&TextureDescriptor::new_2d(
            32768,
            4,
            PixelFormat::Rgba8Unorm,
            TextureUsage::SHADER_READ,
        ));
        assert!(result.is_err());
        assert_eq!(backend.stats().textures_created, 0);
    }

    #[test]
    fn test_texture_data_size_is_checked() {
        let (device, _) = create_test_device();
        let desc = TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8Unorm, TextureUsage::SHADER_READ);
        assert!(device.create_texture_with_data(&desc, &[0; 63]).is_err());
        assert!(device.create_texture_with_data(&desc, &[0; 64]).is_ok());
    }

    #[test]
    fn test_compressed_formats_need_feature() {
        let backend = Arc::new(DummyBackend::with_capabilities(DeviceCapabilities::default()));
        let device = GraphicsDevice::from_backend(backend, None);
        let result = device.create_texture(&TextureDescriptor::new_2d(
            16,
            16,
            PixelFormat::Bc7RgbaUnorm,
            TextureUsage::SHADER_READ,
        ));
        assert!(matches!(result, Err(GraphicsError::FeatureNotSupported(_))));
    }

    #[test]
    fn test_query_feature() {
        let backend = Arc::new(DummyBackend::with_capabilities(
            DeviceCapabilities::default().with_features(Features::TEARING),
        ));
        let device = GraphicsDevice::from_backend(backend, None);
        assert!(device.query_feature(Feature::Tearing));
        assert!(!device.query_feature(Feature::ComputeShaders));
    }

    #[test]
    fn test_commit_frame() {
        let (device, backend) = create_test_device();
        assert_eq!(device.frame_count(), 0);
        assert_eq!(device.commit_frame().unwrap(), 1);
        assert_eq!(device.commit_frame().unwrap(), 2);
        assert_eq!(device.frame_count(), 2);
        assert_eq!(backend.stats().frames_committed, 2);
    }

    #[test]
    fn test_disposed_device_rejects_work() {
        let (device, backend) = create_test_device();
        device.dispose();
        assert_eq!(backend.stats().wait_idle_calls, 1);
        assert!(matches!(
            device.create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX)),
            Err(GraphicsError::ObjectDisposed(_))
        ));
        assert!(device.commit_frame().is_err());
        assert!(device.begin_command_buffer("late").is_err());
        device.dispose();
        assert_eq!(backend.stats().wait_idle_calls, 1);
    }
}
