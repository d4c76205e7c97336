//! wgpu GPU backend implementation.
//!
//! This backend uses wgpu for cross-platform GPU access, supporting
//! Vulkan, Metal, DX12, and WebGPU. Command lists are replayed into one
//! `wgpu::CommandEncoder` each and submitted together.

pub(crate) mod conversion;
mod pass_encoding;
mod resources;
mod swapchain;

use std::sync::Arc;

use parking_lot::Mutex;

pub use swapchain::WgpuSwapChain;

use super::{GpuBackend, GpuBuffer, GpuObjectRef, GpuSwapChain, GpuTexture, GpuTextureView};
use crate::command::CommandList;
use crate::device::{DeviceCapabilities, Features};
use crate::error::GraphicsError;
use crate::instance::{AdapterInfo, BackendType, DeviceParameters};
use crate::swapchain::Surface;
use crate::types::{
    BufferDescriptor, PresentParams, SwapChainDescriptor, TextureDescriptor,
    TextureViewDescriptor,
};

use conversion::{convert_adapter_type, convert_power_preference};

const WAIT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    capabilities: DeviceCapabilities,
    last_submission: Mutex<Option<wgpu::SubmissionIndex>>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a new wgpu backend with default parameters.
    pub fn new() -> Result<Self, GraphicsError> {
        Self::with_params(&DeviceParameters::default())
    }

    /// Create a new wgpu backend with custom parameters.
    pub fn with_params(params: &DeviceParameters) -> Result<Self, GraphicsError> {
        // Configure instance flags based on validation/debug settings
        let mut flags = wgpu::InstanceFlags::default();
        if params.validation {
            flags |= wgpu::InstanceFlags::VALIDATION;
            flags |= wgpu::InstanceFlags::GPU_BASED_VALIDATION;
        }
        if params.debug {
            flags |= wgpu::InstanceFlags::DEBUG;
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: convert_power_preference(params.power_preference),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| GraphicsError::InitializationFailed(format!("no compatible GPU adapter: {e}")))?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        let optional = wgpu::Features::TEXTURE_COMPRESSION_BC
            | wgpu::Features::SHADER_F16
            | wgpu::Features::DEPTH_CLIP_CONTROL
            | wgpu::Features::INDIRECT_FIRST_INSTANCE;
        let required_features = adapter.features() & optional;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(params.label.as_deref().unwrap_or("Vortice Device")),
            required_features,
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| GraphicsError::InitializationFailed(format!("device creation failed: {e}")))?;

        let capabilities = Self::query_capabilities(&adapter, &device);
        log::debug!("wgpu capabilities: {capabilities:?}");

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            capabilities,
            last_submission: Mutex::new(None),
        })
    }

    fn query_capabilities(adapter: &wgpu::Adapter, device: &wgpu::Device) -> DeviceCapabilities {
        let native = device.features();
        let limits = device.limits();

        // Immediate presentation is part of wgpu's surface model.
        let mut features = Features::TEARING;
        if adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            features |= Features::COMPUTE_SHADERS;
        }
        if native.contains(wgpu::Features::TEXTURE_COMPRESSION_BC) {
            features |= Features::TEXTURE_COMPRESSION_BC;
        }
        if native.contains(wgpu::Features::SHADER_F16) {
            features |= Features::SHADER_FLOAT16;
        }
        if native.contains(wgpu::Features::DEPTH_CLIP_CONTROL) {
            features |= Features::DEPTH_CLIP_CONTROL;
        }
        if native.contains(wgpu::Features::INDIRECT_FIRST_INSTANCE) {
            features |= Features::INDIRECT_FIRST_INSTANCE;
        }

        DeviceCapabilities {
            max_texture_dimension: limits.max_texture_dimension_2d,
            max_buffer_size: limits.max_buffer_size,
            features,
        }
    }

    /// Get the wgpu instance.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Get the wgpu adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the wgpu queue.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    fn wgpu_swap_chain(swap_chain: &GpuSwapChain) -> Result<&WgpuSwapChain, GraphicsError> {
        match swap_chain {
            GpuSwapChain::Wgpu(swap_chain) => Ok(swap_chain),
            _ => Err(GraphicsError::InvalidParameter(
                "swap chain was not created by the wgpu backend".into(),
            )),
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Wgpu
    }

    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn adapter_info(&self) -> AdapterInfo {
        let info = self.adapter.get_info();
        AdapterInfo {
            name: info.name,
            vendor: format!("{:#06x}", info.vendor),
            device_type: convert_adapter_type(info.device_type),
        }
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuBuffer, GraphicsError> {
        self.create_buffer_impl(descriptor, initial_data)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        self.write_buffer_impl(buffer, offset, data)
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuTexture, GraphicsError> {
        self.create_texture_impl(descriptor, initial_data)
    }

    fn create_texture_view(
        &self,
        texture: &GpuTexture,
        texture_descriptor: &TextureDescriptor,
        descriptor: &TextureViewDescriptor,
    ) -> Result<GpuTextureView, GraphicsError> {
        self.create_texture_view_impl(texture, texture_descriptor, descriptor)
    }

    fn create_swap_chain(
        &self,
        surface: &Surface,
        descriptor: &SwapChainDescriptor,
    ) -> Result<GpuSwapChain, GraphicsError> {
        let swap_chain = WgpuSwapChain::new(self, surface, descriptor)?;
        Ok(GpuSwapChain::Wgpu(swap_chain))
    }

    fn resize_swap_chain(
        &self,
        swap_chain: &GpuSwapChain,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        Self::wgpu_swap_chain(swap_chain)?.resize(&self.device, width, height);
        Ok(())
    }

    fn swap_chain_extent(&self, swap_chain: &GpuSwapChain) -> (u32, u32) {
        Self::wgpu_swap_chain(swap_chain)
            .map(WgpuSwapChain::extent)
            .unwrap_or((0, 0))
    }

    fn acquire_next_texture(
        &self,
        swap_chain: &GpuSwapChain,
    ) -> Result<Option<GpuTexture>, GraphicsError> {
        Self::wgpu_swap_chain(swap_chain)?.acquire()
    }

    fn present(&self, swap_chain: &GpuSwapChain, params: PresentParams) -> Result<(), GraphicsError> {
        Self::wgpu_swap_chain(swap_chain)?.present(params)
    }

    fn submit_command_lists(&self, lists: &[CommandList]) -> Result<(), GraphicsError> {
        let mut command_buffers = Vec::with_capacity(lists.len());
        for list in lists {
            command_buffers.push(self.encode_command_list(list)?);
        }
        let submission_index = self.queue.submit(command_buffers);
        *self.last_submission.lock() = Some(submission_index);
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        let submission_index = self.last_submission.lock().take();
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index,
                timeout: Some(WAIT_TIMEOUT),
            })
            .map(|_| ())
            .map_err(|e| GraphicsError::Backend(format!("wait_idle failed: {e}")))
    }

    fn frame_committed(&self, frame_index: u64) {
        // Reclaim finished resources without blocking.
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("wgpu poll after frame {frame_index} failed: {e}");
        }
    }

    fn set_object_label(&self, object: GpuObjectRef<'_>, label: &str) {
        // wgpu objects take their label at creation only.
        log::trace!("wgpu: label change to '{label}' not forwarded for {object:?}");
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        if let GpuBuffer::Wgpu(buffer) = buffer {
            buffer.destroy();
        }
    }
}
