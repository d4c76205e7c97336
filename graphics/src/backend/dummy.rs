//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out numbered
//! handles, keeps buffer contents in memory and records everything it is asked
//! to do, so tests can assert on creation/destruction counts, submitted
//! command lists and presents without requiring GPU hardware.
//!
//! Submitted lists are kept as [`SubmittedList`] summaries that hold no
//! resources, and both histories are capped at [`DummyBackend::HISTORY_LIMIT`]
//! entries.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::command::{CommandKind, CommandList, RecordedCommand};
use crate::device::DeviceCapabilities;
use crate::error::GraphicsError;
use crate::instance::{AdapterInfo, AdapterType, BackendType};
use crate::swapchain::Surface;
use crate::types::{
    BufferDescriptor, PresentParams, SwapChainDescriptor, TextureDescriptor,
    TextureViewDescriptor, present_mode_to_buffer_count,
};

use super::{GpuBackend, GpuBuffer, GpuObjectRef, GpuSwapChain, GpuTexture, GpuTextureView};

/// Counters of everything the dummy backend has been asked to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub buffers_created: u64,
    pub buffers_destroyed: u64,
    pub textures_created: u64,
    pub textures_destroyed: u64,
    pub views_created: u64,
    pub views_destroyed: u64,
    pub swap_chains_created: u64,
    pub swap_chains_destroyed: u64,
    pub swap_chain_resizes: u64,
    pub back_buffers_acquired: u64,
    pub back_buffers_released: u64,
    pub submissions: u64,
    pub command_lists: u64,
    pub render_passes: u64,
    pub compute_passes: u64,
    pub draws: u64,
    pub dispatches: u64,
    pub presents: u64,
    pub wait_idle_calls: u64,
    pub frames_committed: u64,
}

/// One present call seen by the dummy backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentRecord {
    /// Id of the presenting swap chain.
    pub swap_chain: u64,
    /// Back buffer index that was presented.
    pub image_index: u32,
    /// Parameters the swap chain passed down.
    pub params: PresentParams,
}

/// A submitted command list, reduced to its label and command kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedList {
    /// Label of the command buffer the list came from.
    pub label: String,
    /// Kinds of the recorded commands, in order.
    pub commands: Vec<CommandKind>,
}

impl SubmittedList {
    fn from_list(list: &CommandList) -> Self {
        Self {
            label: list.label().to_string(),
            commands: list.kinds(),
        }
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, entry: T) {
    if history.len() == DummyBackend::HISTORY_LIMIT {
        history.pop_front();
    }
    history.push_back(entry);
}

/// Native state of a dummy swap chain.
#[derive(Debug)]
pub struct DummySwapChain {
    id: u64,
    extent: Mutex<(u32, u32)>,
    buffer_count: u32,
    image_index: AtomicU32,
    acquired: AtomicBool,
}

impl DummySwapChain {
    /// Swap chain id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of back buffers.
    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }
}

#[derive(Debug, Default)]
struct DummyState {
    stats: DummyStats,
    labels: Vec<(u64, String)>,
    buffer_contents: HashMap<u64, Vec<u8>>,
    submitted: VecDeque<SubmittedList>,
    presents: VecDeque<PresentRecord>,
    acquire_failure: Option<GraphicsError>,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    capabilities: DeviceCapabilities,
    next_id: AtomicU64,
    state: Mutex<DummyState>,
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    /// Number of submitted lists and presents kept for inspection.
    pub const HISTORY_LIMIT: usize = 256;

    /// Create a new dummy backend supporting every optional feature.
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities::all_features())
    }

    /// Create a new dummy backend reporting `capabilities`.
    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            next_id: AtomicU64::new(1),
            state: Mutex::new(DummyState::default()),
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> DummyStats {
        self.state.lock().stats
    }

    /// Every label forwarded to a native object, in order, keyed by handle id.
    pub fn label_history(&self) -> Vec<(u64, String)> {
        self.state.lock().labels.clone()
    }

    /// The most recent submitted command lists, oldest first.
    pub fn submitted_command_lists(&self) -> Vec<SubmittedList> {
        self.state.lock().submitted.iter().cloned().collect()
    }

    /// The most recent presents, oldest first.
    pub fn presents(&self) -> Vec<PresentRecord> {
        self.state.lock().presents.iter().copied().collect()
    }

    /// Current contents of a dummy buffer.
    pub fn buffer_contents(&self, buffer: &GpuBuffer) -> Option<Vec<u8>> {
        match buffer {
            GpuBuffer::Dummy { id } => self.state.lock().buffer_contents.get(id).cloned(),
            #[cfg(feature = "wgpu-backend")]
            _ => None,
        }
    }

    /// Make every following acquire fail with `error`, or succeed again with `None`.
    pub fn set_acquire_failure(&self, error: Option<GraphicsError>) {
        self.state.lock().acquire_failure = error;
    }

    fn dummy_swap_chain(swap_chain: &GpuSwapChain) -> Result<&DummySwapChain, GraphicsError> {
        match swap_chain {
            GpuSwapChain::Dummy(swap_chain) => Ok(swap_chain),
            #[cfg(feature = "wgpu-backend")]
            _ => Err(GraphicsError::InvalidParameter(
                "swap chain was not created by the dummy backend".into(),
            )),
        }
    }
}

impl GpuBackend for DummyBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Dummy
    }

    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            name: "Dummy Adapter".into(),
            vendor: "Vortice".into(),
            device_type: AdapterType::Software,
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
        let id = self.allocate_id();
        log::trace!(
            "DummyBackend: creating buffer {id} {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        let mut contents = vec![0u8; descriptor.size as usize];
        if let Some(data) = initial_data {
            contents[..data.len()].copy_from_slice(data);
        }
        let mut state = self.state.lock();
        state.buffer_contents.insert(id, contents);
        state.stats.buffers_created += 1;
        Ok(GpuBuffer::Dummy { id })
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let id = match buffer {
            GpuBuffer::Dummy { id } => id,
            #[cfg(feature = "wgpu-backend")]
            _ => {
                return Err(GraphicsError::InvalidParameter(
                    "buffer was not created by the dummy backend".into(),
                ));
            }
        };
        let mut state = self.state.lock();
        let contents = state
            .buffer_contents
            .get_mut(id)
            .ok_or_else(|| GraphicsError::Internal(format!("unknown dummy buffer {id}")))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {offset} overflows buffer of {} bytes",
                data.len(),
                contents.len()
            )));
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuTexture, GraphicsError> {
        let id = self.allocate_id();
        log::trace!(
            "DummyBackend: creating texture {id} {:?} ({}x{}x{}, {} mips, {} bytes of data)",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.depth_or_array_layers,
            descriptor.mip_level_count,
            initial_data.map_or(0, <[u8]>::len)
        );
        self.state.lock().stats.textures_created += 1;
        Ok(GpuTexture::Dummy {
            id,
            back_buffer: false,
        })
    }

    fn create_texture_view(
        &self,
        texture: &GpuTexture,
        _texture_descriptor: &TextureDescriptor,
        descriptor: &TextureViewDescriptor,
    ) -> Result<GpuTextureView, GraphicsError> {
        let id = self.allocate_id();
        log::trace!("DummyBackend: creating view {id} of {texture:?} ({descriptor:?})");
        self.state.lock().stats.views_created += 1;
        Ok(GpuTextureView::Dummy { id })
    }

    fn create_swap_chain(
        &self,
        surface: &Surface,
        descriptor: &SwapChainDescriptor,
    ) -> Result<GpuSwapChain, GraphicsError> {
        let id = self.allocate_id();
        let buffer_count = present_mode_to_buffer_count(descriptor.present_mode);
        log::trace!(
            "DummyBackend: creating swap chain {id} ({}x{}, {buffer_count} buffers, headless: {})",
            descriptor.width,
            descriptor.height,
            surface.is_headless()
        );
        self.state.lock().stats.swap_chains_created += 1;
        Ok(GpuSwapChain::Dummy(DummySwapChain {
            id,
            extent: Mutex::new((descriptor.width, descriptor.height)),
            buffer_count,
            image_index: AtomicU32::new(0),
            acquired: AtomicBool::new(false),
        }))
    }

    fn resize_swap_chain(
        &self,
        swap_chain: &GpuSwapChain,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        let swap_chain = Self::dummy_swap_chain(swap_chain)?;
        *swap_chain.extent.lock() = (width, height);
        swap_chain.image_index.store(0, Ordering::Relaxed);
        swap_chain.acquired.store(false, Ordering::Release);
        self.state.lock().stats.swap_chain_resizes += 1;
        Ok(())
    }

    fn swap_chain_extent(&self, swap_chain: &GpuSwapChain) -> (u32, u32) {
        match Self::dummy_swap_chain(swap_chain) {
            Ok(swap_chain) => *swap_chain.extent.lock(),
            Err(_) => (0, 0),
        }
    }

    fn acquire_next_texture(
        &self,
        swap_chain: &GpuSwapChain,
    ) -> Result<Option<GpuTexture>, GraphicsError> {
        let swap_chain = Self::dummy_swap_chain(swap_chain)?;
        if let Some(error) = self.state.lock().acquire_failure.clone() {
            return Err(error);
        }
        swap_chain.acquired.store(true, Ordering::Release);
        let id = self.allocate_id();
        self.state.lock().stats.back_buffers_acquired += 1;
        Ok(Some(GpuTexture::Dummy {
            id,
            back_buffer: true,
        }))
    }

    fn present(
        &self,
        swap_chain: &GpuSwapChain,
        params: PresentParams,
    ) -> Result<(), GraphicsError> {
        let swap_chain = Self::dummy_swap_chain(swap_chain)?;
        if !swap_chain.acquired.swap(false, Ordering::AcqRel) {
            return Err(GraphicsError::InvalidOperation(
                "present without an acquired back buffer".into(),
            ));
        }
        let image_index = swap_chain.image_index.load(Ordering::Relaxed);
        swap_chain
            .image_index
            .store((image_index + 1) % swap_chain.buffer_count, Ordering::Relaxed);
        let mut state = self.state.lock();
        state.stats.presents += 1;
        push_bounded(
            &mut state.presents,
            PresentRecord {
                swap_chain: swap_chain.id,
                image_index,
                params,
            },
        );
        Ok(())
    }

    fn submit_command_lists(&self, lists: &[CommandList]) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        state.stats.submissions += 1;
        for list in lists {
            log::trace!(
                "DummyBackend: executing command list '{}' ({} commands)",
                list.label(),
                list.len()
            );
            state.stats.command_lists += 1;
            for command in list.commands() {
                match command {
                    RecordedCommand::BeginRenderPass(_) => state.stats.render_passes += 1,
                    RecordedCommand::BeginComputePass { .. } => state.stats.compute_passes += 1,
                    RecordedCommand::Draw { .. } | RecordedCommand::DrawIndexed { .. } => {
                        state.stats.draws += 1
                    }
                    RecordedCommand::Dispatch { .. } => state.stats.dispatches += 1,
                    _ => {}
                }
            }
            push_bounded(&mut state.submitted, SubmittedList::from_list(list));
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.state.lock().stats.wait_idle_calls += 1;
        Ok(())
    }

    fn frame_committed(&self, frame_index: u64) {
        log::trace!("DummyBackend: frame {frame_index} committed");
        self.state.lock().stats.frames_committed += 1;
    }

    fn set_object_label(&self, object: GpuObjectRef<'_>, label: &str) {
        let id = match object {
            GpuObjectRef::Buffer(GpuBuffer::Dummy { id })
            | GpuObjectRef::Texture(GpuTexture::Dummy { id, .. })
            | GpuObjectRef::TextureView(GpuTextureView::Dummy { id }) => *id,
            GpuObjectRef::SwapChain(GpuSwapChain::Dummy(swap_chain)) => swap_chain.id,
            #[cfg(feature = "wgpu-backend")]
            _ => return,
        };
        self.state.lock().labels.push((id, label.to_string()));
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        let mut state = self.state.lock();
        if let GpuBuffer::Dummy { id } = buffer {
            state.buffer_contents.remove(&id);
        }
        state.stats.buffers_destroyed += 1;
    }

    fn destroy_texture(&self, texture: GpuTexture) {
        let mut state = self.state.lock();
        match texture {
            GpuTexture::Dummy {
                back_buffer: true, ..
            } => state.stats.back_buffers_released += 1,
            _ => state.stats.textures_destroyed += 1,
        }
    }

    fn destroy_texture_view(&self, _view: GpuTextureView) {
        self.state.lock().stats.views_destroyed += 1;
    }

    fn destroy_swap_chain(&self, _swap_chain: GpuSwapChain) {
        self.state.lock().stats.swap_chains_destroyed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, PixelFormat, PresentMode, TextureUsage};

    #[test]
    fn test_buffer_contents_round_trip() {
        let backend = DummyBackend::new();
        let desc = BufferDescriptor::new(8, BufferUsage::UNIFORM);
        let buffer = backend.create_buffer(&desc, Some(&[1, 2, 3])).unwrap();
        backend.write_buffer(&buffer, 4, &[9, 9]).unwrap();
        assert_eq!(
            backend.buffer_contents(&buffer),
            Some(vec![1, 2, 3, 0, 9, 9, 0, 0])
        );
        assert!(backend.write_buffer(&buffer, 7, &[1, 1]).is_err());

        backend.destroy_buffer(buffer.clone());
        assert_eq!(backend.buffer_contents(&buffer), None);
        assert_eq!(backend.stats().buffers_destroyed, 1);
    }

    #[test]
    fn test_present_requires_acquire() {
        let backend = DummyBackend::new();
        let surface = Surface::headless(64, 64);
        let desc = SwapChainDescriptor::new(64, 64).with_present_mode(PresentMode::Mailbox);
        let swap_chain = backend.create_swap_chain(&surface, &desc).unwrap();
        let params = PresentParams::for_mode(PresentMode::Mailbox, true);

        assert!(backend.present(&swap_chain, params).is_err());

        for expected_index in [0, 1, 2, 0] {
            backend.acquire_next_texture(&swap_chain).unwrap();
            backend.present(&swap_chain, params).unwrap();
            assert_eq!(backend.presents().last().unwrap().image_index, expected_index);
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let backend = DummyBackend::new();
        let surface = Surface::headless(8, 8);
        let swap_chain = backend
            .create_swap_chain(&surface, &SwapChainDescriptor::new(8, 8))
            .unwrap();
        let params = PresentParams::for_mode(PresentMode::Fifo, false);
        let total = DummyBackend::HISTORY_LIMIT + 10;
        for i in 0..total {
            let list = CommandList::new(format!("Frame {i}"), Vec::new());
            backend.submit_command_lists(&[list]).unwrap();
            backend.acquire_next_texture(&swap_chain).unwrap();
            backend.present(&swap_chain, params).unwrap();
        }

        let submitted = backend.submitted_command_lists();
        assert_eq!(submitted.len(), DummyBackend::HISTORY_LIMIT);
        assert_eq!(submitted[0].label, "Frame 10");
        assert_eq!(backend.presents().len(), DummyBackend::HISTORY_LIMIT);
        assert_eq!(backend.stats().presents, total as u64);
        assert_eq!(backend.stats().command_lists, total as u64);
    }

    #[test]
    fn test_acquire_failure() {
        let backend = DummyBackend::new();
        let surface = Surface::headless(64, 64);
        let swap_chain = backend
            .create_swap_chain(&surface, &SwapChainDescriptor::new(64, 64))
            .unwrap();
        backend.set_acquire_failure(Some(GraphicsError::SurfaceLost));
        assert_eq!(
            backend.acquire_next_texture(&swap_chain).unwrap_err(),
            GraphicsError::SurfaceLost
        );
        backend.set_acquire_failure(None);
        assert!(backend.acquire_next_texture(&swap_chain).unwrap().is_some());
    }

    #[test]
    fn test_labels_are_recorded() {
        let backend = DummyBackend::new();
        let desc = TextureDescriptor::new_2d(4, 4, PixelFormat::R8Unorm, TextureUsage::SHADER_READ);
        let texture = backend.create_texture(&desc, None).unwrap();
        backend.set_object_label(GpuObjectRef::Texture(&texture), "Albedo");
        let id = match texture {
            GpuTexture::Dummy { id, .. } => id,
            #[cfg(feature = "wgpu-backend")]
            _ => unreachable!(),
        };
        assert_eq!(backend.label_history(), vec![(id, "Albedo".to_string())]);
    }
}
