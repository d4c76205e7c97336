//! Command buffer recording state machine.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{CommandList, ComputePassEncoder, RecordedCommand, RenderPassDescriptor, RenderPassEncoder};
use crate::device::{Feature, GraphicsDevice};
use crate::error::GraphicsError;
use crate::object::{GraphicsObject, GraphicsResource, ObjectState};
use crate::resources::Texture;
use crate::swapchain::SwapChain;
use crate::types::TextureUsage;

/// Lifecycle stage of a [`CommandBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferStatus {
    /// Accepting commands.
    Recording,
    /// Closed by [`CommandBuffer::end`], ready for submission.
    Ended,
    /// Handed to the device.
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EncoderKind {
    Render,
    Compute,
}

impl EncoderKind {
    fn name(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Compute => "compute",
        }
    }
}

#[derive(Debug)]
struct Recording {
    status: CommandBufferStatus,
    active_encoder: Option<EncoderKind>,
    commands: Vec<RecordedCommand>,
    buffer_debug_depth: u32,
    pass_debug_depth: u32,
    swap_chains: Vec<Arc<SwapChain>>,
}

/// Records GPU work for a single submission.
///
/// A command buffer is single-use: it records until [`end`](Self::end), is
/// submitted once through [`GraphicsDevice::submit`], and is consumed by that
/// call. At most one pass encoder may be open at a time; opening a second or
/// ending the buffer while one is open fails with
/// [`GraphicsError::InvalidOperation`].
///
/// Debug groups never fail: unbalanced pops are ignored with a warning and
/// groups still open when their scope ends are closed automatically.
pub struct CommandBuffer {
    state: ObjectState,
    device: Arc<GraphicsDevice>,
    recording: Mutex<Recording>,
}

impl CommandBuffer {
    pub(crate) fn new(device: Arc<GraphicsDevice>, label: &str) -> Self {
        log::trace!("Begin command buffer '{label}'");
        Self {
            state: ObjectState::new(Some(label), "CommandBuffer"),
            device,
            recording: Mutex::new(Recording {
                status: CommandBufferStatus::Recording,
                active_encoder: None,
                commands: Vec::new(),
                buffer_debug_depth: 0,
                pass_debug_depth: 0,
                swap_chains: Vec::new(),
            }),
        }
    }

    /// Current lifecycle stage.
    pub fn status(&self) -> CommandBufferStatus {
        self.recording.lock().status
    }

    /// Check whether a render or compute pass is open.
    pub fn has_active_encoder(&self) -> bool {
        self.recording.lock().active_encoder.is_some()
    }

    /// Number of commands recorded so far.
    pub fn command_count(&self) -> usize {
        self.recording.lock().commands.len()
    }

    /// Open a render pass.
    pub fn begin_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassEncoder<'_>, GraphicsError> {
        self.ensure_can_open(EncoderKind::Render)?;
        self.validate_render_pass(descriptor)?;
        self.open_encoder(
            EncoderKind::Render,
            RecordedCommand::BeginRenderPass(descriptor.clone()),
        )?;
        Ok(RenderPassEncoder::new(self))
    }

    /// Open a compute pass.
    pub fn begin_compute_pass(&self, label: &str) -> Result<ComputePassEncoder<'_>, GraphicsError> {
        self.ensure_can_open(EncoderKind::Compute)?;
        if !self.device.query_feature(Feature::ComputeShaders) {
            return Err(GraphicsError::FeatureNotSupported(
                "compute shaders are not supported by this device".into(),
            ));
        }
        self.open_encoder(
            EncoderKind::Compute,
            RecordedCommand::BeginComputePass {
                label: label.to_string(),
            },
        )?;
        Ok(ComputePassEncoder::new(self))
    }

    /// Acquire the swap chain's back buffer for this frame.
    ///
    /// Returns `Ok(None)` when the frame should be skipped. On success the
    /// swap chain is presented when this buffer is submitted.
    pub fn acquire_swap_chain_texture(
        &self,
        swap_chain: &Arc<SwapChain>,
    ) -> Result<Option<Arc<Texture>>, GraphicsError> {
        self.ensure_recording()?;
        self.check_resource(&**swap_chain)?;

        let Some(texture) = swap_chain.acquire_next_texture()? else {
            return Ok(None);
        };
        let mut recording = self.recording.lock();
        if !recording
            .swap_chains
            .iter()
            .any(|registered| Arc::ptr_eq(registered, swap_chain))
        {
            recording.swap_chains.push(Arc::clone(swap_chain));
        }
        Ok(Some(texture))
    }

    /// Open a named debug group.
    pub fn push_debug_group(&self, label: &str) {
        let mut recording = self.recording.lock();
        if !self.can_record_debug(&recording) {
            return;
        }
        if recording.active_encoder.is_some() {
            recording.pass_debug_depth += 1;
        } else {
            recording.buffer_debug_depth += 1;
        }
        recording
            .commands
            .push(RecordedCommand::PushDebugGroup(label.to_string()));
    }

    /// Close the innermost debug group.
    pub fn pop_debug_group(&self) {
        let mut recording = self.recording.lock();
        if !self.can_record_debug(&recording) {
            return;
        }
        let depth = if recording.active_encoder.is_some() {
            &mut recording.pass_debug_depth
        } else {
            &mut recording.buffer_debug_depth
        };
        if *depth == 0 {
            log::warn!(
                "CommandBuffer '{}': pop_debug_group without matching push, ignored",
                self.label()
            );
            return;
        }
        *depth -= 1;
        recording.commands.push(RecordedCommand::PopDebugGroup);
    }

    /// Insert a single debug marker.
    pub fn insert_debug_marker(&self, label: &str) {
        let mut recording = self.recording.lock();
        if !self.can_record_debug(&recording) {
            return;
        }
        recording
            .commands
            .push(RecordedCommand::InsertDebugMarker(label.to_string()));
    }

    /// Finish recording.
    pub fn end(&self) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        let mut recording = self.recording.lock();
        if recording.status != CommandBufferStatus::Recording {
            return Err(GraphicsError::InvalidOperation(format!(
                "command buffer '{}' is not recording",
                self.label()
            )));
        }
        if let Some(kind) = recording.active_encoder {
            return Err(GraphicsError::InvalidOperation(format!(
                "cannot submit with active command encoders (open {} pass in '{}')",
                kind.name(),
                self.label()
            )));
        }
        if recording.buffer_debug_depth > 0 {
            log::warn!(
                "CommandBuffer '{}': closing {} unbalanced debug group(s)",
                self.label(),
                recording.buffer_debug_depth
            );
            for _ in 0..recording.buffer_debug_depth {
                recording.commands.push(RecordedCommand::PopDebugGroup);
            }
            recording.buffer_debug_depth = 0;
        }
        recording.status = CommandBufferStatus::Ended;
        log::trace!(
            "End command buffer '{}' ({} commands)",
            self.label(),
            recording.commands.len()
        );
        Ok(())
    }

    pub(crate) fn check_submittable(&self, device: &GraphicsDevice) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        if !std::ptr::eq(Arc::as_ptr(&self.device), device) {
            return Err(GraphicsError::InvalidParameter(format!(
                "command buffer '{}' belongs to a different device",
                self.label()
            )));
        }
        match self.status() {
            CommandBufferStatus::Ended => Ok(()),
            CommandBufferStatus::Recording => Err(GraphicsError::InvalidOperation(format!(
                "command buffer '{}' must be ended before submission",
                self.label()
            ))),
            CommandBufferStatus::Submitted => Err(GraphicsError::InvalidOperation(format!(
                "command buffer '{}' was already submitted",
                self.label()
            ))),
        }
    }

    pub(crate) fn take_submission(&self) -> (CommandList, Vec<Arc<SwapChain>>) {
        let mut recording = self.recording.lock();
        recording.status = CommandBufferStatus::Submitted;
        let commands = std::mem::take(&mut recording.commands);
        let swap_chains = std::mem::take(&mut recording.swap_chains);
        (CommandList::new(self.label(), commands), swap_chains)
    }

    /// Record a command from an open encoder.
    pub(crate) fn record(&self, command: RecordedCommand) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        let mut recording = self.recording.lock();
        if recording.status != CommandBufferStatus::Recording {
            return Err(GraphicsError::InvalidOperation(format!(
                "command buffer '{}' is not recording",
                self.label()
            )));
        }
        recording.commands.push(command);
        Ok(())
    }

    /// Close the open encoder of `kind`, popping debug groups left inside it.
    pub(crate) fn close_encoder(&self, kind: EncoderKind) {
        let mut recording = self.recording.lock();
        if recording.active_encoder != Some(kind) {
            return;
        }
        if recording.pass_debug_depth > 0 {
            log::warn!(
                "CommandBuffer '{}': closing {} unbalanced debug group(s) at end of {} pass",
                self.label(),
                recording.pass_debug_depth,
                kind.name()
            );
            for _ in 0..recording.pass_debug_depth {
                recording.commands.push(RecordedCommand::PopDebugGroup);
            }
            recording.pass_debug_depth = 0;
        }
        recording.commands.push(match kind {
            EncoderKind::Render => RecordedCommand::EndRenderPass,
            EncoderKind::Compute => RecordedCommand::EndComputePass,
        });
        recording.active_encoder = None;
    }

    /// Fail unless `resource` is alive and belongs to this buffer's device.
    pub(crate) fn check_resource(&self, resource: &dyn GraphicsResource) -> Result<(), GraphicsError> {
        resource.object_state().ensure_alive()?;
        if !Arc::ptr_eq(resource.device(), &self.device) {
            return Err(GraphicsError::InvalidParameter(format!(
                "'{}' belongs to a different device than command buffer '{}'",
                resource.label(),
                self.label()
            )));
        }
        Ok(())
    }

    fn ensure_recording(&self) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        if self.status() != CommandBufferStatus::Recording {
            return Err(GraphicsError::InvalidOperation(format!(
                "command buffer '{}' is not recording",
                self.label()
            )));
        }
        Ok(())
    }

    /// State checks for opening a pass, run before any descriptor validation.
    fn ensure_can_open(&self, kind: EncoderKind) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        let recording = self.recording.lock();
        self.check_can_open(&recording, kind)
    }

    fn check_can_open(&self, recording: &Recording, kind: EncoderKind) -> Result<(), GraphicsError> {
        if recording.status != CommandBufferStatus::Recording {
            return Err(GraphicsError::InvalidOperation(format!(
                "command buffer '{}' is not recording",
                self.label()
            )));
        }
        if let Some(active) = recording.active_encoder {
            return Err(GraphicsError::InvalidOperation(format!(
                "cannot begin a {} pass while a {} pass is open",
                kind.name(),
                active.name()
            )));
        }
        Ok(())
    }

    fn open_encoder(&self, kind: EncoderKind, begin: RecordedCommand) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        let mut recording = self.recording.lock();
        self.check_can_open(&recording, kind)?;
        recording.active_encoder = Some(kind);
        recording.commands.push(begin);
        Ok(())
    }

    fn validate_render_pass(&self, descriptor: &RenderPassDescriptor) -> Result<(), GraphicsError> {
        if descriptor.color_attachments.is_empty() && descriptor.depth_stencil_attachment.is_none() {
            return Err(GraphicsError::InvalidParameter(
                "render pass needs at least one attachment".into(),
            ));
        }

        let mut extent = None;
        for view in descriptor.views() {
            self.check_resource(&**view)?;
            if !view.usage().contains(TextureUsage::RENDER_TARGET) {
                return Err(GraphicsError::InvalidParameter(format!(
                    "'{}' was not created with RENDER_TARGET usage",
                    view.label()
                )));
            }
            let size = (view.width(), view.height());
            match extent {
                None => extent = Some(size),
                Some(expected) if expected != size => {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "attachment '{}' is {}x{}, expected {}x{}",
                        view.label(),
                        size.0,
                        size.1,
                        expected.0,
                        expected.1
                    )));
                }
                Some(_) => {}
            }
        }

        if let Some(color) = descriptor
            .color_attachments
            .iter()
            .find(|attachment| attachment.view.format().is_depth_stencil())
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "color attachment '{}' has depth format {:?}",
                color.view.label(),
                color.view.format()
            )));
        }
        if let Some(depth) = &descriptor.depth_stencil_attachment
            && !depth.view.format().is_depth_stencil()
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "depth attachment '{}' has color format {:?}",
                depth.view.label(),
                depth.view.format()
            )));
        }
        Ok(())
    }

    fn can_record_debug(&self, recording: &Recording) -> bool {
        if self.state.is_disposed() || recording.status != CommandBufferStatus::Recording {
            log::warn!(
                "CommandBuffer '{}': debug annotation outside recording, ignored",
                self.label()
            );
            return false;
        }
        true
    }
}

impl GraphicsObject for CommandBuffer {
    fn object_state(&self) -> &ObjectState {
        &self.state
    }

    fn destroy(&self) {
        let mut recording = self.recording.lock();
        if recording.status == CommandBufferStatus::Recording && !recording.commands.is_empty() {
            log::debug!(
                "CommandBuffer '{}' discarded with {} unsubmitted command(s)",
                self.state.label(),
                recording.commands.len()
            );
        }
        recording.commands.clear();
        recording.swap_chains.clear();
        recording.active_encoder = None;
    }
}

impl GraphicsResource for CommandBuffer {
    fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let recording = self.recording.lock();
        f.debug_struct("CommandBuffer")
            .field("label", &self.label())
            .field("status", &recording.status)
            .field("commands", &recording.commands.len())
            .field("active_encoder", &recording.active_encoder)
            .finish()
    }
}

static_assertions::assert_impl_all!(CommandBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::command::ColorAttachment;
    use crate::device::DeviceCapabilities;
    use crate::types::{Color, PixelFormat, TextureDescriptor};

    fn device() -> Arc<GraphicsDevice> {
        GraphicsDevice::from_backend(Arc::new(DummyBackend::new()), None)
    }

    fn target(device: &Arc<GraphicsDevice>, width: u32, height: u32) -> Arc<Texture> {
        device
            .create_texture(&TextureDescriptor::new_2d(
                width,
                height,
                PixelFormat::Rgba8Unorm,
                TextureUsage::RENDER_TARGET,
            ))
            .unwrap()
    }

    #[test]
    fn test_new_buffer_is_recording() {
        let device = device();
        let cb = device.begin_command_buffer("Frame").unwrap();
        assert_eq!(cb.status(), CommandBufferStatus::Recording);
        assert!(!cb.has_active_encoder());
        assert_eq!(cb.label(), "Frame");
    }

    #[test]
    fn test_render_pass_inside_compute_fails() {
        let device = device();
        let cb = device.begin_command_buffer("Nested").unwrap();
        let target = target(&device, 8, 8);
        let compute = cb.begin_compute_pass("Cull").unwrap();
        let desc = RenderPassDescriptor::new().with_color(ColorAttachment::new(target.view().unwrap()));
        assert!(matches!(
            cb.begin_render_pass(&desc),
            Err(GraphicsError::InvalidOperation(_))
        ));
        compute.end();
        assert!(cb.begin_render_pass(&desc).is_ok());
    }

    #[test]
    fn test_open_pass_is_reported_before_invalid_input() {
        let device = GraphicsDevice::from_backend(
            Arc::new(DummyBackend::with_capabilities(
                DeviceCapabilities::default().with_features(crate::device::Features::empty()),
            )),
            None,
        );
        let cb = device.begin_command_buffer("Busy").unwrap();
        let target = target(&device, 8, 8);
        let pass = cb
            .begin_render_pass(
                &RenderPassDescriptor::new().with_color(ColorAttachment::new(target.view().unwrap())),
            )
            .unwrap();

        assert!(matches!(
            cb.begin_render_pass(&RenderPassDescriptor::new()),
            Err(GraphicsError::InvalidOperation(_))
        ));
        assert!(matches!(
            cb.begin_compute_pass("NoCompute"),
            Err(GraphicsError::InvalidOperation(_))
        ));
        pass.end();
        assert!(matches!(
            cb.begin_compute_pass("NoCompute"),
            Err(GraphicsError::FeatureNotSupported(_))
        ));
    }

    #[test]
    fn test_end_with_open_pass_fails() {
        let device = device();
        let cb = device.begin_command_buffer("Open").unwrap();
        let encoder = cb.begin_compute_pass("Work").unwrap();
        let err = cb.end().unwrap_err();
        assert!(err.to_string().contains("cannot submit with active command encoders"));
        encoder.end();
        cb.end().unwrap();
        assert_eq!(cb.status(), CommandBufferStatus::Ended);
    }

    #[test]
    fn test_empty_render_pass_is_rejected() {
        let device = device();
        let cb = device.begin_command_buffer("Empty").unwrap();
        assert!(matches!(
            cb.begin_render_pass(&RenderPassDescriptor::new()),
            Err(GraphicsError::InvalidParameter(_))
        ));
        assert!(!cb.has_active_encoder());
    }

    #[test]
    fn test_attachment_without_render_target_usage() {
        let device = device();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                4,
                4,
                PixelFormat::Rgba8Unorm,
                TextureUsage::SHADER_READ,
            ))
            .unwrap();
        let cb = device.begin_command_buffer("Bad").unwrap();
        let desc = RenderPassDescriptor::new().with_color(ColorAttachment::new(texture.view().unwrap()));
        assert!(cb.begin_render_pass(&desc).is_err());
    }

    #[test]
    fn test_mismatched_attachment_sizes() {
        let device = device();
        let a = target(&device, 16, 16);
        let b = target(&device, 8, 8);
        let cb = device.begin_command_buffer("Mismatch").unwrap();
        let desc = RenderPassDescriptor::new()
            .with_color(ColorAttachment::new(a.view().unwrap()))
            .with_color(ColorAttachment::new(b.view().unwrap()));
        assert!(matches!(
            cb.begin_render_pass(&desc),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_disposed_attachment_is_rejected() {
        let device = device();
        let texture = target(&device, 4, 4);
        let view = texture.view().unwrap();
        texture.dispose();
        let cb = device.begin_command_buffer("Stale").unwrap();
        let desc = RenderPassDescriptor::new().with_color(ColorAttachment::new(view));
        assert!(matches!(
            cb.begin_render_pass(&desc),
            Err(GraphicsError::ObjectDisposed(_))
        ));
    }

    #[test]
    fn test_attachment_from_other_device() {
        let device_a = device();
        let device_b = device();
        let texture = target(&device_b, 4, 4);
        let cb = device_a.begin_command_buffer("Foreign").unwrap();
        let desc = RenderPassDescriptor::new().with_color(ColorAttachment::new(texture.view().unwrap()));
        assert!(matches!(
            cb.begin_render_pass(&desc),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_compute_requires_feature() {
        let backend = Arc::new(DummyBackend::with_capabilities(
            DeviceCapabilities::default().with_features(crate::device::Features::empty()),
        ));
        let device = GraphicsDevice::from_backend(backend, None);
        let cb = device.begin_command_buffer("NoCompute").unwrap();
        assert!(matches!(
            cb.begin_compute_pass("Work"),
            Err(GraphicsError::FeatureNotSupported(_))
        ));
    }

    #[test]
    fn test_unbalanced_debug_groups() {
        let device = device();
        let cb = device.begin_command_buffer("Debug").unwrap();
        cb.pop_debug_group();
        cb.push_debug_group("Outer");
        cb.push_debug_group("Inner");
        cb.insert_debug_marker("Here");
        cb.end().unwrap();
        cb.push_debug_group("Late");

        let (list, _) = cb.take_submission();
        let pops = list
            .commands()
            .iter()
            .filter(|command| matches!(command, RecordedCommand::PopDebugGroup))
            .count();
        assert_eq!(pops, 2);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn test_debug_groups_closed_at_pass_end() {
        let device = device();
        let cb = device.begin_command_buffer("PassDebug").unwrap();
        let texture = target(&device, 4, 4);
        let desc = RenderPassDescriptor::new()
            .with_color(ColorAttachment::new(texture.view().unwrap()).with_clear(Color::BLACK));
        let mut pass = cb.begin_render_pass(&desc).unwrap();
        pass.push_debug_group("Opaque");
        pass.end();
        cb.end().unwrap();

        let (list, _) = cb.take_submission();
        assert!(matches!(
            list.commands(),
            [
                RecordedCommand::BeginRenderPass(_),
                RecordedCommand::PushDebugGroup(_),
                RecordedCommand::PopDebugGroup,
                RecordedCommand::EndRenderPass,
            ]
        ));
    }

    #[test]
    fn test_submission_state_checks() {
        let device = device();
        let cb = device.begin_command_buffer("Twice").unwrap();
        assert!(matches!(
            cb.check_submittable(&device),
            Err(GraphicsError::InvalidOperation(_))
        ));
        cb.end().unwrap();
        cb.check_submittable(&device).unwrap();
        let _ = cb.take_submission();
        assert_eq!(cb.status(), CommandBufferStatus::Submitted);
        assert!(cb.check_submittable(&device).is_err());
        assert!(cb.end().is_err());
    }

    #[test]
    fn test_disposed_buffer_rejects_recording() {
        let device = device();
        let cb = device.begin_command_buffer("Gone").unwrap();
        cb.dispose();
        assert!(matches!(
            cb.begin_compute_pass("Work"),
            Err(GraphicsError::ObjectDisposed(_))
        ));
        assert!(matches!(cb.end(), Err(GraphicsError::ObjectDisposed(_))));
    }
}
