//! Render and compute pass encoders.

use std::sync::Arc;

use super::buffer::EncoderKind;
use super::{CommandBuffer, RecordedCommand};
use crate::error::GraphicsError;
use crate::object::GraphicsObject;
use crate::resources::Buffer;
use crate::types::{BufferUsage, IndexFormat, ScissorRect, Viewport};

/// Records commands into an open render pass.
///
/// Call [`end`](Self::end) when done. Dropping an encoder without ending it
/// closes the pass with a warning.
pub struct RenderPassEncoder<'a> {
    command_buffer: &'a CommandBuffer,
    index_format: Option<IndexFormat>,
    ended: bool,
}

impl<'a> RenderPassEncoder<'a> {
    pub(crate) fn new(command_buffer: &'a CommandBuffer) -> Self {
        Self {
            command_buffer,
            index_format: None,
            ended: false,
        }
    }

    /// Set the viewport transform.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), GraphicsError> {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "viewport must have a positive extent, got {}x{}",
                viewport.width, viewport.height
            )));
        }
        self.command_buffer
            .record(RecordedCommand::SetViewport(viewport))
    }

    /// Set the scissor rectangle.
    pub fn set_scissor_rect(&mut self, rect: ScissorRect) -> Result<(), GraphicsError> {
        self.command_buffer
            .record(RecordedCommand::SetScissorRect(rect))
    }

    /// Bind a vertex buffer to `slot`.
    pub fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: &Arc<Buffer>,
        offset: u64,
    ) -> Result<(), GraphicsError> {
        self.check_buffer(buffer, BufferUsage::VERTEX, offset)?;
        self.command_buffer.record(RecordedCommand::SetVertexBuffer {
            slot,
            buffer: Arc::clone(buffer),
            offset,
        })
    }

    /// Bind the index buffer used by [`draw_indexed`](Self::draw_indexed).
    pub fn set_index_buffer(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        format: IndexFormat,
    ) -> Result<(), GraphicsError> {
        self.check_buffer(buffer, BufferUsage::INDEX, offset)?;
        if offset % format.size() != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "index buffer offset {offset} is not aligned to {format:?}"
            )));
        }
        self.command_buffer.record(RecordedCommand::SetIndexBuffer {
            buffer: Arc::clone(buffer),
            offset,
            format,
        })?;
        self.index_format = Some(format);
        Ok(())
    }

    /// Draw non-indexed primitives.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<(), GraphicsError> {
        self.command_buffer.record(RecordedCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        })
    }

    /// Draw indexed primitives. Requires a bound index buffer.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), GraphicsError> {
        if self.index_format.is_none() {
            return Err(GraphicsError::InvalidOperation(
                "draw_indexed without a bound index buffer".into(),
            ));
        }
        self.command_buffer.record(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        })
    }

    /// Open a debug group scoped to this pass. Groups still open at
    /// [`end`](Self::end) are closed.
    pub fn push_debug_group(&mut self, label: &str) {
        self.command_buffer.push_debug_group(label);
    }

    /// Close the innermost debug group of this pass. Ignored with a warning
    /// when none is open.
    pub fn pop_debug_group(&mut self) {
        self.command_buffer.pop_debug_group();
    }

    /// Insert a single debug marker.
    pub fn insert_debug_marker(&mut self, label: &str) {
        self.command_buffer.insert_debug_marker(label);
    }

    /// Close the pass.
    pub fn end(mut self) {
        self.ended = true;
        self.command_buffer.close_encoder(EncoderKind::Render);
    }

    fn check_buffer(
        &self,
        buffer: &Arc<Buffer>,
        usage: BufferUsage,
        offset: u64,
    ) -> Result<(), GraphicsError> {
        self.command_buffer.check_resource(&**buffer)?;
        if !buffer.usage().contains(usage) {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer '{}' lacks {usage:?} usage",
                buffer.label()
            )));
        }
        if offset >= buffer.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "offset {offset} is outside buffer '{}' ({} bytes)",
                buffer.label(),
                buffer.size()
            )));
        }
        Ok(())
    }
}

impl Drop for RenderPassEncoder<'_> {
    fn drop(&mut self) {
        if !self.ended {
            log::warn!(
                "Render pass in '{}' dropped without end(), closing it",
                self.command_buffer.label()
            );
            self.command_buffer.close_encoder(EncoderKind::Render);
        }
    }
}

/// Records commands into an open compute pass.
pub struct ComputePassEncoder<'a> {
    command_buffer: &'a CommandBuffer,
    ended: bool,
}

impl<'a> ComputePassEncoder<'a> {
    pub(crate) fn new(command_buffer: &'a CommandBuffer) -> Self {
        Self {
            command_buffer,
            ended: false,
        }
    }

    /// Dispatch `x * y * z` workgroups.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), GraphicsError> {
        self.command_buffer
            .record(RecordedCommand::Dispatch { x, y, z })
    }

    /// Open a debug group scoped to this pass. Groups still open at
    /// [`end`](Self::end) are closed.
    pub fn push_debug_group(&mut self, label: &str) {
        self.command_buffer.push_debug_group(label);
    }

    /// Close the innermost debug group of this pass. Ignored with a warning
    /// when none is open.
    pub fn pop_debug_group(&mut self) {
        self.command_buffer.pop_debug_group();
    }

    /// Insert a single debug marker.
    pub fn insert_debug_marker(&mut self, label: &str) {
        self.command_buffer.insert_debug_marker(label);
    }

    /// Close the pass.
    pub fn end(mut self) {
        self.ended = true;
        self.command_buffer.close_encoder(EncoderKind::Compute);
    }
}

impl Drop for ComputePassEncoder<'_> {
    fn drop(&mut self) {
        if !self.ended {
            log::warn!(
                "Compute pass in '{}' dropped without end(), closing it",
                self.command_buffer.label()
            );
            self.command_buffer.close_encoder(EncoderKind::Compute);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::command::{ColorAttachment, RenderPassDescriptor};
    use crate::device::GraphicsDevice;
    use crate::resources::Texture;
    use crate::types::{BufferDescriptor, PixelFormat, TextureDescriptor, TextureUsage};

    fn setup() -> (Arc<GraphicsDevice>, Arc<Texture>) {
        let device = GraphicsDevice::from_backend(Arc::new(DummyBackend::new()), None);
        let target = device
            .create_texture(&TextureDescriptor::new_2d(
                32,
                32,
                PixelFormat::Rgba8Unorm,
                TextureUsage::RENDER_TARGET,
            ))
            .unwrap();
        (device, target)
    }

    fn pass_descriptor(target: &Arc<Texture>) -> RenderPassDescriptor {
        RenderPassDescriptor::new().with_color(ColorAttachment::new(target.view().unwrap()))
    }

    #[test]
    fn test_draw_records_commands() {
        let (device, target) = setup();
        let vertices = device
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::VERTEX))
            .unwrap();
        let cb = device.begin_command_buffer("Draw").unwrap();
        let mut pass = cb.begin_render_pass(&pass_descriptor(&target)).unwrap();
        pass.set_viewport(Viewport::from_dimensions(32, 32)).unwrap();
        pass.set_vertex_buffer(0, &vertices, 0).unwrap();
        pass.draw(3, 1, 0, 0).unwrap();
        pass.end();
        assert!(!cb.has_active_encoder());
        assert_eq!(cb.command_count(), 5);
    }

    #[test]
    fn test_vertex_buffer_usage_is_checked() {
        let (device, target) = setup();
        let uniforms = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::UNIFORM))
            .unwrap();
        let cb = device.begin_command_buffer("Usage").unwrap();
        let mut pass = cb.begin_render_pass(&pass_descriptor(&target)).unwrap();
        assert!(matches!(
            pass.set_vertex_buffer(0, &uniforms, 0),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_draw_indexed_needs_index_buffer() {
        let (device, target) = setup();
        let indices = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::INDEX))
            .unwrap();
        let cb = device.begin_command_buffer("Indexed").unwrap();
        let mut pass = cb.begin_render_pass(&pass_descriptor(&target)).unwrap();
        assert!(matches!(
            pass.draw_indexed(6, 1, 0, 0, 0),
            Err(GraphicsError::InvalidOperation(_))
        ));
        assert!(pass.set_index_buffer(&indices, 2, IndexFormat::Uint32).is_err());
        pass.set_index_buffer(&indices, 4, IndexFormat::Uint32).unwrap();
        pass.draw_indexed(6, 1, 0, 0, 0).unwrap();
    }

    #[test]
    fn test_disposed_buffer_is_rejected() {
        let (device, target) = setup();
        let vertices = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::VERTEX))
            .unwrap();
        vertices.dispose();
        let cb = device.begin_command_buffer("Stale").unwrap();
        let mut pass = cb.begin_render_pass(&pass_descriptor(&target)).unwrap();
        assert!(matches!(
            pass.set_vertex_buffer(0, &vertices, 0),
            Err(GraphicsError::ObjectDisposed(_))
        ));
    }

    #[test]
    fn test_dropped_encoder_closes_pass() {
        let (device, _) = setup();
        let cb = device.begin_command_buffer("Dropped").unwrap();
        {
            let mut pass = cb.begin_compute_pass("Work").unwrap();
            pass.dispatch(8, 8, 1).unwrap();
        }
        assert!(!cb.has_active_encoder());
        cb.end().unwrap();
        let (list, _) = cb.take_submission();
        assert!(matches!(
            list.commands().last(),
            Some(RecordedCommand::EndComputePass)
        ));
    }

    #[test]
    fn test_second_pass_after_end() {
        let (device, target) = setup();
        let cb = device.begin_command_buffer("Sequential").unwrap();
        cb.begin_compute_pass("First").unwrap().end();
        let pass = cb.begin_render_pass(&pass_descriptor(&target)).unwrap();
        pass.end();
        cb.end().unwrap();
    }
}
