//! GPU buffer resource.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{GpuBuffer, GpuObjectRef};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::object::{GraphicsObject, GraphicsResource, ObjectState};
use crate::types::{BufferDescriptor, BufferUsage, CpuAccessMode};

/// A GPU buffer resource.
///
/// Buffers are created by [`GraphicsDevice::create_buffer`] and are reference-counted.
/// They keep their parent device alive. Dropping the last reference (or calling
/// [`dispose`](GraphicsObject::dispose)) releases the native buffer.
///
/// # Example
///
/// ```ignore
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))?;
/// buffer.write(0, &vertex_bytes)?;
/// ```
pub struct Buffer {
    state: ObjectState,
    device: Arc<GraphicsDevice>,
    descriptor: BufferDescriptor,
    native: RwLock<Option<GpuBuffer>>,
}

impl Buffer {
    /// Create a new buffer (called by GraphicsDevice).
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        descriptor: BufferDescriptor,
        native: GpuBuffer,
    ) -> Self {
        Self {
            state: ObjectState::new(descriptor.label.as_deref(), "Buffer"),
            device,
            descriptor,
            native: RwLock::new(Some(native)),
        }
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.descriptor.usage
    }

    /// Get the CPU access mode.
    pub fn cpu_access(&self) -> CpuAccessMode {
        self.descriptor.cpu_access
    }

    /// Native handle, or `None` once disposed.
    pub fn native_handle(&self) -> Option<GpuBuffer> {
        self.native.read().clone()
    }

    /// Write `data` at byte `offset` through the device queue.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        self.state.ensure_alive()?;
        let end = offset.checked_add(data.len() as u64);
        if end.is_none_or(|end| end > self.descriptor.size) {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {offset} overflows buffer '{}' of {} bytes",
                data.len(),
                self.label(),
                self.descriptor.size
            )));
        }
        if data.is_empty() {
            return Ok(());
        }
        let native = self.native.read();
        match native.as_ref() {
            Some(native) => self.device.backend().write_buffer(native, offset, data),
            None => Err(GraphicsError::ObjectDisposed(self.label())),
        }
    }
}

impl GraphicsObject for Buffer {
    fn object_state(&self) -> &ObjectState {
        &self.state
    }

    fn on_label_changed(&self, label: &str) {
        if let Some(native) = self.native.read().as_ref() {
            self.device
                .backend()
                .set_object_label(GpuObjectRef::Buffer(native), label);
        }
    }

    fn destroy(&self) {
        if let Some(native) = self.native.write().take() {
            log::trace!("Buffer: releasing '{}'", self.label());
            self.device.backend().destroy_buffer(native);
        }
    }
}

impl GraphicsResource for Buffer {
    fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("label", &self.label())
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// Ensure Buffer is Send + Sync
static_assertions::assert_impl_all!(Buffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    fn create_test_device() -> (Arc<GraphicsDevice>, Arc<DummyBackend>) {
        let backend = Arc::new(DummyBackend::new());
        (GraphicsDevice::from_backend(backend.clone(), None), backend)
    }

    #[test]
    fn test_buffer_debug() {
        let (device, _) = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
            .unwrap();
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("Buffer"));
        assert!(debug.contains("1024"));
    }

    #[test]
    fn test_buffer_accessors() {
        let (device, _) = create_test_device();
        let desc = BufferDescriptor::new(2048, BufferUsage::UNIFORM)
            .with_cpu_access(CpuAccessMode::Write);
        let buffer = device.create_buffer(&desc).unwrap();
        assert_eq!(buffer.size(), 2048);
        assert_eq!(buffer.usage(), BufferUsage::UNIFORM);
        assert_eq!(buffer.cpu_access(), CpuAccessMode::Write);
        assert_eq!(buffer.label(), "Buffer");
    }

    #[test]
    fn test_buffer_write() {
        let (device, backend) = create_test_device();
        let buffer = device
            .create_buffer_with_data(&BufferDescriptor::new(8, BufferUsage::UNIFORM), &[1, 2])
            .unwrap();
        buffer.write(6, &[7, 8]).unwrap();
        let native = buffer.native_handle().unwrap();
        assert_eq!(
            backend.buffer_contents(&native),
            Some(vec![1, 2, 0, 0, 0, 0, 7, 8])
        );
        assert!(matches!(
            buffer.write(7, &[1, 2]),
            Err(GraphicsError::InvalidParameter(_))
        ));
        assert!(buffer.write(u64::MAX, &[1]).is_err());
    }

    #[test]
    fn test_buffer_dispose_once() {
        let (device, backend) = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::INDEX))
            .unwrap();
        buffer.dispose();
        buffer.dispose();
        assert_eq!(backend.stats().buffers_destroyed, 1);
        assert!(buffer.native_handle().is_none());
        assert!(matches!(
            buffer.write(0, &[0; 4]),
            Err(GraphicsError::ObjectDisposed(_))
        ));
        drop(buffer);
        assert_eq!(backend.stats().buffers_destroyed, 1);
    }

    #[test]
    fn test_drop_releases_buffer() {
        let (device, backend) = create_test_device();
        drop(
            device
                .create_buffer(&BufferDescriptor::new(64, BufferUsage::INDEX))
                .unwrap(),
        );
        assert_eq!(backend.stats().buffers_destroyed, 1);
    }

    #[test]
    fn test_label_forwarded_to_backend() {
        let (device, backend) = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::INDEX).with_label("ib"))
            .unwrap();
        assert_eq!(buffer.label(), "ib");
        buffer.set_label("Index Buffer").unwrap();
        assert_eq!(buffer.label(), "Index Buffer");
        let history = backend.label_history();
        assert_eq!(history.last().unwrap().1, "Index Buffer");
    }
}
