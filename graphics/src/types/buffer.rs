//! Buffer types and descriptors.

use bitflags::bitflags;

use crate::error::GraphicsError;

/// Smallest buffer size accepted at creation, in bytes.
pub const MIN_BUFFER_SIZE: u64 = 4;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be bound as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be bound as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be read from shaders.
        const SHADER_READ = 1 << 3;
        /// Buffer can be read and written from shaders.
        const SHADER_READ_WRITE = 1 << 4;
        /// Buffer can hold indirect draw or dispatch arguments.
        const INDIRECT = 1 << 5;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// CPU visibility of a resource's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CpuAccessMode {
    /// GPU-only memory.
    #[default]
    None,
    /// CPU can read back (readback heap).
    Read,
    /// CPU can write (upload heap).
    Write,
}

/// Element format of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub fn size(&self) -> u64 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// CPU access mode.
    pub cpu_access: CpuAccessMode,
}

impl BufferDescriptor {
    /// Create a new GPU-only buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
            cpu_access: CpuAccessMode::None,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the CPU access mode.
    pub fn with_cpu_access(mut self, cpu_access: CpuAccessMode) -> Self {
        self.cpu_access = cpu_access;
        self
    }

    /// Check the descriptor for values no backend can satisfy.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if self.size < MIN_BUFFER_SIZE {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size must be at least {MIN_BUFFER_SIZE} bytes, got {}",
                self.size
            )));
        }
        Ok(())
    }
}
