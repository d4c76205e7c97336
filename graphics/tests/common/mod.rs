//! Common utilities for integration tests.
//!
//! This module provides shared test infrastructure that can be reused
//! across different backend implementations.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use vortice_graphics::{
    BackendRegistry, BackendType, ColorAttachment, CommandBuffer, DeviceCapabilities,
    DeviceParameters, DummyBackend, GraphicsDevice, PixelFormat, RenderPassDescriptor, Texture,
    TextureDescriptor, TextureUsage,
};

static LOGGER: Once = Once::new();

/// Route `log` output to the test harness. Filter with `RUST_LOG`.
pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available GPU backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Dummy backend (no actual GPU operations).
    Dummy,
    /// WebGPU backend (via wgpu).
    WebGpu,
}

impl Backend {
    /// Check if this backend is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Dummy => true,
            #[cfg(feature = "wgpu-backend")]
            Backend::WebGpu => true,
            #[cfg(not(feature = "wgpu-backend"))]
            Backend::WebGpu => false,
        }
    }

    fn backend_type(&self) -> BackendType {
        match self {
            Backend::Dummy => BackendType::Dummy,
            Backend::WebGpu => BackendType::Wgpu,
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// A device for one backend, plus the dummy backend when it is the one in use.
pub struct TestContext {
    pub backend: Backend,
    pub device: Arc<GraphicsDevice>,
    pub dummy: Option<Arc<DummyBackend>>,
}

impl TestContext {
    /// Create a new test context for the given backend.
    ///
    /// Returns `None` if the backend is not compiled in or has no usable adapter.
    pub fn new(backend: Backend) -> Option<Self> {
        init_logging();
        if !backend.is_available() {
            return None;
        }

        if backend == Backend::Dummy {
            return Some(Self::dummy(DeviceCapabilities::all_features()));
        }

        let params = DeviceParameters::new()
            .with_backend(backend.backend_type())
            .with_label("Test Device");
        match GraphicsDevice::with_registry(&BackendRegistry::with_default_backends(), &params) {
            Ok(device) => Some(Self {
                backend,
                device,
                dummy: None,
            }),
            Err(err) => {
                log::warn!("Skipping {backend:?}: {err}");
                None
            }
        }
    }

    /// A dummy-backed context reporting `capabilities`.
    pub fn dummy(capabilities: DeviceCapabilities) -> Self {
        init_logging();
        let dummy = Arc::new(DummyBackend::with_capabilities(capabilities));
        let device = GraphicsDevice::from_backend(dummy.clone(), Some("Test Device"));
        Self {
            backend: Backend::Dummy,
            device,
            dummy: Some(dummy),
        }
    }

    /// The dummy backend. Panics for other backends.
    pub fn dummy_backend(&self) -> &DummyBackend {
        self.dummy
            .as_deref()
            .expect("test requires the dummy backend")
    }

    /// Create a 2D render target.
    pub fn render_target(&self, width: u32, height: u32) -> Arc<Texture> {
        self.device
            .create_texture(
                &TextureDescriptor::new_2d(
                    width,
                    height,
                    PixelFormat::Rgba8Unorm,
                    TextureUsage::RENDER_TARGET | TextureUsage::SHADER_READ,
                )
                .with_label("Test Target"),
            )
            .expect("Failed to create render target")
    }

    /// Record a command buffer that clears `target`, ended and ready to submit.
    pub fn clear_pass(&self, label: &str, target: &Arc<Texture>) -> CommandBuffer {
        let cb = self
            .device
            .begin_command_buffer(label)
            .expect("Failed to begin command buffer");
        let pass = RenderPassDescriptor::new().with_color(
            ColorAttachment::new(target.view().expect("Failed to create view"))
                .with_clear(vortice_graphics::Color::new(0.1, 0.2, 0.3, 1.0)),
        );
        cb.begin_render_pass(&pass)
            .expect("Failed to begin render pass")
            .end();
        cb.end().expect("Failed to end command buffer");
        cb
    }
}
