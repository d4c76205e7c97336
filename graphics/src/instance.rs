//! Backend selection and device creation parameters.
//!
//! [`DeviceParameters`] describes what kind of device the application wants;
//! [`BackendRegistry`] maps each [`BackendType`] to a factory and picks one.
//! The registry is an ordinary value owned by the caller, so tests can
//! register counting or failing backends without touching global state.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::backend::GpuBackend;
use crate::error::GraphicsError;

/// Environment variable overriding the backend choice.
pub const BACKEND_ENV_VAR: &str = "VORTICE_BACKEND";

/// Environment variable enabling API validation (`1` or `true`).
pub const VALIDATION_ENV_VAR: &str = "VORTICE_VALIDATION";

/// Information about a graphics adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Adapter name.
    pub name: String,
    /// Adapter vendor.
    pub vendor: String,
    /// Device type (discrete, integrated, etc.).
    pub device_type: AdapterType,
}

/// Type of graphics adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterType {
    /// Discrete GPU (dedicated graphics card).
    Discrete,
    /// Integrated GPU (shared with CPU).
    Integrated,
    /// Software renderer.
    Software,
    /// Unknown adapter type.
    Unknown,
}

/// Graphics backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Highest-priority registered backend that initializes successfully.
    #[default]
    Auto,
    /// Recording no-op backend.
    Dummy,
    /// wgpu (Vulkan, Metal, DX12, WebGPU).
    Wgpu,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Dummy => write!(f, "dummy"),
            Self::Wgpu => write!(f, "wgpu"),
        }
    }
}

impl FromStr for BackendType {
    type Err = GraphicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "dummy" | "null" => Ok(Self::Dummy),
            "wgpu" | "webgpu" => Ok(Self::Wgpu),
            other => Err(GraphicsError::InvalidParameter(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

/// GPU power preference for adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerPreference {
    /// Prefer an integrated / power-efficient adapter.
    LowPower,
    /// Prefer a discrete / high-performance adapter.
    #[default]
    HighPerformance,
}

/// Parameters for creating a [`GraphicsDevice`](crate::GraphicsDevice).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceParameters {
    /// Backend to create.
    pub backend: BackendType,
    /// Enable API validation layers.
    pub validation: bool,
    /// Enable debug labels and markers in native tooling.
    pub debug: bool,
    /// Adapter power preference.
    pub power_preference: PowerPreference,
    /// Debug label of the device.
    pub label: Option<String>,
}

impl DeviceParameters {
    /// Create default parameters (auto backend, no validation).
    pub fn new() -> Self {
        Self::default()
    }

    /// Default parameters with overrides from `VORTICE_BACKEND` and
    /// `VORTICE_VALIDATION`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut params = Self::new();
        if let Ok(value) = std::env::var(BACKEND_ENV_VAR) {
            match value.parse() {
                Ok(backend) => params.backend = backend,
                Err(err) => log::warn!("Ignoring {BACKEND_ENV_VAR}={value:?}: {err}"),
            }
        }
        if let Ok(value) = std::env::var(VALIDATION_ENV_VAR) {
            params.validation = matches!(value.trim(), "1" | "true" | "TRUE" | "on");
        }
        params
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Enable or disable validation.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Enable or disable debug annotations.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the power preference.
    pub fn with_power_preference(mut self, preference: PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }

    /// Set the device label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Factory creating a backend from device parameters.
pub type BackendFactory =
    Box<dyn Fn(&DeviceParameters) -> Result<Arc<dyn GpuBackend>, GraphicsError> + Send + Sync>;

struct RegisteredBackend {
    backend_type: BackendType,
    priority: i32,
    factory: BackendFactory,
}

/// Explicit registry of backend factories.
///
/// [`BackendType::Auto`] tries registered backends from the highest priority
/// down and returns the first that initializes.
#[derive(Default)]
pub struct BackendRegistry {
    entries: Vec<RegisteredBackend>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("available", &self.available())
            .finish()
    }
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every backend compiled into this crate.
    ///
    /// wgpu (when enabled) outranks the dummy backend, so `Auto` falls back to
    /// dummy only if no GPU is usable.
    pub fn with_default_backends() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "wgpu-backend")]
        registry.register(BackendType::Wgpu, 100, |params| {
            let backend = crate::backend::wgpu_backend::WgpuBackend::with_params(params)?;
            Ok(Arc::new(backend) as Arc<dyn GpuBackend>)
        });
        #[cfg(feature = "dummy")]
        registry.register(BackendType::Dummy, 0, |_| {
            Ok(Arc::new(crate::backend::dummy::DummyBackend::new()) as Arc<dyn GpuBackend>)
        });
        registry
    }

    /// Register `factory` for `backend_type`, replacing any earlier registration.
    pub fn register<F>(&mut self, backend_type: BackendType, priority: i32, factory: F) -> &mut Self
    where
        F: Fn(&DeviceParameters) -> Result<Arc<dyn GpuBackend>, GraphicsError>
            + Send
            + Sync
            + 'static,
    {
        self.entries.retain(|entry| entry.backend_type != backend_type);
        self.entries.push(RegisteredBackend {
            backend_type,
            priority,
            factory: Box::new(factory),
        });
        self.entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        self
    }

    /// Check whether `backend_type` has a factory.
    pub fn is_registered(&self, backend_type: BackendType) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.backend_type == backend_type)
    }

    /// Registered backends, highest priority first.
    pub fn available(&self) -> Vec<BackendType> {
        self.entries.iter().map(|entry| entry.backend_type).collect()
    }

    /// Create the backend requested by `params`.
    pub fn create(&self, params: &DeviceParameters) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
        if params.backend != BackendType::Auto {
            let entry = self
                .entries
                .iter()
                .find(|entry| entry.backend_type == params.backend)
                .ok_or_else(|| {
                    GraphicsError::FeatureNotSupported(format!(
                        "backend '{}' is not registered",
                        params.backend
                    ))
                })?;
            return (entry.factory)(params);
        }

        let mut last_error = None;
        for entry in &self.entries {
            match (entry.factory)(params) {
                Ok(backend) => {
                    log::info!("Using {} ({})", backend.name(), entry.backend_type);
                    return Ok(backend);
                }
                Err(err) => {
                    log::warn!("Backend '{}' unavailable: {err}", entry.backend_type);
                    last_error = Some(err);
                }
            }
        }
        Err(GraphicsError::InitializationFailed(match last_error {
            Some(err) => format!("no registered backend could be created (last error: {err})"),
            None => "no backends are registered".into(),
        }))
    }
}
