//! Type conversions between Vortice types and wgpu types.

use crate::instance::{AdapterType, PowerPreference};
use crate::types::{
    BufferUsage, Color, CpuAccessMode, IndexFormat, LoadAction, PixelFormat, PresentMode,
    StoreAction, TextureDimension, TextureUsage, TextureViewDimension,
};

/// Convert BufferUsage flags and CPU access to wgpu buffer usages.
///
/// Readback buffers may only be copy destinations. Every other buffer can be
/// written through the queue and copied from.
pub fn convert_buffer_usage(usage: BufferUsage, cpu_access: CpuAccessMode) -> wgpu::BufferUsages {
    if cpu_access == CpuAccessMode::Read {
        return wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST;
    }

    let mut result = wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC;

    if usage.contains(BufferUsage::VERTEX) {
        result |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsage::INDEX) {
        result |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        result |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.intersects(BufferUsage::SHADER_READ | BufferUsage::SHADER_READ_WRITE) {
        result |= wgpu::BufferUsages::STORAGE;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        result |= wgpu::BufferUsages::INDIRECT;
    }

    result
}

/// Convert PixelFormat to wgpu format.
pub fn convert_texture_format(format: PixelFormat) -> Option<wgpu::TextureFormat> {
    Some(match format {
        PixelFormat::Undefined => return None,

        // 8-bit formats
        PixelFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        PixelFormat::R8Snorm => wgpu::TextureFormat::R8Snorm,
        PixelFormat::R8Uint => wgpu::TextureFormat::R8Uint,
        PixelFormat::R8Sint => wgpu::TextureFormat::R8Sint,

        // 16-bit formats
        PixelFormat::R16Float => wgpu::TextureFormat::R16Float,
        PixelFormat::R16Uint => wgpu::TextureFormat::R16Uint,
        PixelFormat::Rg8Unorm => wgpu::TextureFormat::Rg8Unorm,

        // 32-bit formats
        PixelFormat::R32Float => wgpu::TextureFormat::R32Float,
        PixelFormat::R32Uint => wgpu::TextureFormat::R32Uint,
        PixelFormat::Rg16Float => wgpu::TextureFormat::Rg16Float,
        PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        PixelFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        PixelFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        PixelFormat::Rgb10a2Unorm => wgpu::TextureFormat::Rgb10a2Unorm,
        PixelFormat::Rg11b10Float => wgpu::TextureFormat::Rg11b10Ufloat,

        // 64-bit formats
        PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::Rg32Float => wgpu::TextureFormat::Rg32Float,

        // 128-bit formats
        PixelFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,

        // Depth/stencil formats
        PixelFormat::Depth16Unorm => wgpu::TextureFormat::Depth16Unorm,
        PixelFormat::Depth24UnormStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
        PixelFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        PixelFormat::Depth32FloatStencil8 => wgpu::TextureFormat::Depth32FloatStencil8,

        // Block-compressed formats
        PixelFormat::Bc1RgbaUnorm => wgpu::TextureFormat::Bc1RgbaUnorm,
        PixelFormat::Bc3RgbaUnorm => wgpu::TextureFormat::Bc3RgbaUnorm,
        PixelFormat::Bc7RgbaUnorm => wgpu::TextureFormat::Bc7RgbaUnorm,
    })
}

/// Convert TextureUsage flags to wgpu texture usages. Uploads and copies are always allowed.
pub fn convert_texture_usage(usage: TextureUsage) -> wgpu::TextureUsages {
    let mut result = wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC;

    if usage.contains(TextureUsage::SHADER_READ) {
        result |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(TextureUsage::SHADER_WRITE) {
        result |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if usage.contains(TextureUsage::RENDER_TARGET) {
        result |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }

    result
}

/// Convert TextureDimension to wgpu's storage dimension. Cubes are 2D arrays.
pub fn convert_texture_dimension(dimension: TextureDimension) -> wgpu::TextureDimension {
    match dimension {
        TextureDimension::D1 => wgpu::TextureDimension::D1,
        TextureDimension::D2 | TextureDimension::Cube => wgpu::TextureDimension::D2,
        TextureDimension::D3 => wgpu::TextureDimension::D3,
    }
}

/// Convert TextureViewDimension to wgpu.
pub fn convert_view_dimension(dimension: TextureViewDimension) -> wgpu::TextureViewDimension {
    match dimension {
        // wgpu has no 1D array views; a single-layer range is the common case.
        TextureViewDimension::D1 | TextureViewDimension::D1Array => wgpu::TextureViewDimension::D1,
        TextureViewDimension::D2 => wgpu::TextureViewDimension::D2,
        TextureViewDimension::D2Array => wgpu::TextureViewDimension::D2Array,
        TextureViewDimension::D3 => wgpu::TextureViewDimension::D3,
        TextureViewDimension::Cube => wgpu::TextureViewDimension::Cube,
        TextureViewDimension::CubeArray => wgpu::TextureViewDimension::CubeArray,
    }
}

/// Convert IndexFormat to wgpu.
pub fn convert_index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

/// Convert a color load action.
pub fn convert_load_op(action: LoadAction<Color>) -> wgpu::LoadOp<wgpu::Color> {
    match action {
        LoadAction::Load => wgpu::LoadOp::Load,
        LoadAction::DontCare => wgpu::LoadOp::Load, // wgpu doesn't have DontCare for color
        LoadAction::Clear(color) => wgpu::LoadOp::Clear(wgpu::Color {
            r: color.r,
            g: color.g,
            b: color.b,
            a: color.a,
        }),
    }
}

/// Convert a depth or stencil load action.
pub fn convert_value_load_op<T: Copy>(action: LoadAction<T>) -> wgpu::LoadOp<T> {
    match action {
        LoadAction::Load | LoadAction::DontCare => wgpu::LoadOp::Load,
        LoadAction::Clear(value) => wgpu::LoadOp::Clear(value),
    }
}

/// Convert StoreAction to wgpu store op.
pub fn convert_store_op(action: StoreAction) -> wgpu::StoreOp {
    match action {
        StoreAction::Store => wgpu::StoreOp::Store,
        StoreAction::Discard => wgpu::StoreOp::Discard,
    }
}

/// Convert PresentMode to wgpu present mode.
pub fn convert_present_mode(mode: PresentMode) -> wgpu::PresentMode {
    match mode {
        PresentMode::Immediate => wgpu::PresentMode::Immediate,
        PresentMode::Mailbox => wgpu::PresentMode::Mailbox,
        PresentMode::Fifo => wgpu::PresentMode::Fifo,
    }
}

/// Convert PowerPreference to wgpu.
pub fn convert_power_preference(preference: PowerPreference) -> wgpu::PowerPreference {
    match preference {
        PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
    }
}

/// Convert wgpu's device type to AdapterType.
pub fn convert_adapter_type(device_type: wgpu::DeviceType) -> AdapterType {
    match device_type {
        wgpu::DeviceType::DiscreteGpu => AdapterType::Discrete,
        wgpu::DeviceType::IntegratedGpu => AdapterType::Integrated,
        wgpu::DeviceType::Cpu => AdapterType::Software,
        wgpu::DeviceType::VirtualGpu | wgpu::DeviceType::Other => AdapterType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readback_buffer_usage() {
        let usage = convert_buffer_usage(BufferUsage::VERTEX, CpuAccessMode::Read);
        assert_eq!(usage, wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST);
    }

    #[test]
    fn test_storage_buffer_usage() {
        let usage = convert_buffer_usage(BufferUsage::SHADER_READ_WRITE, CpuAccessMode::None);
        assert!(usage.contains(wgpu::BufferUsages::STORAGE));
        assert!(usage.contains(wgpu::BufferUsages::COPY_DST));
    }

    #[test]
    fn test_format_mapping() {
        assert_eq!(convert_texture_format(PixelFormat::Undefined), None);
        assert_eq!(
            convert_texture_format(PixelFormat::Depth24UnormStencil8),
            Some(wgpu::TextureFormat::Depth24PlusStencil8)
        );
        assert_eq!(
            convert_texture_format(PixelFormat::Rg11b10Float),
            Some(wgpu::TextureFormat::Rg11b10Ufloat)
        );
    }

    #[test]
    fn test_cube_is_stored_as_2d() {
        assert_eq!(
            convert_texture_dimension(TextureDimension::Cube),
            wgpu::TextureDimension::D2
        );
    }
}
