//! Texture types and descriptors.

use bitflags::bitflags;

use super::CpuAccessMode;
use crate::error::GraphicsError;

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PixelFormat {
    /// No format. Rejected by every creation path.
    Undefined,

    // 8-bit formats
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit red channel, signed normalized.
    R8Snorm,
    /// 8-bit red channel, unsigned integer.
    R8Uint,
    /// 8-bit red channel, signed integer.
    R8Sint,

    // 16-bit formats
    /// 16-bit red channel, float.
    R16Float,
    /// 16-bit red channel, unsigned integer.
    R16Uint,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,

    // 32-bit formats
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// 10-bit RGB with 2-bit alpha, unsigned normalized.
    Rgb10a2Unorm,
    /// Packed 11/11/10-bit unsigned float.
    Rg11b10Float,

    // 64-bit formats
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RG channels, float.
    Rg32Float,

    // 128-bit formats
    /// 32-bit RGBA channels, float.
    Rgba32Float,

    // Depth/stencil formats
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24UnormStencil8,
    /// 32-bit depth, float.
    Depth32Float,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,

    // Block-compressed formats
    /// BC1 RGBA, unsigned normalized.
    Bc1RgbaUnorm,
    /// BC3 RGBA, unsigned normalized.
    Bc3RgbaUnorm,
    /// BC7 RGBA, unsigned normalized.
    Bc7RgbaUnorm,
}

impl PixelFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth24UnormStencil8
                | Self::Depth32Float
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24UnormStencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns true for sRGB-encoded color formats.
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }

    /// Returns true for 4x4 block-compressed formats.
    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            Self::Bc1RgbaUnorm | Self::Bc3RgbaUnorm | Self::Bc7RgbaUnorm
        )
    }

    /// Returns the size in bytes per pixel, or per 4x4 block for compressed formats.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::Undefined => 0,
            Self::R8Unorm | Self::R8Snorm | Self::R8Uint | Self::R8Sint => 1,
            Self::R16Float | Self::R16Uint | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Rgb10a2Unorm
            | Self::Rg11b10Float
            | Self::Depth24UnormStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float
            | Self::Rg32Float
            | Self::Depth32FloatStencil8
            | Self::Bc1RgbaUnorm => 8,
            Self::Rgba32Float | Self::Bc3RgbaUnorm | Self::Bc7RgbaUnorm => 16,
        }
    }

    /// Tightly packed size of one row of `width` texels, or `None` if it
    /// does not fit in a `u32`.
    pub fn bytes_per_row(&self, width: u32) -> Option<u32> {
        if self.is_compressed() {
            width.div_ceil(4).checked_mul(self.block_size())
        } else {
            width.checked_mul(self.block_size())
        }
    }

    /// Number of rows (texel rows, or block rows when compressed) covering `height`.
    pub fn rows_per_image(&self, height: u32) -> u32 {
        if self.is_compressed() {
            height.div_ceil(4)
        } else {
            height
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be sampled in a shader.
        const SHADER_READ = 1 << 0;
        /// Texture can be written as a storage texture.
        const SHADER_WRITE = 1 << 1;
        /// Texture can be used as a color or depth attachment.
        const RENDER_TARGET = 1 << 2;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::SHADER_READ
    }
}

/// Dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    /// One-dimensional texture (height is always 1).
    D1,
    /// Two-dimensional texture.
    #[default]
    D2,
    /// Three-dimensional (volume) texture.
    D3,
    /// Cube map; array layers come in groups of six faces.
    Cube,
}

/// Multisample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureSampleCount {
    /// Single sample.
    #[default]
    Count1,
    /// 2x MSAA.
    Count2,
    /// 4x MSAA.
    Count4,
    /// 8x MSAA.
    Count8,
    /// 16x MSAA.
    Count16,
    /// 32x MSAA.
    Count32,
}

impl TextureSampleCount {
    /// Number of samples per texel.
    pub fn as_u32(&self) -> u32 {
        match self {
            Self::Count1 => 1,
            Self::Count2 => 2,
            Self::Count4 => 4,
            Self::Count8 => 8,
            Self::Count16 => 16,
            Self::Count32 => 32,
        }
    }
}

/// Length of the full mip chain for an extent whose largest side is `max_extent`.
///
/// This is the smallest `n` with `2^n >= max_extent`, plus one for the base
/// level. A non-power-of-two side rounds up, so 255 and 256 both yield 9.
pub fn mip_level_count_for_extent(max_extent: u32) -> u32 {
    if max_extent <= 1 {
        1
    } else {
        (u32::BITS - (max_extent - 1).leading_zeros()) + 1
    }
}

/// Descriptor for creating a texture.
///
/// A `mip_level_count` of 0 requests the full mip chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Texture dimensionality.
    pub dimension: TextureDimension,
    /// Pixel format.
    pub format: PixelFormat,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth for 3D textures, array layer count otherwise.
    pub depth_or_array_layers: u32,
    /// Mip level count (0 means full chain).
    pub mip_level_count: u32,
    /// Usage flags.
    pub usage: TextureUsage,
    /// Sample count for multisampling.
    pub sample_count: TextureSampleCount,
    /// CPU access mode.
    pub cpu_access: CpuAccessMode,
}

impl TextureDescriptor {
    fn with_dimension(
        dimension: TextureDimension,
        width: u32,
        height: u32,
        depth_or_array_layers: u32,
        format: PixelFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label: None,
            dimension,
            format,
            width,
            height,
            depth_or_array_layers,
            mip_level_count: 1,
            usage,
            sample_count: TextureSampleCount::Count1,
            cpu_access: CpuAccessMode::None,
        }
    }

    /// Create a new 1D texture descriptor.
    pub fn new_1d(width: u32, format: PixelFormat, usage: TextureUsage) -> Self {
        Self::with_dimension(TextureDimension::D1, width, 1, 1, format, usage)
    }

    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: PixelFormat, usage: TextureUsage) -> Self {
        Self::with_dimension(TextureDimension::D2, width, height, 1, format, usage)
    }

    /// Create a new 3D texture descriptor.
    pub fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: PixelFormat,
        usage: TextureUsage,
    ) -> Self {
        Self::with_dimension(TextureDimension::D3, width, height, depth, format, usage)
    }

    /// Create a new cube map descriptor with six faces.
    pub fn new_cube(size: u32, format: PixelFormat, usage: TextureUsage) -> Self {
        Self::with_dimension(TextureDimension::Cube, size, size, 6, format, usage)
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count (0 means full chain).
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Set the array layer count.
    pub fn with_array_layers(mut self, layers: u32) -> Self {
        self.depth_or_array_layers = layers;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: TextureSampleCount) -> Self {
        self.sample_count = count;
        self
    }

    /// Set the CPU access mode.
    pub fn with_cpu_access(mut self, cpu_access: CpuAccessMode) -> Self {
        self.cpu_access = cpu_access;
        self
    }

    /// Number of array layers (1 for 3D textures).
    pub fn array_layer_count(&self) -> u32 {
        match self.dimension {
            TextureDimension::D3 => 1,
            _ => self.depth_or_array_layers,
        }
    }

    /// Depth in texels (1 for anything but 3D textures).
    pub fn depth(&self) -> u32 {
        match self.dimension {
            TextureDimension::D3 => self.depth_or_array_layers,
            _ => 1,
        }
    }

    /// Size in bytes of mip 0 of every layer or slice, tightly packed.
    /// `None` when the size overflows.
    pub fn initial_data_size(&self) -> Option<u64> {
        let row = u64::from(self.format.bytes_per_row(self.width)?);
        row.checked_mul(u64::from(self.format.rows_per_image(self.height)))?
            .checked_mul(u64::from(self.depth_or_array_layers))
    }

    /// Length of the full mip chain for this extent.
    pub fn full_mip_chain_length(&self) -> u32 {
        mip_level_count_for_extent(self.width.max(self.height).max(self.depth()))
    }

    /// Mip level count with the 0 ("full chain") request resolved.
    pub fn resolved_mip_level_count(&self) -> u32 {
        if self.mip_level_count == 0 {
            self.full_mip_chain_length()
        } else {
            self.mip_level_count
        }
    }

    /// Check the descriptor for values no backend can satisfy.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if self.format == PixelFormat::Undefined {
            return Err(GraphicsError::InvalidParameter(
                "texture format must not be Undefined".into(),
            ));
        }
        if self.width == 0 || self.height == 0 || self.depth_or_array_layers == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture extent must be non-zero, got {}x{}x{}",
                self.width, self.height, self.depth_or_array_layers
            )));
        }
        match self.dimension {
            TextureDimension::D1 if self.height != 1 => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "1D texture height must be 1, got {}",
                    self.height
                )));
            }
            TextureDimension::Cube => {
                if self.width != self.height {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "cube texture faces must be square, got {}x{}",
                        self.width, self.height
                    )));
                }
                if self.depth_or_array_layers % 6 != 0 {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "cube texture layer count must be a multiple of 6, got {}",
                        self.depth_or_array_layers
                    )));
                }
            }
            _ => {}
        }
        let full_chain = self.full_mip_chain_length();
        if self.mip_level_count > full_chain {
            return Err(GraphicsError::InvalidParameter(format!(
                "mip level count {} exceeds full chain length {full_chain}",
                self.mip_level_count
            )));
        }
        if self.sample_count != TextureSampleCount::Count1 && self.resolved_mip_level_count() > 1
        {
            return Err(GraphicsError::InvalidParameter(
                "multisampled textures cannot have mip levels".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(1, 1, PixelFormat::default(), TextureUsage::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(256, 9)]
    #[case(255, 9)]
    #[case(1, 1)]
    #[case(64, 7)]
    #[case(2, 2)]
    #[case(3, 3)]
    #[case(1000, 11)]
    fn test_mip_level_count_for_extent(#[case] extent: u32, #[case] expected: u32) {
        assert_eq!(mip_level_count_for_extent(extent), expected);
    }

    #[test]
    fn test_resolved_mip_levels() {
        let desc = TextureDescriptor::new_2d(256, 64, PixelFormat::Rgba8Unorm, TextureUsage::SHADER_READ)
            .with_mip_levels(0);
        assert_eq!(desc.resolved_mip_level_count(), 9);

        let desc = desc.with_mip_levels(3);
        assert_eq!(desc.resolved_mip_level_count(), 3);
    }

    #[test]
    fn test_array_layers_do_not_grow_mip_chain() {
        let desc = TextureDescriptor::new_2d(4, 4, PixelFormat::R8Unorm, TextureUsage::SHADER_READ)
            .with_array_layers(64)
            .with_mip_levels(0);
        assert_eq!(desc.resolved_mip_level_count(), 3);

        let volume = TextureDescriptor::new_3d(4, 4, 64, PixelFormat::R8Unorm, TextureUsage::SHADER_READ)
            .with_mip_levels(0);
        assert_eq!(volume.resolved_mip_level_count(), 7);
    }

    #[rstest]
    #[case::undefined_format(TextureDescriptor::new_2d(4, 4, PixelFormat::Undefined, TextureUsage::SHADER_READ))]
    #[case::zero_width(TextureDescriptor::new_2d(0, 4, PixelFormat::R8Unorm, TextureUsage::SHADER_READ))]
    #[case::zero_layers(TextureDescriptor::new_2d(4, 4, PixelFormat::R8Unorm, TextureUsage::SHADER_READ).with_array_layers(0))]
    #[case::cube_not_square(TextureDescriptor { width: 8, ..TextureDescriptor::new_cube(4, PixelFormat::R8Unorm, TextureUsage::SHADER_READ) })]
    #[case::cube_bad_layers(TextureDescriptor::new_cube(4, PixelFormat::R8Unorm, TextureUsage::SHADER_READ).with_array_layers(5))]
    #[case::tall_1d(TextureDescriptor { height: 2, ..TextureDescriptor::new_1d(8, PixelFormat::R8Unorm, TextureUsage::SHADER_READ) })]
    #[case::too_many_mips(TextureDescriptor::new_2d(4, 4, PixelFormat::R8Unorm, TextureUsage::SHADER_READ).with_mip_levels(4))]
    #[case::msaa_mips(TextureDescriptor::new_2d(4, 4, PixelFormat::R8Unorm, TextureUsage::RENDER_TARGET).with_mip_levels(2).with_sample_count(TextureSampleCount::Count4))]
    fn test_invalid_descriptors(#[case] desc: TextureDescriptor) {
        assert!(matches!(
            desc.validate(),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_valid_descriptors() {
        let cube_array = TextureDescriptor::new_cube(16, PixelFormat::Rgba16Float, TextureUsage::SHADER_READ)
            .with_array_layers(12)
            .with_mip_levels(0);
        assert!(cube_array.validate().is_ok());
        assert_eq!(cube_array.array_layer_count(), 12);
        assert_eq!(cube_array.depth(), 1);

        let full = TextureDescriptor::new_2d(4, 4, PixelFormat::R8Unorm, TextureUsage::SHADER_READ)
            .with_mip_levels(3);
        assert!(full.validate().is_ok());
    }

    #[test]
    fn test_format_properties() {
        assert!(PixelFormat::Depth24UnormStencil8.is_depth_stencil());
        assert!(PixelFormat::Depth24UnormStencil8.has_stencil());
        assert!(!PixelFormat::Depth32Float.has_stencil());
        assert!(PixelFormat::Bgra8UnormSrgb.is_srgb());
        assert_eq!(PixelFormat::Rgba16Float.block_size(), 8);
        assert_eq!(PixelFormat::Rgba8Unorm.bytes_per_row(10), Some(40));
        assert_eq!(PixelFormat::Bc1RgbaUnorm.bytes_per_row(10), Some(24));
        assert_eq!(PixelFormat::Rgba32Float.bytes_per_row(0x2000_0000), None);
        assert_eq!(PixelFormat::Bc7RgbaUnorm.rows_per_image(10), 3);
    }

    #[test]
    fn test_initial_data_size() {
        let desc = TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8Unorm, TextureUsage::SHADER_READ)
            .with_array_layers(2);
        assert_eq!(desc.initial_data_size(), Some(128));

        let huge = TextureDescriptor::new_2d(
            0x2000_0000,
            1,
            PixelFormat::Rgba32Float,
            TextureUsage::SHADER_READ,
        );
        assert_eq!(huge.initial_data_size(), None);
    }

    #[test]
    fn test_sample_count() {
        assert_eq!(TextureSampleCount::default().as_u32(), 1);
        assert_eq!(TextureSampleCount::Count8.as_u32(), 8);
    }
}
