//! Texture view descriptors.

use super::{TextureDescriptor, TextureDimension};
use crate::error::GraphicsError;

/// How a view interprets the texture it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewDimension {
    /// Single 1D layer.
    D1,
    /// Array of 1D layers.
    D1Array,
    /// Single 2D layer.
    D2,
    /// Array of 2D layers.
    D2Array,
    /// Volume.
    D3,
    /// Six 2D layers viewed as a cube.
    Cube,
    /// Groups of six 2D layers viewed as cubes.
    CubeArray,
}

impl TextureViewDimension {
    /// The view dimension covering a whole texture.
    pub fn default_for(descriptor: &TextureDescriptor) -> Self {
        let layers = descriptor.array_layer_count();
        match descriptor.dimension {
            TextureDimension::D1 if layers > 1 => Self::D1Array,
            TextureDimension::D1 => Self::D1,
            TextureDimension::D2 if layers > 1 => Self::D2Array,
            TextureDimension::D2 => Self::D2,
            TextureDimension::D3 => Self::D3,
            TextureDimension::Cube if layers == 6 => Self::Cube,
            TextureDimension::Cube => Self::CubeArray,
        }
    }
}

/// Descriptor selecting a subresource range of a texture.
///
/// Structurally equal descriptors are the key of a texture's view cache, so two
/// requests with the same descriptor resolve to the same view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewDescriptor {
    /// View dimensionality.
    pub dimension: TextureViewDimension,
    /// First mip level visible through the view.
    pub base_mip_level: u32,
    /// Number of visible mip levels.
    pub mip_level_count: u32,
    /// First visible array layer.
    pub base_array_layer: u32,
    /// Number of visible array layers.
    pub array_layer_count: u32,
}

impl TextureViewDescriptor {
    /// Descriptor covering every mip level and layer of `texture`.
    ///
    /// `texture` must already have its mip count resolved.
    pub fn full(texture: &TextureDescriptor) -> Self {
        Self {
            dimension: TextureViewDimension::default_for(texture),
            base_mip_level: 0,
            mip_level_count: texture.resolved_mip_level_count(),
            base_array_layer: 0,
            array_layer_count: texture.array_layer_count(),
        }
    }

    /// Restrict the view to a mip range.
    pub fn with_mip_range(mut self, base: u32, count: u32) -> Self {
        self.base_mip_level = base;
        self.mip_level_count = count;
        self
    }

    /// Restrict the view to an array layer range.
    pub fn with_layer_range(mut self, base: u32, count: u32) -> Self {
        self.base_array_layer = base;
        self.array_layer_count = count;
        self
    }

    /// Override the view dimension.
    pub fn with_dimension(mut self, dimension: TextureViewDimension) -> Self {
        self.dimension = dimension;
        self
    }

    /// Check that this view fits inside `texture`.
    pub fn validate_against(&self, texture: &TextureDescriptor) -> Result<(), GraphicsError> {
        let mip_levels = texture.resolved_mip_level_count();
        let layers = texture.array_layer_count();

        if self.mip_level_count == 0 || self.array_layer_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "texture view must cover at least one mip level and layer".into(),
            ));
        }
        let mip_end = self.base_mip_level.checked_add(self.mip_level_count);
        if mip_end.is_none_or(|end| end > mip_levels) {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture view mips {}+{} exceed {mip_levels} levels",
                self.base_mip_level, self.mip_level_count
            )));
        }
        let layer_end = self.base_array_layer.checked_add(self.array_layer_count);
        if layer_end.is_none_or(|end| end > layers) {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture view layers {}+{} exceed {layers} layers",
                self.base_array_layer, self.array_layer_count
            )));
        }

        let compatible = match self.dimension {
            TextureViewDimension::D1 => {
                texture.dimension == TextureDimension::D1 && self.array_layer_count == 1
            }
            TextureViewDimension::D1Array => texture.dimension == TextureDimension::D1,
            TextureViewDimension::D2 => {
                matches!(
                    texture.dimension,
                    TextureDimension::D2 | TextureDimension::Cube
                ) && self.array_layer_count == 1
            }
            TextureViewDimension::D2Array => matches!(
                texture.dimension,
                TextureDimension::D2 | TextureDimension::Cube
            ),
            TextureViewDimension::D3 => texture.dimension == TextureDimension::D3,
            TextureViewDimension::Cube => {
                texture.dimension != TextureDimension::D3
                    && texture.dimension != TextureDimension::D1
                    && texture.width == texture.height
                    && self.array_layer_count == 6
            }
            TextureViewDimension::CubeArray => {
                texture.dimension != TextureDimension::D3
                    && texture.dimension != TextureDimension::D1
                    && texture.width == texture.height
                    && self.array_layer_count % 6 == 0
            }
        };
        if !compatible {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} view over {} layers is incompatible with a {:?} texture",
                self.dimension, self.array_layer_count, texture.dimension
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PixelFormat, TextureUsage};

    fn cube() -> TextureDescriptor {
        TextureDescriptor::new_cube(64, PixelFormat::Rgba8Unorm, TextureUsage::SHADER_READ)
            .with_mip_levels(0)
    }

    #[test]
    fn test_full_view_descriptor() {
        let desc = TextureViewDescriptor::full(&cube());
        assert_eq!(desc.dimension, TextureViewDimension::Cube);
        assert_eq!(desc.mip_level_count, 7);
        assert_eq!(desc.array_layer_count, 6);
        assert!(desc.validate_against(&cube()).is_ok());
    }

    #[test]
    fn test_default_dimension() {
        let array = TextureDescriptor::new_2d(8, 8, PixelFormat::R8Unorm, TextureUsage::SHADER_READ)
            .with_array_layers(4);
        assert_eq!(
            TextureViewDimension::default_for(&array),
            TextureViewDimension::D2Array
        );
        let volume = TextureDescriptor::new_3d(8, 8, 8, PixelFormat::R8Unorm, TextureUsage::SHADER_READ);
        assert_eq!(
            TextureViewDimension::default_for(&volume),
            TextureViewDimension::D3
        );
    }

    #[test]
    fn test_face_view_of_cube() {
        let face = TextureViewDescriptor::full(&cube())
            .with_dimension(TextureViewDimension::D2)
            .with_layer_range(3, 1)
            .with_mip_range(2, 1);
        assert!(face.validate_against(&cube()).is_ok());
    }

    #[test]
    fn test_out_of_range_views() {
        let base = TextureViewDescriptor::full(&cube());
        assert!(base.with_mip_range(5, 3).validate_against(&cube()).is_err());
        assert!(base.with_mip_range(0, 0).validate_against(&cube()).is_err());
        assert!(base
            .with_dimension(TextureViewDimension::D2Array)
            .with_layer_range(4, 4)
            .validate_against(&cube())
            .is_err());
        assert!(base
            .with_mip_range(u32::MAX, 2)
            .validate_against(&cube())
            .is_err());
    }

    #[test]
    fn test_incompatible_dimension() {
        let base = TextureViewDescriptor::full(&cube());
        assert!(base
            .with_dimension(TextureViewDimension::D3)
            .validate_against(&cube())
            .is_err());
    }
}
