//! Resource creation for the wgpu backend.

use std::sync::Arc;

use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, TextureDescriptor, TextureViewDescriptor};

use super::super::{GpuBuffer, GpuTexture, GpuTextureView};
use super::WgpuBackend;
use super::conversion::{
    convert_buffer_usage, convert_texture_dimension, convert_texture_format,
    convert_texture_usage, convert_view_dimension,
};

impl WgpuBackend {
    pub(super) fn create_buffer_impl(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuBuffer, GraphicsError> {
        let usage = convert_buffer_usage(descriptor.usage, descriptor.cpu_access);

        // Queue writes operate on 4-byte granules.
        let size = descriptor.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size,
            usage,
            mapped_at_creation: false,
        });
        let buffer = GpuBuffer::Wgpu(Arc::new(buffer));

        if let Some(data) = initial_data
            && !data.is_empty()
        {
            self.write_buffer_impl(&buffer, 0, data)?;
        }

        Ok(buffer)
    }

    pub(super) fn write_buffer_impl(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let GpuBuffer::Wgpu(wgpu_buffer) = buffer else {
            return Err(GraphicsError::Internal(
                "write_buffer called with non-wgpu buffer".to_string(),
            ));
        };
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer write offset {offset} must be a multiple of {}",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }

        let aligned_len = (data.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if aligned_len == data.len() as u64 {
            self.queue.write_buffer(wgpu_buffer, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(aligned_len as usize, 0);
            self.queue.write_buffer(wgpu_buffer, offset, &padded);
        }
        Ok(())
    }

    pub(super) fn create_texture_impl(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuTexture, GraphicsError> {
        let format = convert_texture_format(descriptor.format).ok_or_else(|| {
            GraphicsError::InvalidParameter("texture format must not be Undefined".into())
        })?;
        let size = wgpu::Extent3d {
            width: descriptor.width,
            height: descriptor.height,
            depth_or_array_layers: descriptor.depth_or_array_layers,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size,
            mip_level_count: descriptor.mip_level_count,
            sample_count: descriptor.sample_count.as_u32(),
            dimension: convert_texture_dimension(descriptor.dimension),
            format,
            usage: convert_texture_usage(descriptor.usage),
            view_formats: &[],
        });

        if let Some(data) = initial_data {
            // Mip 0 of every layer, tightly packed.
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: descriptor.format.bytes_per_row(descriptor.width),
                    rows_per_image: Some(descriptor.format.rows_per_image(descriptor.height)),
                },
                size,
            );
        }

        Ok(GpuTexture::Wgpu(Arc::new(texture)))
    }

    pub(super) fn create_texture_view_impl(
        &self,
        texture: &GpuTexture,
        texture_descriptor: &TextureDescriptor,
        descriptor: &TextureViewDescriptor,
    ) -> Result<GpuTextureView, GraphicsError> {
        let GpuTexture::Wgpu(wgpu_texture) = texture else {
            return Err(GraphicsError::Internal(
                "create_texture_view called with non-wgpu texture".to_string(),
            ));
        };

        let view = wgpu_texture.create_view(&wgpu::TextureViewDescriptor {
            label: texture_descriptor.label.as_deref(),
            dimension: Some(convert_view_dimension(descriptor.dimension)),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: descriptor.base_mip_level,
            mip_level_count: Some(descriptor.mip_level_count),
            base_array_layer: descriptor.base_array_layer,
            array_layer_count: Some(descriptor.array_layer_count),
            ..Default::default()
        });

        Ok(GpuTextureView::Wgpu(Arc::new(view)))
    }
}
