//! Command list replay for the wgpu backend.

use std::sync::Arc;

use crate::command::{CommandList, RecordedCommand, RenderPassDescriptor};
use crate::error::GraphicsError;
use crate::object::GraphicsObject;
use crate::resources::{Buffer, TextureView};

use super::super::{GpuBuffer, GpuTextureView};
use super::WgpuBackend;
use super::conversion::{
    convert_index_format, convert_load_op, convert_store_op, convert_value_load_op,
};

enum ActivePass {
    None,
    Render(wgpu::RenderPass<'static>),
    Compute(wgpu::ComputePass<'static>),
}

impl WgpuBackend {
    /// Encode one command list into a finished wgpu command buffer.
    pub(super) fn encode_command_list(
        &self,
        list: &CommandList,
    ) -> Result<wgpu::CommandBuffer, GraphicsError> {
        // No pipelines are bound through this layer; wgpu rejects draws without one.
        if let Some(command) = list.commands().iter().find(|command| {
            matches!(
                command,
                RecordedCommand::Draw { .. }
                    | RecordedCommand::DrawIndexed { .. }
                    | RecordedCommand::Dispatch { .. }
            )
        }) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "'{}': {command:?} needs a bound pipeline, which the wgpu backend does not provide",
                list.label()
            )));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(list.label()),
            });
        let mut active = ActivePass::None;

        for command in list.commands() {
            match command {
                RecordedCommand::BeginRenderPass(descriptor) => {
                    active = ActivePass::Render(begin_render_pass(&mut encoder, descriptor)?);
                }
                RecordedCommand::BeginComputePass { label } => {
                    let pass = encoder
                        .begin_compute_pass(&wgpu::ComputePassDescriptor {
                            label: Some(label.as_str()),
                            timestamp_writes: None,
                        })
                        .forget_lifetime();
                    active = ActivePass::Compute(pass);
                }
                RecordedCommand::EndRenderPass | RecordedCommand::EndComputePass => {
                    active = ActivePass::None;
                }
                RecordedCommand::PushDebugGroup(label) => match &mut active {
                    ActivePass::None => encoder.push_debug_group(label),
                    ActivePass::Render(pass) => pass.push_debug_group(label),
                    ActivePass::Compute(pass) => pass.push_debug_group(label),
                },
                RecordedCommand::PopDebugGroup => match &mut active {
                    ActivePass::None => encoder.pop_debug_group(),
                    ActivePass::Render(pass) => pass.pop_debug_group(),
                    ActivePass::Compute(pass) => pass.pop_debug_group(),
                },
                RecordedCommand::InsertDebugMarker(label) => match &mut active {
                    ActivePass::None => encoder.insert_debug_marker(label),
                    ActivePass::Render(pass) => pass.insert_debug_marker(label),
                    ActivePass::Compute(pass) => pass.insert_debug_marker(label),
                },
                RecordedCommand::SetViewport(vp) => {
                    if let ActivePass::Render(pass) = &mut active {
                        pass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);
                    }
                }
                RecordedCommand::SetScissorRect(rect) => {
                    if let ActivePass::Render(pass) = &mut active {
                        pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
                    }
                }
                RecordedCommand::SetVertexBuffer {
                    slot,
                    buffer,
                    offset,
                } => {
                    if let ActivePass::Render(pass) = &mut active {
                        let native = native_buffer(buffer)?;
                        pass.set_vertex_buffer(*slot, native.slice(*offset..));
                    }
                }
                RecordedCommand::SetIndexBuffer {
                    buffer,
                    offset,
                    format,
                } => {
                    if let ActivePass::Render(pass) = &mut active {
                        let native = native_buffer(buffer)?;
                        pass.set_index_buffer(native.slice(*offset..), convert_index_format(*format));
                    }
                }
                RecordedCommand::Draw { .. }
                | RecordedCommand::DrawIndexed { .. }
                | RecordedCommand::Dispatch { .. } => {}
            }
        }
        drop(active);

        Ok(encoder.finish())
    }
}

fn begin_render_pass(
    encoder: &mut wgpu::CommandEncoder,
    descriptor: &RenderPassDescriptor,
) -> Result<wgpu::RenderPass<'static>, GraphicsError> {
    let color_views = descriptor
        .color_attachments
        .iter()
        .map(|attachment| native_view(&attachment.view))
        .collect::<Result<Vec<_>, _>>()?;
    let color_attachments: Vec<_> = descriptor
        .color_attachments
        .iter()
        .zip(&color_views)
        .map(|(attachment, view)| {
            Some(wgpu::RenderPassColorAttachment {
                view: view.as_ref(),
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: convert_load_op(attachment.load),
                    store: convert_store_op(attachment.store),
                },
            })
        })
        .collect();

    let depth_view = descriptor
        .depth_stencil_attachment
        .as_ref()
        .map(|attachment| native_view(&attachment.view))
        .transpose()?;
    let depth_stencil_attachment = descriptor
        .depth_stencil_attachment
        .as_ref()
        .zip(depth_view.as_ref())
        .map(|(attachment, view)| {
            let stencil_ops = attachment.view.format().has_stencil().then(|| wgpu::Operations {
                load: convert_value_load_op(attachment.stencil_load),
                store: convert_store_op(attachment.stencil_store),
            });
            wgpu::RenderPassDepthStencilAttachment {
                view: view.as_ref(),
                depth_ops: Some(wgpu::Operations {
                    load: convert_value_load_op(attachment.depth_load),
                    store: convert_store_op(attachment.depth_store),
                }),
                stencil_ops,
            }
        });

    let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: descriptor.label.as_deref(),
        color_attachments: &color_attachments,
        depth_stencil_attachment,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    Ok(pass.forget_lifetime())
}

fn native_view(view: &TextureView) -> Result<Arc<wgpu::TextureView>, GraphicsError> {
    match view.native_handle() {
        Some(GpuTextureView::Wgpu(native)) => Ok(native),
        Some(_) => Err(GraphicsError::Internal(format!(
            "'{}' was not created by the wgpu backend",
            view.label()
        ))),
        None => Err(GraphicsError::ObjectDisposed(view.label())),
    }
}

fn native_buffer(buffer: &Buffer) -> Result<Arc<wgpu::Buffer>, GraphicsError> {
    match buffer.native_handle() {
        Some(GpuBuffer::Wgpu(native)) => Ok(native),
        Some(_) => Err(GraphicsError::Internal(format!(
            "'{}' was not created by the wgpu backend",
            buffer.label()
        ))),
        None => Err(GraphicsError::ObjectDisposed(buffer.label())),
    }
}
