//! Replayable command lists.
//!
//! A [`CommandBuffer`](super::CommandBuffer) records into a flat list of
//! [`RecordedCommand`]s. Ending the buffer freezes that list into a
//! [`CommandList`], which every backend replays in order at submission.
//! Commands hold strong references to the resources they use, so those stay
//! alive until the list is dropped.

use std::sync::Arc;

use super::RenderPassDescriptor;
use crate::resources::Buffer;
use crate::types::{IndexFormat, ScissorRect, Viewport};

/// One recorded command.
#[derive(Debug, Clone)]
pub enum RecordedCommand {
    PushDebugGroup(String),
    PopDebugGroup,
    InsertDebugMarker(String),
    BeginRenderPass(RenderPassDescriptor),
    EndRenderPass,
    BeginComputePass {
        label: String,
    },
    EndComputePass,
    SetViewport(Viewport),
    SetScissorRect(ScissorRect),
    SetVertexBuffer {
        slot: u32,
        buffer: Arc<Buffer>,
        offset: u64,
    },
    SetIndexBuffer {
        buffer: Arc<Buffer>,
        offset: u64,
        format: IndexFormat,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
}

/// The kind of a [`RecordedCommand`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    PushDebugGroup,
    PopDebugGroup,
    InsertDebugMarker,
    BeginRenderPass,
    EndRenderPass,
    BeginComputePass,
    EndComputePass,
    SetViewport,
    SetScissorRect,
    SetVertexBuffer,
    SetIndexBuffer,
    Draw,
    DrawIndexed,
    Dispatch,
}

impl RecordedCommand {
    /// The kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::PushDebugGroup(_) => CommandKind::PushDebugGroup,
            Self::PopDebugGroup => CommandKind::PopDebugGroup,
            Self::InsertDebugMarker(_) => CommandKind::InsertDebugMarker,
            Self::BeginRenderPass(_) => CommandKind::BeginRenderPass,
            Self::EndRenderPass => CommandKind::EndRenderPass,
            Self::BeginComputePass { .. } => CommandKind::BeginComputePass,
            Self::EndComputePass => CommandKind::EndComputePass,
            Self::SetViewport(_) => CommandKind::SetViewport,
            Self::SetScissorRect(_) => CommandKind::SetScissorRect,
            Self::SetVertexBuffer { .. } => CommandKind::SetVertexBuffer,
            Self::SetIndexBuffer { .. } => CommandKind::SetIndexBuffer,
            Self::Draw { .. } => CommandKind::Draw,
            Self::DrawIndexed { .. } => CommandKind::DrawIndexed,
            Self::Dispatch { .. } => CommandKind::Dispatch,
        }
    }
}

/// The finished, immutable contents of an ended command buffer.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
    label: String,
    commands: Vec<RecordedCommand>,
}

impl CommandList {
    pub(crate) fn new(label: String, commands: Vec<RecordedCommand>) -> Self {
        Self { label, commands }
    }

    /// Label of the command buffer this list came from.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Commands in recording order.
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Kinds of the recorded commands, in order.
    pub fn kinds(&self) -> Vec<CommandKind> {
        self.commands.iter().map(RecordedCommand::kind).collect()
    }
}
