//! Render pass descriptors.

use std::sync::Arc;

use crate::resources::TextureView;
use crate::types::{Color, LoadAction, StoreAction};

/// A color target of a render pass.
#[derive(Debug, Clone)]
pub struct ColorAttachment {
    /// View rendered into.
    pub view: Arc<TextureView>,
    /// Load behavior.
    pub load: LoadAction<Color>,
    /// Store behavior.
    pub store: StoreAction,
}

impl ColorAttachment {
    /// Attachment that keeps the existing contents and stores the result.
    pub fn new(view: Arc<TextureView>) -> Self {
        Self {
            view,
            load: LoadAction::Load,
            store: StoreAction::Store,
        }
    }

    /// Clear to `color` when the pass begins.
    pub fn with_clear(mut self, color: Color) -> Self {
        self.load = LoadAction::Clear(color);
        self
    }

    /// Set the store behavior.
    pub fn with_store(mut self, store: StoreAction) -> Self {
        self.store = store;
        self
    }
}

/// The depth/stencil target of a render pass.
#[derive(Debug, Clone)]
pub struct DepthStencilAttachment {
    /// View rendered into. Must have a depth/stencil format.
    pub view: Arc<TextureView>,
    /// Depth load behavior.
    pub depth_load: LoadAction<f32>,
    /// Depth store behavior.
    pub depth_store: StoreAction,
    /// Stencil load behavior. Ignored for formats without stencil.
    pub stencil_load: LoadAction<u32>,
    /// Stencil store behavior.
    pub stencil_store: StoreAction,
}

impl DepthStencilAttachment {
    /// Attachment clearing depth to `depth` and stencil to 0.
    pub fn new(view: Arc<TextureView>, depth: f32) -> Self {
        Self {
            view,
            depth_load: LoadAction::Clear(depth),
            depth_store: StoreAction::Store,
            stencil_load: LoadAction::Clear(0),
            stencil_store: StoreAction::Store,
        }
    }

    /// Keep the existing depth contents.
    pub fn with_depth_load(mut self) -> Self {
        self.depth_load = LoadAction::Load;
        self
    }
}

/// Attachments of a render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDescriptor {
    /// Debug label of the pass.
    pub label: Option<String>,
    /// Color targets, bound to consecutive slots.
    pub color_attachments: Vec<ColorAttachment>,
    /// Optional depth/stencil target.
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

impl RenderPassDescriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a color attachment.
    pub fn with_color(mut self, attachment: ColorAttachment) -> Self {
        self.color_attachments.push(attachment);
        self
    }

    /// Set the depth/stencil attachment.
    pub fn with_depth_stencil(mut self, attachment: DepthStencilAttachment) -> Self {
        self.depth_stencil_attachment = Some(attachment);
        self
    }

    /// Every attached view, colors first.
    pub fn views(&self) -> impl Iterator<Item = &Arc<TextureView>> {
        self.color_attachments
            .iter()
            .map(|attachment| &attachment.view)
            .chain(self.depth_stencil_attachment.iter().map(|attachment| &attachment.view))
    }
}
