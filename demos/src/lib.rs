//! # Vortice Demos
//!
//! Small programs driving the graphics layer end to end.
//!
//! ## Available Demos
//!
//! - `clear_frames` - Clears a headless swap chain for a few frames

use std::sync::Arc;

use vortice_graphics::{
    Color, ColorAttachment, GraphicsDevice, GraphicsError, PixelFormat, RenderPassDescriptor,
    Surface, SwapChain, SwapChainDescriptor, Texture, TextureDescriptor, TextureUsage,
};

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where a demo frame ends up.
pub enum FrameTarget {
    /// A swap chain presenting to a surface.
    SwapChain(Arc<SwapChain>),
    /// An offscreen texture, used when the backend cannot present headless.
    Offscreen(Arc<Texture>),
}

impl FrameTarget {
    /// Create a swap chain for `surface`, falling back to an offscreen target.
    pub fn new(device: &Arc<GraphicsDevice>, surface: &Arc<Surface>) -> Result<Self, GraphicsError> {
        let (width, height) = surface.size();
        match device.create_swap_chain(
            surface,
            &SwapChainDescriptor::new(width, height).with_label("Demo"),
        ) {
            Ok(swap_chain) => Ok(Self::SwapChain(swap_chain)),
            Err(GraphicsError::InvalidParameter(reason)) => {
                log::warn!("No swap chain ({reason}), rendering offscreen");
                let desc = TextureDescriptor::new_2d(
                    width.max(1),
                    height.max(1),
                    PixelFormat::Rgba8Unorm,
                    TextureUsage::RENDER_TARGET,
                )
                .with_label("Demo Offscreen");
                Ok(Self::Offscreen(device.create_texture(&desc)?))
            }
            Err(err) => Err(err),
        }
    }
}

/// Clear color used for `frame`.
pub fn clear_color(frame: u64) -> Color {
    let t = (frame % 60) as f32 / 60.0;
    Color::new(t.into(), 0.2, (1.0 - t).into(), 1.0)
}

/// Record, submit and commit `frames` frames that only clear `target`.
///
/// Returns the number of frames that actually rendered. Frames where the
/// swap chain had nothing to hand out are still committed.
pub fn render_clear_frames(
    device: &Arc<GraphicsDevice>,
    target: &FrameTarget,
    frames: u64,
) -> Result<u64, GraphicsError> {
    let mut rendered = 0;
    for _ in 0..frames {
        let frame = device.frame_count();
        let cb = device.begin_command_buffer("Demo Frame")?;
        let texture = match target {
            FrameTarget::SwapChain(swap_chain) => cb.acquire_swap_chain_texture(swap_chain)?,
            FrameTarget::Offscreen(texture) => Some(Arc::clone(texture)),
        };

        if let Some(texture) = texture {
            let pass = RenderPassDescriptor::new().with_label("Clear").with_color(
                ColorAttachment::new(texture.view()?).with_clear(clear_color(frame)),
            );
            cb.begin_render_pass(&pass)?.end();
            rendered += 1;
        } else {
            log::debug!("Frame {frame}: nothing to render into");
        }

        cb.end()?;
        device.submit(cb)?;
        device.commit_frame()?;
    }
    Ok(rendered)
}
