//! Command recording.
//!
//! Work is recorded on the CPU into a [`CommandBuffer`] through short-lived
//! [`RenderPassEncoder`]s and [`ComputePassEncoder`]s, then handed to
//! [`GraphicsDevice::submit`](crate::GraphicsDevice::submit) as a
//! [`CommandList`] that the active backend replays.
//!
//! ```text
//! Recording ──end()──▶ Ended ──submit()──▶ Submitted
//!     │
//!     └─ begin_*_pass() ─▶ encoder open ─ encoder.end() ─▶ back to Recording
//! ```

mod buffer;
mod encoder;
mod list;
mod pass;

pub use buffer::{CommandBuffer, CommandBufferStatus};
pub use encoder::{ComputePassEncoder, RenderPassEncoder};
pub use list::{CommandKind, CommandList, RecordedCommand};
pub use pass::{ColorAttachment, DepthStencilAttachment, RenderPassDescriptor};
