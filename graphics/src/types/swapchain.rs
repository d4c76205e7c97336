//! Swap chain types and the present-mode policy.

use super::PixelFormat;
use crate::error::GraphicsError;

/// Presentation mode for swap chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum PresentMode {
    /// Present immediately, may tear.
    Immediate = 0,
    /// Wait for vertical blank (vsync).
    #[default]
    Fifo = 1,
    /// Replace the queued frame with the newest one, no tearing.
    Mailbox = 2,
}

impl TryFrom<u32> for PresentMode {
    type Error = GraphicsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Immediate),
            1 => Ok(Self::Fifo),
            2 => Ok(Self::Mailbox),
            other => Err(GraphicsError::InvalidParameter(format!(
                "unrecognized present mode {other}"
            ))),
        }
    }
}

/// Number of back buffers a swap chain allocates for `mode`.
///
/// Every backend sizes its swap chain through this function.
pub fn present_mode_to_buffer_count(mode: PresentMode) -> u32 {
    match mode {
        PresentMode::Immediate => 2,
        PresentMode::Fifo => 2,
        PresentMode::Mailbox => 3,
    }
}

/// Arguments handed to the backend's present call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresentParams {
    /// Vertical blanks to wait before presenting (0 or 1).
    pub sync_interval: u32,
    /// Whether the backend may present with tearing.
    pub allow_tearing: bool,
}

impl PresentParams {
    /// Present parameters for `mode`. Tearing is only requested when supported.
    pub fn for_mode(mode: PresentMode, tearing_supported: bool) -> Self {
        match mode {
            PresentMode::Immediate | PresentMode::Mailbox => Self {
                sync_interval: 0,
                allow_tearing: tearing_supported,
            },
            PresentMode::Fifo => Self {
                sync_interval: 1,
                allow_tearing: false,
            },
        }
    }
}

/// Descriptor for creating a swap chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwapChainDescriptor {
    /// Debug label for the swap chain.
    pub label: Option<String>,
    /// Back buffer width.
    pub width: u32,
    /// Back buffer height.
    pub height: u32,
    /// Back buffer format.
    pub color_format: PixelFormat,
    /// Presentation mode.
    pub present_mode: PresentMode,
    /// Whether to present in exclusive fullscreen.
    pub is_fullscreen: bool,
    /// Resize the back buffers automatically when the surface size changes.
    pub auto_resize_drawable: bool,
}

impl SwapChainDescriptor {
    /// Create a new swap chain descriptor with vsync and automatic resizing.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            label: None,
            width,
            height,
            color_format: PixelFormat::Bgra8UnormSrgb,
            present_mode: PresentMode::Fifo,
            is_fullscreen: false,
            auto_resize_drawable: true,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the back buffer format.
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Set the presentation mode.
    pub fn with_present_mode(mut self, mode: PresentMode) -> Self {
        self.present_mode = mode;
        self
    }

    /// Request exclusive fullscreen.
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.is_fullscreen = fullscreen;
        self
    }

    /// Enable or disable automatic resizing.
    pub fn with_auto_resize(mut self, auto_resize: bool) -> Self {
        self.auto_resize_drawable = auto_resize;
        self
    }

    /// Check the descriptor for values no backend can satisfy.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if self.width == 0 || self.height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "swap chain extent must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.color_format == PixelFormat::Undefined || self.color_format.is_depth_stencil() {
            return Err(GraphicsError::InvalidParameter(format!(
                "swap chain format {:?} is not a color format",
                self.color_format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PresentMode::Immediate, 2)]
    #[case(PresentMode::Fifo, 2)]
    #[case(PresentMode::Mailbox, 3)]
    fn test_buffer_count(#[case] mode: PresentMode, #[case] expected: u32) {
        assert_eq!(present_mode_to_buffer_count(mode), expected);
    }

    #[test]
    fn test_present_mode_from_raw() {
        assert_eq!(PresentMode::try_from(2), Ok(PresentMode::Mailbox));
        assert_eq!(PresentMode::try_from(PresentMode::Fifo as u32), Ok(PresentMode::Fifo));
        assert!(matches!(
            PresentMode::try_from(7),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_present_params() {
        let fifo = PresentParams::for_mode(PresentMode::Fifo, true);
        assert_eq!(fifo.sync_interval, 1);
        assert!(!fifo.allow_tearing);

        let immediate = PresentParams::for_mode(PresentMode::Immediate, true);
        assert_eq!(immediate.sync_interval, 0);
        assert!(immediate.allow_tearing);

        let mailbox = PresentParams::for_mode(PresentMode::Mailbox, false);
        assert_eq!(mailbox.sync_interval, 0);
        assert!(!mailbox.allow_tearing);
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(SwapChainDescriptor::new(1280, 720).validate().is_ok());
        assert!(SwapChainDescriptor::new(0, 720).validate().is_err());
        assert!(SwapChainDescriptor::new(1280, 0).validate().is_err());
        assert!(SwapChainDescriptor::new(1280, 720)
            .with_format(PixelFormat::Depth32Float)
            .validate()
            .is_err());
    }
}
