//! Plain value types shared by windows and backends

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use serde::{Deserialize, Serialize};

/// Integer screen position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

impl Position {
    /// Create a position
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer extent in screen coordinates or pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
}

impl Size {
    /// Create a size
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero, e.g. a minimized framebuffer
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Size of the decorations around a window's content area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameExtents {
    /// Left edge
    pub left: i32,
    /// Top edge (title bar)
    pub top: i32,
    /// Right edge
    pub right: i32,
    /// Bottom edge
    pub bottom: i32,
}

/// Content scale reported by the window system
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContentScale {
    /// Horizontal scale
    pub x: f32,
    /// Vertical scale
    pub y: f32,
}

/// Minimum and maximum content size; `None` leaves a bound unconstrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeLimits {
    /// Minimum width
    pub min_width: Option<u32>,
    /// Minimum height
    pub min_height: Option<u32>,
    /// Maximum width
    pub max_width: Option<u32>,
    /// Maximum height
    pub max_height: Option<u32>,
}

/// RGBA8 image used for icons and custom cursors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long
    pub rgba: Vec<u8>,
}

impl ImageData {
    /// Wrap raw RGBA bytes, checking the buffer length
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        (rgba.len() == expected).then_some(Self { width, height, rgba })
    }

    /// Pack pixels as little-endian `u32`s (R in the lowest byte)
    pub fn packed_pixels(&self) -> Vec<u32> {
        self.rgba
            .chunks_exact(4)
            .map(|px| u32::from_le_bytes([px[0], px[1], px[2], px[3]]))
            .collect()
    }
}

/// Standard cursor shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorIcon {
    /// Regular arrow
    Arrow,
    /// Text input I-beam
    Ibeam,
    /// Crosshair
    Crosshair,
    /// Pointing hand
    Hand,
    /// Horizontal resize arrows
    Hresize,
    /// Vertical resize arrows
    Vresize,
}

/// Input behaviours that can be toggled per window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputMode {
    /// Cursor visibility and capture
    Cursor,
    /// Key presses stay reported until polled
    StickyKeys,
    /// Mouse presses stay reported until polled
    StickyMouseButtons,
    /// Modifier bits include caps/num lock
    LockKeyMods,
    /// Unaccelerated mouse motion while the cursor is disabled
    RawMouseMotion,
}

/// Value of an input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputModeValue {
    /// Visible, free cursor
    Normal,
    /// Hidden while over the window
    Hidden,
    /// Hidden and captured
    Disabled,
    /// Boolean modes
    Enabled(bool),
}

/// Window attributes that are read straight from the native layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowAttribute {
    /// Has input focus
    Focused,
    /// Is shown
    Visible,
    /// Is maximized
    Maximized,
    /// Is minimized
    Iconified,
    /// Cursor is over the content area
    Hovered,
    /// Stays above other windows
    Floating,
    /// Owns a monitor
    Fullscreen,
}

/// Raw handles a renderer presents into
///
/// The pair is what wgpu or `ash-window` surface creation expects. Only
/// valid while the window is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSurface {
    /// Platform window (HWND, NSView, X11 window id, ...)
    pub window: RawWindowHandle,
    /// Platform display connection
    pub display: RawDisplayHandle,
    /// Framebuffer size when the handles were taken
    pub framebuffer: Size,
}
