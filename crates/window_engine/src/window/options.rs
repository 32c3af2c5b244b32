//! Window construction options

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::window::WindowError;

/// OpenGL context version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
}

impl GlVersion {
    /// Create a version pair
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Forward-compatible contexts are requested from 3.0 on
    pub const fn wants_forward_compat(&self) -> bool {
        self.major >= 3
    }

    /// Core profile contexts are requested from 3.2 on
    pub const fn wants_core_profile(&self) -> bool {
        self.major > 3 || (self.major == 3 && self.minor >= 2)
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for GlVersion {
    type Err = WindowError;

    /// Accepts `3.3`, `v4.1` and `4.6.0`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            WindowError::InvalidOptions(format!("Could not determine the gl version from {s}"))
        };
        let trimmed = s.strip_prefix('v').unwrap_or(s);
        let mut parts = trimmed.split('.');

        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if let Some(patch) = parts.next() {
            patch.parse::<u32>().map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self { major, minor })
    }
}

/// Client rendering API created alongside the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClientApi {
    /// No context; the renderer brings its own (Vulkan, WebGPU, software)
    #[default]
    None,
    /// OpenGL or OpenGL ES context
    OpenGl {
        /// Requested context version
        version: GlVersion,
        /// Use OpenGL ES instead of desktop OpenGL
        es: bool,
    },
}

impl ClientApi {
    /// Whether a context is created
    pub const fn has_context(&self) -> bool {
        matches!(self, Self::OpenGl { .. })
    }
}

/// Options for creating a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    /// Title of the window
    pub title: String,
    /// Content width
    pub width: i32,
    /// Content height
    pub height: i32,
    /// Show the window after creation
    pub visible: bool,
    /// Start maximized
    pub maximized: bool,
    /// Start minimized
    pub minimized: bool,
    /// Request focus after creation
    pub focused: bool,
    /// Allow user resizing
    pub resizable: bool,
    /// Stop the event loop once every counted window has closed
    pub auto_exit_event_loop: bool,
    /// Transparent framebuffer
    pub transparent: bool,
    /// No title bar or frame
    pub remove_decorations: bool,
    /// Always on top
    pub floating: bool,
    /// Client API selection
    pub client_api: ClientApi,
    /// Synchronize buffer swaps to the display (OpenGL only)
    pub vsync: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "Window".to_string(),
            width: 800,
            height: 600,
            visible: true,
            maximized: false,
            minimized: false,
            focused: false,
            resizable: true,
            auto_exit_event_loop: true,
            transparent: false,
            remove_decorations: false,
            floating: false,
            client_api: ClientApi::None,
            vsync: true,
        }
    }
}

impl Config for WindowOptions {}

impl WindowOptions {
    /// Options with a title and content size
    pub fn new(title: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Self::default()
        }
    }

    /// Request an OpenGL context, parsing versions like `"3.3"` or `"v4.1"`
    pub fn with_gl_version(mut self, version: &str, es: bool) -> Result<Self, WindowError> {
        self.client_api = ClientApi::OpenGl { version: version.parse()?, es };
        Ok(self)
    }

    /// Check the options before any native call is made
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(WindowError::InvalidOptions(format!(
                "window size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.minimized && self.maximized {
            return Err(WindowError::InvalidOptions(
                "a window cannot start both minimized and maximized".to_string(),
            ));
        }
        Ok(())
    }
}
