//! Native windowing backends
//!
//! The runtime never talks to a window system directly. It goes through
//! [`NativeBackend`], which owns every native resource and reports what
//! happened as a batch of [`NativeEvent`]s each time it is pumped.
//!
//! Backend calls never invoke application code synchronously: anything a
//! setter provokes (a resize, an iconify) is queued and comes back through
//! the next [`NativeBackend::pump_events`]. Listeners are therefore free to
//! call back into windows while an event is being dispatched.

pub mod headless;
#[cfg(feature = "glfw-backend")]
pub mod glfw_backend;

pub use headless::HeadlessBackend;
#[cfg(feature = "glfw-backend")]
pub use glfw_backend::GlfwBackend;

use ash::vk;
use bitflags::bitflags;
use std::fmt;
use thiserror::Error;

use crate::window::common::{
    ContentScale, CursorIcon, FrameExtents, ImageData, InputMode, InputModeValue, Position, Size,
    SizeLimits, WindowAttribute, WindowSurface,
};
use crate::window::options::{ClientApi, WindowOptions};

/// Native backend errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The native library could not be initialized
    #[error("native library initialization failed: {0}")]
    InitializationFailed(String),

    /// Window or context creation failed
    #[error("window creation failed: {0}")]
    CreationFailed(String),

    /// The handle does not name a live native window
    #[error("unknown native handle {0}")]
    UnknownHandle(NativeHandle),

    /// The native library has been terminated
    #[error("native library already terminated")]
    Terminated,

    /// The backend cannot perform the request
    #[error("unsupported by this backend: {0}")]
    Unsupported(&'static str),

    /// The window system would not hand out raw surface handles
    #[error("surface handles unavailable: {0}")]
    SurfaceUnavailable(String),

    /// A Vulkan windowing call failed
    #[error("vulkan error: {0}")]
    Vulkan(String),
}

/// Result alias for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Opaque pointer-sized identifier of a native window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(usize);

impl NativeHandle {
    /// Wrap a raw native pointer value
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw pointer value
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

bitflags! {
    /// Modifier key bits, laid out like the native bitmask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        /// Either shift key
        const SHIFT = 0x0001;
        /// Either control key
        const CONTROL = 0x0002;
        /// Either alt key
        const ALT = 0x0004;
        /// Either super/command/windows key
        const SUPER = 0x0008;
        /// Caps lock is on
        const CAPS_LOCK = 0x0010;
        /// Num lock is on
        const NUM_LOCK = 0x0020;
    }
}

/// Key or button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeAction {
    /// Released
    Release,
    /// Pressed
    Press,
    /// Held long enough to auto-repeat
    Repeat,
}

/// One native callback invocation
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEventKind {
    /// Cursor moved to content-area coordinates
    CursorPos {
        /// Horizontal position
        x: f64,
        /// Vertical position
        y: f64,
    },
    /// Cursor entered or left the content area
    CursorEnter {
        /// True when entering
        entered: bool,
    },
    /// Mouse button changed state
    MouseButton {
        /// Button index, 0 is primary
        button: i32,
        /// Press or release
        action: NativeAction,
        /// Modifier bits
        mods: Modifiers,
    },
    /// Keyboard key changed state
    Key {
        /// Native key code
        key: i32,
        /// Platform scancode
        scancode: i32,
        /// Press, release or repeat
        action: NativeAction,
        /// Modifier bits
        mods: Modifiers,
    },
    /// Unicode character input
    Char {
        /// Character produced
        codepoint: char,
    },
    /// Scroll wheel or trackpad
    Scroll {
        /// Horizontal offset
        x: f64,
        /// Vertical offset
        y: f64,
    },
    /// Window moved
    Pos {
        /// New left edge
        x: i32,
        /// New top edge
        y: i32,
    },
    /// Content area resized
    Size {
        /// New width
        width: i32,
        /// New height
        height: i32,
    },
    /// Framebuffer resized; zero while minimized
    FramebufferSize {
        /// New width in pixels
        width: i32,
        /// New height in pixels
        height: i32,
    },
    /// The user asked to close the window
    Close,
    /// Contents need to be redrawn
    Refresh,
    /// Focus gained or lost
    Focus(bool),
    /// Minimized or restored
    Iconify(bool),
    /// Maximized or restored
    Maximize(bool),
    /// Files dropped onto the window, in native order
    Drop(Vec<String>),
    /// Content scale changed
    ContentScale {
        /// Horizontal scale
        x: f32,
        /// Vertical scale
        y: f32,
    },
}

/// A native callback tagged with the window it fired for
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    /// Window the callback fired for
    pub handle: NativeHandle,
    /// Native timestamp in seconds
    pub time: f64,
    /// What happened
    pub kind: NativeEventKind,
}

/// Creation hints derived from [`WindowOptions`]
///
/// Windows are always created hidden; visibility is applied after the
/// handle has been registered so no early event is lost.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowHints {
    /// Initial title
    pub title: String,
    /// Content width
    pub width: i32,
    /// Content height
    pub height: i32,
    /// Client API and version
    pub client_api: ClientApi,
    /// User resizable
    pub resizable: bool,
    /// Start maximized
    pub maximized: bool,
    /// Transparent framebuffer
    pub transparent: bool,
    /// Draw decorations
    pub decorated: bool,
    /// Always on top
    pub floating: bool,
    /// Multisample count for GL contexts
    pub samples: Option<u32>,
}

impl From<&WindowOptions> for WindowHints {
    fn from(options: &WindowOptions) -> Self {
        Self {
            title: options.title.clone(),
            width: options.width,
            height: options.height,
            client_api: options.client_api,
            resizable: options.resizable,
            maximized: options.maximized,
            transparent: options.transparent,
            decorated: !options.remove_decorations,
            floating: options.floating,
            samples: options.client_api.has_context().then_some(4),
        }
    }
}

/// Contract every native window system integration fulfils
pub trait NativeBackend {
    /// Create a hidden window and enable every callback channel for it
    fn create_window(&mut self, hints: &WindowHints) -> BackendResult<NativeHandle>;

    /// Destroy a window; unknown handles are ignored
    fn destroy_window(&mut self, handle: NativeHandle);

    /// Process pending native events, optionally blocking until one arrives
    fn pump_events(&mut self, wait: bool) -> Vec<NativeEvent>;

    /// Release the native library; further calls fail with `Terminated`
    fn terminate(&mut self);

    /// Whether `terminate` has run
    fn is_terminated(&self) -> bool;

    /// Set the title text
    fn set_title(&mut self, handle: NativeHandle, title: &str) -> BackendResult<()>;

    /// Content area size
    fn size(&self, handle: NativeHandle) -> BackendResult<Size>;

    /// Resize the content area
    fn set_size(&mut self, handle: NativeHandle, size: Size) -> BackendResult<()>;

    /// Top-left corner of the content area
    fn position(&self, handle: NativeHandle) -> BackendResult<Position>;

    /// Move the window
    fn set_position(&mut self, handle: NativeHandle, position: Position) -> BackendResult<()>;

    /// Framebuffer size in pixels
    fn framebuffer_size(&self, handle: NativeHandle) -> BackendResult<Size>;

    /// Decoration extents
    fn frame_size(&self, handle: NativeHandle) -> BackendResult<FrameExtents>;

    /// Content scale
    fn content_scale(&self, handle: NativeHandle) -> BackendResult<ContentScale>;

    /// Whole-window opacity
    fn opacity(&self, handle: NativeHandle) -> BackendResult<f32>;

    /// Set whole-window opacity
    fn set_opacity(&mut self, handle: NativeHandle, opacity: f32) -> BackendResult<()>;

    /// Read a boolean attribute
    fn attribute(&self, handle: NativeHandle, attribute: WindowAttribute) -> BackendResult<bool>;

    /// Show the window
    fn show(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Hide the window
    fn hide(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Minimize the window
    fn iconify(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Restore from minimized or maximized
    fn restore(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Maximize the window
    fn maximize(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Bring the window to front and focus it
    fn focus(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Flash the taskbar entry or bounce the dock icon
    fn request_attention(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Native close flag
    fn should_close(&self, handle: NativeHandle) -> BackendResult<bool>;

    /// Set or clear the native close flag
    fn set_should_close(&mut self, handle: NativeHandle, value: bool) -> BackendResult<()>;

    /// Make the window's GL context current on this thread
    fn make_context_current(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Present the back buffer
    fn swap_buffers(&mut self, handle: NativeHandle) -> BackendResult<()>;

    /// Buffer swap interval for the current context
    fn set_swap_interval(&mut self, interval: u32) -> BackendResult<()>;

    /// Standard cursor, `None` for the default
    fn set_cursor(&mut self, handle: NativeHandle, icon: Option<CursorIcon>) -> BackendResult<()>;

    /// Cursor from an image with a hotspot
    fn set_custom_cursor(
        &mut self,
        handle: NativeHandle,
        image: &ImageData,
        hotspot: Position,
    ) -> BackendResult<()>;

    /// Window icon
    fn set_icon(&mut self, handle: NativeHandle, image: &ImageData) -> BackendResult<()>;

    /// Lock the content aspect ratio
    fn set_aspect_ratio(
        &mut self,
        handle: NativeHandle,
        numerator: u32,
        denominator: u32,
    ) -> BackendResult<()>;

    /// Constrain the content size
    fn set_size_limits(&mut self, handle: NativeHandle, limits: SizeLimits) -> BackendResult<()>;

    /// Set an input mode
    fn set_input_mode(
        &mut self,
        handle: NativeHandle,
        mode: InputMode,
        value: InputModeValue,
    ) -> BackendResult<()>;

    /// Read an input mode
    fn input_mode(&self, handle: NativeHandle, mode: InputMode) -> BackendResult<InputModeValue>;

    /// Whether raw mouse motion is available
    fn raw_mouse_motion_supported(&self) -> bool;

    /// Warp the cursor inside the content area
    fn set_cursor_pos(&mut self, handle: NativeHandle, x: f64, y: f64) -> BackendResult<()>;

    /// Address of a GL function for the window's context
    fn proc_address(&mut self, handle: NativeHandle, name: &str) -> BackendResult<usize>;

    /// Raw window and display handles for presentation
    fn window_surface(&self, handle: NativeHandle) -> BackendResult<WindowSurface>;

    /// Whether a Vulkan loader with presentation support was found
    fn vulkan_supported(&self) -> bool;

    /// Instance extensions surface creation depends on
    fn required_instance_extensions(&self) -> BackendResult<Vec<String>>;

    /// Address of a Vulkan function for `instance`
    fn instance_proc_address(&self, instance: vk::Instance, name: &str) -> BackendResult<usize>;

    /// Whether a queue family of `device` can present to this window system
    fn physical_device_presentation_support(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> BackendResult<bool>;

    /// Create a `VkSurfaceKHR` for a window; the caller owns and destroys it
    fn create_surface(
        &mut self,
        handle: NativeHandle,
        instance: vk::Instance,
    ) -> BackendResult<vk::SurfaceKHR>;
}
