use ash::vk;
use std::cell::{Cell, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use super::common::{
    ContentScale, CursorIcon, FrameExtents, ImageData, InputMode, InputModeValue, Position, Size,
    SizeLimits, WindowAttribute, WindowSurface,
};
use super::options::{ClientApi, WindowOptions};
use super::{LifecycleState, WindowError, WindowId, WindowResult};
use crate::backend::{BackendResult, NativeBackend, NativeHandle};
use crate::events::synthesis::InputState;
use crate::events::{Event, EventData, EventKind};
use crate::runtime::RuntimeShared;

/// Shared handle to a logical window
///
/// Clones refer to the same window; equality compares ids.
#[derive(Clone)]
pub struct Window {
    inner: Rc<WindowInner>,
}

struct WindowInner {
    id: WindowId,
    handle: NativeHandle,
    runtime: Weak<RuntimeShared>,
    state: Cell<LifecycleState>,
    title: RefCell<String>,
    counted: bool,
    client_api: ClientApi,
    input: RefCell<InputState>,
}

impl Window {
    pub(crate) fn new(
        handle: NativeHandle,
        runtime: &Rc<RuntimeShared>,
        options: &WindowOptions,
    ) -> Self {
        Self {
            inner: Rc::new(WindowInner {
                id: WindowId::new(),
                handle,
                runtime: Rc::downgrade(runtime),
                state: Cell::new(LifecycleState::Constructing),
                title: RefCell::new(options.title.clone()),
                counted: options.auto_exit_event_loop,
                client_api: options.client_api,
                input: RefCell::new(InputState::default()),
            }),
        }
    }

    /// Stable identifier
    pub fn id(&self) -> WindowId {
        self.inner.id
    }

    /// Native handle, `None` once closed
    pub fn native_handle(&self) -> Option<NativeHandle> {
        (!self.is_closed()).then_some(self.inner.handle)
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    /// Whether the window has been closed
    pub fn is_closed(&self) -> bool {
        self.state() == LifecycleState::Closed
    }

    /// Whether closing this window counts towards stopping the event loop
    pub fn is_counted(&self) -> bool {
        self.inner.counted
    }

    /// Rendering API the window was created with
    pub fn client_api(&self) -> ClientApi {
        self.inner.client_api
    }

    /// Last title set; readable after close
    pub fn title(&self) -> String {
        self.inner.title.borrow().clone()
    }

    /// Change the title
    pub fn set_title(&self, title: &str) -> WindowResult<()> {
        self.with_native(|native, handle| native.set_title(handle, title))?;
        *self.inner.title.borrow_mut() = title.to_string();
        Ok(())
    }

    /// Content area position
    pub fn position(&self) -> WindowResult<Position> {
        self.with_native(|native, handle| native.position(handle))
    }

    /// Move the window
    pub fn set_position(&self, x: i32, y: i32) -> WindowResult<()> {
        self.with_native(|native, handle| native.set_position(handle, Position::new(x, y)))
    }

    /// Content area size
    pub fn size(&self) -> WindowResult<Size> {
        self.with_native(|native, handle| native.size(handle))
    }

    /// Resize the content area
    pub fn set_size(&self, width: i32, height: i32) -> WindowResult<()> {
        if width <= 0 || height <= 0 {
            return Err(WindowError::InvalidOptions(format!(
                "window size must be positive, got {width}x{height}"
            )));
        }
        self.with_native(|native, handle| native.set_size(handle, Size::new(width, height)))
    }

    /// Framebuffer size in pixels; zero while minimized
    pub fn framebuffer_size(&self) -> WindowResult<Size> {
        self.with_native(|native, handle| native.framebuffer_size(handle))
    }

    /// Decoration extents around the content area
    pub fn frame_size(&self) -> WindowResult<FrameExtents> {
        self.with_native(|native, handle| native.frame_size(handle))
    }

    /// Content scale of the monitor the window is on
    pub fn content_scale(&self) -> WindowResult<ContentScale> {
        self.with_native(|native, handle| native.content_scale(handle))
    }

    /// Whole-window opacity
    pub fn opacity(&self) -> WindowResult<f32> {
        self.with_native(|native, handle| native.opacity(handle))
    }

    /// Set whole-window opacity, clamped to `0.0..=1.0`
    pub fn set_opacity(&self, opacity: f32) -> WindowResult<()> {
        let opacity = opacity.clamp(0.0, 1.0);
        self.with_native(|native, handle| native.set_opacity(handle, opacity))
    }

    /// Shown on screen
    pub fn is_visible(&self) -> WindowResult<bool> {
        self.attribute(WindowAttribute::Visible)
    }

    /// Show or hide
    pub fn set_visible(&self, visible: bool) -> WindowResult<()> {
        self.with_native(|native, handle| {
            if visible {
                native.show(handle)
            } else {
                native.hide(handle)
            }
        })
    }

    /// Has input focus
    pub fn is_focused(&self) -> WindowResult<bool> {
        self.attribute(WindowAttribute::Focused)
    }

    /// Raise and focus
    pub fn focus(&self) -> WindowResult<()> {
        self.with_native(|native, handle| native.focus(handle))
    }

    /// Maximized
    pub fn is_maximized(&self) -> WindowResult<bool> {
        self.attribute(WindowAttribute::Maximized)
    }

    /// Maximize, or restore when `false`
    pub fn set_maximized(&self, maximized: bool) -> WindowResult<()> {
        self.with_native(|native, handle| {
            if maximized {
                native.maximize(handle)
            } else {
                native.restore(handle)
            }
        })
    }

    /// Minimized
    pub fn is_minimized(&self) -> WindowResult<bool> {
        self.attribute(WindowAttribute::Iconified)
    }

    /// Minimize, or restore when `false`
    pub fn set_minimized(&self, minimized: bool) -> WindowResult<()> {
        self.with_native(|native, handle| {
            if minimized {
                native.iconify(handle)
            } else {
                native.restore(handle)
            }
        })
    }

    /// Owns a monitor
    pub fn is_fullscreen(&self) -> WindowResult<bool> {
        self.attribute(WindowAttribute::Fullscreen)
    }

    /// Cursor is over the content area
    pub fn is_hovered(&self) -> WindowResult<bool> {
        self.attribute(WindowAttribute::Hovered)
    }

    /// Stays above other windows
    pub fn is_floating(&self) -> WindowResult<bool> {
        self.attribute(WindowAttribute::Floating)
    }

    /// Native close flag, set when the user asked to close
    pub fn should_close(&self) -> WindowResult<bool> {
        self.with_native(|native, handle| native.should_close(handle))
    }

    /// Flash the taskbar entry or bounce the dock icon
    pub fn request_user_attention(&self) -> WindowResult<()> {
        self.with_native(|native, handle| native.request_attention(handle))
    }

    /// Queue a `redrawRequested` event for the next event pump
    pub fn request_redraw(&self) -> WindowResult<()> {
        let runtime = self.live_runtime()?;
        runtime.queue_redraw(self);
        Ok(())
    }

    /// Make the GL context current; no-op for windows without one
    pub fn make_context_current(&self) -> WindowResult<()> {
        if !self.inner.client_api.has_context() {
            return self.ensure_open();
        }
        self.with_native(|native, handle| native.make_context_current(handle))
    }

    /// Present the back buffer
    pub fn swap_buffers(&self) -> WindowResult<()> {
        self.with_native(|native, handle| native.swap_buffers(handle))
    }

    /// Address of a GL function for this window's context
    pub fn proc_address(&self, name: &str) -> WindowResult<usize> {
        self.with_native(|native, handle| native.proc_address(handle, name))
    }

    /// Raw window and display handles a renderer can present into
    pub fn window_surface(&self) -> WindowResult<WindowSurface> {
        self.with_native(|native, handle| native.window_surface(handle))
    }

    /// Create a Vulkan surface for this window
    ///
    /// The instance must have been created with the extensions reported
    /// by [`Runtime::required_instance_extensions`](crate::Runtime::required_instance_extensions).
    /// The caller destroys the surface before closing the window.
    pub fn create_surface(&self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        self.with_native(|native, handle| native.create_surface(handle, instance))
    }

    /// Standard cursor, `None` for the platform default
    pub fn set_cursor(&self, icon: Option<CursorIcon>) -> WindowResult<()> {
        self.with_native(|native, handle| native.set_cursor(handle, icon))
    }

    /// Cursor from an RGBA image
    pub fn set_custom_cursor(&self, image: &ImageData, hotspot: Position) -> WindowResult<()> {
        self.with_native(|native, handle| native.set_custom_cursor(handle, image, hotspot))
    }

    /// Window icon
    pub fn set_icon(&self, image: &ImageData) -> WindowResult<()> {
        self.with_native(|native, handle| native.set_icon(handle, image))
    }

    /// Lock the aspect ratio of the content area
    pub fn set_aspect_ratio(&self, numerator: u32, denominator: u32) -> WindowResult<()> {
        if numerator == 0 || denominator == 0 {
            return Err(WindowError::InvalidOptions(format!(
                "aspect ratio terms must be positive, got {numerator}:{denominator}"
            )));
        }
        self.with_native(|native, handle| native.set_aspect_ratio(handle, numerator, denominator))
    }

    /// Constrain the content size
    pub fn set_size_limits(&self, limits: SizeLimits) -> WindowResult<()> {
        self.with_native(|native, handle| native.set_size_limits(handle, limits))
    }

    /// Set an input mode
    pub fn set_input_mode(&self, mode: InputMode, value: InputModeValue) -> WindowResult<()> {
        self.with_native(|native, handle| native.set_input_mode(handle, mode, value))
    }

    /// Read an input mode
    pub fn input_mode(&self, mode: InputMode) -> WindowResult<InputModeValue> {
        self.with_native(|native, handle| native.input_mode(handle, mode))
    }

    /// Whether [`InputMode::RawMouseMotion`] can be enabled
    pub fn raw_mouse_motion_supported(&self) -> WindowResult<bool> {
        self.with_native(|native, _| Ok(native.raw_mouse_motion_supported()))
    }

    /// Warp the cursor to content-area coordinates
    pub fn set_cursor_pos(&self, x: f64, y: f64) -> WindowResult<()> {
        self.with_native(|native, handle| native.set_cursor_pos(handle, x, y))
    }

    /// Close the window
    ///
    /// The first call marks the window closed, dispatches `closed`,
    /// destroys the native window and unregisters its handle. A counted
    /// window also releases its share of the event loop, which shuts the
    /// runtime down when it was the last one. Later calls do nothing.
    pub fn close(&self) -> WindowResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.inner.state.set(LifecycleState::Closed);
        log::debug!("Closing window {} ({})", self.id(), self.inner.handle);

        let Some(runtime) = self.inner.runtime.upgrade() else {
            return Ok(());
        };

        let closed = Event::for_window(EventKind::Closed, self, runtime.now_ms(), EventData::None);
        runtime.bus.dispatch(&closed);

        runtime.backend.borrow_mut().destroy_window(self.inner.handle);
        runtime.registry.borrow_mut().unregister(self.inner.handle);

        if self.inner.counted {
            runtime.release_counted_window();
        }
        Ok(())
    }

    pub(crate) fn native_handle_unchecked(&self) -> NativeHandle {
        self.inner.handle
    }

    pub(crate) fn mark_live(&self) {
        if self.state() == LifecycleState::Constructing {
            self.inner.state.set(LifecycleState::Live);
        }
    }

    /// Mark closed without touching native state; used when the native
    /// library has been torn down underneath the window.
    pub(crate) fn mark_closed(&self) {
        self.inner.state.set(LifecycleState::Closed);
    }

    pub(crate) fn input_state(&self) -> RefMut<'_, InputState> {
        self.inner.input.borrow_mut()
    }

    fn attribute(&self, attribute: WindowAttribute) -> WindowResult<bool> {
        self.with_native(|native, handle| native.attribute(handle, attribute))
    }

    fn ensure_open(&self) -> WindowResult<()> {
        if self.is_closed() {
            Err(WindowError::Closed(self.id()))
        } else {
            Ok(())
        }
    }

    fn live_runtime(&self) -> WindowResult<Rc<RuntimeShared>> {
        self.ensure_open()?;
        self.inner.runtime.upgrade().ok_or(WindowError::RuntimeStopped)
    }

    fn with_native<R>(
        &self,
        f: impl FnOnce(&mut dyn NativeBackend, NativeHandle) -> BackendResult<R>,
    ) -> WindowResult<R> {
        let runtime = self.live_runtime()?;
        let mut backend = runtime.backend.borrow_mut();
        Ok(f(backend.as_mut(), self.inner.handle)?)
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Window {}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.inner.id)
            .field("handle", &self.inner.handle)
            .field("state", &self.inner.state.get())
            .field("title", &*self.inner.title.borrow())
            .finish()
    }
}
