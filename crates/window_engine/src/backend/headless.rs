//! In-memory backend with no window system behind it
//!
//! Used for tests and headless runs. The backend is a cheap clone of shared
//! state, so a test can keep one clone to inject native events and inspect
//! native window state while the runtime owns the other.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use ash::vk;

use super::{
    BackendError, BackendResult, NativeBackend, NativeEvent, NativeEventKind, NativeHandle,
    WindowHints,
};
use crate::window::common::{
    ContentScale, CursorIcon, FrameExtents, ImageData, InputMode, InputModeValue, Position, Size,
    SizeLimits, WindowAttribute, WindowSurface,
};
use crate::window::options::ClientApi;

/// Title bar height reported for decorated windows
const TITLE_BAR_HEIGHT: i32 = 30;

const NO_VULKAN: BackendError = BackendError::Unsupported("headless backend has no Vulkan loader");

const fn framebuffer_event(size: Size) -> NativeEventKind {
    NativeEventKind::FramebufferSize { width: size.width, height: size.height }
}

/// Native state of one headless window
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    /// Current title
    pub title: String,
    /// Content size
    pub size: Size,
    /// Position
    pub position: Position,
    /// Shown
    pub visible: bool,
    /// Focused
    pub focused: bool,
    /// Maximized
    pub maximized: bool,
    /// Minimized
    pub iconified: bool,
    /// Cursor over the content area
    pub hovered: bool,
    /// Always on top
    pub floating: bool,
    /// Decorated
    pub decorated: bool,
    /// Native close flag
    pub should_close: bool,
    /// Opacity
    pub opacity: f32,
    /// Standard cursor in use
    pub cursor: Option<CursorIcon>,
    /// Custom cursor size, if one is set
    pub custom_cursor: Option<(u32, u32)>,
    /// Icon size, if one is set
    pub icon: Option<(u32, u32)>,
    /// Aspect ratio lock
    pub aspect_ratio: Option<(u32, u32)>,
    /// Size limits
    pub size_limits: SizeLimits,
    /// Last warped cursor position
    pub cursor_pos: (f64, f64),
    /// Client API the window was created with
    pub client_api: ClientApi,
    /// Buffers presented so far
    pub swaps: u64,
    input_modes: HashMap<InputMode, InputModeValue>,
}

impl HeadlessWindow {
    fn from_hints(hints: &WindowHints, position: Position) -> Self {
        Self {
            title: hints.title.clone(),
            size: Size::new(hints.width, hints.height),
            position,
            visible: false,
            focused: false,
            maximized: hints.maximized,
            iconified: false,
            hovered: false,
            floating: hints.floating,
            decorated: hints.decorated,
            should_close: false,
            opacity: 1.0,
            cursor: None,
            custom_cursor: None,
            icon: None,
            aspect_ratio: None,
            size_limits: SizeLimits::default(),
            cursor_pos: (0.0, 0.0),
            client_api: hints.client_api,
            swaps: 0,
            input_modes: HashMap::new(),
        }
    }

    fn framebuffer_size(&self) -> Size {
        if self.iconified {
            Size::default()
        } else {
            self.size
        }
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_handle: usize,
    windows: HashMap<NativeHandle, HeadlessWindow>,
    queue: VecDeque<NativeEvent>,
    time: f64,
    terminated: bool,
    terminate_calls: u32,
    fail_next_create: Option<String>,
    current_context: Option<NativeHandle>,
    swap_interval: u32,
    pump_waits: Vec<bool>,
    raw_mouse_motion: bool,
    destroyed: Vec<NativeHandle>,
}

impl HeadlessState {
    fn window(&self, handle: NativeHandle) -> BackendResult<&HeadlessWindow> {
        if self.terminated {
            return Err(BackendError::Terminated);
        }
        self.windows.get(&handle).ok_or(BackendError::UnknownHandle(handle))
    }

    fn window_mut(&mut self, handle: NativeHandle) -> BackendResult<&mut HeadlessWindow> {
        if self.terminated {
            return Err(BackendError::Terminated);
        }
        self.windows.get_mut(&handle).ok_or(BackendError::UnknownHandle(handle))
    }

    fn queue(&mut self, handle: NativeHandle, kind: NativeEventKind) {
        let time = self.time;
        self.queue.push_back(NativeEvent { handle, time, kind });
    }
}

/// Backend keeping every window in memory
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a native event stamped with the current native time
    pub fn push_event(&self, handle: NativeHandle, kind: NativeEventKind) {
        self.state.borrow_mut().queue(handle, kind);
    }

    /// Queue a native event with an explicit timestamp in milliseconds
    pub fn push_event_at(&self, handle: NativeHandle, time_ms: f64, kind: NativeEventKind) {
        self.state.borrow_mut().queue.push_back(NativeEvent {
            handle,
            time: time_ms / 1000.0,
            kind,
        });
    }

    /// Advance the native clock
    pub fn advance_time(&self, ms: f64) {
        self.state.borrow_mut().time += ms / 1000.0;
    }

    /// Make the next `create_window` fail with the given reason
    pub fn fail_next_create(&self, reason: impl Into<String>) {
        self.state.borrow_mut().fail_next_create = Some(reason.into());
    }

    /// Snapshot of a live window's native state
    pub fn window(&self, handle: NativeHandle) -> Option<HeadlessWindow> {
        self.state.borrow().windows.get(&handle).cloned()
    }

    /// Whether the handle names a live native window
    pub fn is_live(&self, handle: NativeHandle) -> bool {
        self.state.borrow().windows.contains_key(&handle)
    }

    /// Number of live native windows
    pub fn window_count(&self) -> usize {
        self.state.borrow().windows.len()
    }

    /// Handles destroyed so far, in destruction order
    pub fn destroyed(&self) -> Vec<NativeHandle> {
        self.state.borrow().destroyed.clone()
    }

    /// How often `terminate` has been called
    pub fn terminate_calls(&self) -> u32 {
        self.state.borrow().terminate_calls
    }

    /// How often events have been pumped
    pub fn pump_calls(&self) -> usize {
        self.state.borrow().pump_waits.len()
    }

    /// The `wait` flag of every pump so far
    pub fn pump_waits(&self) -> Vec<bool> {
        self.state.borrow().pump_waits.clone()
    }

    /// Pretend the platform can or cannot deliver raw mouse motion
    pub fn set_raw_mouse_motion_supported(&self, supported: bool) {
        self.state.borrow_mut().raw_mouse_motion = supported;
    }

    /// Native events still waiting for a pump
    pub fn pending_events(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Window whose context is current
    pub fn current_context(&self) -> Option<NativeHandle> {
        self.state.borrow().current_context
    }

    /// Last swap interval set
    pub fn swap_interval(&self) -> u32 {
        self.state.borrow().swap_interval
    }

    /// Simulate the user pressing the close button
    pub fn request_close(&self, handle: NativeHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(window) = state.windows.get_mut(&handle) {
            window.should_close = true;
        }
        state.queue(handle, NativeEventKind::Close);
    }
}

impl NativeBackend for HeadlessBackend {
    fn create_window(&mut self, hints: &WindowHints) -> BackendResult<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if state.terminated {
            return Err(BackendError::Terminated);
        }
        if let Some(reason) = state.fail_next_create.take() {
            return Err(BackendError::CreationFailed(reason));
        }

        // Pointer-like values: non-zero and aligned
        state.next_handle += 1;
        let handle = NativeHandle::from_raw(state.next_handle * 0x10);
        let offset = i32::try_from(state.windows.len()).unwrap_or(0) * 24;
        let window = HeadlessWindow::from_hints(hints, Position::new(100 + offset, 100 + offset));
        state.windows.insert(handle, window);
        log::trace!("headless window {handle} created");
        Ok(handle)
    }

    fn destroy_window(&mut self, handle: NativeHandle) {
        let mut state = self.state.borrow_mut();
        if state.windows.remove(&handle).is_some() {
            state.destroyed.push(handle);
            state.queue.retain(|event| event.handle != handle);
            if state.current_context == Some(handle) {
                state.current_context = None;
            }
        }
    }

    fn pump_events(&mut self, wait: bool) -> Vec<NativeEvent> {
        // Nothing can arrive while blocked, so waiting degrades to polling
        let mut state = self.state.borrow_mut();
        state.pump_waits.push(wait);
        if state.terminated {
            return Vec::new();
        }
        state.queue.drain(..).collect()
    }

    fn terminate(&mut self) {
        let mut state = self.state.borrow_mut();
        state.terminate_calls += 1;
        state.terminated = true;
        let handles: Vec<_> = state.windows.drain().map(|(handle, _)| handle).collect();
        state.destroyed.extend(handles);
        state.queue.clear();
        state.current_context = None;
    }

    fn is_terminated(&self) -> bool {
        self.state.borrow().terminated
    }

    fn set_title(&mut self, handle: NativeHandle, title: &str) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.title = title.to_string();
        Ok(())
    }

    fn size(&self, handle: NativeHandle) -> BackendResult<Size> {
        Ok(self.state.borrow().window(handle)?.size)
    }

    fn set_size(&mut self, handle: NativeHandle, size: Size) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let window = state.window_mut(handle)?;
        window.size = size;
        let framebuffer = window.framebuffer_size();
        state.queue(handle, NativeEventKind::Size { width: size.width, height: size.height });
        state.queue(handle, framebuffer_event(framebuffer));
        Ok(())
    }

    fn position(&self, handle: NativeHandle) -> BackendResult<Position> {
        Ok(self.state.borrow().window(handle)?.position)
    }

    fn set_position(&mut self, handle: NativeHandle, position: Position) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        state.window_mut(handle)?.position = position;
        state.queue(handle, NativeEventKind::Pos { x: position.x, y: position.y });
        Ok(())
    }

    fn framebuffer_size(&self, handle: NativeHandle) -> BackendResult<Size> {
        Ok(self.state.borrow().window(handle)?.framebuffer_size())
    }

    fn frame_size(&self, handle: NativeHandle) -> BackendResult<FrameExtents> {
        let state = self.state.borrow();
        let window = state.window(handle)?;
        Ok(if window.decorated {
            FrameExtents { left: 1, top: TITLE_BAR_HEIGHT, right: 1, bottom: 1 }
        } else {
            FrameExtents::default()
        })
    }

    fn content_scale(&self, handle: NativeHandle) -> BackendResult<ContentScale> {
        self.state.borrow().window(handle)?;
        Ok(ContentScale { x: 1.0, y: 1.0 })
    }

    fn opacity(&self, handle: NativeHandle) -> BackendResult<f32> {
        Ok(self.state.borrow().window(handle)?.opacity)
    }

    fn set_opacity(&mut self, handle: NativeHandle, opacity: f32) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    fn attribute(&self, handle: NativeHandle, attribute: WindowAttribute) -> BackendResult<bool> {
        let state = self.state.borrow();
        let window = state.window(handle)?;
        Ok(match attribute {
            WindowAttribute::Focused => window.focused,
            WindowAttribute::Visible => window.visible,
            WindowAttribute::Maximized => window.maximized,
            WindowAttribute::Iconified => window.iconified,
            WindowAttribute::Hovered => window.hovered,
            WindowAttribute::Floating => window.floating,
            WindowAttribute::Fullscreen => false,
        })
    }

    fn show(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.visible = true;
        Ok(())
    }

    fn hide(&mut self, handle: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let window = state.window_mut(handle)?;
        window.visible = false;
        if window.focused {
            window.focused = false;
            state.queue(handle, NativeEventKind::Focus(false));
        }
        Ok(())
    }

    fn iconify(&mut self, handle: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let window = state.window_mut(handle)?;
        if window.iconified {
            return Ok(());
        }
        window.iconified = true;
        state.queue(handle, NativeEventKind::Iconify(true));
        state.queue(handle, NativeEventKind::FramebufferSize { width: 0, height: 0 });
        Ok(())
    }

    fn restore(&mut self, handle: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let window = state.window_mut(handle)?;
        let was_iconified = std::mem::replace(&mut window.iconified, false);
        let was_maximized = std::mem::replace(&mut window.maximized, false);
        let size = window.size;
        if was_iconified {
            state.queue(handle, NativeEventKind::Iconify(false));
            state.queue(handle, framebuffer_event(size));
        } else if was_maximized {
            state.queue(handle, NativeEventKind::Maximize(false));
        }
        Ok(())
    }

    fn maximize(&mut self, handle: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let window = state.window_mut(handle)?;
        if window.maximized {
            return Ok(());
        }
        window.maximized = true;
        state.queue(handle, NativeEventKind::Maximize(true));
        Ok(())
    }

    fn focus(&mut self, handle: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        state.window_mut(handle)?;

        let mut changes = Vec::new();
        for (other, window) in &mut state.windows {
            let focused = *other == handle;
            if window.focused != focused {
                window.focused = focused;
                changes.push((*other, focused));
            }
        }
        // Blur before focus, like a window manager reports it
        changes.sort_by_key(|(_, focused)| *focused);
        for (other, focused) in changes {
            state.queue(other, NativeEventKind::Focus(focused));
        }
        Ok(())
    }

    fn request_attention(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.state.borrow().window(handle)?;
        Ok(())
    }

    fn should_close(&self, handle: NativeHandle) -> BackendResult<bool> {
        Ok(self.state.borrow().window(handle)?.should_close)
    }

    fn set_should_close(&mut self, handle: NativeHandle, value: bool) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.should_close = value;
        Ok(())
    }

    fn make_context_current(&mut self, handle: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.window(handle)?.client_api.has_context() {
            return Err(BackendError::Unsupported("window has no client API context"));
        }
        state.current_context = Some(handle);
        Ok(())
    }

    fn swap_buffers(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.swaps += 1;
        Ok(())
    }

    fn set_swap_interval(&mut self, interval: u32) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        if state.current_context.is_none() {
            return Err(BackendError::Unsupported("no current context"));
        }
        state.swap_interval = interval;
        Ok(())
    }

    fn set_cursor(&mut self, handle: NativeHandle, icon: Option<CursorIcon>) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let window = state.window_mut(handle)?;
        window.cursor = icon;
        window.custom_cursor = None;
        Ok(())
    }

    fn set_custom_cursor(
        &mut self,
        handle: NativeHandle,
        image: &ImageData,
        _hotspot: Position,
    ) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let window = state.window_mut(handle)?;
        window.cursor = None;
        window.custom_cursor = Some((image.width, image.height));
        Ok(())
    }

    fn set_icon(&mut self, handle: NativeHandle, image: &ImageData) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.icon = Some((image.width, image.height));
        Ok(())
    }

    fn set_aspect_ratio(
        &mut self,
        handle: NativeHandle,
        numerator: u32,
        denominator: u32,
    ) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.aspect_ratio = Some((numerator, denominator));
        Ok(())
    }

    fn set_size_limits(&mut self, handle: NativeHandle, limits: SizeLimits) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.size_limits = limits;
        Ok(())
    }

    fn set_input_mode(
        &mut self,
        handle: NativeHandle,
        mode: InputMode,
        value: InputModeValue,
    ) -> BackendResult<()> {
        self.state.borrow_mut().window_mut(handle)?.input_modes.insert(mode, value);
        Ok(())
    }

    fn input_mode(&self, handle: NativeHandle, mode: InputMode) -> BackendResult<InputModeValue> {
        let state = self.state.borrow();
        let window = state.window(handle)?;
        Ok(window.input_modes.get(&mode).copied().unwrap_or(match mode {
            InputMode::Cursor => InputModeValue::Normal,
            _ => InputModeValue::Enabled(false),
        }))
    }

    fn raw_mouse_motion_supported(&self) -> bool {
        self.state.borrow().raw_mouse_motion
    }

    fn set_cursor_pos(&mut self, handle: NativeHandle, x: f64, y: f64) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        state.window_mut(handle)?.cursor_pos = (x, y);
        state.queue(handle, NativeEventKind::CursorPos { x, y });
        Ok(())
    }

    fn proc_address(&mut self, handle: NativeHandle, _name: &str) -> BackendResult<usize> {
        self.state.borrow().window(handle)?;
        Err(BackendError::Unsupported("headless backend has no GL loader"))
    }

    fn window_surface(&self, handle: NativeHandle) -> BackendResult<WindowSurface> {
        self.state.borrow().window(handle)?;
        Err(BackendError::Unsupported("headless windows cannot be presented into"))
    }

    fn vulkan_supported(&self) -> bool {
        false
    }

    fn required_instance_extensions(&self) -> BackendResult<Vec<String>> {
        Err(NO_VULKAN)
    }

    fn instance_proc_address(&self, _instance: vk::Instance, _name: &str) -> BackendResult<usize> {
        Err(NO_VULKAN)
    }

    fn physical_device_presentation_support(
        &self,
        _instance: vk::Instance,
        _device: vk::PhysicalDevice,
        _queue_family: u32,
    ) -> BackendResult<bool> {
        Err(NO_VULKAN)
    }

    fn create_surface(
        &mut self,
        handle: NativeHandle,
        _instance: vk::Instance,
    ) -> BackendResult<vk::SurfaceKHR> {
        self.state.borrow().window(handle)?;
        Err(NO_VULKAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::options::WindowOptions;

    fn create(backend: &mut HeadlessBackend) -> NativeHandle {
        backend
            .create_window(&WindowHints::from(&WindowOptions::default()))
            .unwrap()
    }

    #[test]
    fn test_windows_start_hidden() {
        let mut backend = HeadlessBackend::new();
        let handle = create(&mut backend);
        assert!(!backend.attribute(handle, WindowAttribute::Visible).unwrap());
        assert_ne!(handle.raw(), 0);
    }

    #[test]
    fn test_iconify_reports_zero_framebuffer() {
        let mut backend = HeadlessBackend::new();
        let handle = create(&mut backend);
        backend.iconify(handle).unwrap();

        let events = backend.pump_events(false);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, NativeEventKind::Iconify(true));
        assert_eq!(events[1].kind, NativeEventKind::FramebufferSize { width: 0, height: 0 });
        assert_eq!(backend.framebuffer_size(handle).unwrap(), Size::default());
    }

    #[test]
    fn test_destroy_drops_pending_events() {
        let mut backend = HeadlessBackend::new();
        let handle = create(&mut backend);
        backend.push_event(handle, NativeEventKind::Refresh);
        backend.destroy_window(handle);

        assert!(backend.pump_events(false).is_empty());
        assert_eq!(backend.size(handle), Err(BackendError::UnknownHandle(handle)));
        assert_eq!(backend.destroyed(), vec![handle]);
    }

    #[test]
    fn test_terminate_rejects_further_calls() {
        let mut backend = HeadlessBackend::new();
        let handle = create(&mut backend);
        backend.terminate();

        assert!(backend.is_terminated());
        assert_eq!(backend.window_count(), 0);
        assert_eq!(backend.size(handle), Err(BackendError::Terminated));
        assert!(backend
            .create_window(&WindowHints::from(&WindowOptions::default()))
            .is_err());
    }

    #[test]
    fn test_focus_moves_between_windows() {
        let mut backend = HeadlessBackend::new();
        let first = create(&mut backend);
        let second = create(&mut backend);

        backend.focus(first).unwrap();
        backend.pump_events(false);
        backend.focus(second).unwrap();

        let events = backend.pump_events(false);
        assert_eq!(
            events.iter().map(|e| (e.handle, e.kind.clone())).collect::<Vec<_>>(),
            vec![(first, NativeEventKind::Focus(false)), (second, NativeEventKind::Focus(true))]
        );
    }

    #[test]
    fn test_pump_records_wait_flag() {
        let mut backend = HeadlessBackend::new();
        backend.pump_events(true);
        backend.pump_events(false);
        assert_eq!(backend.pump_waits(), vec![true, false]);
        assert_eq!(backend.pump_calls(), 2);
    }

    #[test]
    fn test_no_vulkan_or_presentation() {
        let mut backend = HeadlessBackend::new();
        let handle = create(&mut backend);

        assert!(!backend.vulkan_supported());
        assert_eq!(backend.required_instance_extensions(), Err(NO_VULKAN));
        assert_eq!(backend.create_surface(handle, vk::Instance::null()), Err(NO_VULKAN));
        assert!(matches!(backend.window_surface(handle), Err(BackendError::Unsupported(_))));

        let stale = NativeHandle::from_raw(0xdead0);
        assert_eq!(
            backend.create_surface(stale, vk::Instance::null()),
            Err(BackendError::UnknownHandle(stale))
        );
    }

    #[test]
    fn test_context_requires_client_api() {
        let mut backend = HeadlessBackend::new();
        let handle = create(&mut backend);
        assert!(backend.make_context_current(handle).is_err());
        assert!(backend.set_swap_interval(1).is_err());
    }
}
