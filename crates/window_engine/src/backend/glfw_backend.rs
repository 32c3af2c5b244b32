//! GLFW-based native backend
//!
//! Every window gets all polling channels enabled on creation. A pump calls
//! into GLFW once, then drains each window's channel and merges the results
//! by native timestamp so callbacks from different windows keep their
//! arrival order.

use std::collections::HashMap;

use ash::vk;
use glfw::{Context, WindowEvent};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use super::{
    BackendError, BackendResult, Modifiers, NativeAction, NativeBackend, NativeEvent,
    NativeEventKind, NativeHandle, WindowHints,
};
use crate::window::common::{
    ContentScale, CursorIcon, FrameExtents, ImageData, InputMode, InputModeValue, Position, Size,
    SizeLimits, WindowAttribute, WindowSurface,
};
use crate::window::options::ClientApi;

struct GlfwWindow {
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, WindowEvent)>,
}

/// Backend driving real native windows through GLFW
pub struct GlfwBackend {
    glfw: Option<glfw::Glfw>,
    windows: HashMap<NativeHandle, GlfwWindow>,
}

impl GlfwBackend {
    /// Initialize GLFW
    pub fn new() -> BackendResult<Self> {
        let glfw = glfw::init(|error: glfw::Error, description: String| {
            log::error!("GLFW error {error:?}: {description}");
        })
        .map_err(|e| BackendError::InitializationFailed(format!("{e:?}")))?;

        log::info!("GLFW {} initialized", glfw::get_version_string());
        Ok(Self {
            glfw: Some(glfw),
            windows: HashMap::new(),
        })
    }

    fn glfw(&self) -> BackendResult<&glfw::Glfw> {
        self.glfw.as_ref().ok_or(BackendError::Terminated)
    }

    fn glfw_mut(&mut self) -> BackendResult<&mut glfw::Glfw> {
        self.glfw.as_mut().ok_or(BackendError::Terminated)
    }

    fn window(&self, handle: NativeHandle) -> BackendResult<&glfw::PWindow> {
        if self.glfw.is_none() {
            return Err(BackendError::Terminated);
        }
        self.windows
            .get(&handle)
            .map(|entry| &entry.window)
            .ok_or(BackendError::UnknownHandle(handle))
    }

    fn window_mut(&mut self, handle: NativeHandle) -> BackendResult<&mut glfw::PWindow> {
        if self.glfw.is_none() {
            return Err(BackendError::Terminated);
        }
        self.windows
            .get_mut(&handle)
            .map(|entry| &mut entry.window)
            .ok_or(BackendError::UnknownHandle(handle))
    }

    fn apply_hints(glfw: &mut glfw::Glfw, hints: &WindowHints) {
        use glfw::WindowHint;

        glfw.default_window_hints();
        match hints.client_api {
            ClientApi::None => {
                glfw.window_hint(WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
            }
            ClientApi::OpenGl { version, es } => {
                glfw.window_hint(WindowHint::ContextVersion(version.major, version.minor));
                glfw.window_hint(WindowHint::ClientApi(if es {
                    glfw::ClientApiHint::OpenGlEs
                } else {
                    glfw::ClientApiHint::OpenGl
                }));
                if version.wants_forward_compat() {
                    glfw.window_hint(WindowHint::OpenGlForwardCompat(true));
                }
                if version.wants_core_profile() {
                    glfw.window_hint(WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
                }
                glfw.window_hint(WindowHint::Samples(hints.samples));
            }
        }

        glfw.window_hint(WindowHint::Floating(hints.floating));
        glfw.window_hint(WindowHint::Resizable(hints.resizable));
        glfw.window_hint(WindowHint::Visible(false));
        glfw.window_hint(WindowHint::Maximized(hints.maximized));
        glfw.window_hint(WindowHint::TransparentFramebuffer(hints.transparent));
        glfw.window_hint(WindowHint::Decorated(hints.decorated));
    }
}

fn convert_action(action: glfw::Action) -> NativeAction {
    match action {
        glfw::Action::Release => NativeAction::Release,
        glfw::Action::Press => NativeAction::Press,
        glfw::Action::Repeat => NativeAction::Repeat,
    }
}

fn convert_mods(mods: glfw::Modifiers) -> Modifiers {
    Modifiers::from_bits_truncate(mods.bits() as u32)
}

fn convert_event(event: WindowEvent) -> Option<NativeEventKind> {
    Some(match event {
        WindowEvent::Pos(x, y) => NativeEventKind::Pos { x, y },
        WindowEvent::Size(width, height) => NativeEventKind::Size { width, height },
        WindowEvent::Close => NativeEventKind::Close,
        WindowEvent::Refresh => NativeEventKind::Refresh,
        WindowEvent::Focus(focused) => NativeEventKind::Focus(focused),
        WindowEvent::Iconify(iconified) => NativeEventKind::Iconify(iconified),
        WindowEvent::Maximize(maximized) => NativeEventKind::Maximize(maximized),
        WindowEvent::FramebufferSize(width, height) => {
            NativeEventKind::FramebufferSize { width, height }
        }
        WindowEvent::MouseButton(button, action, mods) => NativeEventKind::MouseButton {
            button: button as i32,
            action: convert_action(action),
            mods: convert_mods(mods),
        },
        WindowEvent::CursorPos(x, y) => NativeEventKind::CursorPos { x, y },
        WindowEvent::CursorEnter(entered) => NativeEventKind::CursorEnter { entered },
        WindowEvent::Scroll(x, y) => NativeEventKind::Scroll { x, y },
        WindowEvent::Key(key, scancode, action, mods) => NativeEventKind::Key {
            key: key as i32,
            scancode,
            action: convert_action(action),
            mods: convert_mods(mods),
        },
        WindowEvent::Char(codepoint) => NativeEventKind::Char { codepoint },
        WindowEvent::FileDrop(paths) => {
            NativeEventKind::Drop(paths.iter().map(|p| p.to_string_lossy().into_owned()).collect())
        }
        WindowEvent::ContentScale(x, y) => NativeEventKind::ContentScale { x, y },
        _ => return None,
    })
}

fn standard_cursor(icon: CursorIcon) -> glfw::StandardCursor {
    match icon {
        CursorIcon::Arrow => glfw::StandardCursor::Arrow,
        CursorIcon::Ibeam => glfw::StandardCursor::IBeam,
        CursorIcon::Crosshair => glfw::StandardCursor::Crosshair,
        CursorIcon::Hand => glfw::StandardCursor::Hand,
        CursorIcon::Hresize => glfw::StandardCursor::HResize,
        CursorIcon::Vresize => glfw::StandardCursor::VResize,
    }
}

fn pixel_image(image: &ImageData) -> glfw::PixelImage {
    glfw::PixelImage {
        width: image.width,
        height: image.height,
        pixels: image.packed_pixels(),
    }
}

impl NativeBackend for GlfwBackend {
    fn create_window(&mut self, hints: &WindowHints) -> BackendResult<NativeHandle> {
        let invalid = |what: &str, value: i32| {
            BackendError::CreationFailed(format!("invalid {what} {value}"))
        };
        let width = u32::try_from(hints.width).map_err(|_| invalid("width", hints.width))?;
        let height = u32::try_from(hints.height).map_err(|_| invalid("height", hints.height))?;

        let glfw = self.glfw_mut()?;
        Self::apply_hints(glfw, hints);

        let (mut window, events) = glfw
            .create_window(width, height, &hints.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| {
                BackendError::CreationFailed(format!("GLFW refused window '{}'", hints.title))
            })?;

        window.set_all_polling(true);

        let handle = NativeHandle::from_raw(window.window_ptr() as usize);
        self.windows.insert(handle, GlfwWindow { window, events });
        Ok(handle)
    }

    fn destroy_window(&mut self, handle: NativeHandle) {
        // Dropping the PWindow destroys the native window
        self.windows.remove(&handle);
    }

    fn pump_events(&mut self, wait: bool) -> Vec<NativeEvent> {
        let Some(glfw) = self.glfw.as_mut() else {
            return Vec::new();
        };
        if wait {
            glfw.wait_events();
        } else {
            glfw.poll_events();
        }

        let mut batch = Vec::new();
        for (handle, entry) in &self.windows {
            for (time, event) in glfw::flush_messages(&entry.events) {
                if let Some(kind) = convert_event(event) {
                    batch.push(NativeEvent { handle: *handle, time, kind });
                }
            }
        }
        // Stable sort keeps per-window order for equal timestamps
        batch.sort_by(|a, b| a.time.total_cmp(&b.time));
        batch
    }

    fn terminate(&mut self) {
        self.windows.clear();
        if self.glfw.take().is_some() {
            log::info!("GLFW terminated");
        }
    }

    fn is_terminated(&self) -> bool {
        self.glfw.is_none()
    }

    fn set_title(&mut self, handle: NativeHandle, title: &str) -> BackendResult<()> {
        self.window_mut(handle)?.set_title(title);
        Ok(())
    }

    fn size(&self, handle: NativeHandle) -> BackendResult<Size> {
        let (width, height) = self.window(handle)?.get_size();
        Ok(Size::new(width, height))
    }

    fn set_size(&mut self, handle: NativeHandle, size: Size) -> BackendResult<()> {
        self.window_mut(handle)?.set_size(size.width, size.height);
        Ok(())
    }

    fn position(&self, handle: NativeHandle) -> BackendResult<Position> {
        let (x, y) = self.window(handle)?.get_pos();
        Ok(Position::new(x, y))
    }

    fn set_position(&mut self, handle: NativeHandle, position: Position) -> BackendResult<()> {
        self.window_mut(handle)?.set_pos(position.x, position.y);
        Ok(())
    }

    fn framebuffer_size(&self, handle: NativeHandle) -> BackendResult<Size> {
        let (width, height) = self.window(handle)?.get_framebuffer_size();
        Ok(Size::new(width, height))
    }

    fn frame_size(&self, handle: NativeHandle) -> BackendResult<FrameExtents> {
        let (left, top, right, bottom) = self.window(handle)?.get_frame_size();
        Ok(FrameExtents { left, top, right, bottom })
    }

    fn content_scale(&self, handle: NativeHandle) -> BackendResult<ContentScale> {
        let (x, y) = self.window(handle)?.get_content_scale();
        Ok(ContentScale { x, y })
    }

    fn opacity(&self, handle: NativeHandle) -> BackendResult<f32> {
        Ok(self.window(handle)?.get_opacity())
    }

    fn set_opacity(&mut self, handle: NativeHandle, opacity: f32) -> BackendResult<()> {
        self.window_mut(handle)?.set_opacity(opacity);
        Ok(())
    }

    fn attribute(&self, handle: NativeHandle, attribute: WindowAttribute) -> BackendResult<bool> {
        let window = self.window(handle)?;
        Ok(match attribute {
            WindowAttribute::Focused => window.is_focused(),
            WindowAttribute::Visible => window.is_visible(),
            WindowAttribute::Maximized => window.is_maximized(),
            WindowAttribute::Iconified => window.is_iconified(),
            WindowAttribute::Hovered => window.is_hovered(),
            WindowAttribute::Floating => window.is_floating(),
            WindowAttribute::Fullscreen => {
                window.with_window_mode(|mode| matches!(mode, glfw::WindowMode::FullScreen(_)))
            }
        })
    }

    fn show(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.show();
        Ok(())
    }

    fn hide(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.hide();
        Ok(())
    }

    fn iconify(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.iconify();
        Ok(())
    }

    fn restore(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.restore();
        Ok(())
    }

    fn maximize(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.maximize();
        Ok(())
    }

    fn focus(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.focus();
        Ok(())
    }

    fn request_attention(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.request_attention();
        Ok(())
    }

    fn should_close(&self, handle: NativeHandle) -> BackendResult<bool> {
        Ok(self.window(handle)?.should_close())
    }

    fn set_should_close(&mut self, handle: NativeHandle, value: bool) -> BackendResult<()> {
        self.window_mut(handle)?.set_should_close(value);
        Ok(())
    }

    fn make_context_current(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.make_current();
        Ok(())
    }

    fn swap_buffers(&mut self, handle: NativeHandle) -> BackendResult<()> {
        self.window_mut(handle)?.swap_buffers();
        Ok(())
    }

    fn set_swap_interval(&mut self, interval: u32) -> BackendResult<()> {
        let glfw = self.glfw_mut()?;
        glfw.set_swap_interval(if interval == 0 {
            glfw::SwapInterval::None
        } else {
            glfw::SwapInterval::Sync(interval)
        });
        Ok(())
    }

    fn set_cursor(&mut self, handle: NativeHandle, icon: Option<CursorIcon>) -> BackendResult<()> {
        let cursor = icon.map(|icon| glfw::Cursor::standard(standard_cursor(icon)));
        // The previous cursor is returned and destroyed on drop
        let _previous = self.window_mut(handle)?.set_cursor(cursor);
        Ok(())
    }

    fn set_custom_cursor(
        &mut self,
        handle: NativeHandle,
        image: &ImageData,
        hotspot: Position,
    ) -> BackendResult<()> {
        let x = u32::try_from(hotspot.x).unwrap_or(0);
        let y = u32::try_from(hotspot.y).unwrap_or(0);
        let cursor = glfw::Cursor::create(pixel_image(image), x, y);
        let _previous = self.window_mut(handle)?.set_cursor(Some(cursor));
        Ok(())
    }

    fn set_icon(&mut self, handle: NativeHandle, image: &ImageData) -> BackendResult<()> {
        self.window_mut(handle)?.set_icon_from_pixels(vec![pixel_image(image)]);
        Ok(())
    }

    fn set_aspect_ratio(
        &mut self,
        handle: NativeHandle,
        numerator: u32,
        denominator: u32,
    ) -> BackendResult<()> {
        self.window_mut(handle)?.set_aspect_ratio(numerator, denominator);
        Ok(())
    }

    fn set_size_limits(&mut self, handle: NativeHandle, limits: SizeLimits) -> BackendResult<()> {
        self.window_mut(handle)?.set_size_limits(
            limits.min_width,
            limits.min_height,
            limits.max_width,
            limits.max_height,
        );
        Ok(())
    }

    fn set_input_mode(
        &mut self,
        handle: NativeHandle,
        mode: InputMode,
        value: InputModeValue,
    ) -> BackendResult<()> {
        use glfw::CursorMode;

        let window = self.window_mut(handle)?;
        match (mode, value) {
            (InputMode::Cursor, InputModeValue::Normal) => {
                window.set_cursor_mode(CursorMode::Normal);
            }
            (InputMode::Cursor, InputModeValue::Hidden) => {
                window.set_cursor_mode(CursorMode::Hidden);
            }
            (InputMode::Cursor, InputModeValue::Disabled) => {
                window.set_cursor_mode(CursorMode::Disabled);
            }
            (InputMode::StickyKeys, InputModeValue::Enabled(on)) => window.set_sticky_keys(on),
            (InputMode::StickyMouseButtons, InputModeValue::Enabled(on)) => {
                window.set_sticky_mouse_buttons(on);
            }
            (InputMode::RawMouseMotion, InputModeValue::Enabled(on)) => {
                window.set_raw_mouse_motion(on);
            }
            (InputMode::LockKeyMods, _) => return Err(BackendError::Unsupported("lock key mods")),
            _ => return Err(BackendError::Unsupported("input mode value does not fit the mode")),
        }
        Ok(())
    }

    fn input_mode(&self, handle: NativeHandle, mode: InputMode) -> BackendResult<InputModeValue> {
        let window = self.window(handle)?;
        Ok(match mode {
            InputMode::Cursor => match window.get_cursor_mode() {
                glfw::CursorMode::Normal => InputModeValue::Normal,
                glfw::CursorMode::Hidden => InputModeValue::Hidden,
                glfw::CursorMode::Disabled => InputModeValue::Disabled,
                #[allow(unreachable_patterns)]
                _ => InputModeValue::Normal,
            },
            InputMode::StickyKeys => InputModeValue::Enabled(window.has_sticky_keys()),
            InputMode::StickyMouseButtons => {
                InputModeValue::Enabled(window.has_sticky_mouse_buttons())
            }
            InputMode::RawMouseMotion => InputModeValue::Enabled(window.uses_raw_mouse_motion()),
            InputMode::LockKeyMods => return Err(BackendError::Unsupported("lock key mods")),
        })
    }

    fn raw_mouse_motion_supported(&self) -> bool {
        self.glfw.as_ref().is_some_and(glfw::Glfw::supports_raw_motion)
    }

    fn set_cursor_pos(&mut self, handle: NativeHandle, x: f64, y: f64) -> BackendResult<()> {
        self.window_mut(handle)?.set_cursor_pos(x, y);
        Ok(())
    }

    fn proc_address(&mut self, handle: NativeHandle, name: &str) -> BackendResult<usize> {
        let address = self.window_mut(handle)?.get_proc_address(name) as usize;
        if address == 0 {
            Err(BackendError::Unsupported("GL function not available"))
        } else {
            Ok(address)
        }
    }

    fn window_surface(&self, handle: NativeHandle) -> BackendResult<WindowSurface> {
        let window = self.window(handle)?;
        let unavailable = |err: raw_window_handle::HandleError| {
            BackendError::SurfaceUnavailable(err.to_string())
        };
        let raw_window = window.window_handle().map_err(unavailable)?.as_raw();
        let raw_display = window.display_handle().map_err(unavailable)?.as_raw();
        let (width, height) = window.get_framebuffer_size();
        Ok(WindowSurface {
            window: raw_window,
            display: raw_display,
            framebuffer: Size::new(width, height),
        })
    }

    fn vulkan_supported(&self) -> bool {
        self.glfw.as_ref().is_some_and(glfw::Glfw::vulkan_supported)
    }

    fn required_instance_extensions(&self) -> BackendResult<Vec<String>> {
        self.glfw()?
            .get_required_instance_extensions()
            .ok_or_else(|| BackendError::Vulkan("no Vulkan loader found".to_string()))
    }

    fn instance_proc_address(&self, instance: vk::Instance, name: &str) -> BackendResult<usize> {
        let address = self.glfw()?.get_instance_proc_address_raw(instance, name) as usize;
        if address == 0 {
            Err(BackendError::Vulkan(format!("{name} not available")))
        } else {
            Ok(address)
        }
    }

    fn physical_device_presentation_support(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> BackendResult<bool> {
        Ok(self
            .glfw()?
            .get_physical_device_presentation_support_raw(instance, device, queue_family))
    }

    fn create_surface(
        &mut self,
        handle: NativeHandle,
        instance: vk::Instance,
    ) -> BackendResult<vk::SurfaceKHR> {
        let window = self.window(handle)?;
        let mut surface = vk::SurfaceKHR::null();
        let result = window.create_window_surface(instance, std::ptr::null(), &mut surface);
        if result == vk::Result::SUCCESS {
            log::debug!("Vulkan surface created for {handle}");
            Ok(surface)
        } else {
            Err(BackendError::Vulkan(format!("surface creation failed: {result:?}")))
        }
    }
}
