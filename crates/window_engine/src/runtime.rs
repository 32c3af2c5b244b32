//! Runtime context and main loop
//!
//! [`Runtime`] owns everything that is process-wide in a windowing
//! program: the native backend, the handle registry, the event bus, the
//! animation-frame table, the running flag and the counted-window tally.
//! It is single-threaded; clones share the same context.
//!
//! One frame tick:
//!
//! 1. take a timestamp
//! 2. run the pending animation frames as one batch, awaiting each
//! 3. await the frame callback
//! 4. pump native events and dispatch what they imply
//!
//! The loop stops when the running flag drops, which happens when the last
//! counted window closes or [`Runtime::exit`] is called. Teardown then
//! terminates the native library and, if configured, exits the process
//! with code 0.

use ash::vk;
use futures::future::FutureExt;
use futures::task::{LocalSpawn, LocalSpawnExt, SpawnError};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use thiserror::Error;

use crate::backend::{
    BackendError, HeadlessBackend, NativeBackend, NativeEvent, NativeHandle, WindowHints,
};
use crate::config::{ConfigError, RuntimeConfig};
use crate::events::bus::panic_message;
use crate::events::synthesis::Synthesizer;
use crate::events::{Event, EventBus, EventData, EventError, EventKind, ListenerId, ListenerResult};
use crate::foundation::time::FrameClock;
use crate::registry::WindowRegistry;
use crate::scheduler::{yield_now, AnimationFrames, FrameRequestId, MainloopHandle};
use crate::window::{Window, WindowError, WindowOptions, WindowResult};

/// Top-level errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Native layer failure
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Window failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Event model failure
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// Configuration failure
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The executor refused the chained main loop
    #[error("Failed to spawn main loop: {0}")]
    Spawn(#[from] SpawnError),
}

pub(crate) struct RuntimeShared {
    config: RuntimeConfig,
    pub(crate) backend: RefCell<Box<dyn NativeBackend>>,
    pub(crate) registry: RefCell<WindowRegistry>,
    pub(crate) bus: EventBus,
    frames: RefCell<AnimationFrames>,
    synthesizer: Synthesizer,
    clock: RefCell<FrameClock>,
    redraws: RefCell<Vec<Window>>,
    counted: Cell<usize>,
    running: Cell<bool>,
    shut_down: Cell<bool>,
    torn_down: Cell<bool>,
}

impl RuntimeShared {
    pub(crate) fn now_ms(&self) -> f64 {
        self.clock.borrow().now_ms()
    }

    pub(crate) fn queue_redraw(&self, window: &Window) {
        let mut redraws = self.redraws.borrow_mut();
        if !redraws.contains(window) {
            redraws.push(window.clone());
        }
    }

    pub(crate) fn release_counted_window(&self) {
        let remaining = self.counted.get().saturating_sub(1);
        self.counted.set(remaining);
        log::debug!("{remaining} counted window(s) remain");
        if remaining == 0 {
            self.shutdown();
        }
    }

    fn create_window(self: &Rc<Self>, options: &WindowOptions) -> WindowResult<Window> {
        options.validate()?;
        if !self.running.get() {
            return Err(WindowError::RuntimeStopped);
        }

        let hints = WindowHints::from(options);
        let handle = self
            .backend
            .borrow_mut()
            .create_window(&hints)
            .map_err(WindowError::Creation)?;

        let window = Window::new(handle, self, options);
        let registered = self.registry.borrow_mut().register(handle, window.clone());
        if let Err(err) = registered {
            self.backend.borrow_mut().destroy_window(handle);
            window.mark_closed();
            return Err(err);
        }
        if let Err(err) = self.apply_initial_state(&window, options) {
            self.registry.borrow_mut().unregister(handle);
            self.backend.borrow_mut().destroy_window(handle);
            window.mark_closed();
            return Err(err);
        }

        if window.is_counted() {
            self.counted.set(self.counted.get() + 1);
        }
        window.mark_live();
        log::debug!("Window {} live as {} ({:?})", window.id(), handle, options.title);
        Ok(window)
    }

    fn apply_initial_state(&self, window: &Window, options: &WindowOptions) -> WindowResult<()> {
        let handle = window.native_handle_unchecked();
        let mut backend = self.backend.borrow_mut();

        if options.client_api.has_context() {
            backend.make_context_current(handle)?;
            if options.vsync {
                backend.set_swap_interval(1)?;
            }
        }
        if options.minimized {
            backend.iconify(handle)?;
        }
        if options.visible {
            backend.show(handle)?;
        }
        if options.focused {
            backend.focus(handle)?;
        }

        let position = backend.position(handle)?;
        window.input_state().set_window_position(position);
        Ok(())
    }

    fn poll_events(&self, wait: bool) {
        // A queued redraw is already something to deliver
        let wait = wait && self.redraws.borrow().is_empty();
        let natives = self.backend.borrow_mut().pump_events(wait);
        for native in &natives {
            self.deliver(native);
        }
        self.flush_redraws();
    }

    fn deliver(&self, native: &NativeEvent) {
        let Some(window) = self.registry.borrow().resolve(native.handle) else {
            log::trace!("Ignoring {:?} for unregistered handle {}", native.kind, native.handle);
            return;
        };

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.dispatch_native(&window, native)));
        if let Err(payload) = outcome {
            log::error!(
                "Handling {:?} for window {} panicked: {}",
                native.kind,
                window.id(),
                panic_message(&*payload)
            );
        }
    }

    fn dispatch_native(&self, window: &Window, native: &NativeEvent) {
        let events = {
            let mut input = window.input_state();
            self.synthesizer.synthesize(window, &mut input, native)
        };

        for event in events {
            if window.is_closed() {
                break;
            }
            let proceed = self.bus.dispatch(&event);
            if event.kind() == EventKind::Close {
                self.finish_close_request(window, proceed);
            }
        }
    }

    fn finish_close_request(&self, window: &Window, proceed: bool) {
        if proceed {
            if let Err(err) = window.close() {
                log::warn!("Closing window {} failed: {err}", window.id());
            }
            return;
        }

        log::debug!("Close of window {} cancelled", window.id());
        if let Some(handle) = window.native_handle() {
            if let Err(err) = self.backend.borrow_mut().set_should_close(handle, false) {
                log::warn!("Could not reset close flag of {handle}: {err}");
            }
        }
    }

    fn flush_redraws(&self) {
        let pending = std::mem::take(&mut *self.redraws.borrow_mut());
        for window in pending.iter().filter(|window| !window.is_closed()) {
            let event = Event::for_window(
                EventKind::RedrawRequested,
                window,
                self.now_ms(),
                EventData::None,
            );
            self.bus.dispatch(&event);
        }
    }

    /// Stop the event loop: runs once, however often it is reached
    fn shutdown(&self) {
        if self.shut_down.replace(true) {
            return;
        }
        self.running.set(false);
        log::info!("Event loop stopping");

        self.bus.dispatch(&Event::unload(self.now_ms()));

        let remaining = self.registry.borrow_mut().clear();
        for window in &remaining {
            window.mark_closed();
            let closed =
                Event::for_window(EventKind::Closed, window, self.now_ms(), EventData::None);
            self.bus.dispatch(&closed);
        }
        self.redraws.borrow_mut().clear();
        self.terminate_native();
    }

    fn terminate_native(&self) {
        let mut backend = self.backend.borrow_mut();
        if !backend.is_terminated() {
            backend.terminate();
            log::info!("Native library terminated");
        }
    }

    async fn tick<F, Fut>(&self, frame: &mut F, wait: bool)
    where
        F: FnMut(f64) -> Fut,
        Fut: Future<Output = ()>,
    {
        let now = self.clock.borrow_mut().begin_frame();

        let batch = self.frames.borrow_mut().take_batch();
        for callback in batch {
            callback(now).await;
        }

        frame(now).await;
        self.poll_events(wait);
    }

    fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        self.terminate_native();
        log::info!(
            "Main loop finished after {} frame(s)",
            self.clock.borrow().frame_count()
        );
        if self.config.exit_process {
            std::process::exit(0);
        }
    }
}

async fn drive<F, Fut>(shared: Rc<RuntimeShared>, mut frame: F, wait: bool, chained: bool)
where
    F: FnMut(f64) -> Fut,
    Fut: Future<Output = ()>,
{
    log::info!("Main loop started ({})", if chained { "chained" } else { "blocking" });
    while shared.running.get() {
        shared.tick(&mut frame, wait).await;
        if chained {
            yield_now().await;
        }
    }
    shared.teardown();
}

/// Shared windowing context
#[derive(Clone)]
pub struct Runtime {
    shared: Rc<RuntimeShared>,
}

impl Runtime {
    /// Create a runtime on top of a backend
    pub fn new(backend: impl NativeBackend + 'static, config: RuntimeConfig) -> Self {
        log::info!("Runtime created: {config:?}");
        Self {
            shared: Rc::new(RuntimeShared {
                synthesizer: Synthesizer::new(&config),
                config,
                backend: RefCell::new(Box::new(backend)),
                registry: RefCell::new(WindowRegistry::new()),
                bus: EventBus::new(),
                frames: RefCell::new(AnimationFrames::new()),
                clock: RefCell::new(FrameClock::new()),
                redraws: RefCell::new(Vec::new()),
                counted: Cell::new(0),
                running: Cell::new(true),
                shut_down: Cell::new(false),
                torn_down: Cell::new(false),
            }),
        }
    }

    /// In-memory runtime plus a handle for driving its backend
    ///
    /// Headless runtimes never exit the process.
    pub fn headless(config: RuntimeConfig) -> (Self, HeadlessBackend) {
        let backend = HeadlessBackend::new();
        let config = RuntimeConfig { exit_process: false, ..config };
        (Self::new(backend.clone(), config), backend)
    }

    /// Runtime on the GLFW window system
    #[cfg(feature = "glfw-backend")]
    pub fn glfw(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let backend = crate::backend::GlfwBackend::new()?;
        Ok(Self::new(backend, config))
    }

    /// Settings the runtime was created with
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Create, register and show a window
    ///
    /// Fails without leaving anything registered when the options are
    /// invalid or the native window cannot be created.
    pub fn create_window(&self, options: WindowOptions) -> WindowResult<Window> {
        self.shared.create_window(&options)
    }

    /// Live window for a native handle
    pub fn window(&self, handle: NativeHandle) -> Option<Window> {
        self.shared.registry.borrow().resolve(handle)
    }

    /// All live windows
    pub fn windows(&self) -> Vec<Window> {
        let registry = self.shared.registry.borrow();
        registry.handles().into_iter().filter_map(|handle| registry.resolve(handle)).collect()
    }

    /// Counted windows still open
    pub fn counted_windows(&self) -> usize {
        self.shared.counted.get()
    }

    /// Event bus shared by every window
    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    /// Subscribe to one kind
    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) -> ListenerResult + 'static,
    {
        self.shared.bus.add_listener(kind, listener)
    }

    /// Subscribe by kind name
    pub fn add_event_listener<F>(&self, name: &str, listener: F) -> Result<ListenerId, EventError>
    where
        F: Fn(&Event) -> ListenerResult + 'static,
    {
        self.shared.bus.add_event_listener(name, listener)
    }

    /// Unsubscribe
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.bus.remove_listener(id)
    }

    /// Run `callback` at the start of the next tick
    pub fn request_animation_frame<F>(&self, callback: F) -> FrameRequestId
    where
        F: FnOnce(f64) + 'static,
    {
        self.request_animation_frame_async(move |now| {
            callback(now);
            std::future::ready(())
        })
    }

    /// Run an asynchronous `callback` at the start of the next tick
    ///
    /// The tick awaits it before running later callbacks.
    pub fn request_animation_frame_async<F, Fut>(&self, callback: F) -> FrameRequestId
    where
        F: FnOnce(f64) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.shared
            .frames
            .borrow_mut()
            .request(Box::new(move |now| callback(now).boxed_local()))
    }

    /// Cancel a pending frame request
    pub fn cancel_animation_frame(&self, id: FrameRequestId) -> bool {
        self.shared.frames.borrow_mut().cancel(id)
    }

    /// Frame requests waiting for the next tick
    pub fn pending_animation_frames(&self) -> usize {
        self.shared.frames.borrow().len()
    }

    /// Pump native events once and dispatch what they imply
    ///
    /// With `wait` the call blocks until at least one native event arrives,
    /// unless a redraw request is already queued.
    pub fn poll_events(&self, wait: bool) {
        self.shared.poll_events(wait);
    }

    /// Whether the native layer can create Vulkan surfaces
    pub fn vulkan_supported(&self) -> bool {
        self.shared.backend.borrow().vulkan_supported()
    }

    /// Instance extensions needed for [`Window::create_surface`]
    pub fn required_instance_extensions(&self) -> Result<Vec<String>, RuntimeError> {
        Ok(self.shared.backend.borrow().required_instance_extensions()?)
    }

    /// Address of a Vulkan function, resolved through the native loader
    ///
    /// A null `instance` resolves the global functions such as
    /// `vkCreateInstance`.
    pub fn instance_proc_address(
        &self,
        instance: vk::Instance,
        name: &str,
    ) -> Result<usize, RuntimeError> {
        Ok(self.shared.backend.borrow().instance_proc_address(instance, name)?)
    }

    /// Whether a queue family can present to windows of this runtime
    pub fn physical_device_presentation_support(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<bool, RuntimeError> {
        let backend = self.shared.backend.borrow();
        Ok(backend.physical_device_presentation_support(instance, device, queue_family)?)
    }

    /// Whether the event loop is still running
    pub fn is_running(&self) -> bool {
        self.shared.running.get()
    }

    /// Whether main-loop teardown has run
    pub fn is_torn_down(&self) -> bool {
        self.shared.torn_down.get()
    }

    /// Frames started so far
    pub fn frame_count(&self) -> u64 {
        self.shared.clock.borrow().frame_count()
    }

    /// Stop the event loop
    ///
    /// Dispatches `unload`, then `closed` for every window still open, and
    /// terminates the native library. Only the first call has an effect.
    pub fn exit(&self) {
        self.shared.shutdown();
    }

    /// Blocking main loop
    ///
    /// Ticks until the running flag drops, then tears down. `wait` blocks
    /// each tick until a native event arrives, for interactive programs
    /// that redraw only in response to input.
    pub fn mainloop<F, Fut>(&self, frame: F, wait: bool)
    where
        F: FnMut(f64) -> Fut,
        Fut: Future<Output = ()>,
    {
        pollster::block_on(drive(Rc::clone(&self.shared), frame, wait, false));
    }

    /// Blocking main loop with a synchronous frame callback
    pub fn run<F>(&self, mut frame: F, wait: bool)
    where
        F: FnMut(f64),
    {
        self.mainloop(
            move |now| {
                frame(now);
                std::future::ready(())
            },
            wait,
        );
    }

    /// Chained main loop
    ///
    /// Every tick yields to the executor, so other tasks on `spawner`
    /// interleave with frames. The returned handle resolves once the loop
    /// has stopped and torn down.
    pub fn spawn_mainloop<S, F, Fut>(
        &self,
        spawner: &S,
        frame: F,
        wait: bool,
    ) -> Result<MainloopHandle, RuntimeError>
    where
        S: LocalSpawn,
        F: FnMut(f64) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let handle =
            spawner.spawn_local_with_handle(drive(Rc::clone(&self.shared), frame, wait, true))?;
        Ok(MainloopHandle::new(handle))
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.shared.config)
            .field("windows", &self.shared.registry.borrow().len())
            .field("counted", &self.shared.counted.get())
            .field("running", &self.shared.running.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NativeEventKind, NativeHandle};
    use crate::window::{ClientApi, GlVersion, LifecycleState};

    fn runtime() -> (Runtime, HeadlessBackend) {
        Runtime::headless(RuntimeConfig::default())
    }

    #[test]
    fn test_headless_never_exits_process() {
        let (runtime, _) = runtime();
        assert!(!runtime.config().exit_process);
    }

    #[test]
    fn test_create_window_applies_options() {
        let (runtime, backend) = runtime();
        let options = WindowOptions { focused: true, ..WindowOptions::new("Editor", 640, 480) };

        let window = runtime.create_window(options).unwrap();
        let handle = window.native_handle().unwrap();
        let native = backend.window(handle).unwrap();

        assert_eq!(window.state(), LifecycleState::Live);
        assert!(native.visible);
        assert!(native.focused);
        assert_eq!(native.title, "Editor");
        assert_eq!(runtime.counted_windows(), 1);
        assert_eq!(runtime.window(handle), Some(window));
    }

    #[test]
    fn test_hidden_window_stays_hidden() {
        let (runtime, backend) = runtime();
        let options = WindowOptions { visible: false, ..WindowOptions::default() };
        let window = runtime.create_window(options).unwrap();

        assert!(!backend.window(window.native_handle().unwrap()).unwrap().visible);
        assert!(!window.is_visible().unwrap());
    }

    #[test]
    fn test_gl_window_gets_context_and_vsync() {
        let (runtime, backend) = runtime();
        let options = WindowOptions {
            client_api: ClientApi::OpenGl { version: GlVersion::new(3, 3), es: false },
            ..WindowOptions::default()
        };
        let window = runtime.create_window(options).unwrap();

        assert_eq!(backend.current_context(), window.native_handle());
        assert_eq!(backend.swap_interval(), 1);
    }

    #[test]
    fn test_creation_failure_leaves_nothing_registered() {
        let (runtime, backend) = runtime();
        backend.fail_next_create("no display");

        let result = runtime.create_window(WindowOptions::default());

        assert!(matches!(result, Err(WindowError::Creation(BackendError::CreationFailed(_)))));
        assert!(runtime.windows().is_empty());
        assert_eq!(runtime.counted_windows(), 0);
        assert!(runtime.is_running());
    }

    #[test]
    fn test_invalid_options_rejected_before_native_call() {
        let (runtime, backend) = runtime();
        let result = runtime.create_window(WindowOptions::new("bad", 0, 600));

        assert!(matches!(result, Err(WindowError::InvalidOptions(_))));
        assert_eq!(backend.window_count(), 0);
    }

    #[test]
    fn test_uncounted_window_does_not_stop_loop() {
        let (runtime, _) = runtime();
        let tool = runtime
            .create_window(WindowOptions {
                auto_exit_event_loop: false,
                ..WindowOptions::default()
            })
            .unwrap();
        let main = runtime.create_window(WindowOptions::default()).unwrap();
        assert_eq!(runtime.counted_windows(), 1);

        tool.close().unwrap();
        assert!(runtime.is_running());
        assert_eq!(runtime.counted_windows(), 1);

        main.close().unwrap();
        assert!(!runtime.is_running());
    }

    #[test]
    fn test_exit_closes_remaining_windows() {
        let (runtime, backend) = runtime();
        let window = runtime.create_window(WindowOptions::default()).unwrap();

        runtime.exit();
        runtime.exit();

        assert!(!runtime.is_running());
        assert!(window.is_closed());
        assert!(runtime.windows().is_empty());
        assert_eq!(backend.terminate_calls(), 1);
        assert!(matches!(
            runtime.create_window(WindowOptions::default()),
            Err(WindowError::RuntimeStopped)
        ));
    }

    #[test]
    fn test_redraw_requests_are_delivered_once() {
        let (runtime, _) = runtime();
        let window = runtime.create_window(WindowOptions::default()).unwrap();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        runtime.add_listener(EventKind::RedrawRequested, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        window.request_redraw().unwrap();
        window.request_redraw().unwrap();
        runtime.poll_events(false);
        runtime.poll_events(false);

        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_pending_redraw_does_not_block_pump() {
        let (runtime, backend) = runtime();
        let window = runtime.create_window(WindowOptions::default()).unwrap();

        window.request_redraw().unwrap();
        runtime.poll_events(true);
        runtime.poll_events(true);

        assert_eq!(backend.pump_waits(), vec![false, true]);
    }

    #[test]
    fn test_headless_runtime_has_no_vulkan() {
        let (runtime, _) = runtime();
        let window = runtime.create_window(WindowOptions::default()).unwrap();

        assert!(!runtime.vulkan_supported());
        assert!(matches!(
            runtime.required_instance_extensions(),
            Err(RuntimeError::Backend(BackendError::Unsupported(_)))
        ));
        assert!(runtime.instance_proc_address(vk::Instance::null(), "vkCreateInstance").is_err());
        assert!(matches!(
            window.create_surface(vk::Instance::null()),
            Err(WindowError::Backend(BackendError::Unsupported(_)))
        ));

        window.close().unwrap();
        assert_eq!(
            window.create_surface(vk::Instance::null()),
            Err(WindowError::Closed(window.id()))
        );
    }

    #[test]
    fn test_listener_panic_does_not_stop_pump() {
        let (runtime, backend) = runtime();
        let window = runtime.create_window(WindowOptions::default()).unwrap();
        let handle = window.native_handle().unwrap();
        let seen = Rc::new(Cell::new(0));

        runtime.add_listener(EventKind::Refresh, |_| panic!("boom"));
        let counter = Rc::clone(&seen);
        runtime.add_listener(EventKind::Focus, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        backend.push_event(handle, NativeEventKind::Refresh);
        backend.push_event(handle, NativeEventKind::Focus(true));
        runtime.poll_events(false);

        assert_eq!(seen.get(), 1);
        assert!(runtime.is_running());
    }

    #[test]
    fn test_stale_handle_is_ignored() {
        let (runtime, backend) = runtime();
        let _window = runtime.create_window(WindowOptions::default()).unwrap();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        runtime.add_listener(EventKind::Resize, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        let stale = NativeHandle::from_raw(0xbad0);
        backend.push_event(stale, NativeEventKind::Size { width: 1, height: 1 });
        runtime.poll_events(false);

        assert_eq!(hits.get(), 0);
    }
}
