//! Native callback to event translation
//!
//! [`Synthesizer::synthesize`] turns one [`NativeEvent`] into the events it
//! implies and advances the window's [`InputState`]. Derived events:
//!
//! - every mouse down/up/move is followed by its pointer alias
//! - an up whose button was recorded down adds `click` (primary) or
//!   `contextmenu` (any other button); an unmatched up adds nothing
//! - a primary click within the threshold of the previous one adds
//!   `dblclick` and forgets the previous click, so a third quick click
//!   starts a new pair
//!
//! Synthesis never calls into the native layer.

use crate::backend::{Modifiers, NativeAction, NativeEvent, NativeEventKind};
use crate::config::RuntimeConfig;
use crate::events::keys::{self, KeyPlatform};
use crate::events::{Event, EventData, EventKind, KeyboardEventData, MouseEventData};
use crate::window::{Position, Size, Window};

const PRIMARY_BUTTON: i32 = 0;

/// Per-window tracking that derived events depend on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    cursor_x: f64,
    cursor_y: f64,
    window_position: Position,
    last_click_ms: Option<f64>,
    pressed: u32,
}

impl InputState {
    /// Last recorded cursor position in content coordinates
    pub const fn cursor(&self) -> (f64, f64) {
        (self.cursor_x, self.cursor_y)
    }

    /// Bitmask of buttons recorded down
    pub const fn pressed_buttons(&self) -> u32 {
        self.pressed
    }

    /// Timestamp of a primary click still waiting for its pair
    pub const fn pending_click(&self) -> Option<f64> {
        self.last_click_ms
    }

    pub(crate) fn set_window_position(&mut self, position: Position) {
        self.window_position = position;
    }

    fn mouse_data(&self, button: i32, modifiers: Modifiers) -> MouseEventData {
        MouseEventData {
            button,
            buttons: self.pressed,
            client_x: self.cursor_x,
            client_y: self.cursor_y,
            screen_x: self.cursor_x + f64::from(self.window_position.x),
            screen_y: self.cursor_y + f64::from(self.window_position.y),
            movement_x: 0.0,
            movement_y: 0.0,
            modifiers,
        }
    }
}

fn button_bit(button: i32) -> u32 {
    u32::try_from(button)
        .ok()
        .and_then(|shift| 1u32.checked_shl(shift))
        .unwrap_or(0)
}

/// Stateless translator configured from [`RuntimeConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synthesizer {
    double_click_threshold_ms: f64,
    pointer_events: bool,
    key_platform: KeyPlatform,
}

impl Synthesizer {
    /// Translator for the running platform
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            double_click_threshold_ms: config.double_click_threshold_ms,
            pointer_events: config.pointer_events,
            key_platform: KeyPlatform::current(),
        }
    }

    /// Use a specific physical key table
    #[must_use]
    pub const fn with_key_platform(mut self, platform: KeyPlatform) -> Self {
        self.key_platform = platform;
        self
    }

    /// Events implied by one native callback, in dispatch order
    pub fn synthesize(
        &self,
        window: &Window,
        input: &mut InputState,
        native: &NativeEvent,
    ) -> Vec<Event> {
        let time = native.time * 1000.0;
        let event = |kind, data| Event::for_window(kind, window, time, data);

        match &native.kind {
            NativeEventKind::CursorPos { x, y } => {
                let (movement_x, movement_y) = (x - input.cursor_x, y - input.cursor_y);
                input.cursor_x = *x;
                input.cursor_y = *y;
                let data = MouseEventData {
                    movement_x,
                    movement_y,
                    ..input.mouse_data(-1, Modifiers::empty())
                };
                self.with_pointer_alias(
                    event(EventKind::MouseMove, EventData::Mouse(data)),
                    EventKind::PointerMove,
                    |kind| event(kind, EventData::Mouse(data)),
                )
            }
            NativeEventKind::CursorEnter { entered } => {
                let kind = if *entered { EventKind::MouseEnter } else { EventKind::MouseLeave };
                vec![event(kind, EventData::Mouse(input.mouse_data(-1, Modifiers::empty())))]
            }
            NativeEventKind::MouseButton { button, action, mods } => {
                self.mouse_button(input, *button, *action, *mods, &event)
            }
            NativeEventKind::Key { key, scancode, action, mods } => {
                let kind = match action {
                    NativeAction::Release => EventKind::KeyUp,
                    NativeAction::Press | NativeAction::Repeat => EventKind::KeyDown,
                };
                let data = KeyboardEventData {
                    code: keys::physical_code(*key, *scancode, self.key_platform),
                    key: keys::logical_key(*key, *mods),
                    key_code: *key,
                    location: keys::key_location(*key),
                    modifiers: *mods,
                    repeat: *action == NativeAction::Repeat,
                    is_composing: false,
                };
                vec![event(kind, EventData::Keyboard(data))]
            }
            NativeEventKind::Char { codepoint } => {
                vec![event(EventKind::Input, EventData::Input(codepoint.to_string()))]
            }
            NativeEventKind::Scroll { x, y } => vec![event(
                EventKind::Scroll,
                EventData::Scroll { delta_x: *x, delta_y: *y },
            )],
            NativeEventKind::Pos { x, y } => {
                let position = Position::new(*x, *y);
                input.set_window_position(position);
                vec![event(EventKind::Move, EventData::Position(position))]
            }
            NativeEventKind::Size { width, height } => {
                vec![event(EventKind::Resize, EventData::Size(Size::new(*width, *height)))]
            }
            NativeEventKind::FramebufferSize { width, height } => vec![event(
                EventKind::FramebufferSize,
                EventData::Size(Size::new(*width, *height)),
            )],
            NativeEventKind::Close => vec![event(EventKind::Close, EventData::None)],
            NativeEventKind::Refresh => vec![event(EventKind::Refresh, EventData::None)],
            NativeEventKind::Focus(focused) => {
                vec![event(EventKind::Focus, EventData::Toggle(*focused))]
            }
            NativeEventKind::Iconify(iconified) => {
                vec![event(EventKind::Minimize, EventData::Toggle(*iconified))]
            }
            NativeEventKind::Maximize(maximized) => {
                vec![event(EventKind::Maximize, EventData::Toggle(*maximized))]
            }
            NativeEventKind::Drop(paths) => {
                vec![event(EventKind::Drop, EventData::Drop(paths.clone()))]
            }
            NativeEventKind::ContentScale { x, y } => vec![event(
                EventKind::ContentScale,
                EventData::ContentScale(crate::window::ContentScale { x: *x, y: *y }),
            )],
        }
    }

    fn mouse_button(
        &self,
        input: &mut InputState,
        button: i32,
        action: NativeAction,
        mods: Modifiers,
        event: &impl Fn(EventKind, EventData) -> Event,
    ) -> Vec<Event> {
        let bit = button_bit(button);

        if action != NativeAction::Release {
            input.pressed |= bit;
            let data = input.mouse_data(button, mods);
            return self.with_pointer_alias(
                event(EventKind::MouseDown, EventData::Mouse(data)),
                EventKind::PointerDown,
                |kind| event(kind, EventData::Mouse(data)),
            );
        }

        let was_down = bit != 0 && input.pressed & bit != 0;
        input.pressed &= !bit;
        let data = input.mouse_data(button, mods);
        let mut events = self.with_pointer_alias(
            event(EventKind::MouseUp, EventData::Mouse(data)),
            EventKind::PointerUp,
            |kind| event(kind, EventData::Mouse(data)),
        );

        if !was_down {
            return events;
        }

        if button != PRIMARY_BUTTON {
            events.push(event(EventKind::ContextMenu, EventData::Mouse(data)));
            return events;
        }

        let click = event(EventKind::Click, EventData::Mouse(data));
        let now = click.timestamp();
        events.push(click);

        match input.last_click_ms {
            Some(last) if (0.0..self.double_click_threshold_ms).contains(&(now - last)) => {
                events.push(event(EventKind::DblClick, EventData::Mouse(data)));
                input.last_click_ms = None;
            }
            _ => input.last_click_ms = Some(now),
        }
        events
    }

    fn with_pointer_alias(
        &self,
        mouse: Event,
        alias: EventKind,
        build: impl FnOnce(EventKind) -> Event,
    ) -> Vec<Event> {
        if self.pointer_events {
            vec![mouse, build(alias)]
        } else {
            vec![mouse]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessBackend, NativeHandle};
    use crate::runtime::Runtime;
    use crate::window::WindowOptions;
    use approx::assert_relative_eq;

    struct Fixture {
        _runtime: Runtime,
        window: Window,
        input: InputState,
        synth: Synthesizer,
    }

    impl Fixture {
        fn new(config: &RuntimeConfig) -> Self {
            let runtime = Runtime::new(HeadlessBackend::new(), config.clone());
            let window = runtime.create_window(WindowOptions::default()).unwrap();
            Self {
                _runtime: runtime,
                window,
                input: InputState::default(),
                synth: Synthesizer::new(config).with_key_platform(KeyPlatform::Generic),
            }
        }

        fn feed(&mut self, time_ms: f64, kind: NativeEventKind) -> Vec<EventKind> {
            self.feed_events(time_ms, kind).iter().map(Event::kind).collect()
        }

        fn feed_events(&mut self, time_ms: f64, kind: NativeEventKind) -> Vec<Event> {
            let native = NativeEvent {
                handle: NativeHandle::from_raw(0x10),
                time: time_ms / 1000.0,
                kind,
            };
            self.synth.synthesize(&self.window, &mut self.input, &native)
        }

        fn button(&mut self, time_ms: f64, button: i32, action: NativeAction) -> Vec<EventKind> {
            self.feed(
                time_ms,
                NativeEventKind::MouseButton { button, action, mods: Modifiers::empty() },
            )
        }

        fn click(&mut self, time_ms: f64) -> Vec<EventKind> {
            self.button(time_ms, 0, NativeAction::Press);
            self.button(time_ms, 0, NativeAction::Release)
        }
    }

    fn fixture() -> Fixture {
        Fixture::new(&RuntimeConfig::embedded())
    }

    #[test]
    fn test_move_emits_pointer_alias_with_same_payload() {
        let mut fx = fixture();
        let events = fx.feed_events(0.0, NativeEventKind::CursorPos { x: 10.0, y: 5.0 });

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::MouseMove);
        assert_eq!(events[1].kind(), EventKind::PointerMove);
        assert_eq!(events[0].data(), events[1].data());
        assert!(events[0].matches(&fx.window));
    }

    #[test]
    fn test_movement_is_delta_from_previous_position() {
        let mut fx = fixture();
        fx.feed(0.0, NativeEventKind::CursorPos { x: 10.0, y: 20.0 });
        let events = fx.feed_events(16.0, NativeEventKind::CursorPos { x: 13.5, y: 18.0 });
        let data = events[0].mouse().unwrap();

        assert_relative_eq!(data.movement_x, 3.5);
        assert_relative_eq!(data.movement_y, -2.0);
        assert_relative_eq!(data.client_x, 13.5);

        let events = fx.feed_events(32.0, NativeEventKind::CursorPos { x: 13.5, y: 18.0 });
        let data = events[0].mouse().unwrap();
        assert_relative_eq!(data.movement_x, 0.0);
        assert_relative_eq!(data.movement_y, 0.0);
    }

    #[test]
    fn test_screen_coordinates_include_window_position() {
        let mut fx = fixture();
        fx.feed(0.0, NativeEventKind::Pos { x: 100, y: 50 });
        let events = fx.feed_events(1.0, NativeEventKind::CursorPos { x: 5.0, y: 6.0 });
        let data = events[0].mouse().unwrap();

        assert_relative_eq!(data.screen_x, 105.0);
        assert_relative_eq!(data.screen_y, 56.0);
    }

    #[test]
    fn test_pointer_aliases_can_be_disabled() {
        let config = RuntimeConfig { pointer_events: false, ..RuntimeConfig::embedded() };
        let mut fx = Fixture::new(&config);

        assert_eq!(
            fx.feed(0.0, NativeEventKind::CursorPos { x: 1.0, y: 1.0 }),
            vec![EventKind::MouseMove]
        );
        assert_eq!(fx.button(0.0, 0, NativeAction::Press), vec![EventKind::MouseDown]);
    }

    #[test]
    fn test_click_requires_matching_down() {
        let mut fx = fixture();

        assert_eq!(
            fx.button(0.0, 0, NativeAction::Release),
            vec![EventKind::MouseUp, EventKind::PointerUp]
        );
        assert_eq!(
            fx.button(10.0, 0, NativeAction::Press),
            vec![EventKind::MouseDown, EventKind::PointerDown]
        );
        assert_eq!(
            fx.button(20.0, 0, NativeAction::Release),
            vec![EventKind::MouseUp, EventKind::PointerUp, EventKind::Click]
        );
        assert_eq!(
            fx.button(30.0, 0, NativeAction::Release),
            vec![EventKind::MouseUp, EventKind::PointerUp]
        );
    }

    #[test]
    fn test_secondary_button_emits_contextmenu() {
        let mut fx = fixture();
        fx.button(0.0, 1, NativeAction::Press);
        assert_eq!(
            fx.button(5.0, 1, NativeAction::Release),
            vec![EventKind::MouseUp, EventKind::PointerUp, EventKind::ContextMenu]
        );
        assert_eq!(fx.input.pending_click(), None);
    }

    #[test]
    fn test_held_buttons_mask() {
        let mut fx = fixture();
        fx.button(0.0, 0, NativeAction::Press);
        let events = fx.feed_events(1.0, NativeEventKind::MouseButton {
            button: 2,
            action: NativeAction::Press,
            mods: Modifiers::CONTROL,
        });
        let data = events[0].mouse().unwrap();

        assert_eq!(data.buttons, 0b101);
        assert_eq!(data.button, 2);
        assert!(data.ctrl_key());

        fx.button(2.0, 0, NativeAction::Release);
        assert_eq!(fx.input.pressed_buttons(), 0b100);
    }

    #[test]
    fn test_double_click_pairs_then_resets() {
        let mut fx = fixture();

        assert_eq!(fx.click(0.0).last(), Some(&EventKind::Click));
        assert_eq!(
            fx.click(100.0),
            vec![EventKind::MouseUp, EventKind::PointerUp, EventKind::Click, EventKind::DblClick]
        );
        assert_eq!(
            fx.click(200.0),
            vec![EventKind::MouseUp, EventKind::PointerUp, EventKind::Click]
        );
        assert_eq!(fx.click(300.0).last(), Some(&EventKind::DblClick));
    }

    #[test]
    fn test_slow_clicks_do_not_pair() {
        let mut fx = fixture();
        fx.click(0.0);
        assert_eq!(fx.click(500.0).last(), Some(&EventKind::Click));
        assert_eq!(fx.input.pending_click(), Some(500.0));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let config = RuntimeConfig { double_click_threshold_ms: 50.0, ..RuntimeConfig::embedded() };
        let mut fx = Fixture::new(&config);
        fx.click(0.0);
        assert_eq!(fx.click(60.0).last(), Some(&EventKind::Click));
        assert_eq!(fx.click(100.0).last(), Some(&EventKind::DblClick));
    }

    #[test]
    fn test_enter_leave_use_last_position() {
        let mut fx = fixture();
        fx.feed(0.0, NativeEventKind::CursorPos { x: 4.0, y: 8.0 });
        let events = fx.feed_events(1.0, NativeEventKind::CursorEnter { entered: false });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::MouseLeave);
        let data = events[0].mouse().unwrap();
        assert_relative_eq!(data.client_x, 4.0);
        assert_relative_eq!(data.movement_x, 0.0);
    }

    #[test]
    fn test_key_events() {
        let mut fx = fixture();
        let down = fx.feed_events(0.0, NativeEventKind::Key {
            key: 65,
            scancode: 38,
            action: NativeAction::Press,
            mods: Modifiers::SHIFT,
        });
        let repeat = fx.feed_events(30.0, NativeEventKind::Key {
            key: 65,
            scancode: 38,
            action: NativeAction::Repeat,
            mods: Modifiers::empty(),
        });
        let up = fx.feed_events(60.0, NativeEventKind::Key {
            key: 65,
            scancode: 38,
            action: NativeAction::Release,
            mods: Modifiers::empty(),
        });

        let data = down[0].keyboard().unwrap();
        assert_eq!(down[0].kind(), EventKind::KeyDown);
        assert_eq!(data.code, "KeyA");
        assert_eq!(data.key, "A");
        assert!(data.shift_key());
        assert!(!data.repeat);

        assert_eq!(repeat[0].kind(), EventKind::KeyDown);
        assert!(repeat[0].keyboard().unwrap().repeat);

        assert_eq!(up[0].kind(), EventKind::KeyUp);
        assert!(!up[0].keyboard().unwrap().repeat);
        assert!(up[0].is_cancelable());
    }

    #[test]
    fn test_zero_framebuffer_is_passed_through() {
        let mut fx = fixture();
        let events =
            fx.feed_events(0.0, NativeEventKind::FramebufferSize { width: 0, height: 0 });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].size(), Some(Size::new(0, 0)));
    }

    #[test]
    fn test_drop_preserves_order() {
        let mut fx = fixture();
        let paths = vec!["/b.txt".to_string(), "/a.txt".to_string()];
        let events = fx.feed_events(0.0, NativeEventKind::Drop(paths.clone()));

        assert_eq!(events[0].data(), &EventData::Drop(paths));
    }

    #[test]
    fn test_timestamps_are_milliseconds() {
        let mut fx = fixture();
        let events = fx.feed_events(1250.0, NativeEventKind::Refresh);
        assert_relative_eq!(events[0].timestamp(), 1250.0);
    }

    #[test]
    fn test_close_request_is_cancelable() {
        let mut fx = fixture();
        let events = fx.feed_events(0.0, NativeEventKind::Close);
        assert_eq!(events[0].kind(), EventKind::Close);
        assert!(events[0].is_cancelable());
    }
}
