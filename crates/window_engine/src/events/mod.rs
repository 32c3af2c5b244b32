//! DOM-style event model
//!
//! Every native callback becomes one or more [`Event`]s. An event is a
//! shared header (kind, originating window, timestamp, cancelable flag)
//! plus a kind-specific [`EventData`] payload. Payloads are complete at
//! construction; the only thing dispatch may change is the
//! default-prevented flag of a cancelable event.

pub mod bus;
pub mod keys;
pub mod synthesis;

pub use bus::{EventBus, Listener, ListenerError, ListenerId, ListenerResult};
pub use keys::KeyLocation;

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::backend::Modifiers;
use crate::window::{ContentScale, Position, Size, Window};

/// Event model errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// No event kind has this name
    #[error("unknown event kind: {0:?}")]
    UnknownKind(String),
}

macro_rules! event_kinds {
    ($($(#[$doc:meta])* $variant:ident => $name:literal),+ $(,)?) => {
        /// Kind of an event; the string names are the public subscription keys
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum EventKind {
            $($(#[$doc])* $variant,)+
        }

        impl EventKind {
            /// Every kind, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable subscription name
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl FromStr for EventKind {
            type Err = EventError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(EventError::UnknownKind(other.to_string())),
                }
            }
        }
    };
}

event_kinds! {
    /// The user asked to close a window
    Close => "close",
    /// A window was destroyed
    Closed => "closed",
    /// Content area resized
    Resize => "resize",
    /// Window moved
    Move => "move",
    /// Framebuffer resized
    FramebufferSize => "framebuffersize",
    /// Focus gained or lost
    Focus => "focus",
    /// Minimized or restored
    Minimize => "minimize",
    /// Maximized or restored
    Maximize => "maximize",
    /// Contents damaged
    Refresh => "refresh",
    /// Redraw requested by the application
    RedrawRequested => "redrawRequested",
    /// Key pressed or repeated
    KeyDown => "keydown",
    /// Key released
    KeyUp => "keyup",
    /// Mouse button pressed
    MouseDown => "mousedown",
    /// Mouse button released
    MouseUp => "mouseup",
    /// Cursor moved
    MouseMove => "mousemove",
    /// Cursor entered the content area
    MouseEnter => "mouseenter",
    /// Cursor left the content area
    MouseLeave => "mouseleave",
    /// Primary button pressed and released
    Click => "click",
    /// Second primary click within the threshold
    DblClick => "dblclick",
    /// Secondary button pressed and released
    ContextMenu => "contextmenu",
    /// Pointer alias of `mousedown`
    PointerDown => "pointerdown",
    /// Pointer alias of `mouseup`
    PointerUp => "pointerup",
    /// Pointer alias of `mousemove`
    PointerMove => "pointermove",
    /// Wheel or trackpad scroll
    Scroll => "scroll",
    /// Text input
    Input => "input",
    /// Files dropped
    Drop => "drop",
    /// Content scale changed
    ContentScale => "contentscale",
    /// The event loop is shutting down
    Unload => "unload",
}

impl EventKind {
    /// Whether listeners may suppress the default action
    pub const fn is_cancelable(self) -> bool {
        self.is_keyboard() || self.is_mouse() || matches!(self, Self::Close)
    }

    /// `keydown` or `keyup`
    pub const fn is_keyboard(self) -> bool {
        matches!(self, Self::KeyDown | Self::KeyUp)
    }

    /// Any mouse or pointer kind
    pub const fn is_mouse(self) -> bool {
        matches!(
            self,
            Self::MouseDown
                | Self::MouseUp
                | Self::MouseMove
                | Self::MouseEnter
                | Self::MouseLeave
                | Self::Click
                | Self::DblClick
                | Self::ContextMenu
                | Self::PointerDown
                | Self::PointerUp
                | Self::PointerMove
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Mouse and pointer payload
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseEventData {
    /// Button that changed, -1 for moves
    pub button: i32,
    /// Bitmask of held buttons, bit `n` for button `n`
    pub buttons: u32,
    /// Content-area x
    pub client_x: f64,
    /// Content-area y
    pub client_y: f64,
    /// Screen x
    pub screen_x: f64,
    /// Screen y
    pub screen_y: f64,
    /// Change in x since the previous recorded position
    pub movement_x: f64,
    /// Change in y since the previous recorded position
    pub movement_y: f64,
    /// Modifier keys
    pub modifiers: Modifiers,
}

impl MouseEventData {
    /// Alias of `client_x`
    pub const fn x(&self) -> f64 {
        self.client_x
    }

    /// Alias of `client_y`
    pub const fn y(&self) -> f64 {
        self.client_y
    }

    /// Alt held
    pub const fn alt_key(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Control held
    pub const fn ctrl_key(&self) -> bool {
        self.modifiers.contains(Modifiers::CONTROL)
    }

    /// Shift held
    pub const fn shift_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Super/command held
    pub const fn meta_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SUPER)
    }
}

/// Keyboard payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEventData {
    /// Physical key, e.g. `KeyA`
    pub code: String,
    /// Logical key, e.g. `a`, `A` or `Enter`
    pub key: String,
    /// Native key code
    pub key_code: i32,
    /// Where the key sits
    pub location: KeyLocation,
    /// Modifier keys
    pub modifiers: Modifiers,
    /// Auto-repeat of a held key; only set on `keydown`
    pub repeat: bool,
    /// Part of an IME composition; never set
    pub is_composing: bool,
}

impl KeyboardEventData {
    /// Alt held
    pub const fn alt_key(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Control held
    pub const fn ctrl_key(&self) -> bool {
        self.modifiers.contains(Modifiers::CONTROL)
    }

    /// Shift held
    pub const fn shift_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Super/command held
    pub const fn meta_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SUPER)
    }
}

/// Kind-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// No payload: close, closed, refresh, redrawRequested, unload
    None,
    /// resize, framebuffersize
    Size(Size),
    /// move
    Position(Position),
    /// focus, minimize, maximize
    Toggle(bool),
    /// keydown, keyup
    Keyboard(KeyboardEventData),
    /// mouse and pointer kinds
    Mouse(MouseEventData),
    /// scroll
    Scroll {
        /// Horizontal offset
        delta_x: f64,
        /// Vertical offset
        delta_y: f64,
    },
    /// input
    Input(String),
    /// drop, paths in native order
    Drop(Vec<String>),
    /// contentscale
    ContentScale(ContentScale),
}

/// Something that happened to a window
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    window: Option<Window>,
    timestamp: f64,
    cancelable: bool,
    default_prevented: Cell<bool>,
    data: EventData,
}

impl Event {
    /// Build an event; cancelability follows from the kind
    pub fn new(kind: EventKind, window: Option<Window>, timestamp: f64, data: EventData) -> Self {
        Self {
            kind,
            window,
            timestamp,
            cancelable: kind.is_cancelable(),
            default_prevented: Cell::new(false),
            data,
        }
    }

    /// Build an event about `window`
    pub fn for_window(kind: EventKind, window: &Window, timestamp: f64, data: EventData) -> Self {
        Self::new(kind, Some(window.clone()), timestamp, data)
    }

    /// Process-wide `unload` notification
    pub fn unload(timestamp: f64) -> Self {
        Self::new(EventKind::Unload, None, timestamp, EventData::None)
    }

    /// Kind
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Originating window; `None` only for `unload`
    pub const fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    /// Milliseconds on the native clock
    pub const fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Payload
    pub const fn data(&self) -> &EventData {
        &self.data
    }

    /// Whether `prevent_default` has any effect
    pub const fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// Suppress the default action; ignored on non-cancelable events
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    /// Whether a listener suppressed the default action
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Whether this event concerns `window`
    pub fn matches(&self, window: &Window) -> bool {
        self.window.as_ref().is_some_and(|own| own == window)
    }

    /// Mouse payload, for mouse and pointer kinds
    pub const fn mouse(&self) -> Option<&MouseEventData> {
        match &self.data {
            EventData::Mouse(data) => Some(data),
            _ => None,
        }
    }

    /// Keyboard payload, for key kinds
    pub const fn keyboard(&self) -> Option<&KeyboardEventData> {
        match &self.data {
            EventData::Keyboard(data) => Some(data),
            _ => None,
        }
    }

    /// Size payload, for resize and framebuffersize
    pub const fn size(&self) -> Option<Size> {
        match self.data {
            EventData::Size(size) => Some(size),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.name().parse::<EventKind>(), Ok(*kind));
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!(EventKind::ALL.len(), 28);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        assert_eq!(
            "mouseover".parse::<EventKind>(),
            Err(EventError::UnknownKind("mouseover".to_string()))
        );
        assert!("RedrawRequested".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_cancelable_kinds() {
        assert!(EventKind::Close.is_cancelable());
        assert!(EventKind::KeyUp.is_cancelable());
        assert!(EventKind::PointerMove.is_cancelable());
        assert!(EventKind::DblClick.is_cancelable());
        assert!(!EventKind::Closed.is_cancelable());
        assert!(!EventKind::FramebufferSize.is_cancelable());
        assert!(!EventKind::Unload.is_cancelable());
    }

    #[test]
    fn test_prevent_default_only_on_cancelable() {
        let close = Event::new(EventKind::Close, None, 0.0, EventData::None);
        close.prevent_default();
        assert!(close.default_prevented());

        let closed = Event::new(EventKind::Closed, None, 0.0, EventData::None);
        closed.prevent_default();
        assert!(!closed.default_prevented());
    }

    #[test]
    fn test_unload_has_no_window() {
        let event = Event::unload(12.0);
        assert_eq!(event.kind(), EventKind::Unload);
        assert!(event.window().is_none());
        assert!(!event.is_cancelable());
    }

    #[test]
    fn test_modifier_accessors() {
        let data = MouseEventData {
            modifiers: Modifiers::SHIFT | Modifiers::SUPER,
            ..MouseEventData::default()
        };
        assert!(data.shift_key());
        assert!(data.meta_key());
        assert!(!data.alt_key());
        assert!(!data.ctrl_key());
    }
}
