//! Keyboard lookup tables
//!
//! Native key codes follow the GLFW numbering (printable keys use their US
//! ASCII value). Physical `code` strings come from a per-platform table:
//! Windows reports stable set-1 scancodes (extended keys carry `0x100`),
//! elsewhere the key code itself is the most reliable physical identity.

use crate::backend::Modifiers;

/// Native code for a key the window system could not identify
pub const KEY_UNKNOWN: i32 = -1;

/// Which physical-code table applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPlatform {
    /// Scancode table
    Windows,
    /// Key code table
    Generic,
}

impl KeyPlatform {
    /// Table for the running target
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Generic
        }
    }
}

/// Where on the keyboard a key sits, using DOM numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyLocation {
    /// Only one such key
    #[default]
    Standard = 0,
    /// Left-hand variant
    Left = 1,
    /// Right-hand variant
    Right = 2,
    /// Numeric keypad
    Numpad = 3,
}

/// Physical key code string, e.g. `KeyA` or `ArrowUp`
pub fn physical_code(key: i32, scancode: i32, platform: KeyPlatform) -> String {
    let code = match platform {
        KeyPlatform::Windows => windows_scancode_code(scancode),
        KeyPlatform::Generic => key_code_name(key),
    };
    code.map_or_else(|| format!("Unknown({scancode})"), str::to_string)
}

/// Logical key string as the current modifiers would produce it
pub fn logical_key(key: i32, mods: Modifiers) -> String {
    let shift = mods.contains(Modifiers::SHIFT);

    if let Some(c) = u8::try_from(key).ok().filter(u8::is_ascii_uppercase) {
        let upper = shift ^ mods.contains(Modifiers::CAPS_LOCK);
        let c = char::from(c);
        return if upper { c.to_string() } else { c.to_ascii_lowercase().to_string() };
    }

    if let Some(c) = printable(key, shift) {
        return c.to_string();
    }

    named_key(key).unwrap_or("Unidentified").to_string()
}

/// Keyboard location of a key
pub const fn key_location(key: i32) -> KeyLocation {
    match key {
        340..=343 => KeyLocation::Left,
        344..=347 => KeyLocation::Right,
        320..=336 => KeyLocation::Numpad,
        _ => KeyLocation::Standard,
    }
}

fn printable(key: i32, shift: bool) -> Option<char> {
    let (plain, shifted) = match key {
        32 => (' ', ' '),
        39 => ('\'', '"'),
        44 => (',', '<'),
        45 => ('-', '_'),
        46 => ('.', '>'),
        47 => ('/', '?'),
        48 => ('0', ')'),
        49 => ('1', '!'),
        50 => ('2', '@'),
        51 => ('3', '#'),
        52 => ('4', '$'),
        53 => ('5', '%'),
        54 => ('6', '^'),
        55 => ('7', '&'),
        56 => ('8', '*'),
        57 => ('9', '('),
        59 => (';', ':'),
        61 => ('=', '+'),
        91 => ('[', '{'),
        92 => ('\\', '|'),
        93 => (']', '}'),
        96 => ('`', '~'),
        320..=329 => {
            let digit = char::from_digit(u32::try_from(key - 320).ok()?, 10)?;
            (digit, digit)
        }
        330 => ('.', '.'),
        331 => ('/', '/'),
        332 => ('*', '*'),
        333 => ('-', '-'),
        334 => ('+', '+'),
        336 => ('=', '='),
        _ => return None,
    };
    Some(if shift { shifted } else { plain })
}

fn named_key(key: i32) -> Option<&'static str> {
    const FUNCTION_KEYS: [&str; 25] = [
        "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "F13", "F14",
        "F15", "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23", "F24", "F25",
    ];

    Some(match key {
        256 => "Escape",
        257 | 335 => "Enter",
        258 => "Tab",
        259 => "Backspace",
        260 => "Insert",
        261 => "Delete",
        262 => "ArrowRight",
        263 => "ArrowLeft",
        264 => "ArrowDown",
        265 => "ArrowUp",
        266 => "PageUp",
        267 => "PageDown",
        268 => "Home",
        269 => "End",
        280 => "CapsLock",
        281 => "ScrollLock",
        282 => "NumLock",
        283 => "PrintScreen",
        284 => "Pause",
        290..=314 => FUNCTION_KEYS[usize::try_from(key - 290).ok()?],
        340 | 344 => "Shift",
        341 | 345 => "Control",
        342 | 346 => "Alt",
        343 | 347 => "Meta",
        348 => "ContextMenu",
        _ => return None,
    })
}

fn key_code_name(key: i32) -> Option<&'static str> {
    const LETTERS: [&str; 26] = [
        "KeyA", "KeyB", "KeyC", "KeyD", "KeyE", "KeyF", "KeyG", "KeyH", "KeyI", "KeyJ", "KeyK",
        "KeyL", "KeyM", "KeyN", "KeyO", "KeyP", "KeyQ", "KeyR", "KeyS", "KeyT", "KeyU", "KeyV",
        "KeyW", "KeyX", "KeyY", "KeyZ",
    ];
    const DIGITS: [&str; 10] = [
        "Digit0", "Digit1", "Digit2", "Digit3", "Digit4", "Digit5", "Digit6", "Digit7", "Digit8",
        "Digit9",
    ];
    const NUMPAD: [&str; 10] = [
        "Numpad0", "Numpad1", "Numpad2", "Numpad3", "Numpad4", "Numpad5", "Numpad6", "Numpad7",
        "Numpad8", "Numpad9",
    ];

    Some(match key {
        32 => "Space",
        39 => "Quote",
        44 => "Comma",
        45 => "Minus",
        46 => "Period",
        47 => "Slash",
        48..=57 => DIGITS[usize::try_from(key - 48).ok()?],
        59 => "Semicolon",
        61 => "Equal",
        65..=90 => LETTERS[usize::try_from(key - 65).ok()?],
        91 => "BracketLeft",
        92 => "Backslash",
        93 => "BracketRight",
        96 => "Backquote",
        161 | 162 => "IntlBackslash",
        320..=329 => NUMPAD[usize::try_from(key - 320).ok()?],
        330 => "NumpadDecimal",
        331 => "NumpadDivide",
        332 => "NumpadMultiply",
        333 => "NumpadSubtract",
        334 => "NumpadAdd",
        335 => "NumpadEnter",
        336 => "NumpadEqual",
        340 => "ShiftLeft",
        341 => "ControlLeft",
        342 => "AltLeft",
        343 => "MetaLeft",
        344 => "ShiftRight",
        345 => "ControlRight",
        346 => "AltRight",
        347 => "MetaRight",
        348 => "ContextMenu",
        // Named keys share their DOM key and code spelling
        _ => named_key(key)?,
    })
}

fn windows_scancode_code(scancode: i32) -> Option<&'static str> {
    Some(match scancode {
        0x001 => "Escape",
        0x002 => "Digit1",
        0x003 => "Digit2",
        0x004 => "Digit3",
        0x005 => "Digit4",
        0x006 => "Digit5",
        0x007 => "Digit6",
        0x008 => "Digit7",
        0x009 => "Digit8",
        0x00A => "Digit9",
        0x00B => "Digit0",
        0x00C => "Minus",
        0x00D => "Equal",
        0x00E => "Backspace",
        0x00F => "Tab",
        0x010 => "KeyQ",
        0x011 => "KeyW",
        0x012 => "KeyE",
        0x013 => "KeyR",
        0x014 => "KeyT",
        0x015 => "KeyY",
        0x016 => "KeyU",
        0x017 => "KeyI",
        0x018 => "KeyO",
        0x019 => "KeyP",
        0x01A => "BracketLeft",
        0x01B => "BracketRight",
        0x01C => "Enter",
        0x01D => "ControlLeft",
        0x01E => "KeyA",
        0x01F => "KeyS",
        0x020 => "KeyD",
        0x021 => "KeyF",
        0x022 => "KeyG",
        0x023 => "KeyH",
        0x024 => "KeyJ",
        0x025 => "KeyK",
        0x026 => "KeyL",
        0x027 => "Semicolon",
        0x028 => "Quote",
        0x029 => "Backquote",
        0x02A => "ShiftLeft",
        0x02B => "Backslash",
        0x02C => "KeyZ",
        0x02D => "KeyX",
        0x02E => "KeyC",
        0x02F => "KeyV",
        0x030 => "KeyB",
        0x031 => "KeyN",
        0x032 => "KeyM",
        0x033 => "Comma",
        0x034 => "Period",
        0x035 => "Slash",
        0x036 => "ShiftRight",
        0x037 => "NumpadMultiply",
        0x038 => "AltLeft",
        0x039 => "Space",
        0x03A => "CapsLock",
        0x03B => "F1",
        0x03C => "F2",
        0x03D => "F3",
        0x03E => "F4",
        0x03F => "F5",
        0x040 => "F6",
        0x041 => "F7",
        0x042 => "F8",
        0x043 => "F9",
        0x044 => "F10",
        0x045 => "Pause",
        0x046 => "ScrollLock",
        0x047 => "Numpad7",
        0x048 => "Numpad8",
        0x049 => "Numpad9",
        0x04A => "NumpadSubtract",
        0x04B => "Numpad4",
        0x04C => "Numpad5",
        0x04D => "Numpad6",
        0x04E => "NumpadAdd",
        0x04F => "Numpad1",
        0x050 => "Numpad2",
        0x051 => "Numpad3",
        0x052 => "Numpad0",
        0x053 => "NumpadDecimal",
        0x056 => "IntlBackslash",
        0x057 => "F11",
        0x058 => "F12",
        0x059 => "NumpadEqual",
        0x064 => "F13",
        0x065 => "F14",
        0x066 => "F15",
        0x067 => "F16",
        0x068 => "F17",
        0x069 => "F18",
        0x06A => "F19",
        0x06B => "F20",
        0x06C => "F21",
        0x06D => "F22",
        0x06E => "F23",
        0x076 => "F24",
        0x11C => "NumpadEnter",
        0x11D => "ControlRight",
        0x135 => "NumpadDivide",
        0x137 => "PrintScreen",
        0x138 => "AltRight",
        0x145 => "NumLock",
        0x147 => "Home",
        0x148 => "ArrowUp",
        0x149 => "PageUp",
        0x14B => "ArrowLeft",
        0x14D => "ArrowRight",
        0x14F => "End",
        0x150 => "ArrowDown",
        0x151 => "PageDown",
        0x152 => "Insert",
        0x153 => "Delete",
        0x15B => "MetaLeft",
        0x15C => "MetaRight",
        0x15D => "ContextMenu",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_case_follows_shift_and_caps_lock() {
        assert_eq!(logical_key(65, Modifiers::empty()), "a");
        assert_eq!(logical_key(65, Modifiers::SHIFT), "A");
        assert_eq!(logical_key(65, Modifiers::CAPS_LOCK), "A");
        assert_eq!(logical_key(65, Modifiers::SHIFT | Modifiers::CAPS_LOCK), "a");
    }

    #[test]
    fn test_shifted_symbols() {
        assert_eq!(logical_key(49, Modifiers::empty()), "1");
        assert_eq!(logical_key(49, Modifiers::SHIFT), "!");
        assert_eq!(logical_key(47, Modifiers::SHIFT), "?");
        assert_eq!(logical_key(32, Modifiers::SHIFT), " ");
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(logical_key(257, Modifiers::empty()), "Enter");
        assert_eq!(logical_key(265, Modifiers::empty()), "ArrowUp");
        assert_eq!(logical_key(301, Modifiers::empty()), "F12");
        assert_eq!(logical_key(344, Modifiers::empty()), "Shift");
        assert_eq!(logical_key(KEY_UNKNOWN, Modifiers::empty()), "Unidentified");
    }

    #[test]
    fn test_generic_codes() {
        assert_eq!(physical_code(65, 38, KeyPlatform::Generic), "KeyA");
        assert_eq!(physical_code(50, 11, KeyPlatform::Generic), "Digit2");
        assert_eq!(physical_code(335, 104, KeyPlatform::Generic), "NumpadEnter");
        assert_eq!(physical_code(262, 114, KeyPlatform::Generic), "ArrowRight");
        assert_eq!(physical_code(KEY_UNKNOWN, 999, KeyPlatform::Generic), "Unknown(999)");
    }

    #[test]
    fn test_windows_scancodes() {
        assert_eq!(physical_code(65, 0x01E, KeyPlatform::Windows), "KeyA");
        assert_eq!(physical_code(257, 0x01C, KeyPlatform::Windows), "Enter");
        assert_eq!(physical_code(335, 0x11C, KeyPlatform::Windows), "NumpadEnter");
        assert_eq!(physical_code(265, 0x148, KeyPlatform::Windows), "ArrowUp");
        assert_eq!(physical_code(65, 0x1FF, KeyPlatform::Windows), "Unknown(511)");
    }

    #[test]
    fn test_locations() {
        assert_eq!(key_location(340), KeyLocation::Left);
        assert_eq!(key_location(346), KeyLocation::Right);
        assert_eq!(key_location(325), KeyLocation::Numpad);
        assert_eq!(key_location(65), KeyLocation::Standard);
    }
}
