//! Close confirmation demo
//!
//! The first close request is cancelled and arms the guard; a second one
//! within the session closes the window. Double click toggles maximize,
//! right click cycles the cursor shape.

use std::cell::Cell;
use std::rc::Rc;

use window_engine::prelude::*;

const CURSORS: [Option<CursorIcon>; 5] = [
    None,
    Some(CursorIcon::Crosshair),
    Some(CursorIcon::Hand),
    Some(CursorIcon::Ibeam),
    Some(CursorIcon::Hresize),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    demo_app::init();
    log::info!("Starting close guard demo");

    let runtime = Runtime::glfw(RuntimeConfig::default())?;
    let window = runtime.create_window(WindowOptions::new("Close me twice", 640, 400))?;

    let armed = Rc::new(Cell::new(false));
    let guard = Rc::clone(&armed);
    let target = window.clone();
    runtime.add_listener(EventKind::Close, move |event| {
        if !event.matches(&target) {
            return Ok(());
        }
        if guard.replace(true) {
            log::info!("Second close request, closing");
        } else {
            event.prevent_default();
            target.set_title("Close again to quit")?;
            target.request_user_attention()?;
        }
        Ok(())
    });

    let target = window.clone();
    runtime.add_listener(EventKind::DblClick, move |_| {
        target.set_maximized(!target.is_maximized()?)?;
        Ok(())
    });

    let cursor = Rc::new(Cell::new(0usize));
    let target = window.clone();
    runtime.add_listener(EventKind::ContextMenu, move |_| {
        let next = (cursor.get() + 1) % CURSORS.len();
        cursor.set(next);
        target.set_cursor(CURSORS[next])?;
        Ok(())
    });

    let target = window;
    runtime.add_listener(EventKind::FramebufferSize, move |event| {
        if event.size().is_some_and(|size| size.is_empty()) {
            log::info!("{} minimized, pausing", target.title());
        }
        Ok(())
    });

    runtime.run(|_now| {}, true);
    Ok(())
}
