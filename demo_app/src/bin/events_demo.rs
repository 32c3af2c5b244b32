//! Event log demo
//!
//! Opens one OpenGL window and logs every event it receives. Press Escape
//! to close the window, which ends the program.

use window_engine::prelude::*;
use window_engine::window::GlVersion;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    demo_app::init();
    log::info!("Starting event log demo");

    let runtime = Runtime::glfw(RuntimeConfig::default())?;
    let options = WindowOptions::new("Event log", 960, 540)
        .with_gl_version("3.3", false)?;
    let window = runtime.create_window(options)?;

    for &kind in EventKind::ALL {
        if matches!(kind, EventKind::MouseMove | EventKind::PointerMove) {
            continue;
        }
        runtime.add_listener(kind, |event| {
            log::info!("{}", demo_app::describe(event));
            Ok(())
        });
    }

    let target = window.clone();
    runtime.add_listener(EventKind::KeyDown, move |event| {
        if event.keyboard().is_some_and(|key| key.key == "Escape") {
            target.close()?;
        }
        Ok(())
    });

    log::info!("GL {} context, press Escape to quit", GlVersion::new(3, 3));
    runtime.run(
        move |_now| {
            if let Err(err) = window.swap_buffers() {
                log::debug!("Skipping swap: {err}");
            }
        },
        true,
    );
    Ok(())
}
