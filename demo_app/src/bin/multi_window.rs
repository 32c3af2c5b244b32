//! Several windows on a chained main loop
//!
//! Two counted windows and one uncounted tool window. The tool window can
//! be closed freely; the program ends once both counted windows are gone.
//! A second task on the same executor reports progress between frames.

use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use std::cell::Cell;
use std::rc::Rc;

use window_engine::prelude::*;
use window_engine::scheduler::yield_now;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    demo_app::init();
    log::info!("Starting multi window demo");

    let runtime = Runtime::glfw(RuntimeConfig::default())?;
    let left = runtime.create_window(WindowOptions::new("Left", 480, 360))?;
    let right = runtime.create_window(WindowOptions::new("Right", 480, 360))?;
    let tools = runtime.create_window(WindowOptions {
        auto_exit_event_loop: false,
        floating: true,
        ..WindowOptions::new("Tools", 240, 320)
    })?;

    left.set_position(80, 120)?;
    right.set_position(600, 120)?;
    tools.set_position(1120, 120)?;

    for kind in [EventKind::Focus, EventKind::Closed, EventKind::Unload, EventKind::Resize] {
        runtime.add_listener(kind, |event| {
            log::info!("{}", demo_app::describe(event));
            Ok(())
        });
    }

    schedule_title_update(&runtime, left.clone());

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let frames = Rc::new(Cell::new(0u64));

    let frame_counter = Rc::clone(&frames);
    let done = runtime.spawn_mainloop(
        &spawner,
        move |_now| {
            frame_counter.set(frame_counter.get() + 1);
            async {}
        },
        false,
    )?;

    let progress = Rc::clone(&frames);
    let watcher = runtime.clone();
    spawner.spawn_local(async move {
        let mut reported = 0;
        while watcher.is_running() {
            let now = progress.get() / 600;
            if now > reported {
                reported = now;
                log::info!("{} frames, {} windows open", progress.get(), watcher.windows().len());
            }
            yield_now().await;
        }
    })?;

    pool.run_until(done);
    Ok(())
}

/// Keep the window title showing the frame timestamp
fn schedule_title_update(runtime: &Runtime, window: Window) {
    let next = runtime.clone();
    runtime.request_animation_frame(move |now| {
        if window.set_title(&format!("Left - {:.0} s", now / 1000.0)).is_ok() {
            schedule_title_update(&next, window);
        }
    });
}
