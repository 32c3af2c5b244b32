//! End-to-end scenarios against the headless backend


use std::cell::RefCell;
use std::rc::Rc;

use crate::backend::HeadlessBackend;
use crate::config::RuntimeConfig;
use crate::events::{Event, EventKind};
use crate::runtime::Runtime;
use crate::window::{Window, WindowOptions};

/// Runtime with one default window
fn setup() -> (Runtime, HeadlessBackend, Window) {
    let (runtime, backend) = Runtime::headless(RuntimeConfig::default());
    let window = runtime
        .create_window(WindowOptions::default())
        .expect("headless window");
    (runtime, backend, window)
}

/// Record every event of the given kinds, in dispatch order
fn record(runtime: &Runtime, kinds: &[EventKind]) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let log = Rc::clone(&log);
        runtime.add_listener(kind, move |event| {
            log.borrow_mut().push(event.clone());
            Ok(())
        });
    }
    log
}

fn kinds(log: &Rc<RefCell<Vec<Event>>>) -> Vec<EventKind> {
    log.borrow().iter().map(Event::kind).collect()
}
