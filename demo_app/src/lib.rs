//! Shared setup for the demo binaries

use window_engine::events::Event;

/// Install the panic hook and logger every demo uses
pub fn init() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {panic_info}");
    }));

    window_engine::foundation::logging::init();
}

/// One-line description of an event for logs
pub fn describe(event: &Event) -> String {
    let target = event
        .window()
        .map_or_else(|| "-".to_string(), |window| window.title());
    format!(
        "[{:>10.1} ms] {:<16} {:<20} {:?}",
        event.timestamp(),
        event.kind(),
        target,
        event.data()
    )
}
