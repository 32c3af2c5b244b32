//! Logging utilities

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honors `RUST_LOG`; defaults to `info` when unset.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Initialize the logging system, ignoring repeated initialization
///
/// Returns false when a logger was already installed.
pub fn try_init() -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init()
        .is_ok()
}
