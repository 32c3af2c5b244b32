//! # Window Engine
//!
//! Native desktop windows with a DOM-style event model.
//!
//! ## Features
//!
//! - **Native backends**: GLFW in production, an in-memory backend for tests
//! - **Event model**: typed, ordered, cancelable events with stable names
//! - **Derived input**: click, double click and pointer aliases from raw callbacks
//! - **Main loop**: animation frames, blocking or chained frame driving
//! - **Lifecycle**: counted windows stop the loop when the last one closes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use window_engine::prelude::*;
//!
//! fn main() -> Result<(), RuntimeError> {
//!     window_engine::foundation::logging::init();
//!
//!     let runtime = Runtime::glfw(RuntimeConfig::default())?;
//!     let window = runtime.create_window(WindowOptions::new("Hello", 800, 600))?;
//!
//!     runtime.add_event_listener("click", |event| {
//!         if let Some(mouse) = event.mouse() {
//!             println!("click at {}, {}", mouse.x(), mouse.y());
//!         }
//!         Ok(())
//!     })?;
//!
//!     runtime.run(move |_now| {
//!         let _ = window.swap_buffers();
//!     }, true);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod backend;
pub mod config;
pub mod events;
pub mod foundation;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod window;

#[cfg(test)]
mod tests;

pub use runtime::{Runtime, RuntimeError};

/// Vulkan handle types used by the surface services
pub use ash::vk;
/// Raw handle types carried by [`window::WindowSurface`]
pub use raw_window_handle;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        backend::{HeadlessBackend, Modifiers, NativeBackend, NativeHandle},
        config::{Config, RuntimeConfig},
        events::{
            Event, EventData, EventKind, KeyboardEventData, ListenerId, ListenerResult,
            MouseEventData,
        },
        runtime::{Runtime, RuntimeError},
        scheduler::{FrameRequestId, MainloopHandle},
        window::{
            ClientApi, CursorIcon, GlVersion, LifecycleState, Window, WindowError, WindowOptions,
        },
    };
}
