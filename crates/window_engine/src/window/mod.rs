//! Logical windows
//!
//! A [`Window`] is a cheap, cloneable reference to one native window owned
//! by a [`Runtime`](crate::runtime::Runtime). Its state moves one way only:
//!
//! ```text
//! Constructing ──► Live ──► Closed
//! ```
//!
//! Once closed the native handle is never touched again. Accessors that
//! need it return [`WindowError::Closed`]; the id and the last title set
//! stay readable, and further `close()` calls succeed without effect.

pub mod common;
pub mod options;
mod handle;

pub use common::{
    ContentScale, CursorIcon, FrameExtents, ImageData, InputMode, InputModeValue, Position, Size,
    SizeLimits, WindowAttribute, WindowSurface,
};
pub use handle::Window;
pub use options::{ClientApi, GlVersion, WindowOptions};

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::backend::{BackendError, NativeHandle};

/// Window errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The window has been closed and its native handle released
    #[error("window {0} is closed")]
    Closed(WindowId),

    /// Construction options were rejected
    #[error("invalid window options: {0}")]
    InvalidOptions(String),

    /// The native window could not be created
    #[error("failed to create window: {0}")]
    Creation(BackendError),

    /// A second window claimed a live native handle
    #[error("native handle {0} is already registered")]
    AlreadyRegistered(NativeHandle),

    /// The owning runtime has shut down
    #[error("runtime is no longer running")]
    RuntimeStopped,

    /// A native call failed
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result alias for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Stable identity of a window for the lifetime of the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(Uuid);

impl WindowId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a window is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Native window created, setup still running
    Constructing,
    /// Registered and receiving events
    Live,
    /// Destroyed; terminal
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_ids_are_unique() {
        let a = WindowId::new();
        let b = WindowId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_uuid().to_string());
    }

    #[test]
    fn test_backend_errors_convert() {
        let err: WindowError = BackendError::Terminated.into();
        assert_eq!(err, WindowError::Backend(BackendError::Terminated));
        assert_eq!(err.to_string(), "native library already terminated");
    }
}
