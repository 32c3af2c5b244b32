//! Native handle to window routing
//!
//! Native callbacks carry nothing but the native handle, so every event is
//! routed through this table. While a handle is live it maps to exactly one
//! [`Window`].

use std::collections::HashMap;

use crate::backend::NativeHandle;
use crate::window::{Window, WindowError, WindowResult};

/// Map of live native handles to their windows
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: HashMap<NativeHandle, Window>,
}

impl WindowRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `handle` to `window`
    ///
    /// A handle that is already registered is a programming error: the
    /// existing mapping is kept and the call fails.
    pub fn register(&mut self, handle: NativeHandle, window: Window) -> WindowResult<()> {
        if let Some(existing) = self.windows.get(&handle) {
            log::error!(
                "Native handle {} already belongs to window {}; refusing {}",
                handle,
                existing.id(),
                window.id()
            );
            return Err(WindowError::AlreadyRegistered(handle));
        }
        log::trace!("Registered window {} as {}", window.id(), handle);
        self.windows.insert(handle, window);
        Ok(())
    }

    /// Window for a handle, `None` for stale or foreign handles
    pub fn resolve(&self, handle: NativeHandle) -> Option<Window> {
        self.windows.get(&handle).cloned()
    }

    /// Remove a mapping; removing an unknown handle is a no-op
    pub fn unregister(&mut self, handle: NativeHandle) -> Option<Window> {
        self.windows.remove(&handle)
    }

    /// Whether a handle is currently routed
    pub fn contains(&self, handle: NativeHandle) -> bool {
        self.windows.contains_key(&handle)
    }

    /// Remove every mapping, returning the windows that were live
    pub fn clear(&mut self) -> Vec<Window> {
        self.windows.drain().map(|(_, window)| window).collect()
    }

    /// Registered handles
    pub fn handles(&self) -> Vec<NativeHandle> {
        self.windows.keys().copied().collect()
    }

    /// Number of live windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// No live windows
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
