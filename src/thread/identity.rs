//! Thread identity shared between a [`Thread`](super::Thread) and its
//! background readers.

use std::sync::{Arc, PoisonError, RwLock};

/// Synchronized, cloneable thread identifier.
///
/// Empty until the first `thread.started` event supplies one, or pre-seeded
/// when resuming. Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct ThreadId {
    inner: Arc<RwLock<Option<String>>>,
}

impl ThreadId {
    /// An empty identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An identity seeded with `id`. An empty `id` leaves it unset.
    #[must_use]
    pub fn seeded(id: impl Into<String>) -> Self {
        let identity = Self::new();
        identity.set(id);
        identity
    }

    /// The current identifier.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the identifier. Empty values are ignored.
    pub fn set(&self, id: impl Into<String>) {
        let id = id.into();
        if id.is_empty() {
            return;
        }
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if guard.as_deref() != Some(id.as_str()) {
            tracing::info!(thread_id = %id, "Thread identity assigned");
        }
        *guard = Some(id);
    }
}
