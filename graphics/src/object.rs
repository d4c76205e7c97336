//! Lifecycle core shared by every graphics object.
//!
//! [`GraphicsObject`] gives each object a mutable debug label and an
//! exactly-once disposal protocol. [`GraphicsResource`] adds the owning
//! [`GraphicsDevice`] back-reference.
//!
//! Disposal is decided by a single compare-and-swap on the disposed flag, so
//! the teardown hook ([`GraphicsObject::destroy`]) runs at most once even if
//! `dispose()` races with `Drop`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;

/// Label and disposed flag embedded in every graphics object.
#[derive(Debug)]
pub struct ObjectState {
    label: RwLock<String>,
    disposed: AtomicBool,
}

impl ObjectState {
    /// Create a new live state. A missing label falls back to `type_name`.
    pub fn new(label: Option<&str>, type_name: &str) -> Self {
        Self {
            label: RwLock::new(label.unwrap_or(type_name).to_string()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Get the current label.
    pub fn label(&self) -> String {
        self.label.read().clone()
    }

    pub(crate) fn store_label(&self, label: &str) {
        *self.label.write() = label.to_string();
    }

    /// Check whether disposal has started.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Atomically flip the disposed flag. Returns `true` for the single caller
    /// that wins the exchange.
    pub fn try_begin_dispose(&self) -> bool {
        self.disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Fail with [`GraphicsError::ObjectDisposed`] once the object is disposed.
    pub fn ensure_alive(&self) -> Result<(), GraphicsError> {
        if self.is_disposed() {
            Err(GraphicsError::ObjectDisposed(self.label()))
        } else {
            Ok(())
        }
    }
}

/// A labelled object with an explicit, idempotent disposal protocol.
pub trait GraphicsObject: Send + Sync {
    /// Access the embedded lifecycle state.
    fn object_state(&self) -> &ObjectState;

    /// Release native state. Called exactly once, by the winner of [`dispose`](Self::dispose).
    fn destroy(&self);

    /// Invoked after the label changed. Backend resources forward it to native
    /// debug names; the default does nothing.
    fn on_label_changed(&self, _label: &str) {}

    /// Get the debug label.
    fn label(&self) -> String {
        self.object_state().label()
    }

    /// Replace the debug label.
    fn set_label(&self, label: &str) -> Result<(), GraphicsError> {
        let state = self.object_state();
        state.ensure_alive()?;
        state.store_label(label);
        self.on_label_changed(label);
        Ok(())
    }

    /// Check whether the object has been disposed.
    fn is_disposed(&self) -> bool {
        self.object_state().is_disposed()
    }

    /// Dispose the object. Subsequent calls are no-ops.
    fn dispose(&self) {
        if self.object_state().try_begin_dispose() {
            self.destroy();
        }
    }
}

/// A graphics object created by, and bound to, a [`GraphicsDevice`].
pub trait GraphicsResource: GraphicsObject {
    /// The device that created this resource.
    fn device(&self) -> &Arc<GraphicsDevice>;
}
