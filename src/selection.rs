//! Shared "currently previewed ticket" slot.
//!
//! Several independent list, table, and card surfaces can ask for a
//! ticket's detail view, while the detail dialog is mounted once near
//! the root. This slot is the single place they all read and write,
//! passed around explicitly (dependency injection) instead of living in
//! implicit module scope.

use std::sync::{Arc, Mutex};

use crate::error::{GigPassError, Result};
use crate::models::{SubscriptionId, Ticket};

/// Callback invoked with the new selection after every write.
pub type SelectionSubscriber = Arc<dyn Fn(Option<&Ticket>) + Send + Sync>;

/// Inner mutable state.
struct SelectionInner {
    /// The currently selected ticket, if any.
    current: Option<Ticket>,
    /// Subscriber registry, in subscription order.
    subscribers: Vec<(SubscriptionId, SelectionSubscriber)>,
    /// Counter for subscription handles.
    next_subscription: u64,
}

/// Observable single-slot selection state.
///
/// At most one ticket is selected system-wide; writing a new selection
/// silently replaces the previous one — there is no stacking. This is a
/// deliberate, tested property of the design, not an oversight.
pub struct SelectionSlot {
    /// All state behind a single mutex.
    inner: Mutex<SelectionInner>,
}

impl core::fmt::Debug for SelectionSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let selected = self
            .inner
            .lock()
            .map(|inner| inner.current.as_ref().map(|t| t.id.clone()))
            .unwrap_or(None);
        f.debug_struct("SelectionSlot")
            .field("selected", &selected)
            .finish()
    }
}

impl Default for SelectionSlot {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> GigPassError {
    GigPassError::Store(err.to_string().into())
}

impl SelectionSlot {
    /// Creates an empty slot with no selection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SelectionInner {
                current: None,
                subscribers: Vec::new(),
                next_subscription: 1,
            }),
        }
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut SelectionInner) -> R) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }

    /// Returns the current selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot lock is poisoned.
    pub fn get(&self) -> Result<Option<Ticket>> {
        self.with_lock(|inner| inner.current.clone())
    }

    /// Writes the selection, evicting whatever was there, and notifies
    /// every subscriber with the new value (including `None` for a
    /// clear).
    ///
    /// Callbacks run outside the lock, so a subscriber may read the
    /// slot back without deadlocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot lock is poisoned.
    pub fn set(&self, ticket: Option<Ticket>) -> Result<()> {
        let to_notify = self.with_lock(|inner| {
            inner.current = ticket.clone();
            inner
                .subscribers
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect::<Vec<_>>()
        })?;

        for callback in to_notify {
            callback(ticket.as_ref());
        }
        Ok(())
    }

    /// Clears the selection. Equivalent to `set(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot lock is poisoned.
    #[inline]
    pub fn clear(&self) -> Result<()> {
        self.set(None)
    }

    /// Registers a callback fired on every write until
    /// [`Self::unsubscribe`] is called with the returned handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot lock is poisoned.
    pub fn subscribe(&self, callback: SelectionSubscriber) -> Result<SubscriptionId> {
        self.with_lock(|inner| {
            let id = SubscriptionId::new(inner.next_subscription);
            inner.next_subscription += 1;
            inner.subscribers.push((id, callback));
            id
        })
    }

    /// Removes a previously registered callback. Unknown handles are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot lock is poisoned.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.with_lock(|inner| {
            inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        })
    }
}
