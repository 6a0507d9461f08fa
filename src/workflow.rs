//! Delete confirmation workflow.
//!
//! Destructive actions go through an explicit confirmation step:
//! `Idle → PendingConfirmation → Deleting → Idle`. Opening the dialog
//! never touches the network; only an explicit confirm does. While a
//! delete is in flight the machine refuses re-entry, so a double click
//! cannot issue two remote deletes, and the machine always lands back
//! in `Idle` whatever the outcome — a failed delete must not leave the
//! UI stuck.

use std::sync::{Arc, Mutex};

use crate::backend::Backend;
use crate::error::{GigPassError, Result};
use crate::models::TicketId;
use crate::service::TicketService;

/// The three states of the confirmation machine.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeleteState {
    /// Nothing pending.
    Idle,
    /// A delete awaits explicit confirmation; no network activity yet.
    PendingConfirmation(TicketId),
    /// The remote delete is in flight; confirm is disabled.
    Deleting(TicketId),
}

/// Confirmation-gated delete driver over the mutation service.
#[derive(Debug)]
pub struct DeleteWorkflow<B> {
    /// The mutation service performing the actual delete.
    service: Arc<TicketService<B>>,
    /// Current machine state.
    state: Mutex<DeleteState>,
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> GigPassError {
    GigPassError::Store(err.to_string().into())
}

impl<B: Backend> DeleteWorkflow<B> {
    /// Creates an idle workflow over the given service.
    #[must_use]
    pub fn new(service: Arc<TicketService<B>>) -> Self {
        Self {
            service,
            state: Mutex::new(DeleteState::Idle),
        }
    }

    /// Acquires the state lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut DeleteState) -> R) -> Result<R> {
        let mut state = self.state.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut state))
    }

    /// Records a delete as pending confirmation.
    ///
    /// Returns `false` without changing anything while a delete is in
    /// flight; a pending id from an earlier `open` is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn open(&self, id: TicketId) -> Result<bool> {
        self.with_lock(|state| {
            if matches!(state, DeleteState::Deleting(_)) {
                return false;
            }
            *state = DeleteState::PendingConfirmation(id);
            true
        })
    }

    /// Drops a pending confirmation.
    ///
    /// Does not abort an in-flight delete; the machine resets itself
    /// when that delete completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn cancel(&self) -> Result<()> {
        self.with_lock(|state| {
            if matches!(state, DeleteState::PendingConfirmation(_)) {
                *state = DeleteState::Idle;
            }
        })
    }

    /// Confirms the pending delete and runs it.
    ///
    /// Returns `Ok(None)` when there is nothing pending — including
    /// while a delete is already in flight, which is the re-entrancy
    /// guard. On a real run, returns the deleted id, and the machine is
    /// back in `Idle` afterwards whether the delete succeeded or not.
    ///
    /// # Errors
    ///
    /// Propagates the mutation service's error after resetting the
    /// machine.
    #[tracing::instrument(skip_all)]
    pub async fn confirm(&self) -> Result<Option<TicketId>> {
        let pending = self.with_lock(|state| {
            if let DeleteState::PendingConfirmation(id) = state.clone() {
                *state = DeleteState::Deleting(id.clone());
                Some(id)
            } else {
                None
            }
        })?;

        let Some(id) = pending else {
            tracing::trace!("confirm ignored, nothing pending");
            return Ok(None);
        };

        tracing::debug!(id = %id, "confirmed, deleting");
        let outcome = self.service.delete(&id).await;
        self.with_lock(|state| *state = DeleteState::Idle)?;

        outcome.map(|()| Some(id))
    }

    /// The id awaiting confirmation or being deleted, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn pending_id(&self) -> Result<Option<TicketId>> {
        self.with_lock(|state| match state {
            DeleteState::Idle => None,
            DeleteState::PendingConfirmation(id) | DeleteState::Deleting(id) => Some(id.clone()),
        })
    }

    /// Whether a delete is currently in flight (confirm control should
    /// be disabled).
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn is_deleting(&self) -> Result<bool> {
        self.with_lock(|state| matches!(state, DeleteState::Deleting(_)))
    }
}
