//! Ticket mutation service.
//!
//! Orchestrates create, update, delete, and the simulated purchase:
//! validates preconditions, recomputes derived fields, issues the
//! remote call through a freshly guaranteed session, and invalidates
//! the affected cache keys after — and only after — remote success.

use std::sync::Arc;

use crate::backend::{Backend, TicketInsert, TicketUpdate};
use crate::cache::TicketCache;
use crate::error::{GigPassError, Result};
use crate::models::{Ticket, TicketDraft, TicketId, TicketPatch, TicketStatus};
use crate::session::SessionGuard;

/// Rounds a computed amount to whole cents.
#[inline]
#[must_use]
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Checks that a title has visible content.
fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(GigPassError::Validation(
            "title must not be empty".to_owned(),
        ));
    }
    Ok(())
}

/// Checks that a unit price is a usable amount.
fn validate_price_per_unit(value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(GigPassError::Validation(
            "price per unit must be a non-negative amount".to_owned(),
        ));
    }
    Ok(())
}

/// Checks that a quantity is at least one.
fn validate_quantity(value: u32) -> Result<()> {
    if value < 1 {
        return Err(GigPassError::Validation(
            "quantity must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

/// Create/update/delete/purchase orchestration over a backend.
///
/// Every operation follows the same shape: guarantee a fresh session,
/// re-check authorization and status against the *current* remote row,
/// perform the remote call, then invalidate the affected cache keys.
/// None of the checks trust values rendered at dialog-open time.
#[derive(Debug)]
pub struct TicketService<B> {
    /// The complete backend.
    backend: Arc<B>,
    /// Credential freshness guard.
    guard: SessionGuard<B>,
    /// The shared cache every surface reads from.
    cache: Arc<TicketCache<B>>,
}

impl<B: Backend> TicketService<B> {
    /// Creates a service over the given backend and shared cache.
    #[must_use]
    pub fn new(backend: Arc<B>, cache: Arc<TicketCache<B>>) -> Self {
        let guard = SessionGuard::new(Arc::clone(&backend));
        Self {
            backend,
            guard,
            cache,
        }
    }

    /// Returns the session guard, for read paths that need the current
    /// identity.
    #[inline]
    #[must_use]
    pub const fn guard(&self) -> &SessionGuard<B> {
        &self.guard
    }

    /// Creates a ticket listing.
    ///
    /// The seller is the freshly read session user, never caller input,
    /// and the stored `price` is recomputed from the draft's unit price
    /// and quantity.
    ///
    /// # Errors
    ///
    /// Returns [`GigPassError::NotAuthenticated`] without a valid
    /// session, [`GigPassError::Validation`] for an empty title, bad
    /// unit price, or zero quantity, or any backend error.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, draft: TicketDraft) -> Result<Ticket> {
        let session = self.guard.ensure_fresh().await?;

        validate_title(&draft.title)?;
        validate_price_per_unit(draft.price_per_unit)?;
        validate_quantity(draft.quantity)?;

        let row = TicketInsert {
            seller_id: session.user_id,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            venue: draft.venue,
            event_date: draft.event_date,
            event_time: draft.event_time,
            price: round_to_cents(draft.price_per_unit * f64::from(draft.quantity)),
            price_per_unit: draft.price_per_unit,
            quantity: draft.quantity,
            file_path: draft.file_path,
            status: TicketStatus::Available,
        };

        let ticket = self.backend.insert(&row).await?;
        tracing::debug!(id = %ticket.id, "ticket created");

        let _collection = self.cache.invalidate(&ticket.seller_id).await?;
        Ok(ticket)
    }

    /// Applies a partial update to an existing listing.
    ///
    /// Ownership and status are re-checked against the current remote
    /// row at mutation time. The stored `price` is recomputed from the
    /// effective unit price and quantity, and the existing attachment
    /// is preserved when the patch carries none.
    ///
    /// # Errors
    ///
    /// Returns [`GigPassError::NotFound`] if the row is gone,
    /// [`GigPassError::Forbidden`] if the session user is not the
    /// seller, [`GigPassError::InvalidState`] outside `available`,
    /// [`GigPassError::Validation`] for bad patch fields, or any
    /// backend error.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn update(&self, id: &TicketId, patch: TicketPatch) -> Result<Ticket> {
        let session = self.guard.ensure_fresh().await?;

        let current = self.backend.ticket(id).await?.ok_or(GigPassError::NotFound)?;
        if current.seller_id != session.user_id {
            tracing::debug!(user = %session.user_id, "update refused, not the seller");
            return Err(GigPassError::Forbidden);
        }
        if !current.status.is_available() {
            return Err(GigPassError::InvalidState(current.status));
        }

        if let Some(title) = patch.title.as_deref() {
            validate_title(title)?;
        }
        if let Some(value) = patch.price_per_unit {
            validate_price_per_unit(value)?;
        }
        if let Some(value) = patch.quantity {
            validate_quantity(value)?;
        }

        let price_per_unit = patch.price_per_unit.unwrap_or(current.price_per_unit);
        let quantity = patch.quantity.unwrap_or(current.quantity);

        let row = TicketUpdate {
            title: patch.title.unwrap_or(current.title),
            description: patch.description.or(current.description),
            category: patch.category.or(current.category),
            venue: patch.venue.or(current.venue),
            event_date: patch.event_date.or(current.event_date),
            event_time: patch.event_time.or(current.event_time),
            price: round_to_cents(price_per_unit * f64::from(quantity)),
            price_per_unit,
            quantity,
            // No new upload keeps the current attachment.
            file_path: patch.file_path.or(current.file_path),
        };

        let updated = self.backend.update(id, &row).await?;
        tracing::debug!(id = %updated.id, "ticket updated");

        let _collection = self.cache.invalidate(&updated.seller_id).await?;
        Ok(updated)
    }

    /// Deletes a listing.
    ///
    /// A row that no longer exists — locally unknown or reported
    /// missing by the backend — is success, because a concurrent delete
    /// from another tab is a benign race. The caller's cache key is
    /// invalidated either way so the initiating surface converges.
    ///
    /// # Errors
    ///
    /// Returns [`GigPassError::Forbidden`] if the session user is not
    /// the seller, [`GigPassError::InvalidState`] outside `available`,
    /// or any backend error other than not-found.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn delete(&self, id: &TicketId) -> Result<()> {
        let session = self.guard.ensure_fresh().await?;

        let Some(current) = self.backend.ticket(id).await? else {
            tracing::debug!("ticket already gone, treating delete as success");
            let _collection = self.cache.invalidate(&session.user_id).await?;
            return Ok(());
        };

        if current.seller_id != session.user_id {
            tracing::debug!(user = %session.user_id, "delete refused, not the seller");
            return Err(GigPassError::Forbidden);
        }
        if !current.status.is_available() {
            return Err(GigPassError::InvalidState(current.status));
        }

        match self.backend.delete(id).await {
            Ok(()) => {}
            Err(GigPassError::NotFound) => {
                tracing::debug!("ticket vanished mid-delete, treating as success");
            }
            Err(err) => return Err(err),
        }
        tracing::debug!(id = %id, "ticket deleted");

        let _collection = self.cache.invalidate(&current.seller_id).await?;
        Ok(())
    }

    /// Simulated purchase: assigns the session user as buyer and moves
    /// the listing to `sold`. No payment is executed.
    ///
    /// Both the seller's and the buyer's cache keys are invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`GigPassError::NotFound`] if the row is gone,
    /// [`GigPassError::Validation`] when the buyer is the seller,
    /// [`GigPassError::InvalidState`] outside `available`, or any
    /// backend error.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn purchase(&self, id: &TicketId) -> Result<Ticket> {
        let session = self.guard.ensure_fresh().await?;

        let current = self.backend.ticket(id).await?.ok_or(GigPassError::NotFound)?;
        if current.seller_id == session.user_id {
            return Err(GigPassError::Validation(
                "cannot purchase your own listing".to_owned(),
            ));
        }
        if !current.status.is_available() {
            return Err(GigPassError::InvalidState(current.status));
        }

        let sold = self.backend.mark_sold(id, &session.user_id).await?;
        tracing::debug!(id = %sold.id, buyer = %session.user_id, "ticket sold");

        let _collection = self.cache.invalidate(&sold.seller_id).await?;
        let _collection = self.cache.invalidate(&session.user_id).await?;
        Ok(sold)
    }
}
