//! Ticket listing model and mutation input types.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TicketId, TicketStatus, UserId};

/// A ticket listing, as stored in the backend's ticket table.
///
/// While the ticket is [`TicketStatus::Available`] the commercial fields
/// obey `price == round(price_per_unit * quantity, 2)`; the mutation
/// service recomputes `price` on every create and update, so the
/// invariant cannot drift through this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Unique identifier (UUID), assigned by the backend at creation.
    pub id: TicketId,
    /// The listing user. Set at creation, immutable.
    pub seller_id: UserId,
    /// The purchasing user. `None` until sold, then immutable.
    pub buyer_id: Option<UserId>,
    /// Listing title.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Category, referenced by name.
    pub category: Option<String>,
    /// Venue name.
    pub venue: Option<String>,
    /// Date of the event.
    pub event_date: Option<NaiveDate>,
    /// Start time of the event.
    pub event_time: Option<NaiveTime>,
    /// Total price for the whole listing (unit price times quantity).
    pub price: f64,
    /// Price per ticket (>= 0).
    pub price_per_unit: f64,
    /// Number of tickets in the listing (>= 1).
    pub quantity: u32,
    /// Attachment reference produced by the upload collaborator; opaque
    /// to this core.
    pub file_path: Option<String>,
    /// Lifecycle status.
    pub status: TicketStatus,
    /// Creation timestamp, backend-assigned, set once.
    pub created_at: DateTime<Utc>,
    /// Last-mutation timestamp, backend-bumped on every write.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a ticket listing.
///
/// Carries no `price` and no `seller_id`: the total is derived by the
/// mutation service and the seller comes from the fresh session, so
/// neither can be forged by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDraft {
    /// Listing title (must be non-empty).
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Category name.
    pub category: Option<String>,
    /// Venue name.
    pub venue: Option<String>,
    /// Date of the event.
    pub event_date: Option<NaiveDate>,
    /// Start time of the event.
    pub event_time: Option<NaiveTime>,
    /// Price per ticket (must be finite and >= 0).
    pub price_per_unit: f64,
    /// Number of tickets (must be >= 1).
    pub quantity: u32,
    /// Attachment reference from the upload collaborator.
    pub file_path: Option<String>,
}

impl TicketDraft {
    /// Creates a draft with the required fields; everything else starts
    /// unset.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(title: T, price_per_unit: f64, quantity: u32) -> Self {
        Self {
            title: title.into(),
            description: None,
            category: None,
            venue: None,
            event_date: None,
            event_time: None,
            price_per_unit,
            quantity,
            file_path: None,
        }
    }

    /// Sets the description.
    #[inline]
    #[must_use]
    pub fn description<T: Into<String>>(mut self, text: T) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Sets the category name.
    #[inline]
    #[must_use]
    pub fn category<T: Into<String>>(mut self, name: T) -> Self {
        self.category = Some(name.into());
        self
    }

    /// Sets the venue name.
    #[inline]
    #[must_use]
    pub fn venue<T: Into<String>>(mut self, name: T) -> Self {
        self.venue = Some(name.into());
        self
    }

    /// Sets the event date.
    #[inline]
    #[must_use]
    pub const fn event_date(mut self, date: NaiveDate) -> Self {
        self.event_date = Some(date);
        self
    }

    /// Sets the event start time.
    #[inline]
    #[must_use]
    pub const fn event_time(mut self, time: NaiveTime) -> Self {
        self.event_time = Some(time);
        self
    }

    /// Sets the attachment reference.
    #[inline]
    #[must_use]
    pub fn file_path<T: Into<String>>(mut self, path: T) -> Self {
        self.file_path = Some(path.into());
        self
    }
}

/// Partial update for an existing ticket listing.
///
/// Every field is optional; `None` means "leave unchanged". In
/// particular, a patch without a `file_path` preserves the existing
/// attachment. There is no `price` field — the total is recomputed by
/// the mutation service whenever the unit price or quantity changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    /// New title, if changing.
    pub title: Option<String>,
    /// New description, if changing.
    pub description: Option<String>,
    /// New category name, if changing.
    pub category: Option<String>,
    /// New venue name, if changing.
    pub venue: Option<String>,
    /// New event date, if changing.
    pub event_date: Option<NaiveDate>,
    /// New event start time, if changing.
    pub event_time: Option<NaiveTime>,
    /// New price per ticket, if changing.
    pub price_per_unit: Option<f64>,
    /// New quantity, if changing.
    pub quantity: Option<u32>,
    /// Replacement attachment reference; `None` keeps the current one.
    pub file_path: Option<String>,
}

impl TicketPatch {
    /// Creates an empty patch that changes nothing.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the patch carries no changes at all.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.venue.is_none()
            && self.event_date.is_none()
            && self.event_time.is_none()
            && self.price_per_unit.is_none()
            && self.quantity.is_none()
            && self.file_path.is_none()
    }

    /// Changes the title.
    #[inline]
    #[must_use]
    pub fn title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Changes the description.
    #[inline]
    #[must_use]
    pub fn description<T: Into<String>>(mut self, text: T) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Changes the category name.
    #[inline]
    #[must_use]
    pub fn category<T: Into<String>>(mut self, name: T) -> Self {
        self.category = Some(name.into());
        self
    }

    /// Changes the venue name.
    #[inline]
    #[must_use]
    pub fn venue<T: Into<String>>(mut self, name: T) -> Self {
        self.venue = Some(name.into());
        self
    }

    /// Changes the event date.
    #[inline]
    #[must_use]
    pub const fn event_date(mut self, date: NaiveDate) -> Self {
        self.event_date = Some(date);
        self
    }

    /// Changes the event start time.
    #[inline]
    #[must_use]
    pub const fn event_time(mut self, time: NaiveTime) -> Self {
        self.event_time = Some(time);
        self
    }

    /// Changes the price per ticket.
    #[inline]
    #[must_use]
    pub const fn price_per_unit(mut self, value: f64) -> Self {
        self.price_per_unit = Some(value);
        self
    }

    /// Changes the quantity.
    #[inline]
    #[must_use]
    pub const fn quantity(mut self, value: u32) -> Self {
        self.quantity = Some(value);
        self
    }

    /// Replaces the attachment reference.
    #[inline]
    #[must_use]
    pub fn file_path<T: Into<String>>(mut self, path: T) -> Self {
        self.file_path = Some(path.into());
        self
    }
}
