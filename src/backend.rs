//! Backend boundary: the hosted data platform consumed as an opaque
//! collaborator.
//!
//! Two traits split the platform's surfaces — [`AuthBackend`] for the
//! authentication side, [`TicketStore`] for the ticket table — with
//! [`Backend`] as the supertrait the high-level client is generic over.
//! Two implementations ship with the crate: [`RestBackend`] (feature
//! `rest`) speaking HTTP, and [`InMemoryBackend`] for tests and local
//! experimentation.

use core::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{
    NaiveDate, NaiveTime, Session, Ticket, TicketId, TicketStatus, UserId,
};

mod memory;
#[cfg(feature = "rest")]
mod rest;

pub use memory::InMemoryBackend;
#[cfg(feature = "rest")]
pub use rest::{RestBackend, RestBackendBuilder};

/// Row shape sent to the store when creating a ticket.
///
/// The backend assigns `id`, `created_at`, and `updated_at`; everything
/// else — including the service-computed `price` — comes from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketInsert {
    /// The listing user, taken from the fresh session.
    pub seller_id: UserId,
    /// Listing title.
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
    /// Total price, computed by the mutation service.
    pub price: f64,
    /// Price per ticket.
    pub price_per_unit: f64,
    /// Number of tickets.
    pub quantity: u32,
    /// Attachment reference.
    pub file_path: Option<String>,
    /// Initial status (always [`TicketStatus::Available`] from this core).
    pub status: TicketStatus,
}

/// Row shape sent to the store when updating a ticket.
///
/// The mutation service resolves the caller's partial patch against the
/// current row first, so every field here is concrete; the backend
/// writes them as-is and bumps `updated_at`. Status and ownership are
/// not updatable through this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    /// Listing title.
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
    /// Total price, recomputed by the mutation service.
    pub price: f64,
    /// Price per ticket.
    pub price_per_unit: f64,
    /// Number of tickets.
    pub quantity: u32,
    /// Attachment reference (already merged with the existing one).
    pub file_path: Option<String>,
}

/// The backend's authentication surface.
///
/// Consumed exclusively through [`crate::session::SessionGuard`]; the
/// rest of the crate never talks to it directly.
pub trait AuthBackend: core::fmt::Debug + Send + Sync {
    /// Reads the current session.
    ///
    /// Returns `Ok(None)` when no user is signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth surface cannot be reached.
    fn session(&self) -> impl Future<Output = Result<Option<Session>>> + Send;

    /// Requests a token refresh, possibly extending the validity window.
    ///
    /// Best-effort: callers re-read the session afterward rather than
    /// trusting this call alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth surface cannot be reached.
    fn refresh_session(&self) -> impl Future<Output = Result<()>> + Send;
}

/// The backend's ticket table.
pub trait TicketStore: core::fmt::Debug + Send + Sync {
    /// Returns every ticket where `user` is the seller or the buyer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn tickets_for_user(&self, user: &UserId)
    -> impl Future<Output = Result<Vec<Ticket>>> + Send;

    /// Returns every ticket currently in `available` status.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn available_tickets(&self) -> impl Future<Output = Result<Vec<Ticket>>> + Send;

    /// Looks up a single ticket by id.
    ///
    /// Returns `Ok(None)` when no such row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn ticket(&self, id: &TicketId) -> impl Future<Output = Result<Option<Ticket>>> + Send;

    /// Inserts a new row and returns it as stored (with id and
    /// timestamps assigned).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn insert(&self, row: &TicketInsert) -> impl Future<Output = Result<Ticket>> + Send;

    /// Overwrites the mutable fields of an existing row, bumps
    /// `updated_at`, and returns the stored result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GigPassError::NotFound`] if the row does
    /// not exist, or another error if the backend call fails.
    fn update(
        &self,
        id: &TicketId,
        row: &TicketUpdate,
    ) -> impl Future<Output = Result<Ticket>> + Send;

    /// Assigns a buyer, moves the row to `sold`, bumps `updated_at`, and
    /// returns the stored result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GigPassError::NotFound`] if the row does
    /// not exist, or another error if the backend call fails.
    fn mark_sold(
        &self,
        id: &TicketId,
        buyer: &UserId,
    ) -> impl Future<Output = Result<Ticket>> + Send;

    /// Deletes a row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GigPassError::NotFound`] if the row does
    /// not exist (callers may treat that as success), or another error
    /// if the backend call fails.
    fn delete(&self, id: &TicketId) -> impl Future<Output = Result<()>> + Send;
}

/// A complete backend: both the auth surface and the ticket table.
pub trait Backend: AuthBackend + TicketStore {}

impl<T: AuthBackend + TicketStore> Backend for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_row_serializes_camel_case() {
        let row = TicketInsert {
            seller_id: UserId::new("u-1".to_owned()),
            title: "Gig".to_owned(),
            description: None,
            category: None,
            venue: None,
            event_date: None,
            event_time: None,
            price: 45.0,
            price_per_unit: 15.0,
            quantity: 3,
            file_path: None,
            status: TicketStatus::Available,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains(r#""sellerId":"u-1""#));
        assert!(json.contains(r#""pricePerUnit":15.0"#));
        assert!(json.contains(r#""status":"available""#));
    }

    #[test]
    fn update_row_roundtrip() {
        let row = TicketUpdate {
            title: "Gig".to_owned(),
            description: Some("Moved".to_owned()),
            category: None,
            venue: Some("Arena".to_owned()),
            event_date: None,
            event_time: None,
            price: 30.0,
            price_per_unit: 15.0,
            quantity: 2,
            file_path: Some("uploads/scan.pdf".to_owned()),
        };
        let json = serde_json::to_string(&row).unwrap();
        let deserialized: TicketUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, row);
    }
}
