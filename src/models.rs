//! Data models for GigPass marketplace entities.
//!
//! Strongly-typed representations of the ticket row and its mutation
//! inputs, newtype ID wrappers, the session view, and the per-user
//! collection projection.

mod collection;
mod enums;
mod ids;
mod session;
mod ticket;

pub use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
pub use collection::TicketCollection;
pub use enums::TicketStatus;
pub use ids::{SubscriptionId, TicketId, UserId};
pub use session::Session;
pub use ticket::{Ticket, TicketDraft, TicketPatch};
