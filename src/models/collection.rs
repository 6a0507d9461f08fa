//! Per-user ticket collection view.

use serde::{Deserialize, Serialize};

use super::{Ticket, TicketId, UserId};

/// The cached projection of one user's tickets: listings they added and
/// tickets they purchased.
///
/// Always derived by partitioning the rows fetched for that user —
/// never stored or mutated field-by-field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCollection {
    /// Tickets where the user is the seller.
    pub added: Vec<Ticket>,
    /// Tickets where the user is the buyer.
    pub purchased: Vec<Ticket>,
}

impl TicketCollection {
    /// Partitions fetched rows into the added/purchased sets for `user`.
    ///
    /// A row that belongs to neither set (possible only if the fetch
    /// filter was wider than the user) is dropped.
    #[must_use]
    pub fn for_user(user: &UserId, rows: Vec<Ticket>) -> Self {
        let mut collection = Self::default();
        for ticket in rows {
            if ticket.seller_id == *user {
                collection.added.push(ticket);
            } else if ticket.buyer_id.as_ref() == Some(user) {
                collection.purchased.push(ticket);
            }
        }
        collection
    }

    /// Total number of tickets across both sets.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.purchased.len()
    }

    /// Returns `true` if the user neither sells nor has bought anything.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.purchased.is_empty()
    }

    /// Returns `true` if either set contains the given ticket id.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &TicketId) -> bool {
        self.added.iter().any(|t| t.id == *id) || self.purchased.iter().any(|t| t.id == *id)
    }
}
