//! Enumeration types for constrained values.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a ticket listing.
///
/// `Available` is the only status in which this core permits edits and
/// deletion. The other three are terminal here: `Sold` is entered through
/// a purchase, while `Expired` and `Cancelled` are written by external
/// time-based and administrative processes that this core only reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Listed and open to edits, deletion, and purchase.
    Available,
    /// Purchased; a buyer has been assigned.
    Sold,
    /// The event date passed without a sale.
    Expired,
    /// Withdrawn by an administrative action.
    Cancelled,
}

impl TicketStatus {
    /// Returns `true` if the ticket is open to mutation and purchase.
    #[inline]
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }

    /// Returns `true` if no transition out of this status is possible
    /// within this core.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_available()
    }
}

impl core::fmt::Display for TicketStatus {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Available => "available",
            Self::Sold => "sold",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serde_available() {
        let json = serde_json::to_string(&TicketStatus::Available).unwrap();
        assert_eq!(json, r#""available""#);
        let deserialized: TicketStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, TicketStatus::Available);
    }

    #[test]
    fn status_all_variants_roundtrip() {
        let variants = [
            TicketStatus::Available,
            TicketStatus::Sold,
            TicketStatus::Expired,
            TicketStatus::Cancelled,
        ];
        for variant in variants {
            let json = serde_json::to_string(&variant).unwrap();
            let deserialized: TicketStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(deserialized, variant);
        }
    }

    #[test]
    fn status_display_matches_wire_form() {
        for variant in [
            TicketStatus::Available,
            TicketStatus::Sold,
            TicketStatus::Expired,
            TicketStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&variant).unwrap();
            assert_eq!(json, format!("\"{variant}\""));
        }
    }

    #[test]
    fn only_available_is_mutable() {
        assert!(TicketStatus::Available.is_available());
        assert!(!TicketStatus::Available.is_terminal());
        for terminal in [
            TicketStatus::Sold,
            TicketStatus::Expired,
            TicketStatus::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.is_available());
        }
    }
}
