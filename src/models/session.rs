//! Authentication session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// A point-in-time view of the authenticated session.
///
/// Produced by the backend's auth surface and re-read by
/// [`crate::session::SessionGuard`] immediately before every mutating
/// operation, so authorization checks never run against an identity
/// cached at dialog-open time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The authenticated user.
    pub user_id: UserId,
    /// When the access token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns `true` if the token is still valid at `now`.
    #[inline]
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
