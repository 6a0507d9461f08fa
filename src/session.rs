//! Session guard: refresh-then-read credential freshness.
//!
//! A mutation dialog can sit open for minutes before its action is
//! confirmed; a token obtained when the dialog opened may have expired
//! by then. [`SessionGuard`] consolidates the refresh-then-read step
//! every mutating path must take, so no call site re-implements it
//! inline and no mutation ever runs against a stale identity.

use std::sync::Arc;

use chrono::Utc;

use crate::backend::AuthBackend;
use crate::error::{GigPassError, Result};
use crate::models::Session;

/// Ensures a valid, non-expired session before any mutating call.
#[derive(Debug)]
pub struct SessionGuard<B> {
    /// The backend's auth surface.
    auth: Arc<B>,
}

impl<B: AuthBackend> SessionGuard<B> {
    /// Creates a guard over the given auth surface.
    #[inline]
    #[must_use]
    pub const fn new(auth: Arc<B>) -> Self {
        Self { auth }
    }

    /// Refreshes the token, then reads back the current session.
    ///
    /// The refresh is best-effort: a refresh failure is logged and the
    /// session is still re-read, since the existing token may remain
    /// valid. The returned session's `user_id` is the identity callers
    /// must use for authorization checks.
    ///
    /// # Errors
    ///
    /// Returns [`GigPassError::NotAuthenticated`] if no session exists
    /// after the refresh, or if the session is already expired. Other
    /// errors propagate from the session read.
    #[tracing::instrument(skip_all)]
    pub async fn ensure_fresh(&self) -> Result<Session> {
        if let Err(err) = self.auth.refresh_session().await {
            tracing::warn!(error = %err, "session refresh failed, reading current session anyway");
        }

        let session = self
            .auth
            .session()
            .await?
            .ok_or(GigPassError::NotAuthenticated)?;

        if !session.is_valid_at(Utc::now()) {
            tracing::debug!(user = %session.user_id, "session expired");
            return Err(GigPassError::NotAuthenticated);
        }

        tracing::debug!(user = %session.user_id, "session fresh");
        Ok(session)
    }
}
