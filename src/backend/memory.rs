//! In-memory backend for tests and local experimentation.
//!
//! Provides [`InMemoryBackend`], a thread-safe in-process implementation
//! of both backend traits. It mints row ids and owns timestamps the way
//! the hosted platform does, so the rest of the crate cannot tell the
//! difference.

use core::future::{self, Future};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::{GigPassError, Result};
use crate::models::{Session, Ticket, TicketId, TicketStatus, UserId};

use super::{AuthBackend, TicketInsert, TicketStore, TicketUpdate};

/// Validity window granted by [`InMemoryBackend::sign_in`] and by each
/// successful refresh.
const SESSION_WINDOW_MINUTES: i64 = 60;

/// Thread-safe in-memory backend.
///
/// All state sits behind a single mutex; methods take `&self` and use
/// interior mutability. Test-oriented session controls (`sign_in`,
/// `sign_out`, `set_session_expiry`, `set_refresh_extends`) let tests
/// drive every authentication scenario without a real auth service.
///
/// # Example
///
/// ```rust
/// use gigpass_rs::backend::InMemoryBackend;
/// use gigpass_rs::models::UserId;
///
/// let backend = InMemoryBackend::new();
/// backend.sign_in(UserId::new("u-1".to_owned())).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    /// All state behind a single mutex for thread-safe interior
    /// mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug)]
struct Inner {
    /// Current session, if signed in.
    session: Option<Session>,
    /// Whether a refresh extends the session's validity window.
    refresh_extends: bool,
    /// Stored ticket rows.
    tickets: Vec<Ticket>,
    /// Counter for minted row ids.
    next_id: u64,
    /// Number of delete calls issued, successful or not.
    delete_calls: u64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            session: None,
            refresh_extends: true,
            tickets: Vec::new(),
            next_id: 1,
            delete_calls: 0,
        }
    }
}

impl InMemoryBackend {
    /// Creates a new empty backend with no session.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }

    // ── Session controls ─────────────────────────────────────────────

    /// Signs a user in with a fresh validity window.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn sign_in(&self, user: UserId) -> Result<()> {
        self.with_lock(|inner| {
            inner.session = Some(Session {
                user_id: user,
                expires_at: Utc::now() + Duration::minutes(SESSION_WINDOW_MINUTES),
            });
        })
    }

    /// Signs the current user out.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn sign_out(&self) -> Result<()> {
        self.with_lock(|inner| inner.session = None)
    }

    /// Overrides the current session's expiry (no-op when signed out).
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn set_session_expiry(&self, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_lock(|inner| {
            if let Some(session) = inner.session.as_mut() {
                session.expires_at = expires_at;
            }
        })
    }

    /// Controls whether [`AuthBackend::refresh_session`] extends the
    /// validity window (defaults to `true`).
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn set_refresh_extends(&self, extends: bool) -> Result<()> {
        self.with_lock(|inner| inner.refresh_extends = extends)
    }

    // ── Test observation helpers ─────────────────────────────────────

    /// Places an arbitrary row directly into the table, bypassing the
    /// mutation service (for seeding sold/expired rows in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn seed_ticket(&self, ticket: Ticket) -> Result<()> {
        self.with_lock(|inner| inner.tickets.push(ticket))
    }

    /// Number of rows currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn ticket_count(&self) -> Result<usize> {
        self.with_lock(|inner| inner.tickets.len())
    }

    /// Number of delete calls issued so far, successful or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn delete_calls(&self) -> Result<u64> {
        self.with_lock(|inner| inner.delete_calls)
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> GigPassError {
    GigPassError::Store(err.to_string().into())
}

/// Mints the next row id.
fn mint_id(inner: &mut Inner) -> TicketId {
    let id = TicketId::new(format!("tkt-{:04}", inner.next_id));
    inner.next_id += 1;
    id
}

impl AuthBackend for InMemoryBackend {
    #[inline]
    fn session(&self) -> impl Future<Output = Result<Option<Session>>> + Send {
        future::ready(self.with_lock(|inner| inner.session.clone()))
    }

    #[inline]
    fn refresh_session(&self) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with_lock(|inner| {
            if inner.refresh_extends {
                if let Some(session) = inner.session.as_mut() {
                    session.expires_at = Utc::now() + Duration::minutes(SESSION_WINDOW_MINUTES);
                }
            }
        }))
    }
}

impl TicketStore for InMemoryBackend {
    #[inline]
    fn tickets_for_user(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Ticket>>> + Send {
        future::ready(self.with_lock(|inner| {
            inner
                .tickets
                .iter()
                .filter(|t| t.seller_id == *user || t.buyer_id.as_ref() == Some(user))
                .cloned()
                .collect()
        }))
    }

    #[inline]
    fn available_tickets(&self) -> impl Future<Output = Result<Vec<Ticket>>> + Send {
        future::ready(self.with_lock(|inner| {
            inner
                .tickets
                .iter()
                .filter(|t| t.status.is_available())
                .cloned()
                .collect()
        }))
    }

    #[inline]
    fn ticket(&self, id: &TicketId) -> impl Future<Output = Result<Option<Ticket>>> + Send {
        future::ready(
            self.with_lock(|inner| inner.tickets.iter().find(|t| t.id == *id).cloned()),
        )
    }

    fn insert(&self, row: &TicketInsert) -> impl Future<Output = Result<Ticket>> + Send {
        future::ready(self.with_lock(|inner| {
            let now = Utc::now();
            let ticket = Ticket {
                id: mint_id(inner),
                seller_id: row.seller_id.clone(),
                buyer_id: None,
                title: row.title.clone(),
                description: row.description.clone(),
                category: row.category.clone(),
                venue: row.venue.clone(),
                event_date: row.event_date,
                event_time: row.event_time,
                price: row.price,
                price_per_unit: row.price_per_unit,
                quantity: row.quantity,
                file_path: row.file_path.clone(),
                status: row.status,
                created_at: now,
                updated_at: now,
            };
            inner.tickets.push(ticket.clone());
            ticket
        }))
    }

    fn update(
        &self,
        id: &TicketId,
        row: &TicketUpdate,
    ) -> impl Future<Output = Result<Ticket>> + Send {
        let result = self.with_lock(|inner| {
            inner.tickets.iter_mut().find(|t| t.id == *id).map(|t| {
                t.title = row.title.clone();
                t.description = row.description.clone();
                t.category = row.category.clone();
                t.venue = row.venue.clone();
                t.event_date = row.event_date;
                t.event_time = row.event_time;
                t.price = row.price;
                t.price_per_unit = row.price_per_unit;
                t.quantity = row.quantity;
                t.file_path = row.file_path.clone();
                t.updated_at = Utc::now();
                t.clone()
            })
        });
        future::ready(match result {
            Ok(Some(ticket)) => Ok(ticket),
            Ok(None) => Err(GigPassError::NotFound),
            Err(err) => Err(err),
        })
    }

    fn mark_sold(
        &self,
        id: &TicketId,
        buyer: &UserId,
    ) -> impl Future<Output = Result<Ticket>> + Send {
        let result = self.with_lock(|inner| {
            inner.tickets.iter_mut().find(|t| t.id == *id).map(|t| {
                t.buyer_id = Some(buyer.clone());
                t.status = TicketStatus::Sold;
                t.updated_at = Utc::now();
                t.clone()
            })
        });
        future::ready(match result {
            Ok(Some(ticket)) => Ok(ticket),
            Ok(None) => Err(GigPassError::NotFound),
            Err(err) => Err(err),
        })
    }

    fn delete(&self, id: &TicketId) -> impl Future<Output = Result<()>> + Send {
        let result = self.with_lock(|inner| {
            inner.delete_calls += 1;
            let before = inner.tickets.len();
            inner.tickets.retain(|t| t.id != *id);
            inner.tickets.len() < before
        });
        future::ready(match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(GigPassError::NotFound),
            Err(err) => Err(err),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a minimal insert row.
    fn test_insert(seller: &str, title: &str) -> TicketInsert {
        TicketInsert {
            seller_id: UserId::new(seller.to_owned()),
            title: title.to_owned(),
            description: None,
            category: None,
            venue: None,
            event_date: None,
            event_time: None,
            price: 20.0,
            price_per_unit: 10.0,
            quantity: 2,
            file_path: None,
            status: TicketStatus::Available,
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let backend = InMemoryBackend::new();
        let first = backend.insert(&test_insert("u-1", "A")).await.unwrap();
        let second = backend.insert(&test_insert("u-1", "B")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(backend.ticket_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn tickets_for_user_matches_seller_and_buyer() {
        let backend = InMemoryBackend::new();
        let listed = backend.insert(&test_insert("u-1", "A")).await.unwrap();
        let _other = backend.insert(&test_insert("u-2", "B")).await.unwrap();
        let sold = backend.insert(&test_insert("u-3", "C")).await.unwrap();
        let _sold = backend
            .mark_sold(&sold.id, &UserId::new("u-1".to_owned()))
            .await
            .unwrap();

        let mine = backend
            .tickets_for_user(&UserId::new("u-1".to_owned()))
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().any(|t| t.id == listed.id));
    }

    #[tokio::test]
    async fn available_excludes_sold() {
        let backend = InMemoryBackend::new();
        let kept = backend.insert(&test_insert("u-1", "A")).await.unwrap();
        let sold = backend.insert(&test_insert("u-1", "B")).await.unwrap();
        let _sold = backend
            .mark_sold(&sold.id, &UserId::new("u-2".to_owned()))
            .await
            .unwrap();

        let available = backend.available_tickets().await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available.first().map(|t| t.id.clone()), Some(kept.id));
    }

    #[tokio::test]
    async fn update_overwrites_and_bumps_timestamp() {
        let backend = InMemoryBackend::new();
        let stored = backend.insert(&test_insert("u-1", "A")).await.unwrap();
        let row = TicketUpdate {
            title: "Renamed".to_owned(),
            description: Some("Now with notes".to_owned()),
            category: None,
            venue: None,
            event_date: None,
            event_time: None,
            price: 30.0,
            price_per_unit: 15.0,
            quantity: 2,
            file_path: None,
        };
        let updated = backend.update(&stored.id, &row).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.price, 30.0);
        assert!(updated.updated_at >= stored.updated_at);
        assert_eq!(updated.created_at, stored.created_at);
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let backend = InMemoryBackend::new();
        let row = TicketUpdate {
            title: "X".to_owned(),
            description: None,
            category: None,
            venue: None,
            event_date: None,
            event_time: None,
            price: 1.0,
            price_per_unit: 1.0,
            quantity: 1,
            file_path: None,
        };
        let err = backend
            .update(&TicketId::new("missing".to_owned()), &row)
            .await
            .unwrap_err();
        assert!(matches!(err, GigPassError::NotFound));
    }

    #[tokio::test]
    async fn delete_removes_row_then_reports_not_found() {
        let backend = InMemoryBackend::new();
        let stored = backend.insert(&test_insert("u-1", "A")).await.unwrap();
        backend.delete(&stored.id).await.unwrap();
        let err = backend.delete(&stored.id).await.unwrap_err();
        assert!(matches!(err, GigPassError::NotFound));
        assert_eq!(backend.delete_calls().unwrap(), 2);
    }

    #[tokio::test]
    async fn mark_sold_assigns_buyer() {
        let backend = InMemoryBackend::new();
        let stored = backend.insert(&test_insert("u-1", "A")).await.unwrap();
        let sold = backend
            .mark_sold(&stored.id, &UserId::new("u-2".to_owned()))
            .await
            .unwrap();
        assert_eq!(sold.status, TicketStatus::Sold);
        assert_eq!(sold.buyer_id, Some(UserId::new("u-2".to_owned())));
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let backend = InMemoryBackend::new();
        assert!(backend.session().await.unwrap().is_none());

        backend.sign_in(UserId::new("u-1".to_owned())).unwrap();
        let session = backend.session().await.unwrap().unwrap();
        assert_eq!(session.user_id, UserId::new("u-1".to_owned()));
        assert!(session.is_valid_at(Utc::now()));

        backend.sign_out().unwrap();
        assert!(backend.session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_extends_expired_session() {
        let backend = InMemoryBackend::new();
        backend.sign_in(UserId::new("u-1".to_owned())).unwrap();
        backend
            .set_session_expiry(Utc::now() - Duration::minutes(5))
            .unwrap();

        backend.refresh_session().await.unwrap();
        let session = backend.session().await.unwrap().unwrap();
        assert!(session.is_valid_at(Utc::now()));
    }

    #[tokio::test]
    async fn refresh_can_be_disabled() {
        let backend = InMemoryBackend::new();
        backend.sign_in(UserId::new("u-1".to_owned())).unwrap();
        backend.set_refresh_extends(false).unwrap();
        let expiry = Utc::now() - Duration::minutes(5);
        backend.set_session_expiry(expiry).unwrap();

        backend.refresh_session().await.unwrap();
        let session = backend.session().await.unwrap().unwrap();
        assert_eq!(session.expires_at, expiry);
    }
}
