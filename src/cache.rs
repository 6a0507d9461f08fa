//! Process-wide keyed cache of ticket collections.
//!
//! The single source every presentation surface reads from. Entries are
//! keyed by user; mutation success is the only publisher. Subscribers
//! registered for a key receive the refreshed collection after every
//! repopulation, in subscription order — one cache instance means one
//! ordering for every surface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::backend::TicketStore;
use crate::error::{GigPassError, Result};
use crate::models::{SubscriptionId, Ticket, TicketCollection, UserId};

/// Callback invoked with the refreshed collection for a key.
pub type TicketSubscriber = Arc<dyn Fn(&TicketCollection) + Send + Sync>;

/// One cached entry: the fetched rows plus a staleness mark.
#[derive(Debug)]
struct CacheEntry {
    /// Rows as last fetched from the store.
    rows: Vec<Ticket>,
    /// Set when a mutation has outdated the rows.
    stale: bool,
}

/// Inner mutable state.
struct CacheInner {
    /// Cached rows per user key.
    entries: HashMap<UserId, CacheEntry>,
    /// Subscriber registry per user key, in subscription order.
    subscribers: HashMap<UserId, Vec<(SubscriptionId, TicketSubscriber)>>,
    /// Counter for subscription handles.
    next_subscription: u64,
}

/// Keyed, observable cache of per-user ticket collections.
///
/// Locks are released before the store is awaited and before callbacks
/// run, so neither can deadlock against a subscriber that reads the
/// cache back.
pub struct TicketCache<B> {
    /// The backing ticket table.
    store: Arc<B>,
    /// All cache state behind a single mutex.
    inner: Mutex<CacheInner>,
}

impl<B> core::fmt::Debug for TicketCache<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (entries, subscribers) = self
            .inner
            .lock()
            .map(|inner| (inner.entries.len(), inner.subscribers.len()))
            .unwrap_or((0, 0));
        f.debug_struct("TicketCache")
            .field("entries", &entries)
            .field("subscribed_keys", &subscribers)
            .finish()
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> GigPassError {
    GigPassError::Store(err.to_string().into())
}

impl<B: TicketStore> TicketCache<B> {
    /// Creates an empty cache over the given store.
    #[must_use]
    pub fn new(store: Arc<B>) -> Self {
        Self {
            store,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                subscribers: HashMap::new(),
                next_subscription: 1,
            }),
        }
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut CacheInner) -> R) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }

    /// Registers a callback for a user key.
    ///
    /// The callback fires after every repopulation of that key until
    /// [`Self::unsubscribe`] is called with the returned handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    pub fn subscribe(&self, user: &UserId, callback: TicketSubscriber) -> Result<SubscriptionId> {
        self.with_lock(|inner| {
            let id = SubscriptionId::new(inner.next_subscription);
            inner.next_subscription += 1;
            inner
                .subscribers
                .entry(user.clone())
                .or_default()
                .push((id, callback));
            id
        })
    }

    /// Removes a previously registered callback. Unknown handles are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    pub fn unsubscribe(&self, user: &UserId, id: SubscriptionId) -> Result<()> {
        self.with_lock(|inner| {
            if let Some(subs) = inner.subscribers.get_mut(user) {
                subs.retain(|(sub_id, _)| *sub_id != id);
            }
        })
    }

    /// Returns the cached collection when fresh, fetching and
    /// populating the key otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails or the cache lock is
    /// poisoned.
    #[tracing::instrument(skip_all, fields(user = %user))]
    pub async fn get_or_fetch(&self, user: &UserId) -> Result<TicketCollection> {
        let cached = self.with_lock(|inner| {
            inner
                .entries
                .get(user)
                .filter(|entry| !entry.stale)
                .map(|entry| entry.rows.clone())
        })?;

        if let Some(rows) = cached {
            tracing::trace!("cache hit");
            return Ok(TicketCollection::for_user(user, rows));
        }

        tracing::debug!("cache miss, fetching");
        self.refresh(user).await
    }

    /// Marks a key stale and refetches it, notifying every subscriber
    /// of that key with the new collection.
    ///
    /// Mutation paths call this only after remote success; a failure
    /// here leaves the key stale so the next read fetches again.
    ///
    /// # Errors
    ///
    /// Returns an error if the refetch fails or the cache lock is
    /// poisoned.
    #[tracing::instrument(skip_all, fields(user = %user))]
    pub async fn invalidate(&self, user: &UserId) -> Result<TicketCollection> {
        self.with_lock(|inner| {
            if let Some(entry) = inner.entries.get_mut(user) {
                entry.stale = true;
            }
        })?;
        tracing::debug!("invalidated, refetching");
        self.refresh(user).await
    }

    /// Fetches rows for a key, stores them fresh, and notifies
    /// subscribers outside the lock.
    async fn refresh(&self, user: &UserId) -> Result<TicketCollection> {
        let rows = self.store.tickets_for_user(user).await?;
        let collection = TicketCollection::for_user(user, rows.clone());

        let to_notify = self.with_lock(|inner| {
            let _old = inner
                .entries
                .insert(user.clone(), CacheEntry { rows, stale: false });
            inner
                .subscribers
                .get(user)
                .map(|subs| {
                    subs.iter()
                        .map(|(_, callback)| Arc::clone(callback))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })?;

        for callback in to_notify {
            callback(&collection);
        }
        Ok(collection)
    }
}
