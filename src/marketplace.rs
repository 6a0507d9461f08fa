//! High-level GigPass client.
//!
//! Wires the backend, session guard, mutation service, shared cache,
//! selection slot, and delete workflow into the one object presentation
//! surfaces hold, and adds the marketplace's browse/filter queries.

use std::sync::{Arc, Mutex};

use crate::backend::Backend;
use crate::cache::{TicketCache, TicketSubscriber};
use crate::error::{GigPassError, Result};
use crate::models::{
    NaiveDate, Session, SubscriptionId, Ticket, TicketCollection, TicketDraft, TicketId,
    TicketPatch, TicketStatus, UserId,
};
use crate::selection::SelectionSlot;
use crate::service::TicketService;
use crate::workflow::DeleteWorkflow;

/// Composable filter for querying ticket listings.
///
/// Use builder-style methods to chain multiple criteria. All conditions
/// are combined — a ticket must satisfy every set criterion to pass.
///
/// # Examples
///
/// ```
/// use gigpass_rs::marketplace::TicketFilter;
/// use gigpass_rs::models::NaiveDate;
///
/// let filter = TicketFilter::new()
///     .category("Concert")
///     .unit_price_range(10.0, 50.0)
///     .event_date_range(
///         NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
///     );
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TicketFilter {
    /// Category name (case-insensitive exact match).
    pub category: Option<String>,
    /// Venue substring (case-insensitive).
    pub venue: Option<String>,
    /// Title substring (case-insensitive).
    pub title: Option<String>,
    /// Lifecycle status.
    pub status: Option<TicketStatus>,
    /// Seller ID.
    pub seller: Option<UserId>,
    /// Minimum unit price (inclusive).
    pub min_unit_price: Option<f64>,
    /// Maximum unit price (inclusive).
    pub max_unit_price: Option<f64>,
    /// Earliest event date (inclusive).
    pub date_from: Option<NaiveDate>,
    /// Latest event date (inclusive).
    pub date_to: Option<NaiveDate>,
}

impl TicketFilter {
    /// Creates an empty filter that matches all tickets.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to tickets in the given category (case-insensitive).
    #[inline]
    #[must_use]
    pub fn category<T: Into<String>>(mut self, name: T) -> Self {
        self.category = Some(name.into());
        self
    }

    /// Restricts to tickets whose venue contains the given substring
    /// (case-insensitive).
    #[inline]
    #[must_use]
    pub fn venue<T: Into<String>>(mut self, name: T) -> Self {
        self.venue = Some(name.into());
        self
    }

    /// Restricts to tickets whose title contains the given substring
    /// (case-insensitive).
    #[inline]
    #[must_use]
    pub fn title_contains<T: Into<String>>(mut self, text: T) -> Self {
        self.title = Some(text.into());
        self
    }

    /// Restricts to tickets in the given status.
    #[inline]
    #[must_use]
    pub const fn status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to tickets listed by the given seller.
    #[inline]
    #[must_use]
    pub fn seller(mut self, id: UserId) -> Self {
        self.seller = Some(id);
        self
    }

    /// Restricts to tickets with a unit price in `[min, max]`.
    #[inline]
    #[must_use]
    pub const fn unit_price_range(mut self, min: f64, max: f64) -> Self {
        self.min_unit_price = Some(min);
        self.max_unit_price = Some(max);
        self
    }

    /// Restricts to tickets whose event date lies in the given range
    /// (inclusive). Tickets without an event date do not match.
    #[inline]
    #[must_use]
    pub const fn event_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Returns `true` if the ticket satisfies all set criteria.
    #[inline]
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.matches_category(ticket)
            && self.matches_venue(ticket)
            && self.matches_title(ticket)
            && self.matches_status(ticket)
            && self.matches_seller(ticket)
            && self.matches_price(ticket)
            && self.matches_date(ticket)
    }

    /// Checks the category criterion.
    fn matches_category(&self, ticket: &Ticket) -> bool {
        self.category.as_ref().is_none_or(|wanted| {
            ticket
                .category
                .as_ref()
                .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
        })
    }

    /// Checks the venue criterion.
    fn matches_venue(&self, ticket: &Ticket) -> bool {
        self.venue.as_ref().is_none_or(|wanted| {
            let wanted_lower = wanted.to_lowercase();
            ticket
                .venue
                .as_ref()
                .is_some_and(|v| v.to_lowercase().contains(&wanted_lower))
        })
    }

    /// Checks the title criterion.
    fn matches_title(&self, ticket: &Ticket) -> bool {
        self.title.as_ref().is_none_or(|wanted| {
            let wanted_lower = wanted.to_lowercase();
            ticket.title.to_lowercase().contains(&wanted_lower)
        })
    }

    /// Checks the status criterion.
    fn matches_status(&self, ticket: &Ticket) -> bool {
        self.status.is_none_or(|wanted| ticket.status == wanted)
    }

    /// Checks the seller criterion.
    fn matches_seller(&self, ticket: &Ticket) -> bool {
        self.seller
            .as_ref()
            .is_none_or(|wanted| ticket.seller_id == *wanted)
    }

    /// Checks the unit price criteria.
    fn matches_price(&self, ticket: &Ticket) -> bool {
        self.min_unit_price
            .is_none_or(|min| ticket.price_per_unit >= min)
            && self
                .max_unit_price
                .is_none_or(|max| ticket.price_per_unit <= max)
    }

    /// Checks the event date criteria.
    fn matches_date(&self, ticket: &Ticket) -> bool {
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }
        ticket.event_date.is_some_and(|date| {
            self.date_from.is_none_or(|from| date >= from)
                && self.date_to.is_none_or(|to| date <= to)
        })
    }
}

/// Builder for constructing a [`GigPass`] client.
#[derive(Debug)]
pub struct GigPassBuilder<B> {
    /// Backend implementation.
    backend: Option<B>,
}

impl<B: Backend> GigPassBuilder<B> {
    /// Sets the backend implementation.
    #[inline]
    #[must_use]
    pub fn backend(mut self, backend: B) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`GigPassError::Store`] if no backend was provided.
    pub fn build(self) -> Result<GigPass<B>> {
        let backend = Arc::new(
            self.backend
                .ok_or_else(|| GigPassError::Store("backend is required".into()))?,
        );
        let cache = Arc::new(TicketCache::new(Arc::clone(&backend)));
        let service = Arc::new(TicketService::new(
            Arc::clone(&backend),
            Arc::clone(&cache),
        ));
        let workflow = DeleteWorkflow::new(Arc::clone(&service));

        Ok(GigPass {
            backend,
            cache,
            service,
            selection: Arc::new(SelectionSlot::new()),
            workflow,
            last_user: Mutex::new(None),
        })
    }
}

/// High-level GigPass marketplace client.
///
/// The single object presentation surfaces hold: reads go through the
/// shared cache, mutations through the guarded service, the preview
/// selection through the shared slot, and destructive actions through
/// the confirmation workflow.
///
/// Use [`GigPass::builder()`] to construct an instance.
#[derive(Debug)]
pub struct GigPass<B> {
    /// The backend collaborator.
    backend: Arc<B>,
    /// Process-wide ticket collection cache.
    cache: Arc<TicketCache<B>>,
    /// Guarded mutation service.
    service: Arc<TicketService<B>>,
    /// Shared "currently previewed ticket" slot.
    selection: Arc<SelectionSlot>,
    /// Confirmation-gated delete driver.
    workflow: DeleteWorkflow<B>,
    /// Identity observed at the last auth-change check.
    last_user: Mutex<Option<UserId>>,
}

impl<B: Backend> GigPass<B> {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub const fn builder() -> GigPassBuilder<B> {
        GigPassBuilder { backend: None }
    }

    // ── Read paths ───────────────────────────────────────────────────

    /// Returns the user's ticket collection from the shared cache,
    /// fetching on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    #[inline]
    pub async fn tickets_for(&self, user: &UserId) -> Result<TicketCollection> {
        self.cache.get_or_fetch(user).await
    }

    /// Forces a refetch of the user's collection, notifying subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if the refetch fails.
    #[inline]
    pub async fn refresh(&self, user: &UserId) -> Result<TicketCollection> {
        self.cache.invalidate(user).await
    }

    /// Registers a callback for changes to the user's collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    #[inline]
    pub fn subscribe_tickets(
        &self,
        user: &UserId,
        callback: TicketSubscriber,
    ) -> Result<SubscriptionId> {
        self.cache.subscribe(user, callback)
    }

    /// Removes a collection subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    #[inline]
    pub fn unsubscribe_tickets(&self, user: &UserId, id: SubscriptionId) -> Result<()> {
        self.cache.unsubscribe(user, id)
    }

    /// Returns all currently available listings matching the filter —
    /// the marketplace's public browse surface. Bypasses the per-user
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[tracing::instrument(skip_all)]
    pub async fn browse(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let rows = self.backend.available_tickets().await?;
        Ok(rows.into_iter().filter(|t| filter.matches(t)).collect())
    }

    /// Applies a filter to the user's own collection (both sets).
    ///
    /// # Errors
    ///
    /// Returns an error if the collection fetch fails.
    pub async fn filter_tickets(
        &self,
        user: &UserId,
        filter: &TicketFilter,
    ) -> Result<Vec<Ticket>> {
        let collection = self.cache.get_or_fetch(user).await?;
        Ok(collection
            .added
            .into_iter()
            .chain(collection.purchased)
            .filter(|t| filter.matches(t))
            .collect())
    }

    // ── Mutation paths ───────────────────────────────────────────────

    /// Creates a listing. See [`TicketService::create`].
    ///
    /// # Errors
    ///
    /// See [`TicketService::create`].
    #[inline]
    pub async fn add_ticket(&self, draft: TicketDraft) -> Result<Ticket> {
        self.service.create(draft).await
    }

    /// Updates a listing. See [`TicketService::update`].
    ///
    /// # Errors
    ///
    /// See [`TicketService::update`].
    #[inline]
    pub async fn update_ticket(&self, id: &TicketId, patch: TicketPatch) -> Result<Ticket> {
        self.service.update(id, patch).await
    }

    /// Deletes a listing directly, without the confirmation workflow.
    /// UI surfaces should prefer [`Self::delete_workflow`].
    ///
    /// # Errors
    ///
    /// See [`TicketService::delete`].
    #[inline]
    pub async fn delete_ticket(&self, id: &TicketId) -> Result<()> {
        self.service.delete(id).await
    }

    /// Purchases a listing. See [`TicketService::purchase`].
    ///
    /// # Errors
    ///
    /// See [`TicketService::purchase`].
    #[inline]
    pub async fn purchase_ticket(&self, id: &TicketId) -> Result<Ticket> {
        self.service.purchase(id).await
    }

    // ── Shared state handles ─────────────────────────────────────────

    /// The shared preview/detail selection slot.
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &SelectionSlot {
        &self.selection
    }

    /// The confirmation-gated delete workflow.
    #[inline]
    #[must_use]
    pub const fn delete_workflow(&self) -> &DeleteWorkflow<B> {
        &self.workflow
    }

    /// Returns a reference to the backend collaborator.
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Reads the current session without refreshing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth surface cannot be reached.
    #[inline]
    pub async fn current_session(&self) -> Result<Option<Session>> {
        self.backend.session().await
    }

    /// Reacts to an authentication-state transition (sign-in, token
    /// refresh): when the observed identity differs from the last one,
    /// that user's cache key is invalidated so a new identity never
    /// inherits a previously cached collection.
    ///
    /// Returns the session observed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session read or the refetch fails.
    #[tracing::instrument(skip_all)]
    pub async fn handle_auth_change(&self) -> Result<Option<Session>> {
        let session = self.backend.session().await?;
        let current = session.as_ref().map(|s| s.user_id.clone());

        let changed = {
            let mut last = self
                .last_user
                .lock()
                .map_err(|err| GigPassError::Store(err.to_string().into()))?;
            let changed = *last != current;
            *last = current.clone();
            changed
        };

        if changed {
            if let Some(user) = current {
                tracing::debug!(user = %user, "identity changed, refreshing collection");
                let _collection = self.cache.invalidate(&user).await?;
            }
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use chrono::DateTime;

    use super::*;
    use crate::backend::InMemoryBackend;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_owned())
    }

    /// Creates a minimal test ticket for filter checks.
    fn test_ticket(id: &str, title: &str) -> Ticket {
        Ticket {
            id: TicketId::new(id.to_owned()),
            seller_id: user("u-1"),
            buyer_id: None,
            title: title.to_owned(),
            description: None,
            category: None,
            venue: None,
            event_date: None,
            event_time: None,
            price: 20.0,
            price_per_unit: 20.0,
            quantity: 1,
            file_path: None,
            status: TicketStatus::Available,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            updated_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn filter_default_matches_all() {
        let filter = TicketFilter::new();
        assert!(filter.matches(&test_ticket("t-1", "Anything")));
    }

    #[test]
    fn filter_category_exact_case_insensitive() {
        let filter = TicketFilter::new().category("concert");
        let mut matching = test_ticket("t-1", "Gig");
        matching.category = Some("Concert".to_owned());
        let mut other = test_ticket("t-2", "Play");
        other.category = Some("Theatre".to_owned());
        let uncategorized = test_ticket("t-3", "Mystery");

        assert!(filter.matches(&matching));
        assert!(!filter.matches(&other));
        assert!(!filter.matches(&uncategorized));
    }

    #[test]
    fn filter_venue_substring() {
        let filter = TicketFilter::new().venue("arena");
        let mut matching = test_ticket("t-1", "Gig");
        matching.venue = Some("Manchester Arena".to_owned());
        let mut other = test_ticket("t-2", "Gig");
        other.venue = Some("Royal Albert Hall".to_owned());

        assert!(filter.matches(&matching));
        assert!(!filter.matches(&other));
    }

    #[test]
    fn filter_title_substring() {
        let filter = TicketFilter::new().title_contains("stalls");
        assert!(filter.matches(&test_ticket("t-1", "Two Stalls seats")));
        assert!(!filter.matches(&test_ticket("t-2", "Balcony pair")));
    }

    #[test]
    fn filter_unit_price_range_is_inclusive() {
        let filter = TicketFilter::new().unit_price_range(10.0, 20.0);
        let mut low = test_ticket("t-1", "A");
        low.price_per_unit = 9.99;
        let mut on_min = test_ticket("t-2", "B");
        on_min.price_per_unit = 10.0;
        let mut on_max = test_ticket("t-3", "C");
        on_max.price_per_unit = 20.0;
        let mut high = test_ticket("t-4", "D");
        high.price_per_unit = 20.01;

        assert!(!filter.matches(&low));
        assert!(filter.matches(&on_min));
        assert!(filter.matches(&on_max));
        assert!(!filter.matches(&high));
    }

    #[test]
    fn filter_date_range_requires_a_date() {
        let filter = TicketFilter::new().event_date_range(
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
        );
        let mut inside = test_ticket("t-1", "A");
        inside.event_date = NaiveDate::from_ymd_opt(2026, 9, 12);
        let mut outside = test_ticket("t-2", "B");
        outside.event_date = NaiveDate::from_ymd_opt(2026, 10, 1);
        let undated = test_ticket("t-3", "C");

        assert!(filter.matches(&inside));
        assert!(!filter.matches(&outside));
        assert!(!filter.matches(&undated));
    }

    #[test]
    fn filter_status_and_seller() {
        let filter = TicketFilter::new()
            .status(TicketStatus::Available)
            .seller(user("u-1"));
        let matching = test_ticket("t-1", "A");
        let mut sold = test_ticket("t-2", "B");
        sold.status = TicketStatus::Sold;
        let mut foreign = test_ticket("t-3", "C");
        foreign.seller_id = user("u-2");

        assert!(filter.matches(&matching));
        assert!(!filter.matches(&sold));
        assert!(!filter.matches(&foreign));
    }

    #[test]
    fn builder_requires_backend() {
        let result = GigPass::<InMemoryBackend>::builder().build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn facade_wires_mutations_and_reads() {
        let backend = InMemoryBackend::new();
        backend.sign_in(user("seller")).unwrap();
        let client = GigPass::builder().backend(backend).build().unwrap();

        let ticket = client
            .add_ticket(TicketDraft::new("Gig", 15.0, 3))
            .await
            .unwrap();
        let collection = client.tickets_for(&user("seller")).await.unwrap();
        assert!(collection.contains(&ticket.id));

        let updated = client
            .update_ticket(&ticket.id, TicketPatch::new().quantity(2))
            .await
            .unwrap();
        assert!((updated.price - 30.0).abs() < 1e-9);

        client.delete_ticket(&ticket.id).await.unwrap();
        let collection = client.tickets_for(&user("seller")).await.unwrap();
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn browse_lists_only_available() {
        let backend = InMemoryBackend::new();
        backend.sign_in(user("seller")).unwrap();
        let client = GigPass::builder().backend(backend).build().unwrap();

        let kept = client
            .add_ticket(TicketDraft::new("Open gig", 15.0, 1).category("Concert"))
            .await
            .unwrap();
        let gone = client
            .add_ticket(TicketDraft::new("Sold gig", 15.0, 1))
            .await
            .unwrap();

        // A buyer takes the second one off the market.
        client.backend().sign_in(user("buyer")).unwrap();
        let _sold = client.purchase_ticket(&gone.id).await.unwrap();

        let listed = client.browse(&TicketFilter::new()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().map(|t| t.id.clone()), Some(kept.id.clone()));

        let filtered = client
            .browse(&TicketFilter::new().category("concert"))
            .await
            .unwrap();
        assert_eq!(filtered.first().map(|t| t.id.clone()), Some(kept.id));
    }

    #[tokio::test]
    async fn filter_tickets_spans_both_sets() {
        let backend = InMemoryBackend::new();
        backend.sign_in(user("seller")).unwrap();
        let client = GigPass::builder().backend(backend).build().unwrap();

        let _listed = client
            .add_ticket(TicketDraft::new("My gig", 15.0, 1))
            .await
            .unwrap();

        let mine = client
            .filter_tickets(&user("seller"), &TicketFilter::new().title_contains("gig"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);

        let none = client
            .filter_tickets(&user("seller"), &TicketFilter::new().title_contains("opera"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn auth_change_refreshes_the_new_identity() {
        let backend = InMemoryBackend::new();
        backend.sign_in(user("b")).unwrap();
        let client = GigPass::builder().backend(backend).build().unwrap();

        // B's key gets cached while empty.
        assert!(client.tickets_for(&user("b")).await.unwrap().is_empty());

        // A listing appears behind the cache's back (another session).
        let mut seeded = test_ticket("t-new", "Appeared elsewhere");
        seeded.seller_id = user("b");
        client.backend().seed_ticket(seeded).unwrap();

        // A plain cached read still shows the stale, empty collection.
        assert!(client.tickets_for(&user("b")).await.unwrap().is_empty());

        // The sign-in transition must not inherit that stale view.
        let observed = client.handle_auth_change().await.unwrap().unwrap();
        assert_eq!(observed.user_id, user("b"));
        let collection = client.tickets_for(&user("b")).await.unwrap();
        assert_eq!(collection.added.len(), 1);
    }

    #[tokio::test]
    async fn auth_change_invalidates_only_on_identity_change() {
        let backend = InMemoryBackend::new();
        let client = GigPass::builder().backend(backend).build().unwrap();

        let notified: Arc<StdMutex<u32>> = Arc::new(StdMutex::new(0));
        let sink = Arc::clone(&notified);
        let _sub = client
            .subscribe_tickets(&user("b"), Arc::new(move |_| *sink.lock().unwrap() += 1))
            .unwrap();

        // Signed out: no identity, nothing refreshed.
        assert!(client.handle_auth_change().await.unwrap().is_none());
        assert_eq!(*notified.lock().unwrap(), 0);

        // Signing in as B refreshes B's key once.
        client.backend().sign_in(user("b")).unwrap();
        assert!(client.handle_auth_change().await.unwrap().is_some());
        assert_eq!(*notified.lock().unwrap(), 1);

        // The same identity observed again does not refetch.
        assert!(client.handle_auth_change().await.unwrap().is_some());
        assert_eq!(*notified.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn selection_and_workflow_are_shared_handles() {
        let backend = InMemoryBackend::new();
        backend.sign_in(user("seller")).unwrap();
        let client = GigPass::builder().backend(backend).build().unwrap();

        let ticket = client
            .add_ticket(TicketDraft::new("Gig", 15.0, 3))
            .await
            .unwrap();

        client.selection().set(Some(ticket.clone())).unwrap();
        assert_eq!(
            client.selection().get().unwrap().map(|t| t.id),
            Some(ticket.id.clone())
        );

        assert!(client.delete_workflow().open(ticket.id.clone()).unwrap());
        let deleted = client.delete_workflow().confirm().await.unwrap();
        assert_eq!(deleted, Some(ticket.id));
        assert!(client.tickets_for(&user("seller")).await.unwrap().is_empty());
    }
}
