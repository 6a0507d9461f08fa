//! HTTP backend speaking the hosted data platform's REST surface.

use core::future::Future;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::{GigPassError, Result};
use crate::models::{Session, Ticket, TicketId, UserId};

use super::{AuthBackend, TicketInsert, TicketStore, TicketUpdate};

/// Base URL for the hosted platform.
const DEFAULT_BASE_URL: &str = "https://api.gigpass.app";

/// Session read endpoint path.
const SESSION_PATH: &str = "/auth/v1/session";

/// Session refresh endpoint path.
const REFRESH_PATH: &str = "/auth/v1/refresh";

/// Ticket table endpoint path.
const TICKETS_PATH: &str = "/rest/v1/tickets";

/// Body for the mark-sold endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SoldRequest<'a> {
    /// The purchasing user.
    buyer_id: &'a UserId,
}

/// Builder for constructing a [`RestBackend`].
#[derive(Debug)]
pub struct RestBackendBuilder {
    /// API key presented as a bearer credential.
    api_key: Option<SecretString>,
    /// Base URL override (for testing).
    base_url: Option<String>,
}

impl RestBackendBuilder {
    /// Sets the API key used to authenticate against the platform.
    #[inline]
    #[must_use]
    pub fn api_key<T: Into<String>>(mut self, key: T) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Overrides the base URL (useful for testing with a mock server).
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the backend.
    ///
    /// # Errors
    ///
    /// Returns [`GigPassError::NotAuthenticated`] if no API key was
    /// provided, or [`GigPassError::Http`] if the HTTP client fails to
    /// build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<RestBackend> {
        let api_key = self.api_key.ok_or(GigPassError::NotAuthenticated)?;
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        tracing::debug!(base_url = %base_url, "building rest backend");
        let http = reqwest::Client::builder().build()?;

        Ok(RestBackend {
            http,
            api_key,
            base_url,
        })
    }
}

/// Backend implementation over the platform's REST interface.
///
/// Use [`RestBackend::builder()`] to construct an instance.
#[derive(Debug)]
pub struct RestBackend {
    /// Underlying HTTP client.
    http: reqwest::Client,
    /// Bearer API key.
    api_key: SecretString,
    /// Platform base URL.
    base_url: String,
}

impl RestBackend {
    /// Creates a new builder for configuring the backend.
    #[inline]
    #[must_use]
    pub const fn builder() -> RestBackendBuilder {
        RestBackendBuilder {
            api_key: None,
            base_url: None,
        }
    }

    /// Joins a path onto the base URL.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends an authenticated request and maps non-success statuses.
    ///
    /// `404` becomes [`GigPassError::NotFound`]; any other non-success
    /// status becomes [`GigPassError::Api`] carrying the response body
    /// as its message.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");
        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::NOT_FOUND {
            Err(GigPassError::NotFound)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_owned());
            tracing::debug!(status = status.as_u16(), message = %message, "backend error");
            Err(GigPassError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Reads and deserializes a JSON response body.
    async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = response.text().await?;
        tracing::trace!(body_len = body.len(), "parsing response body");
        serde_json::from_str(&body).map_err(GigPassError::from)
    }

    #[tracing::instrument(skip_all)]
    async fn fetch_session(&self) -> Result<Option<Session>> {
        let response = self.execute(self.http.get(self.url(SESSION_PATH))).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.text().await?;
        if body.is_empty() || body == "null" {
            return Ok(None);
        }
        serde_json::from_str(&body).map_err(GigPassError::from)
    }

    #[tracing::instrument(skip_all)]
    async fn request_refresh(&self) -> Result<()> {
        tracing::debug!("requesting session refresh");
        let _response = self.execute(self.http.post(self.url(REFRESH_PATH))).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(user = %user))]
    async fn fetch_tickets_for_user(&self, user: &UserId) -> Result<Vec<Ticket>> {
        let request = self
            .http
            .get(self.url(TICKETS_PATH))
            .query(&[("member", user.as_inner())]);
        let response = self.execute(request).await?;
        Self::read_json(response).await
    }

    #[tracing::instrument(skip_all)]
    async fn fetch_available(&self) -> Result<Vec<Ticket>> {
        let request = self
            .http
            .get(self.url(TICKETS_PATH))
            .query(&[("status", "available")]);
        let response = self.execute(request).await?;
        Self::read_json(response).await
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn fetch_ticket(&self, id: &TicketId) -> Result<Option<Ticket>> {
        let url = format!("{}/{id}", self.url(TICKETS_PATH));
        match self.execute(self.http.get(url)).await {
            Ok(response) => Ok(Some(Self::read_json(response).await?)),
            Err(GigPassError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[tracing::instrument(skip_all)]
    async fn insert_row(&self, row: &TicketInsert) -> Result<Ticket> {
        tracing::debug!("inserting ticket row");
        let request = self.http.post(self.url(TICKETS_PATH)).json(row);
        let response = self.execute(request).await?;
        Self::read_json(response).await
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn update_row(&self, id: &TicketId, row: &TicketUpdate) -> Result<Ticket> {
        tracing::debug!("updating ticket row");
        let url = format!("{}/{id}", self.url(TICKETS_PATH));
        let response = self.execute(self.http.patch(url).json(row)).await?;
        Self::read_json(response).await
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn mark_row_sold(&self, id: &TicketId, buyer: &UserId) -> Result<Ticket> {
        tracing::debug!("marking ticket row sold");
        let url = format!("{}/{id}/sold", self.url(TICKETS_PATH));
        let body = SoldRequest { buyer_id: buyer };
        let response = self.execute(self.http.post(url).json(&body)).await?;
        Self::read_json(response).await
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn delete_row(&self, id: &TicketId) -> Result<()> {
        tracing::debug!("deleting ticket row");
        let url = format!("{}/{id}", self.url(TICKETS_PATH));
        let _response = self.execute(self.http.delete(url)).await?;
        Ok(())
    }
}

impl AuthBackend for RestBackend {
    #[inline]
    fn session(&self) -> impl Future<Output = Result<Option<Session>>> + Send {
        self.fetch_session()
    }

    #[inline]
    fn refresh_session(&self) -> impl Future<Output = Result<()>> + Send {
        self.request_refresh()
    }
}

impl TicketStore for RestBackend {
    #[inline]
    fn tickets_for_user(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Ticket>>> + Send {
        self.fetch_tickets_for_user(user)
    }

    #[inline]
    fn available_tickets(&self) -> impl Future<Output = Result<Vec<Ticket>>> + Send {
        self.fetch_available()
    }

    #[inline]
    fn ticket(&self, id: &TicketId) -> impl Future<Output = Result<Option<Ticket>>> + Send {
        self.fetch_ticket(id)
    }

    #[inline]
    fn insert(&self, row: &TicketInsert) -> impl Future<Output = Result<Ticket>> + Send {
        self.insert_row(row)
    }

    #[inline]
    fn update(
        &self,
        id: &TicketId,
        row: &TicketUpdate,
    ) -> impl Future<Output = Result<Ticket>> + Send {
        self.update_row(id, row)
    }

    #[inline]
    fn mark_sold(
        &self,
        id: &TicketId,
        buyer: &UserId,
    ) -> impl Future<Output = Result<Ticket>> + Send {
        self.mark_row_sold(id, buyer)
    }

    #[inline]
    fn delete(&self, id: &TicketId) -> impl Future<Output = Result<()>> + Send {
        self.delete_row(id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::models::TicketStatus;

    #[test]
    fn builder_requires_api_key() {
        let result = RestBackend::builder().build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_with_api_key_succeeds() {
        let backend = RestBackend::builder().api_key("test-key").build().unwrap();
        assert_eq!(backend.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_custom_base_url() {
        let backend = RestBackend::builder()
            .api_key("test-key")
            .base_url("http://localhost:8080")
            .build()
            .unwrap();
        assert_eq!(backend.base_url, "http://localhost:8080");
    }

    /// Builds a backend pointed at the given mock server.
    fn backend_for(server: &MockServer) -> RestBackend {
        RestBackend::builder()
            .api_key("test-key")
            .base_url(server.uri())
            .build()
            .unwrap()
    }

    /// A complete row as the platform would return it.
    fn row_json(id: &str, seller: &str) -> serde_json::Value {
        json!({
            "id": id,
            "sellerId": seller,
            "buyerId": null,
            "title": "Gig",
            "description": null,
            "category": null,
            "venue": null,
            "eventDate": null,
            "eventTime": null,
            "price": 45.0,
            "pricePerUnit": 15.0,
            "quantity": 3,
            "filePath": null,
            "status": "available",
            "createdAt": "2026-08-01T10:00:00Z",
            "updatedAt": "2026-08-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn session_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SESSION_PATH))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userId": "u-1",
                "expiresAt": "2026-08-06T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let session = backend.session().await.unwrap().unwrap();
        assert_eq!(session.user_id, UserId::new("u-1".to_owned()));
    }

    #[tokio::test]
    async fn session_no_content_is_signed_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SESSION_PATH))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        assert!(backend.session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_posts_to_refresh_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        backend.refresh_session().await.unwrap();
    }

    #[tokio::test]
    async fn tickets_for_user_sends_member_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TICKETS_PATH))
            .and(query_param("member", "u-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([row_json("t-1", "u-1")])),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let tickets = backend
            .tickets_for_user(&UserId::new("u-1".to_owned()))
            .await
            .unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets.first().map(|t| t.quantity), Some(3));
    }

    #[tokio::test]
    async fn missing_ticket_is_none() {
        let missing = uuid::Uuid::new_v4().to_string();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{TICKETS_PATH}/{missing}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let ticket = backend
            .ticket(&TicketId::new(missing))
            .await
            .unwrap();
        assert!(ticket.is_none());
    }

    #[tokio::test]
    async fn insert_posts_row_and_parses_stored_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TICKETS_PATH))
            .and(body_partial_json(json!({
                "sellerId": "u-1",
                "price": 45.0,
                "status": "available"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(row_json("t-9", "u-1")))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
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
        let stored = backend.insert(&row).await.unwrap();
        assert_eq!(stored.id, TicketId::new("t-9".to_owned()));
    }

    #[tokio::test]
    async fn update_on_missing_row_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{TICKETS_PATH}/t-404")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let row = TicketUpdate {
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
        };
        let err = backend
            .update(&TicketId::new("t-404".to_owned()), &row)
            .await
            .unwrap_err();
        assert!(matches!(err, GigPassError::NotFound));
    }

    #[tokio::test]
    async fn mark_sold_posts_buyer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{TICKETS_PATH}/t-1/sold")))
            .and(body_partial_json(json!({"buyerId": "u-2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(row_json("t-1", "u-1")))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let stored = backend
            .mark_sold(
                &TicketId::new("t-1".to_owned()),
                &UserId::new("u-2".to_owned()),
            )
            .await
            .unwrap();
        assert_eq!(stored.id, TicketId::new("t-1".to_owned()));
    }

    #[tokio::test]
    async fn delete_maps_server_error_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{TICKETS_PATH}/t-1")))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend
            .delete(&TicketId::new("t-1".to_owned()))
            .await
            .unwrap_err();
        match err {
            GigPassError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
