//! Booking API client implementation

use crate::envelope;
use bus_booking_core::api::{ApiError, ApiFuture, BookingApi};
use bus_booking_core::types::{
    BookingRequest, BusId, BusSummary, SeatMap, Stats, Ticket, TicketId,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;

/// HTTP client for the booking REST API
#[derive(Clone, Debug)]
pub struct HttpBookingApi {
    client: Client,
    base_url: String,
}

impl HttpBookingApi {
    /// Create a client with reqwest's default settings
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a client with a request timeout and `User-Agent`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the TLS backend cannot be initialised
    pub fn with_options(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an existing reqwest client
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and return the JSON body of a successful response
    ///
    /// A response is a failure when its status is not 2xx or when its body
    /// says `success: false`. The server's `message` is preferred over the
    /// generic status text.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self
            .client
            .request(method.clone(), format!("{}{path}", self.base_url));
        if let Some(query) = query {
            request = request.query(&[query]);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "Booking API unreachable");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!(%method, path, status = status.as_u16(), "Booking API responded");

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let parsed = if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&text)
        };

        if !status.is_success() {
            let body = parsed.unwrap_or(Value::Null);
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: envelope::error_message(&body)
                    .unwrap_or_else(|| generic_status_message(status)),
                code: envelope::error_code(&body),
            });
        }

        let body = parsed.map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: envelope::error_message(&body)
                    .unwrap_or_else(|| "Request failed".to_string()),
                code: envelope::error_code(&body),
            });
        }

        Ok(body)
    }
}

/// `HTTP 503 Service Unavailable`
fn generic_status_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}

impl BookingApi for HttpBookingApi {
    fn list_buses(&self) -> ApiFuture<'_, Vec<BusSummary>> {
        Box::pin(async move {
            let body = self.execute(Method::GET, "/api/buses", None, None).await?;
            envelope::buses(&body)
        })
    }

    fn seat_map(&self, bus_id: BusId) -> ApiFuture<'_, SeatMap> {
        Box::pin(async move {
            let path = format!("/api/buses/{bus_id}");
            let body = self.execute(Method::GET, &path, None, None).await?;
            envelope::seat_map(bus_id, &body)
        })
    }

    fn list_tickets(&self, bus_id: Option<BusId>) -> ApiFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let query = bus_id.as_ref().map(|bus| ("bus", bus.as_str()));
            let body = self.execute(Method::GET, "/api/tickets", query, None).await?;
            envelope::tickets(&body)
        })
    }

    fn create_ticket(&self, request: BookingRequest) -> ApiFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let payload = json!({
                "name": request.name,
                "bus": request.bus,
                "seat": request.seat,
            });
            let body = self
                .execute(Method::POST, "/api/tickets", None, Some(payload))
                .await?;
            envelope::booking(&body)
        })
    }

    fn update_ticket(&self, ticket_id: TicketId, name: String) -> ApiFuture<'_, Ticket> {
        Box::pin(async move {
            let path = format!("/api/tickets/{ticket_id}");
            let body = self
                .execute(Method::PUT, &path, None, Some(json!({ "name": name })))
                .await?;
            envelope::ticket(&body)
        })
    }

    fn cancel_ticket(&self, ticket_id: TicketId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let path = format!("/api/tickets/{ticket_id}");
            self.execute(Method::DELETE, &path, None, None).await?;
            Ok(())
        })
    }

    fn stats(&self) -> ApiFuture<'_, Stats> {
        Box::pin(async move {
            let body = self.execute(Method::GET, "/api/stats", None, None).await?;
            envelope::stats(&body)
        })
    }
}
