//! The booking API contract.
//!
//! The session never talks HTTP directly; it holds an `Arc<dyn BookingApi>`
//! in its environment and returns effects that call it.
//!
//! # Implementations
//!
//! - `HttpBookingApi` (in `bus-booking-api`): reqwest client for the REST API
//! - `MockBookingApi` (in `bus-booking-testing`): scripted replies and a call log

use crate::types::{BookingRequest, BusId, BusSummary, SeatMap, Stats, Ticket, TicketId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`BookingApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Errors reported by a [`BookingApi`] implementation.
///
/// These are carried inside actions, so they are `Clone` and serializable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiError {
    /// The request never produced an HTTP response (connection refused,
    /// timeout, DNS failure).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status, or with `success: false`.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Server-provided message, or the generic status text
        message: String,
        /// Server error code such as `SEAT_NOT_AVAILABLE`
        code: Option<String>,
    },

    /// The server answered 2xx but the body had an unexpected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// The message to show a user: the server's message when there is one.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Network(message) | Self::Api { message, .. } | Self::InvalidResponse(message) => {
                message
            },
        }
    }
}

/// The booking REST API as seen by the session.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of `async fn` so that the trait can be
/// used as `Arc<dyn BookingApi>` and captured by effects.
pub trait BookingApi: Send + Sync {
    /// `GET /api/buses`
    fn list_buses(&self) -> ApiFuture<'_, Vec<BusSummary>>;

    /// `GET /api/buses/{id}`, reduced to seat availability
    fn seat_map(&self, bus_id: BusId) -> ApiFuture<'_, SeatMap>;

    /// `GET /api/tickets`, optionally filtered with `?bus=`
    fn list_tickets(&self, bus_id: Option<BusId>) -> ApiFuture<'_, Vec<Ticket>>;

    /// `POST /api/tickets`
    ///
    /// `None` means the server confirmed the booking without sending the
    /// ticket back.
    fn create_ticket(&self, request: BookingRequest) -> ApiFuture<'_, Option<Ticket>>;

    /// `PUT /api/tickets/{id}` with a new passenger name
    fn update_ticket(&self, ticket_id: TicketId, name: String) -> ApiFuture<'_, Ticket>;

    /// `DELETE /api/tickets/{id}`
    fn cancel_ticket(&self, ticket_id: TicketId) -> ApiFuture<'_, ()>;

    /// `GET /api/stats`
    fn stats(&self) -> ApiFuture<'_, Stats>;
}
