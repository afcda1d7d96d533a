//! Async facade over the booking store.
//!
//! [`BookingSession`] turns each user operation into a tagged command, sends
//! it through the store and waits for the event that answers it. All rules
//! live in the reducer; this layer only picks the reply apart.

use crate::booking::{BookingAction, BookingEnvironment, BookingReducer};
use crate::config::SessionConfig;
use crate::error::{SessionError, ValidationError};
use crate::state::{BookingState, LatestRequests, Notification, RequestId, SessionPhase};
use crate::view::SeatGrid;
use bus_booking_api::HttpBookingApi;
use bus_booking_core::api::BookingApi;
use bus_booking_core::environment::{Clock, SystemClock};
use bus_booking_core::types::{BusId, BusSummary, SeatId, SeatMap, Stats, Ticket, TicketId};
use bus_booking_runtime::Store;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

/// A booking session: selection state plus the API it talks to.
///
/// Cheap to clone; clones share the same state.
///
/// # Example
///
/// ```ignore
/// let session = BookingSession::new(Arc::new(HttpBookingApi::new("http://localhost:5000")));
///
/// session.select_bus("BUS001").await?;
/// session.select_seat("S01").await?;
/// let ticket = session.submit_booking("John Doe").await?;
/// ```
#[derive(Clone)]
pub struct BookingSession {
    store: BookingStore,
    requests: Arc<AtomicU64>,
    reply_timeout: Duration,
}

impl BookingSession {
    /// Create a session using the system clock
    #[must_use]
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self::with_clock(api, Arc::new(SystemClock))
    }

    /// Create a session with an explicit clock
    #[must_use]
    pub fn with_clock(api: Arc<dyn BookingApi>, clock: Arc<dyn Clock>) -> Self {
        let store = Store::new(
            BookingState::default(),
            BookingReducer::new(),
            BookingEnvironment::new(api, clock),
        );

        Self {
            store,
            requests: Arc::new(AtomicU64::new(0)),
            reply_timeout: SessionConfig::default().reply_timeout,
        }
    }

    /// Create a session talking HTTP to `config.api_url`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Network`] if the HTTP client cannot be built.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let api = HttpBookingApi::with_options(
            config.api_url.as_str(),
            config.http_timeout,
            &config.user_agent,
        )?;
        tracing::info!(api_url = %config.api_url, "Booking session created");

        Ok(Self::new(Arc::new(api)).with_reply_timeout(config.effective_reply_timeout()))
    }

    /// Set how long operations wait for their reply
    ///
    /// When the wait runs out the call fails with
    /// [`StoreError::Timeout`](bus_booking_runtime::StoreError::Timeout), but
    /// the request keeps running and its reply is still applied to the state.
    /// Keep the wait longer than the API's own timeout.
    #[must_use]
    pub const fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    fn next_request(&self) -> RequestId {
        RequestId::new(self.requests.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Send `action` and wait for the event answering `request`
    async fn request(
        &self,
        action: BookingAction,
        request: RequestId,
    ) -> Result<BookingAction, SessionError> {
        let reply = self
            .store
            .send_and_wait_for(
                action,
                |reply| reply.reply_to() == Some(request),
                self.reply_timeout,
            )
            .await?;

        match reply {
            BookingAction::Rejected { error, .. } => Err(error),
            reply => Ok(reply),
        }
    }

    /// Fail with [`SessionError::Superseded`] if `request` is no longer the
    /// latest of its kind
    async fn ensure_latest(
        &self,
        kind: fn(&LatestRequests) -> Option<RequestId>,
        request: RequestId,
    ) -> Result<(), SessionError> {
        let latest = self.store.state(|s| kind(&s.latest)).await;
        if latest == Some(request) {
            Ok(())
        } else {
            Err(SessionError::Superseded)
        }
    }

    /// Load the bus list and statistics concurrently
    ///
    /// # Errors
    ///
    /// Returns the first failure among the two requests.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        let buses = self.next_request();
        let stats = self.next_request();

        let mut replies = self.store.subscribe_actions();
        let mut handle = self
            .store
            .send(BookingAction::Initialize { buses, stats })
            .await?;
        handle.wait_with_timeout(self.reply_timeout).await?;

        // Both replies were broadcast before the handle completed
        let mut first_error = None;
        while let Ok(reply) = replies.try_recv() {
            let failure = match reply {
                BookingAction::BusesLoaded {
                    request,
                    result: Err(error),
                } if request == buses => error,
                BookingAction::StatsLoaded {
                    request,
                    result: Err(error),
                } if request == stats => error,
                _ => continue,
            };
            first_error.get_or_insert(SessionError::from(failure));
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Select a bus and load its seats
    ///
    /// # Errors
    ///
    /// - [`SessionError::Validation`] for an id not matching `BUS` + 3 digits
    /// - [`SessionError::Superseded`] if another bus was selected meanwhile
    /// - [`SessionError::Network`] / [`SessionError::Api`] if the seat map failed to load
    #[tracing::instrument(skip(self))]
    pub async fn select_bus(&self, bus_id: &str) -> Result<SeatMap, SessionError> {
        let request = self.next_request();
        let action = BookingAction::SelectBus {
            request,
            bus_id: bus_id.to_string(),
        };

        match self.request(action, request).await? {
            BookingAction::SeatMapLoaded { result, .. } => {
                self.ensure_latest(|latest| latest.seat_map, request).await?;
                Ok(result?)
            },
            other => Err(SessionError::UnexpectedReply(other.name())),
        }
    }

    /// Select a seat on the selected bus
    ///
    /// # Errors
    ///
    /// - [`SessionError::Validation`] without a selected bus or loaded seat map,
    ///   or for an id outside `S01`–`S40`
    /// - [`SessionError::SeatUnavailable`] if the seat is booked
    #[tracing::instrument(skip(self))]
    pub async fn select_seat(&self, seat_id: &str) -> Result<SeatId, SessionError> {
        let request = self.next_request();
        let action = BookingAction::SelectSeat {
            request,
            seat_id: seat_id.to_string(),
        };

        match self.request(action, request).await? {
            BookingAction::SeatSelected { seat_id, .. } => Ok(seat_id),
            other => Err(SessionError::UnexpectedReply(other.name())),
        }
    }

    /// Book the selected seat
    ///
    /// On success the selection is cleared and the ticket returned; `None`
    /// when the server confirmed the booking without sending the ticket.
    ///
    /// # Errors
    ///
    /// - [`SessionError::SubmissionInProgress`] while another booking is pending
    /// - [`SessionError::Validation`] for a short name or a missing selection
    /// - [`SessionError::Network`] / [`SessionError::Api`] if the booking failed;
    ///   the selection is kept
    #[tracing::instrument(skip(self, name))]
    pub async fn submit_booking(&self, name: &str) -> Result<Option<Ticket>, SessionError> {
        let request = self.next_request();
        let action = BookingAction::SubmitBooking {
            request,
            name: name.to_string(),
        };

        match self.request(action, request).await? {
            BookingAction::BookingSubmitted { result, .. } => Ok(result?),
            other => Err(SessionError::UnexpectedReply(other.name())),
        }
    }

    /// Change the passenger name on a ticket
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Validation`] for a short name, or the API failure.
    #[tracing::instrument(skip(self, name))]
    pub async fn update_ticket(&self, ticket_id: TicketId, name: &str) -> Result<Ticket, SessionError> {
        let request = self.next_request();
        let action = BookingAction::UpdateTicket {
            request,
            ticket_id,
            name: name.to_string(),
        };

        match self.request(action, request).await? {
            BookingAction::TicketUpdated { result, .. } => Ok(result?),
            other => Err(SessionError::UnexpectedReply(other.name())),
        }
    }

    /// Cancel a ticket
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_ticket(&self, ticket_id: TicketId) -> Result<(), SessionError> {
        let request = self.next_request();
        let action = BookingAction::CancelTicket { request, ticket_id };

        match self.request(action, request).await? {
            BookingAction::TicketCancelled { result, .. } => Ok(result?),
            other => Err(SessionError::UnexpectedReply(other.name())),
        }
    }

    /// Reload aggregate statistics
    ///
    /// # Errors
    ///
    /// Returns the API failure, or [`SessionError::Superseded`] if a newer
    /// refresh was issued meanwhile.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_stats(&self) -> Result<Stats, SessionError> {
        let request = self.next_request();

        match self.request(BookingAction::RefreshStats { request }, request).await? {
            BookingAction::StatsLoaded { result, .. } => {
                self.ensure_latest(|latest| latest.stats, request).await?;
                Ok(result?)
            },
            other => Err(SessionError::UnexpectedReply(other.name())),
        }
    }

    /// Reload the bus list
    ///
    /// # Errors
    ///
    /// Returns the API failure, or [`SessionError::Superseded`].
    #[tracing::instrument(skip(self))]
    pub async fn load_buses(&self) -> Result<Vec<BusSummary>, SessionError> {
        let request = self.next_request();

        match self.request(BookingAction::LoadBuses { request }, request).await? {
            BookingAction::BusesLoaded { result, .. } => {
                self.ensure_latest(|latest| latest.buses, request).await?;
                Ok(result?)
            },
            other => Err(SessionError::UnexpectedReply(other.name())),
        }
    }

    /// Load tickets, optionally only those on one bus
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Validation`] for a malformed bus id, the API
    /// failure, or [`SessionError::Superseded`].
    #[tracing::instrument(skip(self))]
    pub async fn list_tickets(&self, bus_id: Option<&str>) -> Result<Vec<Ticket>, SessionError> {
        let bus_id = bus_id
            .map(BusId::parse)
            .transpose()
            .map_err(ValidationError::from)?;
        let request = self.next_request();

        match self.request(BookingAction::ListTickets { request, bus_id }, request).await? {
            BookingAction::TicketsLoaded { result, .. } => {
                self.ensure_latest(|latest| latest.tickets, request).await?;
                Ok(result?)
            },
            other => Err(SessionError::UnexpectedReply(other.name())),
        }
    }

    /// Copy of the whole session state
    pub async fn snapshot(&self) -> BookingState {
        self.store.state(Clone::clone).await
    }

    /// Current phase of the booking flow
    pub async fn phase(&self) -> SessionPhase {
        self.store.state(BookingState::phase).await
    }

    /// Selected bus, if any
    pub async fn selected_bus(&self) -> Option<BusId> {
        self.store.state(|s| s.selected_bus.clone()).await
    }

    /// Selected seat, if any
    pub async fn selected_seat(&self) -> Option<SeatId> {
        self.store.state(|s| s.selected_seat.clone()).await
    }

    /// Ticket from the last successful booking
    pub async fn last_ticket(&self) -> Option<Ticket> {
        self.store.state(|s| s.last_ticket.clone()).await
    }

    /// Most recent message for the user
    pub async fn notification(&self) -> Option<Notification> {
        self.store.state(|s| s.notification.clone()).await
    }

    /// Seat layout of the selected bus, once loaded
    pub async fn seat_grid(&self) -> Option<SeatGrid> {
        self.store.state(SeatGrid::project).await
    }

    /// Stop accepting operations and wait for in-flight requests
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Runtime`] if requests are still running at `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), SessionError> {
        self.store.shutdown(timeout).await?;
        Ok(())
    }
}

impl std::fmt::Debug for BookingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingSession")
            .field("requests_issued", &self.requests.load(Ordering::Relaxed))
            .field("reply_timeout", &self.reply_timeout)
            .finish_non_exhaustive()
    }
}
