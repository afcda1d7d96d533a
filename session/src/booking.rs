//! The booking session reducer.
//!
//! Every input, whether typed by the user or fed back from a finished
//! request, is a [`BookingAction`] handled in one place:
//!
//! 1. `SelectBus` → store the bus, clear the seat, fetch the seat map
//! 2. `SelectSeat` → check the seat against the loaded seat map
//! 3. `SubmitBooking` → validate the form and `POST /api/tickets`
//! 4. `BookingSubmitted` → keep the ticket and reset the selection, unless
//!    another bus was picked while the booking was in flight
//!
//! Commands that fail validation produce a `Rejected` event and never reach
//! the API. Replies to fetches that were superseded are dropped.

use crate::error::{SessionError, ValidationError, MIN_NAME_LEN};
use crate::state::{BookingState, Notification, NotificationKind, RequestId};
use bus_booking_core::api::{ApiError, BookingApi};
use bus_booking_core::environment::Clock;
use bus_booking_core::types::{
    BookingRequest, BusId, BusSummary, SeatId, SeatMap, Stats, Ticket, TicketId,
};
use bus_booking_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use bus_booking_macros::Action;
use regex::Regex;
use std::sync::{Arc, LazyLock};

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the booking session
#[derive(Action, Clone, Debug, PartialEq)]
pub enum BookingAction {
    // Commands
    /// Load the bus list and statistics together
    #[command]
    Initialize {
        /// Tag for the bus-list fetch
        buses: RequestId,
        /// Tag for the stats fetch
        stats: RequestId,
    },

    /// Select a bus and fetch its seats
    #[command]
    SelectBus {
        /// Request tag
        request: RequestId,
        /// Bus id as entered
        bus_id: String,
    },

    /// Select a seat on the selected bus
    #[command]
    SelectSeat {
        /// Request tag
        request: RequestId,
        /// Seat id as entered
        seat_id: String,
    },

    /// Book the selected seat for a passenger
    #[command]
    SubmitBooking {
        /// Request tag
        request: RequestId,
        /// Passenger name as entered
        name: String,
    },

    /// Change the passenger name on a ticket
    #[command]
    UpdateTicket {
        /// Request tag
        request: RequestId,
        /// Ticket to update
        ticket_id: TicketId,
        /// New passenger name as entered
        name: String,
    },

    /// Cancel a ticket
    #[command]
    CancelTicket {
        /// Request tag
        request: RequestId,
        /// Ticket to cancel
        ticket_id: TicketId,
    },

    /// Reload aggregate statistics
    #[command]
    RefreshStats {
        /// Request tag
        request: RequestId,
    },

    /// Reload the bus list
    #[command]
    LoadBuses {
        /// Request tag
        request: RequestId,
    },

    /// Load tickets, optionally for one bus
    #[command]
    ListTickets {
        /// Request tag
        request: RequestId,
        /// Only tickets on this bus
        bus_id: Option<BusId>,
    },

    // Events
    /// Bus list arrived
    #[event]
    BusesLoaded {
        /// Tag of the fetch
        request: RequestId,
        /// Buses or the failure
        result: Result<Vec<BusSummary>, ApiError>,
    },

    /// Seat map arrived
    #[event]
    SeatMapLoaded {
        /// Tag of the fetch
        request: RequestId,
        /// Bus the fetch was for
        bus_id: BusId,
        /// Seat map or the failure
        result: Result<SeatMap, ApiError>,
    },

    /// Seat selection accepted
    #[event]
    SeatSelected {
        /// Tag of the command
        request: RequestId,
        /// Selected seat
        seat_id: SeatId,
    },

    /// Booking request finished
    #[event]
    BookingSubmitted {
        /// Tag of the command
        request: RequestId,
        /// What was sent
        booking: BookingRequest,
        /// Booked ticket (`None` if the server did not return it) or the failure
        result: Result<Option<Ticket>, ApiError>,
    },

    /// Ticket update finished
    #[event]
    TicketUpdated {
        /// Tag of the command
        request: RequestId,
        /// Updated ticket or the failure
        result: Result<Ticket, ApiError>,
    },

    /// Ticket cancellation finished
    #[event]
    TicketCancelled {
        /// Tag of the command
        request: RequestId,
        /// Ticket that was cancelled
        ticket_id: TicketId,
        /// Outcome
        result: Result<(), ApiError>,
    },

    /// Statistics arrived
    #[event]
    StatsLoaded {
        /// Tag of the fetch
        request: RequestId,
        /// Statistics or the failure
        result: Result<Stats, ApiError>,
    },

    /// Ticket list arrived
    #[event]
    TicketsLoaded {
        /// Tag of the fetch
        request: RequestId,
        /// Tickets or the failure
        result: Result<Vec<Ticket>, ApiError>,
    },

    /// A command failed local checks; nothing was sent
    #[event]
    Rejected {
        /// Tag of the command
        request: RequestId,
        /// Why it was rejected
        error: SessionError,
    },
}

impl BookingAction {
    /// The request an event answers
    #[must_use]
    pub const fn reply_to(&self) -> Option<RequestId> {
        match self {
            Self::BusesLoaded { request, .. }
            | Self::SeatMapLoaded { request, .. }
            | Self::SeatSelected { request, .. }
            | Self::BookingSubmitted { request, .. }
            | Self::TicketUpdated { request, .. }
            | Self::TicketCancelled { request, .. }
            | Self::StatsLoaded { request, .. }
            | Self::TicketsLoaded { request, .. }
            | Self::Rejected { request, .. } => Some(*request),
            _ => None,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Collaborators the reducer's effects use
#[derive(Clone)]
pub struct BookingEnvironment {
    /// The booking API
    pub api: Arc<dyn BookingApi>,
    /// Clock for notification timestamps
    pub clock: Arc<dyn Clock>,
}

impl BookingEnvironment {
    /// Create an environment
    #[must_use]
    pub fn new(api: Arc<dyn BookingApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the booking session
#[derive(Clone, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Seat to select, checked against the selected bus's seat map
    fn validate_seat(state: &BookingState, seat_id: &str) -> Result<SeatId, SessionError> {
        let bus = state
            .selected_bus
            .as_ref()
            .ok_or(ValidationError::NoBusSelected)?;
        let seat = SeatId::parse(seat_id).map_err(ValidationError::from)?;
        let map = state
            .current_seat_map()
            .ok_or_else(|| ValidationError::SeatMapNotLoaded(bus.clone()))?;

        if !map.is_available(&seat) {
            return Err(SessionError::SeatUnavailable {
                bus: bus.clone(),
                seat,
            });
        }
        Ok(seat)
    }

    /// Request body for a booking, or why it cannot be sent
    fn booking_request(state: &BookingState, name: &str) -> Result<BookingRequest, SessionError> {
        if state.is_submitting() {
            return Err(SessionError::SubmissionInProgress);
        }

        let name = validate_name(name)?;
        let bus = state
            .selected_bus
            .clone()
            .ok_or(ValidationError::NoBusSelected)?;
        let seat = state
            .selected_seat
            .clone()
            .ok_or(ValidationError::NoSeatSelected)?;

        Ok(BookingRequest { name, bus, seat })
    }
}

#[allow(clippy::unwrap_used)] // Literal pattern, checked by tests
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z\s'.-]+$").unwrap());

/// Trimmed passenger name with at least [`MIN_NAME_LEN`] characters
///
/// # Errors
///
/// - [`ValidationError::NameTooShort`] for shorter names
/// - [`ValidationError::NameInvalidCharacters`] for anything but letters,
///   whitespace, `-`, `'` and `.`
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::NameTooShort { min: MIN_NAME_LEN });
    }
    if !NAME_PATTERN.is_match(trimmed) {
        return Err(ValidationError::NameInvalidCharacters);
    }
    Ok(trimmed.to_string())
}

fn reject(request: RequestId, error: SessionError) -> SmallVec<[Effect<BookingAction>; 4]> {
    tracing::warn!(%request, reason = error.reason(), %error, "Command rejected");
    metrics::counter!("booking.rejections", "reason" => error.reason()).increment(1);
    smallvec![Effect::emit(BookingAction::Rejected { request, error })]
}

/// Whether `request` is still the latest issued for `kind`
fn is_current(latest: Option<RequestId>, request: RequestId, kind: &'static str) -> bool {
    if latest == Some(request) {
        return true;
    }
    tracing::debug!(%request, ?latest, kind, "Discarding stale response");
    metrics::counter!("booking.stale_responses", "kind" => kind).increment(1);
    false
}

fn notify(
    state: &mut BookingState,
    env: &BookingEnvironment,
    kind: NotificationKind,
    message: String,
) {
    state.notification = Some(Notification {
        kind,
        message,
        at: env.clock.now(),
    });
}

fn notify_failure(state: &mut BookingState, env: &BookingEnvironment, context: &str, error: &ApiError) {
    notify(
        state,
        env,
        NotificationKind::Error,
        format!("{context}: {}", error.user_message()),
    );
}

// Effects: each runs one API call and feeds the outcome back as an event

fn load_buses(env: &BookingEnvironment, request: RequestId) -> Effect<BookingAction> {
    let api = Arc::clone(&env.api);
    Effect::Future(Box::pin(async move {
        let result = api.list_buses().await;
        Some(BookingAction::BusesLoaded { request, result })
    }))
}

fn load_stats(env: &BookingEnvironment, request: RequestId) -> Effect<BookingAction> {
    let api = Arc::clone(&env.api);
    Effect::Future(Box::pin(async move {
        let result = api.stats().await;
        Some(BookingAction::StatsLoaded { request, result })
    }))
}

fn load_seat_map(env: &BookingEnvironment, request: RequestId, bus_id: BusId) -> Effect<BookingAction> {
    let api = Arc::clone(&env.api);
    Effect::Future(Box::pin(async move {
        let result = api.seat_map(bus_id.clone()).await;
        Some(BookingAction::SeatMapLoaded {
            request,
            bus_id,
            result,
        })
    }))
}

fn load_tickets(
    env: &BookingEnvironment,
    request: RequestId,
    bus_id: Option<BusId>,
) -> Effect<BookingAction> {
    let api = Arc::clone(&env.api);
    Effect::Future(Box::pin(async move {
        let result = api.list_tickets(bus_id).await;
        Some(BookingAction::TicketsLoaded { request, result })
    }))
}

fn create_ticket(
    env: &BookingEnvironment,
    request: RequestId,
    booking: BookingRequest,
) -> Effect<BookingAction> {
    let api = Arc::clone(&env.api);
    Effect::Future(Box::pin(async move {
        let result = api.create_ticket(booking.clone()).await;
        Some(BookingAction::BookingSubmitted {
            request,
            booking,
            result,
        })
    }))
}

fn update_ticket(
    env: &BookingEnvironment,
    request: RequestId,
    ticket_id: TicketId,
    name: String,
) -> Effect<BookingAction> {
    let api = Arc::clone(&env.api);
    Effect::Future(Box::pin(async move {
        let result = api.update_ticket(ticket_id, name).await;
        Some(BookingAction::TicketUpdated { request, result })
    }))
}

fn cancel_ticket(env: &BookingEnvironment, request: RequestId, ticket_id: TicketId) -> Effect<BookingAction> {
    let api = Arc::clone(&env.api);
    Effect::Future(Box::pin(async move {
        let result = api.cancel_ticket(ticket_id).await;
        Some(BookingAction::TicketCancelled {
            request,
            ticket_id,
            result,
        })
    }))
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        tracing::trace!(action = action.name(), "Reducing booking action");

        match action {
            // ========== Commands ==========
            BookingAction::Initialize { buses, stats } => {
                state.latest.buses = Some(buses);
                state.latest.stats = Some(stats);
                smallvec![Effect::merge(vec![
                    load_buses(env, buses),
                    load_stats(env, stats),
                ])]
            },

            BookingAction::SelectBus { request, bus_id } => {
                let bus_id = match BusId::parse(&bus_id) {
                    Ok(bus_id) => bus_id,
                    Err(error) => return reject(request, ValidationError::from(error).into()),
                };

                tracing::debug!(%bus_id, %request, "Bus selected");
                state.selected_bus = Some(bus_id.clone());
                state.selected_seat = None;
                state.seat_map = None;
                state.latest.seat_map = Some(request);

                smallvec![load_seat_map(env, request, bus_id)]
            },

            BookingAction::SelectSeat { request, seat_id } => {
                match Self::validate_seat(state, &seat_id) {
                    Ok(seat_id) => {
                        tracing::debug!(%seat_id, "Seat selected");
                        state.selected_seat = Some(seat_id.clone());
                        smallvec![Effect::emit(BookingAction::SeatSelected { request, seat_id })]
                    },
                    Err(error) => reject(request, error),
                }
            },

            BookingAction::SubmitBooking { request, name } => {
                match Self::booking_request(state, &name) {
                    Ok(booking) => {
                        tracing::info!(
                            bus = %booking.bus,
                            seat = %booking.seat,
                            %request,
                            "Submitting booking"
                        );
                        state.submission = Some(request);
                        smallvec![create_ticket(env, request, booking)]
                    },
                    Err(error) => reject(request, error),
                }
            },

            BookingAction::UpdateTicket {
                request,
                ticket_id,
                name,
            } => match validate_name(&name) {
                Ok(name) => smallvec![update_ticket(env, request, ticket_id, name)],
                Err(error) => reject(request, error.into()),
            },

            BookingAction::CancelTicket { request, ticket_id } => {
                smallvec![cancel_ticket(env, request, ticket_id)]
            },

            BookingAction::RefreshStats { request } => {
                state.latest.stats = Some(request);
                smallvec![load_stats(env, request)]
            },

            BookingAction::LoadBuses { request } => {
                state.latest.buses = Some(request);
                smallvec![load_buses(env, request)]
            },

            BookingAction::ListTickets { request, bus_id } => {
                state.latest.tickets = Some(request);
                smallvec![load_tickets(env, request, bus_id)]
            },

            // ========== Events ==========
            BookingAction::SeatMapLoaded {
                request,
                bus_id,
                result,
            } => {
                if !is_current(state.latest.seat_map, request, "seat_map") {
                    return smallvec![Effect::None];
                }

                match result {
                    Ok(map) => {
                        tracing::debug!(%bus_id, available = map.available_count(), "Seat map loaded");
                        state.seat_map = Some(map);
                    },
                    Err(error) => {
                        tracing::warn!(%bus_id, %error, "Seat map failed to load");
                        notify_failure(state, env, &format!("Failed to load seats for {bus_id}"), &error);
                    },
                }
                smallvec![Effect::None]
            },

            BookingAction::SeatSelected { .. } => smallvec![Effect::None],

            BookingAction::BookingSubmitted {
                request,
                booking,
                result,
            } => {
                if state.submission != Some(request) {
                    tracing::debug!(%request, "Discarding reply to an unknown booking");
                    return smallvec![Effect::None];
                }
                state.submission = None;

                match result {
                    Ok(ticket) => {
                        let message = match &ticket {
                            Some(ticket) => {
                                tracing::info!(ticket_id = %ticket.id, "Booking confirmed");
                                format!("Ticket booked successfully! Ticket ID: {}", ticket.id)
                            },
                            None => {
                                tracing::info!(
                                    bus = %booking.bus,
                                    seat = %booking.seat,
                                    "Booking confirmed without a ticket"
                                );
                                "Ticket booked successfully!".to_string()
                            },
                        };
                        notify(state, env, NotificationKind::Success, message);

                        if state.selected_bus.as_ref() == Some(&booking.bus) {
                            state.selected_bus = None;
                            state.selected_seat = None;
                            state.seat_map = None;
                            // A seat-map fetch still in flight belongs to the old selection
                            state.latest.seat_map = None;
                        } else {
                            tracing::debug!(
                                booked = %booking.bus,
                                selected = ?state.selected_bus,
                                "Keeping the selection made while booking"
                            );
                        }
                        state.last_ticket = ticket;
                    },
                    Err(error) => {
                        tracing::warn!(%error, "Booking failed");
                        notify_failure(state, env, "Booking failed", &error);
                    },
                }
                smallvec![Effect::None]
            },

            BookingAction::TicketUpdated { result, .. } => {
                match result {
                    Ok(ticket) => {
                        notify(
                            state,
                            env,
                            NotificationKind::Success,
                            format!("Ticket {} updated", ticket.id),
                        );
                        if let Some(listed) = state.tickets.iter_mut().find(|t| t.id == ticket.id) {
                            *listed = ticket.clone();
                        }
                        if state.last_ticket.as_ref().is_some_and(|t| t.id == ticket.id) {
                            state.last_ticket = Some(ticket);
                        }
                    },
                    Err(error) => notify_failure(state, env, "Update failed", &error),
                }
                smallvec![Effect::None]
            },

            BookingAction::TicketCancelled {
                ticket_id, result, ..
            } => {
                match result {
                    Ok(()) => {
                        notify(
                            state,
                            env,
                            NotificationKind::Success,
                            format!("Ticket {ticket_id} cancelled"),
                        );
                        state.tickets.retain(|t| t.id != ticket_id);
                        if state.last_ticket.as_ref().is_some_and(|t| t.id == ticket_id) {
                            state.last_ticket = None;
                        }
                    },
                    Err(error) => notify_failure(state, env, "Cancellation failed", &error),
                }
                smallvec![Effect::None]
            },

            BookingAction::StatsLoaded { request, result } => {
                if !is_current(state.latest.stats, request, "stats") {
                    return smallvec![Effect::None];
                }
                match result {
                    Ok(stats) => state.stats = Some(stats),
                    Err(error) => notify_failure(state, env, "Failed to load statistics", &error),
                }
                smallvec![Effect::None]
            },

            BookingAction::BusesLoaded { request, result } => {
                if !is_current(state.latest.buses, request, "buses") {
                    return smallvec![Effect::None];
                }
                match result {
                    Ok(buses) => state.buses = buses,
                    Err(error) => notify_failure(state, env, "Failed to load buses", &error),
                }
                smallvec![Effect::None]
            },

            BookingAction::TicketsLoaded { request, result } => {
                if !is_current(state.latest.tickets, request, "tickets") {
                    return smallvec![Effect::None];
                }
                match result {
                    Ok(tickets) => state.tickets = tickets,
                    Err(error) => notify_failure(state, env, "Failed to load tickets", &error),
                }
                smallvec![Effect::None]
            },

            BookingAction::Rejected { error, .. } => {
                notify(state, env, NotificationKind::Error, error.to_string());
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::state::SessionPhase;
    use bus_booking_testing::{
        assertions, resolve_effects, test_clock, ApiCall, MockBookingApi, ReducerTest,
    };
    use proptest::prelude::*;

    fn bus(id: &str) -> BusId {
        BusId::parse(id).unwrap()
    }

    fn seat(id: &str) -> SeatId {
        SeatId::parse(id).unwrap()
    }

    fn req(id: u64) -> RequestId {
        RequestId::new(id)
    }

    fn env(api: &MockBookingApi) -> BookingEnvironment {
        BookingEnvironment::new(Arc::new(api.clone()), Arc::new(test_clock()))
    }

    /// BUS001 selected with its seat map loaded under request #1
    fn bus_selected(available: &[&str]) -> BookingState {
        BookingState {
            selected_bus: Some(bus("BUS001")),
            seat_map: Some(SeatMap::from_available(bus("BUS001"), 40, available)),
            latest: crate::state::LatestRequests {
                seat_map: Some(req(1)),
                ..Default::default()
            },
            ..BookingState::default()
        }
    }

    fn seat_selected() -> BookingState {
        BookingState {
            selected_seat: Some(seat("S01")),
            ..bus_selected(&["S01", "S02"])
        }
    }

    fn john_on_s01() -> BookingRequest {
        BookingRequest {
            name: "John Doe".to_string(),
            bus: bus("BUS001"),
            seat: seat("S01"),
        }
    }

    fn reduce(
        state: &mut BookingState,
        action: BookingAction,
        env: &BookingEnvironment,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        BookingReducer::new().reduce(state, action, env)
    }

    async fn rejection_of(effects: SmallVec<[Effect<BookingAction>; 4]>) -> SessionError {
        match resolve_effects(effects).await.as_slice() {
            [BookingAction::Rejected { error, .. }] => error.clone(),
            other => panic!("expected a single rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_select_bus_resets_seat_and_fetches_map() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(seat_selected())
            .when_action(BookingAction::SelectBus {
                request: req(2),
                bus_id: "BUS002".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.selected_bus, Some(bus("BUS002")));
                assert_eq!(state.selected_seat, None);
                assert_eq!(state.seat_map, None);
                assert_eq!(state.latest.seat_map, Some(req(2)));
                assert_eq!(state.phase(), SessionPhase::BusSelected);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_booked_seat_on_loaded_map_is_rejected() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_actions([
                BookingAction::SelectBus {
                    request: req(1),
                    bus_id: "BUS001".to_string(),
                },
                BookingAction::SeatMapLoaded {
                    request: req(1),
                    bus_id: bus("BUS001"),
                    result: Ok(SeatMap::from_available(bus("BUS001"), 40, ["S02"])),
                },
            ])
            .when_action(BookingAction::SelectSeat {
                request: req(2),
                seat_id: "S01".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.selected_seat, None);
                assert_eq!(state.phase(), SessionPhase::BusSelected);
            })
            .then_feedback(|actions| match actions {
                [BookingAction::Rejected { request, error }] => {
                    assert_eq!(*request, req(2));
                    assert_eq!(
                        *error,
                        SessionError::SeatUnavailable {
                            bus: bus("BUS001"),
                            seat: seat("S01"),
                        }
                    );
                },
                other => panic!("expected a rejection, got {other:?}"),
            })
            .run();
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_free_seat_is_confirmed_by_feedback() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(bus_selected(&["S01", "S02"]))
            .when_action(BookingAction::SelectSeat {
                request: req(2),
                seat_id: "S02".to_string(),
            })
            .then_state(|state| assert_eq!(state.selected_seat, Some(seat("S02"))))
            .then_feedback(|actions| {
                assert_eq!(
                    actions,
                    [BookingAction::SeatSelected {
                        request: req(2),
                        seat_id: seat("S02"),
                    }]
                );
            })
            .run();
    }

    #[tokio::test]
    async fn test_invalid_bus_id_is_rejected_without_fetch() {
        let api = MockBookingApi::new();
        let env = env(&api);
        let mut state = seat_selected();
        let before = state.clone();

        let effects = reduce(
            &mut state,
            BookingAction::SelectBus {
                request: req(2),
                bus_id: "bus1".to_string(),
            },
            &env,
        );

        assert_eq!(state, before);
        assert!(matches!(
            rejection_of(effects).await,
            SessionError::Validation(ValidationError::Id(_))
        ));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_booked_seat_is_rejected_and_selection_kept() {
        let api = MockBookingApi::new();
        let env = env(&api);
        let mut state = seat_selected();

        let effects = reduce(
            &mut state,
            BookingAction::SelectSeat {
                request: req(3),
                seat_id: "S03".to_string(),
            },
            &env,
        );

        assert_eq!(state.selected_seat, Some(seat("S01")));
        assert_eq!(
            rejection_of(effects).await,
            SessionError::SeatUnavailable {
                bus: bus("BUS001"),
                seat: seat("S03"),
            }
        );
    }

    #[tokio::test]
    async fn test_available_seat_is_selected() {
        let api = MockBookingApi::new();
        let env = env(&api);
        let mut state = seat_selected();

        let effects = reduce(
            &mut state,
            BookingAction::SelectSeat {
                request: req(3),
                seat_id: "S02".to_string(),
            },
            &env,
        );

        assert_eq!(state.selected_seat, Some(seat("S02")));
        assert_eq!(
            resolve_effects(effects).await,
            vec![BookingAction::SeatSelected {
                request: req(3),
                seat_id: seat("S02"),
            }]
        );
    }

    #[tokio::test]
    async fn test_seat_needs_bus_and_loaded_map() {
        let api = MockBookingApi::new();
        let env = env(&api);

        let mut idle = BookingState::default();
        let effects = reduce(
            &mut idle,
            BookingAction::SelectSeat {
                request: req(1),
                seat_id: "S01".to_string(),
            },
            &env,
        );
        assert_eq!(
            rejection_of(effects).await,
            SessionError::Validation(ValidationError::NoBusSelected)
        );

        let mut loading = BookingState {
            selected_bus: Some(bus("BUS001")),
            ..BookingState::default()
        };
        let effects = reduce(
            &mut loading,
            BookingAction::SelectSeat {
                request: req(2),
                seat_id: "S01".to_string(),
            },
            &env,
        );
        assert_eq!(
            rejection_of(effects).await,
            SessionError::Validation(ValidationError::SeatMapNotLoaded(bus("BUS001")))
        );
        assert_eq!(loading.selected_seat, None);
    }

    #[tokio::test]
    async fn test_invalid_booking_makes_no_request() {
        let api = MockBookingApi::new().with_empty_bus("BUS001", 40);
        let env = env(&api);

        let cases = [
            (seat_selected(), "J"),
            (seat_selected(), "   J   "),
            (bus_selected(&["S01"]), "John Doe"),
            (BookingState::default(), "John Doe"),
        ];

        for (mut state, name) in cases {
            let before = state.clone();
            let effects = reduce(
                &mut state,
                BookingAction::SubmitBooking {
                    request: req(9),
                    name: name.to_string(),
                },
                &env,
            );

            assert!(matches!(
                rejection_of(effects).await,
                SessionError::Validation(_)
            ));
            assert_eq!(state.selected_bus, before.selected_bus);
            assert_eq!(state.selected_seat, before.selected_seat);
            assert!(!state.is_submitting());
        }

        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected_while_first_in_flight() {
        let api = MockBookingApi::new().with_bus("BUS001", 40, &["S01", "S02"]);
        let env = env(&api);
        let mut state = seat_selected();

        let first = reduce(
            &mut state,
            BookingAction::SubmitBooking {
                request: req(5),
                name: "John Doe".to_string(),
            },
            &env,
        );
        assert_eq!(state.phase(), SessionPhase::Booking);

        let second = reduce(
            &mut state,
            BookingAction::SubmitBooking {
                request: req(6),
                name: "John Doe".to_string(),
            },
            &env,
        );
        assert_eq!(
            rejection_of(second).await,
            SessionError::SubmissionInProgress
        );

        let replies = resolve_effects(first).await;
        assert_eq!(api.create_count(), 1);
        assert!(matches!(
            replies.as_slice(),
            [BookingAction::BookingSubmitted { result: Ok(_), .. }]
        ));
    }

    #[tokio::test]
    async fn test_booking_sends_trimmed_name() {
        let api = MockBookingApi::new().with_bus("BUS001", 40, &["S01", "S02"]);
        let env = env(&api);
        let mut state = seat_selected();

        let effects = reduce(
            &mut state,
            BookingAction::SubmitBooking {
                request: req(5),
                name: "  John Doe ".to_string(),
            },
            &env,
        );
        resolve_effects(effects).await;

        assert_eq!(
            api.calls(),
            vec![ApiCall::CreateTicket(BookingRequest {
                name: "John Doe".to_string(),
                bus: bus("BUS001"),
                seat: seat("S01"),
            })]
        );
    }

    #[test]
    fn test_successful_booking_returns_to_idle() {
        let api = MockBookingApi::new();
        let ticket = Ticket {
            id: TicketId(1),
            name: "John Doe".to_string(),
            bus: "BUS001".to_string(),
            seat: "S01".to_string(),
            status: bus_booking_core::types::TicketStatus::Confirmed,
            booking_time: None,
            fare: Some(97.5),
            seat_type: Some("premium".to_string()),
        };

        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(BookingState {
                submission: Some(req(5)),
                ..seat_selected()
            })
            .when_action(BookingAction::BookingSubmitted {
                request: req(5),
                booking: john_on_s01(),
                result: Ok(Some(ticket)),
            })
            .then_state(|state| {
                assert_eq!(state.phase(), SessionPhase::Idle);
                assert_eq!(state.selected_bus, None);
                assert_eq!(state.selected_seat, None);
                assert_eq!(state.latest.seat_map, None);
                assert_eq!(state.last_ticket.as_ref().map(|t| t.id), Some(TicketId(1)));
                let notification = state.notification.as_ref().unwrap();
                assert_eq!(notification.kind, NotificationKind::Success);
                assert_eq!(notification.at, test_clock().now());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_booking_confirmed_without_ticket_returns_to_idle() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(BookingState {
                submission: Some(req(5)),
                ..seat_selected()
            })
            .when_action(BookingAction::BookingSubmitted {
                request: req(5),
                booking: john_on_s01(),
                result: Ok(None),
            })
            .then_state(|state| {
                assert_eq!(state.phase(), SessionPhase::Idle);
                assert_eq!(state.last_ticket, None);
                let notification = state.notification.as_ref().unwrap();
                assert_eq!(notification.kind, NotificationKind::Success);
                assert_eq!(notification.message, "Ticket booked successfully!");
            })
            .run();
    }

    #[test]
    fn test_booking_keeps_bus_selected_meanwhile() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(BookingState {
                submission: Some(req(5)),
                ..seat_selected()
            })
            .given_actions([BookingAction::SelectBus {
                request: req(6),
                bus_id: "BUS002".to_string(),
            }])
            .when_action(BookingAction::BookingSubmitted {
                request: req(5),
                booking: john_on_s01(),
                result: Ok(None),
            })
            .then_state(|state| {
                assert_eq!(state.phase(), SessionPhase::BusSelected);
                assert_eq!(state.selected_bus, Some(bus("BUS002")));
                assert_eq!(state.latest.seat_map, Some(req(6)));
                assert_eq!(
                    state.notification.as_ref().map(|n| n.kind),
                    Some(NotificationKind::Success)
                );
            })
            .run();
    }

    #[test]
    fn test_failed_booking_keeps_selection() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(BookingState {
                submission: Some(req(5)),
                ..seat_selected()
            })
            .when_action(BookingAction::BookingSubmitted {
                request: req(5),
                booking: john_on_s01(),
                result: Err(ApiError::Api {
                    status: 409,
                    message: "Seat S01 is not available on BUS001".to_string(),
                    code: Some("SEAT_NOT_AVAILABLE".to_string()),
                }),
            })
            .then_state(|state| {
                assert_eq!(state.selected_bus, Some(bus("BUS001")));
                assert_eq!(state.selected_seat, Some(seat("S01")));
                assert!(!state.is_submitting());
                let notification = state.notification.as_ref().unwrap();
                assert_eq!(notification.kind, NotificationKind::Error);
                assert_eq!(
                    notification.message,
                    "Booking failed: Seat S01 is not available on BUS001"
                );
            })
            .run();
    }

    #[test]
    fn test_stale_seat_map_is_discarded() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(BookingState {
                selected_bus: Some(bus("BUS002")),
                latest: crate::state::LatestRequests {
                    seat_map: Some(req(2)),
                    ..Default::default()
                },
                ..BookingState::default()
            })
            .when_action(BookingAction::SeatMapLoaded {
                request: req(1),
                bus_id: bus("BUS001"),
                result: Ok(SeatMap::from_available(bus("BUS001"), 40, ["S01"])),
            })
            .then_state(|state| {
                assert_eq!(state.seat_map, None);
                assert_eq!(state.selected_bus, Some(bus("BUS002")));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_seat_map_failure_keeps_bus_selected() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(BookingState {
                selected_bus: Some(bus("BUS007")),
                latest: crate::state::LatestRequests {
                    seat_map: Some(req(3)),
                    ..Default::default()
                },
                ..BookingState::default()
            })
            .when_action(BookingAction::SeatMapLoaded {
                request: req(3),
                bus_id: bus("BUS007"),
                result: Err(ApiError::Network("connection refused".to_string())),
            })
            .then_state(|state| {
                assert_eq!(state.selected_bus, Some(bus("BUS007")));
                assert_eq!(state.seat_map, None);
                assert_eq!(
                    state.notification.as_ref().unwrap().message,
                    "Failed to load seats for BUS007: connection refused"
                );
            })
            .run();
    }

    #[test]
    fn test_stale_stats_are_discarded() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(BookingState {
                latest: crate::state::LatestRequests {
                    stats: Some(req(8)),
                    ..Default::default()
                },
                ..BookingState::default()
            })
            .when_action(BookingAction::StatsLoaded {
                request: req(7),
                result: Ok(Stats {
                    total_tickets: 1,
                    total_buses: 1,
                    total_seats: None,
                    booked_seats: 1,
                    available_seats: 39,
                    overall_occupancy: 2.5,
                }),
            })
            .then_state(|state| assert_eq!(state.stats, None))
            .run();
    }

    #[tokio::test]
    async fn test_initialize_loads_buses_and_stats_together() {
        let api = MockBookingApi::new().with_empty_bus("BUS001", 40);
        let env = env(&api);
        let mut state = BookingState::default();

        let effects = reduce(
            &mut state,
            BookingAction::Initialize {
                buses: req(1),
                stats: req(2),
            },
            &env,
        );
        assertions::assert_has_parallel_effect(&effects);

        for action in resolve_effects(effects).await {
            reduce(&mut state, action, &env);
        }

        assert_eq!(state.buses.len(), 1);
        assert_eq!(state.stats.as_ref().map(|s| s.available_seats), Some(40));
        assert_eq!(state.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_older_ticket_listing_is_discarded() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_actions([
                BookingAction::ListTickets {
                    request: req(1),
                    bus_id: None,
                },
                BookingAction::ListTickets {
                    request: req(2),
                    bus_id: Some(bus("BUS002")),
                },
            ])
            .when_action(BookingAction::TicketsLoaded {
                request: req(1),
                result: Ok(vec![Ticket {
                    id: TicketId(1),
                    name: "John Doe".to_string(),
                    bus: "BUS001".to_string(),
                    seat: "S01".to_string(),
                    status: bus_booking_core::types::TicketStatus::Confirmed,
                    booking_time: None,
                    fare: None,
                    seat_type: None,
                }]),
            })
            .then_state(|state| {
                assert!(state.tickets.is_empty());
                assert_eq!(state.latest.tickets, Some(req(2)));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_bus_list_failure_is_fed_back() {
        let api = MockBookingApi::new().with_empty_bus("BUS001", 40);
        api.fail_next_list_buses(ApiError::Network("connection refused".to_string()));
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(BookingState {
                buses: vec![BusSummary {
                    bus_number: "BUS007".to_string(),
                    route: None,
                    total_seats: 40,
                    booked_seats: 0,
                    available_seats: 40,
                    occupancy_rate: 0.0,
                    price: None,
                }],
                ..BookingState::default()
            })
            .when_action(BookingAction::LoadBuses { request: req(4) })
            .then_state(|state| assert_eq!(state.latest.buses, Some(req(4))))
            .then_feedback(|actions| {
                assert!(matches!(
                    actions,
                    [BookingAction::BusesLoaded {
                        result: Err(ApiError::Network(_)),
                        ..
                    }]
                ));
            })
            .run();
        assert_eq!(api.calls(), vec![ApiCall::ListBuses]);
    }

    #[tokio::test]
    async fn test_update_ticket_validates_name() {
        let api = MockBookingApi::new();
        let env = env(&api);
        let mut state = BookingState::default();

        let effects = reduce(
            &mut state,
            BookingAction::UpdateTicket {
                request: req(1),
                ticket_id: TicketId(4),
                name: " x ".to_string(),
            },
            &env,
        );

        assert_eq!(
            rejection_of(effects).await,
            SessionError::Validation(ValidationError::NameTooShort { min: 2 })
        );
        assert_eq!(api.call_count(), 0);
    }

    #[test]
    fn test_name_charset() {
        assert_eq!(
            validate_name(" Mary-Jane O'Neil Jr. ").as_deref(),
            Ok("Mary-Jane O'Neil Jr.")
        );
        for name in ["John3", "Ann_Lee", "Bo@Li", "José"] {
            assert_eq!(
                validate_name(name),
                Err(ValidationError::NameInvalidCharacters),
                "{name}"
            );
        }
    }

    #[test]
    fn test_booking_rejects_name_with_digits_locally() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(seat_selected())
            .when_action(BookingAction::SubmitBooking {
                request: req(5),
                name: "R2D2".to_string(),
            })
            .then_state(|state| assert_eq!(state.phase(), SessionPhase::SeatSelected))
            .then_feedback(|actions| {
                assert!(matches!(
                    actions,
                    [BookingAction::Rejected {
                        error: SessionError::Validation(ValidationError::NameInvalidCharacters),
                        ..
                    }]
                ));
            })
            .run();
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_ticket_leaves_listing() {
        let api = MockBookingApi::new().with_bus("BUS001", 40, &["S01", "S02"]);
        let env = env(&api);
        let ticket = api
            .create_ticket(BookingRequest {
                name: "Ann Lee".to_string(),
                bus: bus("BUS001"),
                seat: seat("S02"),
            })
            .await
            .unwrap()
            .unwrap();

        let mut state = BookingState {
            tickets: vec![ticket.clone()],
            last_ticket: Some(ticket.clone()),
            ..BookingState::default()
        };

        let effects = reduce(
            &mut state,
            BookingAction::CancelTicket {
                request: req(1),
                ticket_id: ticket.id,
            },
            &env,
        );
        for action in resolve_effects(effects).await {
            reduce(&mut state, action, &env);
        }

        assert!(state.tickets.is_empty());
        assert_eq!(state.last_ticket, None);
        assert!(api.tickets().is_empty());
    }

    #[test]
    fn test_rejection_raises_notification() {
        let api = MockBookingApi::new();
        ReducerTest::new(BookingReducer::new())
            .with_env(env(&api))
            .given_state(seat_selected())
            .when_action(BookingAction::Rejected {
                request: req(4),
                error: SessionError::SeatUnavailable {
                    bus: bus("BUS001"),
                    seat: seat("S03"),
                },
            })
            .then_state(|state| {
                assert_eq!(state.selected_seat, Some(seat("S01")));
                assert_eq!(
                    state.notification.as_ref().unwrap().message,
                    "Seat S03 is not available on BUS001"
                );
            })
            .run();
    }

    #[test]
    fn test_action_classification() {
        let command = BookingAction::RefreshStats { request: req(1) };
        assert!(command.is_command());
        assert_eq!(command.reply_to(), None);

        let event = BookingAction::StatsLoaded {
            request: req(1),
            result: Err(ApiError::Network("down".to_string())),
        };
        assert!(event.is_event());
        assert_eq!(event.reply_to(), Some(req(1)));
        assert_eq!(event.name(), "StatsLoaded");
    }

    proptest! {
        #[test]
        fn prop_select_bus_sets_bus_and_clears_seat(
            bus_id in bus_booking_testing::properties::bus_id(),
        ) {
            let api = MockBookingApi::new();
            let env = env(&api);
            let mut state = seat_selected();

            reduce(
                &mut state,
                BookingAction::SelectBus { request: req(2), bus_id: bus_id.clone() },
                &env,
            );

            prop_assert_eq!(state.selected_bus.as_ref().map(BusId::as_str), Some(bus_id.as_str()));
            prop_assert_eq!(state.selected_seat, None);
        }

        #[test]
        fn prop_name_rule_counts_trimmed_chars(name in "[A-Za-z .'-]{0,6}") {
            let trimmed_len = name.trim().chars().count();
            prop_assert_eq!(validate_name(&name).is_ok(), trimmed_len >= MIN_NAME_LEN);
        }

        #[test]
        fn prop_names_with_digits_are_rejected(
            name in bus_booking_testing::properties::passenger_name(),
            digit in 0u8..=9,
        ) {
            let name = format!("{name}{digit}");
            prop_assert_eq!(
                validate_name(&name),
                Err(ValidationError::NameInvalidCharacters)
            );
        }
    }
}
