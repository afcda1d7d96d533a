//! Booking session state.

use bus_booking_core::types::{BusId, BusSummary, SeatId, SeatMap, Stats, Ticket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag carried by a command and by the reply to it.
///
/// Issued in increasing order by the session; a reply is applied only if
/// its id is still the latest issued for that kind of request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw sequence number
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw sequence number
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Latest request issued per kind of fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestRequests {
    /// Seat-map fetch for the selected bus
    pub seat_map: Option<RequestId>,
    /// Aggregate statistics
    pub stats: Option<RequestId>,
    /// Bus list
    pub buses: Option<RequestId>,
    /// Ticket list
    pub tickets: Option<RequestId>,
}

/// Where the session is in the booking flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Nothing selected
    Idle,
    /// A bus is selected, no seat yet
    BusSelected,
    /// Bus and seat selected; ready to book
    SeatSelected,
    /// A booking request is in flight
    Booking,
}

/// Severity of a [`Notification`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Something completed
    Success,
    /// Something failed
    Error,
}

/// The most recent message for the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity
    pub kind: NotificationKind,
    /// Text to display
    pub message: String,
    /// When it was raised
    pub at: DateTime<Utc>,
}

/// State of one booking session.
///
/// `selected_seat` and `seat_map` always belong to `selected_bus`: selecting
/// a bus clears both, and a successful booking clears all three while the
/// booked bus is still the selected one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingState {
    /// Bus the user is booking on
    pub selected_bus: Option<BusId>,
    /// Seat the user picked on `selected_bus`
    pub selected_seat: Option<SeatId>,
    /// Availability of `selected_bus`, once loaded
    pub seat_map: Option<SeatMap>,
    /// Bus list, sorted by id
    pub buses: Vec<BusSummary>,
    /// Last loaded statistics
    pub stats: Option<Stats>,
    /// Last loaded ticket list, sorted by id
    pub tickets: Vec<Ticket>,
    /// Ticket from the last successful booking
    pub last_ticket: Option<Ticket>,
    /// Booking request in flight, if any
    pub submission: Option<RequestId>,
    /// Latest issued request per fetch kind
    pub latest: LatestRequests,
    /// Most recent message for the user
    pub notification: Option<Notification>,
}

impl BookingState {
    /// Current phase of the booking flow
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        if self.submission.is_some() {
            SessionPhase::Booking
        } else if self.selected_seat.is_some() {
            SessionPhase::SeatSelected
        } else if self.selected_bus.is_some() {
            SessionPhase::BusSelected
        } else {
            SessionPhase::Idle
        }
    }

    /// Whether a booking request is in flight
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submission.is_some()
    }

    /// The seat map of the selected bus, if it has loaded
    #[must_use]
    pub fn current_seat_map(&self) -> Option<&SeatMap> {
        self.seat_map
            .as_ref()
            .filter(|map| Some(&map.bus_id) == self.selected_bus.as_ref())
    }
}
