//! Session error types.

use bus_booking_core::api::ApiError;
use bus_booking_core::types::{BusId, IdError, SeatId};
use bus_booking_runtime::StoreError;
use thiserror::Error;

/// Shortest accepted passenger name, in characters after trimming.
pub const MIN_NAME_LEN: usize = 2;

/// Input rejected before any request is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Bus or seat id in the wrong format
    #[error(transparent)]
    Id(#[from] IdError),

    /// Passenger name too short once trimmed
    #[error("Name must be at least {min} characters")]
    NameTooShort {
        /// Minimum length
        min: usize,
    },

    /// Passenger name contains something other than letters, spaces, `-`, `'` or `.`
    #[error("Name can only contain letters, spaces, hyphens, apostrophes and periods")]
    NameInvalidCharacters,

    /// A seat or booking needs a bus first
    #[error("Please select a bus first")]
    NoBusSelected,

    /// A booking needs a seat
    #[error("Please select a seat")]
    NoSeatSelected,

    /// The selected bus's seats have not been loaded (or failed to load)
    #[error("Seats for {0} are not loaded yet")]
    SeatMapNotLoaded(BusId),
}

/// Errors returned by [`BookingSession`](crate::BookingSession) operations.
///
/// Every variant leaves the session's selection as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Input failed local validation; no request was made
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The seat is booked according to the last loaded seat map
    #[error("Seat {seat} is not available on {bus}")]
    SeatUnavailable {
        /// Selected bus
        bus: BusId,
        /// Requested seat
        seat: SeatId,
    },

    /// The request never reached the server
    #[error("Network error: {0}")]
    Network(String),

    /// The server rejected the request
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Server message, or the generic status text
        message: String,
        /// Server error code, when present
        code: Option<String>,
    },

    /// The server's reply could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Another booking from this session is still in flight
    #[error("A booking is already being submitted")]
    SubmissionInProgress,

    /// A newer request of the same kind replaced this one
    #[error("Superseded by a newer request")]
    Superseded,

    /// The store stopped or the reply never arrived
    #[error("Session runtime error: {0}")]
    Runtime(#[from] StoreError),

    /// A reply of the wrong kind answered the request
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(&'static str),
}

impl SessionError {
    /// Short label for metrics and logs
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::SeatUnavailable { .. } => "seat_unavailable",
            Self::Network(_) => "network",
            Self::Api { .. } => "api",
            Self::InvalidResponse(_) => "invalid_response",
            Self::SubmissionInProgress => "submission_in_progress",
            Self::Superseded => "superseded",
            Self::Runtime(_) => "runtime",
            Self::UnexpectedReply(_) => "unexpected_reply",
        }
    }
}

impl From<ApiError> for SessionError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Network(message) => Self::Network(message),
            ApiError::Api {
                status,
                message,
                code,
            } => Self::Api {
                status,
                message,
                code,
            },
            ApiError::InvalidResponse(message) => Self::InvalidResponse(message),
        }
    }
}
