//! # Bus Booking Session
//!
//! Client-side booking session: which bus and seat the user picked, whether
//! the booking form may be submitted, and what the server said last.
//!
//! ## Selection state machine
//!
//! ```text
//! Idle --select_bus--> BusSelected --select_seat--> SeatSelected --submit_booking--> Booking
//!  ^                      ^   |                        |   ^                           |  |
//!  |                      +---+ select_bus (reset)     +---+ select_seat               |  |
//!  +--------------------------------------- success ----------------------------------+  |
//!                                     SeatSelected <---------------- failure -------------+
//! ```
//!
//! - [`BookingReducer`] holds every rule; it is pure and tested without I/O
//! - [`BookingSession`] is the async facade used by applications
//! - [`SeatGrid`] projects the selected bus for display
//!
//! ## Example
//!
//! ```ignore
//! use bus_booking_session::{BookingSession, SessionConfig};
//!
//! let session = BookingSession::from_config(&SessionConfig::from_env())?;
//! session.select_bus("BUS001").await?;
//! session.select_seat("S01").await?;
//! if let Some(ticket) = session.submit_booking("John Doe").await? {
//!     println!("Booked ticket {}", ticket.id);
//! }
//! ```

pub mod booking;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod view;

pub use booking::{validate_name, BookingAction, BookingEnvironment, BookingReducer};
pub use config::{SessionConfig, REPLY_MARGIN};
pub use error::{SessionError, ValidationError, MIN_NAME_LEN};
pub use session::BookingSession;
pub use state::{
    BookingState, LatestRequests, Notification, NotificationKind, RequestId, SessionPhase,
};
pub use view::{GridSeat, SeatGrid, SeatRow};
