//! # Bus Booking API Client
//!
//! reqwest implementation of [`BookingApi`](bus_booking_core::api::BookingApi)
//! for the ticket/bus/stats REST API.
//!
//! ## Example
//!
//! ```no_run
//! use bus_booking_api::HttpBookingApi;
//! use bus_booking_core::api::BookingApi;
//! use bus_booking_core::types::BusId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = HttpBookingApi::new("http://localhost:5000");
//!
//!     let seat_map = api.seat_map(BusId::parse("BUS001")?).await?;
//!     println!("{} seats free", seat_map.available_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Response envelopes
//!
//! The server wraps payloads as `{success, message, data}`, but older
//! endpoints return bare objects or lists. [`envelope`] accepts both.

pub mod client;
pub mod envelope;

// Re-export main types for convenience
pub use bus_booking_core::api::{ApiError, BookingApi};
pub use client::HttpBookingApi;
