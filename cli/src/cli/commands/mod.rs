//! Command handlers.
//!
//! Handlers write to the given writer so they can be exercised in tests.

use anyhow::{anyhow, Result};
use bus_booking_core::types::{BusId, SeatId};

pub mod buses;
pub mod bulk;
pub mod tickets;

/// Accept `BUS001`, `bus 1` or `1`
pub fn bus_id(input: &str) -> Result<BusId> {
    BusId::normalize(input).ok_or_else(|| anyhow!("Invalid bus '{input}': use BUS001 to BUS999"))
}

/// Accept `S01`, `s1` or `1`
pub fn seat_id(input: &str) -> Result<SeatId> {
    SeatId::normalize(input).ok_or_else(|| anyhow!("Invalid seat '{input}': use S01 to S40"))
}
