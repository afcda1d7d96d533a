//! Seat grid projection.
//!
//! A read-only view of the selected bus for rendering: seats in rows of four
//! with an aisle in the middle, each carrying its status and class. Derived
//! from [`BookingState`] on demand and never stored.

use crate::state::BookingState;
use bus_booking_core::types::{BusId, SeatClass, SeatId, SeatStatus};
use serde::Serialize;
use std::fmt;

/// Seats on each side of the aisle
pub const SEATS_PER_SIDE: usize = 2;

/// One seat as displayed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GridSeat {
    /// Seat id
    pub id: SeatId,
    /// Available, booked, or selected in this session
    pub status: SeatStatus,
    /// Seat class by position
    pub class: SeatClass,
}

/// A row of up to four seats split by the aisle
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeatRow {
    /// 1-based row number
    pub number: usize,
    /// Window and aisle seat on the left
    pub left: Vec<GridSeat>,
    /// Aisle and window seat on the right
    pub right: Vec<GridSeat>,
}

/// Seat layout of the selected bus
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeatGrid {
    /// Bus shown
    pub bus_id: BusId,
    /// Rows front to back
    pub rows: Vec<SeatRow>,
}

impl SeatGrid {
    /// Project the selected bus's seats, or `None` until its seat map loads.
    #[must_use]
    pub fn project(state: &BookingState) -> Option<Self> {
        let map = state.current_seat_map()?;

        let seats: Vec<GridSeat> = map
            .seats()
            .map(|(id, status)| {
                let status = if state.selected_seat.as_ref() == Some(&id) {
                    SeatStatus::Selected
                } else {
                    status
                };
                let class = id.class();
                GridSeat { id, status, class }
            })
            .collect();

        let rows = seats
            .chunks(SEATS_PER_SIDE * 2)
            .enumerate()
            .map(|(index, chunk)| {
                let split = chunk.len().min(SEATS_PER_SIDE);
                SeatRow {
                    number: index + 1,
                    left: chunk[..split].to_vec(),
                    right: chunk[split..].to_vec(),
                }
            })
            .collect();

        Some(Self {
            bus_id: map.bus_id.clone(),
            rows,
        })
    }

    /// Every seat, front to back
    pub fn seats(&self) -> impl Iterator<Item = &GridSeat> {
        self.rows
            .iter()
            .flat_map(|row| row.left.iter().chain(row.right.iter()))
    }

    /// Number of seats with `status`
    #[must_use]
    pub fn count(&self, status: SeatStatus) -> usize {
        self.seats().filter(|seat| seat.status == status).count()
    }
}

fn cell(seat: &GridSeat) -> String {
    match seat.status {
        SeatStatus::Available => format!(" {} ", seat.id),
        SeatStatus::Booked => "  X  ".to_string(),
        SeatStatus::Selected => format!("[{}]", seat.id),
    }
}

fn side(seats: &[GridSeat]) -> String {
    seats.iter().map(cell).collect::<Vec<_>>().join(" ")
}

impl fmt::Display for SeatGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} available, {} booked",
            self.bus_id,
            self.count(SeatStatus::Available) + self.count(SeatStatus::Selected),
            self.count(SeatStatus::Booked)
        )?;
        for row in &self.rows {
            writeln!(f, "{:>2} {}   {}", row.number, side(&row.left), side(&row.right))?;
        }
        Ok(())
    }
}
