//! Domain types for the bus booking session.
//!
//! Identifiers are validated newtypes: a [`BusId`] or [`SeatId`] can only be
//! constructed from input that matches the server's format, so everything
//! downstream of parsing can rely on it.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Seats per bus when the server does not report a capacity.
pub const MAX_SEATS_PER_BUS: u8 = 40;

#[allow(clippy::unwrap_used)] // Literal pattern, checked by tests
static BUS_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^BUS[0-9]{3}$").unwrap());

#[allow(clippy::unwrap_used)] // Literal pattern, checked by tests
static SEAT_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^S[0-9]{2}$").unwrap());

#[allow(clippy::unwrap_used)] // Literal pattern, checked by tests
static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Identifier parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdError {
    /// Input does not match `BUS` followed by three digits.
    #[error("Invalid bus id '{0}': expected BUS followed by three digits (e.g. BUS001)")]
    InvalidBusId(String),

    /// Input does not match `S` followed by two digits in 01–40.
    #[error("Invalid seat id '{0}': expected S01 to S40")]
    InvalidSeatId(String),
}

/// Bus identifier (`BUS001`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BusId(String);

impl BusId {
    /// Parse a bus id, requiring the exact `^BUS[0-9]{3}$` format.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidBusId`] if the input does not match.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        if BUS_ID_PATTERN.is_match(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(IdError::InvalidBusId(input.to_string()))
        }
    }

    /// Turn loose user input (`bus 1`, `BUS-12`, `7`) into a bus id.
    ///
    /// Takes the first number in the input; buses are numbered 1–999.
    #[must_use]
    pub fn normalize(input: &str) -> Option<Self> {
        let number: u32 = FIRST_NUMBER.find(input)?.as_str().parse().ok()?;
        (1..=999)
            .contains(&number)
            .then(|| Self(format!("BUS{number:03}")))
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BusId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for BusId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Seat identifier (`S01` to `S40`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SeatId(String);

impl SeatId {
    /// Parse a seat id, requiring `^S[0-9]{2}$` with a number in 01–40.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidSeatId`] if the input does not match.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let in_range = SEAT_ID_PATTERN.is_match(input)
            && input[1..]
                .parse::<u8>()
                .is_ok_and(|n| (1..=MAX_SEATS_PER_BUS).contains(&n));

        if in_range {
            Ok(Self(input.to_string()))
        } else {
            Err(IdError::InvalidSeatId(input.to_string()))
        }
    }

    /// Turn loose user input (`s5`, `seat 12`, `7`) into a seat id.
    #[must_use]
    pub fn normalize(input: &str) -> Option<Self> {
        let number: u8 = FIRST_NUMBER.find(input)?.as_str().parse().ok()?;
        Self::from_number(number)
    }

    /// Seat id for a 1-based seat number.
    #[must_use]
    pub fn from_number(number: u8) -> Option<Self> {
        (1..=MAX_SEATS_PER_BUS)
            .contains(&number)
            .then(|| Self(format!("S{number:02}")))
    }

    /// The 1-based seat number
    #[must_use]
    pub fn number(&self) -> u8 {
        // Parsing already guaranteed two ASCII digits
        self.0[1..].parse().unwrap_or_default()
    }

    /// Seat class, derived from the seat's position in the bus
    #[must_use]
    pub fn class(&self) -> SeatClass {
        match self.number() {
            1..=10 => SeatClass::Premium,
            31.. => SeatClass::Sleeper,
            _ => SeatClass::Standard,
        }
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SeatId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for SeatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Seat class by position: front rows are premium, the back rows sleepers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatClass {
    /// Seats 11–30
    Standard,
    /// Seats 1–10
    Premium,
    /// Seats 31–40
    Sleeper,
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Premium => write!(f, "premium"),
            Self::Sleeper => write!(f, "sleeper"),
        }
    }
}

/// Seat status as displayed.
///
/// `Selected` only exists in projections of session state; a [`SeatMap`]
/// reports `Available` or `Booked`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    /// Free to select
    Available,
    /// Taken according to the server
    Booked,
    /// Chosen in the current session
    Selected,
}

/// Availability of every seat on one bus, as last reported by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMap {
    /// Bus this map belongs to
    pub bus_id: BusId,
    /// Number of seats on the bus
    pub capacity: u8,
    available: BTreeSet<SeatId>,
}

impl SeatMap {
    /// Build a seat map from the server's list of available seat ids.
    ///
    /// Entries that are not valid seat ids are dropped; every seat not
    /// listed is treated as booked.
    #[must_use]
    pub fn from_available<I, S>(bus_id: BusId, capacity: u8, available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let available = available
            .into_iter()
            .filter_map(|seat| SeatId::parse(seat.as_ref()).ok())
            .collect();

        Self {
            bus_id,
            capacity: capacity.min(MAX_SEATS_PER_BUS),
            available,
        }
    }

    /// Status of a seat on this bus (`Available` or `Booked`).
    #[must_use]
    pub fn status(&self, seat: &SeatId) -> SeatStatus {
        if self.available.contains(seat) {
            SeatStatus::Available
        } else {
            SeatStatus::Booked
        }
    }

    /// Whether the seat can be selected
    #[must_use]
    pub fn is_available(&self, seat: &SeatId) -> bool {
        self.status(seat) == SeatStatus::Available
    }

    /// Every seat on the bus with its status, in seat order.
    pub fn seats(&self) -> impl Iterator<Item = (SeatId, SeatStatus)> + '_ {
        (1..=self.capacity)
            .filter_map(SeatId::from_number)
            .map(|seat| {
                let status = self.status(&seat);
                (seat, status)
            })
    }

    /// Number of available seats
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available.len()
    }
}

/// Server-assigned ticket identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TicketId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Ticket lifecycle status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Seat is held by the ticket
    #[default]
    Confirmed,
    /// Ticket was cancelled and its seat released
    Cancelled,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A booked ticket as returned by the API.
///
/// Bus and seat are kept as the server sent them: tickets are display data,
/// and one malformed record must not make a whole listing undecodable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket id
    pub id: TicketId,
    /// Passenger name
    pub name: String,
    /// Bus id
    pub bus: String,
    /// Seat id
    pub seat: String,
    /// Ticket status
    #[serde(default)]
    pub status: TicketStatus,
    /// When the ticket was booked
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub booking_time: Option<DateTime<Utc>>,
    /// Fare charged, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fare: Option<f64>,
    /// Seat class label, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_type: Option<String>,
}

/// Accepts RFC 3339 timestamps and naive ISO timestamps (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

/// Reference data for one bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusSummary {
    /// Bus id
    pub bus_number: String,
    /// Route label, when the server provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Seat capacity
    #[serde(default = "default_capacity")]
    pub total_seats: u32,
    /// Seats already booked
    #[serde(default)]
    pub booked_seats: u32,
    /// Seats still free
    #[serde(default)]
    pub available_seats: u32,
    /// Occupancy percentage
    #[serde(default)]
    pub occupancy_rate: f64,
    /// Ticket price, when the server provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

const fn default_capacity() -> u32 {
    MAX_SEATS_PER_BUS as u32
}

/// Aggregate counters across all buses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Tickets currently booked
    pub total_tickets: u64,
    /// Buses in service
    pub total_buses: u64,
    /// Seats across all buses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_seats: Option<u64>,
    /// Seats booked across all buses
    pub booked_seats: u64,
    /// Seats free across all buses
    pub available_seats: u64,
    /// Overall occupancy percentage
    pub overall_occupancy: f64,
}

/// Body of `POST /api/tickets`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Passenger name, trimmed
    pub name: String,
    /// Bus to book on
    pub bus: BusId,
    /// Seat to book
    pub seat: SeatId,
}
