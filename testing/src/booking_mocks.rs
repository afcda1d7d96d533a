//! In-memory booking API for tests
//!
//! Provides a fast, deterministic stand-in for the REST API:
//! - [`MockBookingApi`]: buses, seat maps and tickets kept in memory
//! - [`ApiCall`]: log entry for every request the session made
//! - [`SeatMapGate`]: holds a seat-map reply until the test releases it

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use bus_booking_core::api::{ApiError, ApiFuture, BookingApi};
use bus_booking_core::types::{
    BookingRequest, BusId, BusSummary, SeatId, SeatMap, Stats, Ticket, TicketId, TicketStatus,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A request received by [`MockBookingApi`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    /// `GET /api/buses`
    ListBuses,
    /// `GET /api/buses/{id}`
    SeatMap(BusId),
    /// `GET /api/tickets`
    ListTickets(Option<BusId>),
    /// `POST /api/tickets`
    CreateTicket(BookingRequest),
    /// `PUT /api/tickets/{id}`
    UpdateTicket(TicketId, String),
    /// `DELETE /api/tickets/{id}`
    CancelTicket(TicketId),
    /// `GET /api/stats`
    Stats,
}

/// Holds the next seat-map reply for one bus until released
///
/// # Example
///
/// ```ignore
/// let gate = api.hold_seat_map(&bus);
/// let pending = tokio::spawn(async move { session.select_bus("BUS001").await });
/// gate.entered().await;      // the request has reached the API
/// gate.release();            // let the reply through
/// ```
#[derive(Clone, Debug, Default)]
pub struct SeatMapGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl SeatMapGate {
    /// Wait until the held request has reached the API
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held reply through
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Debug, Default)]
struct Inner {
    seat_maps: BTreeMap<BusId, SeatMap>,
    tickets: BTreeMap<TicketId, Ticket>,
    next_ticket_id: u64,
    calls: Vec<ApiCall>,
    gates: HashMap<BusId, SeatMapGate>,
    create_failures: VecDeque<ApiError>,
    update_failures: VecDeque<ApiError>,
    cancel_failures: VecDeque<ApiError>,
    seat_map_failures: HashMap<BusId, ApiError>,
    stats_failures: VecDeque<ApiError>,
    buses_failures: VecDeque<ApiError>,
}

/// In-memory booking API for fast, deterministic tests
///
/// Behaves like the real server: booking a seat removes it from the bus's
/// seat map, cancelling puts it back, and stats are computed from what is
/// stored. Failures can be scripted per operation; each scripted failure is
/// used once.
///
/// # Example
///
/// ```
/// use bus_booking_testing::MockBookingApi;
///
/// let api = MockBookingApi::new().with_bus("BUS001", 40, &["S01", "S02"]);
/// assert!(api.calls().is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct MockBookingApi {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockBookingApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBookingApi {
    /// Create an API with no buses
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_ticket_id: 1,
                ..Inner::default()
            })),
        }
    }

    /// Add a bus whose available seats are `available`
    ///
    /// Panics if `bus_id` is not a valid bus id.
    #[must_use]
    pub fn with_bus(self, bus_id: &str, capacity: u8, available: &[&str]) -> Self {
        let bus_id = BusId::parse(bus_id).unwrap();
        let map = SeatMap::from_available(bus_id.clone(), capacity, available);
        self.inner.lock().unwrap().seat_maps.insert(bus_id, map);
        self
    }

    /// Add a bus with every seat available
    #[must_use]
    pub fn with_empty_bus(self, bus_id: &str, capacity: u8) -> Self {
        let seats: Vec<String> = (1..=capacity)
            .filter_map(SeatId::from_number)
            .map(|seat| seat.to_string())
            .collect();
        let seats: Vec<&str> = seats.iter().map(String::as_str).collect();
        self.with_bus(bus_id, capacity, &seats)
    }

    /// Every request received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// Number of `POST /api/tickets` requests received so far
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| matches!(call, ApiCall::CreateTicket(_)))
            .count()
    }

    /// Tickets currently stored, sorted by id
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        self.inner.lock().unwrap().tickets.values().cloned().collect()
    }

    /// Hold the next seat-map reply for `bus_id` until the gate is released
    #[must_use]
    pub fn hold_seat_map(&self, bus_id: &BusId) -> SeatMapGate {
        let gate = SeatMapGate::default();
        self.inner
            .lock()
            .unwrap()
            .gates
            .insert(bus_id.clone(), gate.clone());
        gate
    }

    /// Make the next booking fail with `error`
    pub fn fail_next_create(&self, error: ApiError) {
        self.inner.lock().unwrap().create_failures.push_back(error);
    }

    /// Make the next ticket update fail with `error`
    pub fn fail_next_update(&self, error: ApiError) {
        self.inner.lock().unwrap().update_failures.push_back(error);
    }

    /// Make the next cancellation fail with `error`
    pub fn fail_next_cancel(&self, error: ApiError) {
        self.inner.lock().unwrap().cancel_failures.push_back(error);
    }

    /// Make the next seat-map request for `bus_id` fail with `error`
    pub fn fail_next_seat_map(&self, bus_id: &BusId, error: ApiError) {
        self.inner
            .lock()
            .unwrap()
            .seat_map_failures
            .insert(bus_id.clone(), error);
    }

    /// Make the next stats request fail with `error`
    pub fn fail_next_stats(&self, error: ApiError) {
        self.inner.lock().unwrap().stats_failures.push_back(error);
    }

    /// Make the next bus-list request fail with `error`
    pub fn fail_next_list_buses(&self, error: ApiError) {
        self.inner.lock().unwrap().buses_failures.push_back(error);
    }

    fn record(&self, call: ApiCall) {
        self.inner.lock().unwrap().calls.push(call);
    }

    fn lookup_seat_map(&self, bus_id: &BusId) -> Result<SeatMap, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.seat_map_failures.remove(bus_id) {
            return Err(error);
        }
        inner
            .seat_maps
            .get(bus_id)
            .cloned()
            .ok_or_else(|| not_found(&format!("Bus {bus_id} not found")))
    }

    fn book(&self, request: &BookingRequest) -> Result<Ticket, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.create_failures.pop_front() {
            return Err(error);
        }

        let Some(map) = inner.seat_maps.get(&request.bus) else {
            return Err(not_found(&format!("Bus {} not found", request.bus)));
        };
        if !map.is_available(&request.seat) {
            return Err(ApiError::Api {
                status: 409,
                message: format!("Seat {} is not available on {}", request.seat, request.bus),
                code: Some("SEAT_NOT_AVAILABLE".to_string()),
            });
        }

        let updated = with_seat(map, &request.seat, false);
        inner.seat_maps.insert(request.bus.clone(), updated);

        let id = TicketId(inner.next_ticket_id);
        inner.next_ticket_id += 1;

        let ticket = Ticket {
            id,
            name: request.name.clone(),
            bus: request.bus.to_string(),
            seat: request.seat.to_string(),
            status: TicketStatus::Confirmed,
            booking_time: None,
            fare: None,
            seat_type: Some(request.seat.class().to_string()),
        };
        inner.tickets.insert(id, ticket.clone());
        Ok(ticket)
    }

    fn rename(&self, ticket_id: TicketId, name: &str) -> Result<Ticket, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.update_failures.pop_front() {
            return Err(error);
        }

        let ticket = inner
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| not_found(&format!("Ticket {ticket_id} not found")))?;
        ticket.name = name.to_string();
        Ok(ticket.clone())
    }

    fn remove(&self, ticket_id: TicketId) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.cancel_failures.pop_front() {
            return Err(error);
        }

        let ticket = inner
            .tickets
            .remove(&ticket_id)
            .ok_or_else(|| not_found(&format!("Ticket {ticket_id} not found")))?;

        // Release the seat
        if let (Ok(bus), Ok(seat)) = (BusId::parse(&ticket.bus), SeatId::parse(&ticket.seat)) {
            if let Some(map) = inner.seat_maps.get(&bus) {
                let updated = with_seat(map, &seat, true);
                inner.seat_maps.insert(bus, updated);
            }
        }
        Ok(())
    }

    fn summaries(&self) -> Result<Vec<BusSummary>, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.buses_failures.pop_front() {
            return Err(error);
        }

        Ok(inner.seat_maps.values().map(summary).collect())
    }

    fn totals(&self) -> Result<Stats, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.stats_failures.pop_front() {
            return Err(error);
        }

        let total_seats: u64 = inner.seat_maps.values().map(|m| u64::from(m.capacity)).sum();
        let available_seats: u64 = inner
            .seat_maps
            .values()
            .map(|m| m.available_count() as u64)
            .sum();
        let booked_seats = total_seats - available_seats;

        Ok(Stats {
            total_tickets: inner.tickets.len() as u64,
            total_buses: inner.seat_maps.len() as u64,
            total_seats: Some(total_seats),
            booked_seats,
            available_seats,
            overall_occupancy: occupancy(booked_seats, total_seats),
        })
    }
}

fn not_found(message: &str) -> ApiError {
    ApiError::Api {
        status: 404,
        message: message.to_string(),
        code: Some("NOT_FOUND".to_string()),
    }
}

#[allow(clippy::cast_precision_loss)] // Seat counts are tiny
fn occupancy(booked: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (booked as f64 / total as f64 * 10_000.0).round() / 100.0
    }
}

/// Copy of `map` with `seat` marked available or booked
fn with_seat(map: &SeatMap, seat: &SeatId, available: bool) -> SeatMap {
    let seats = map
        .seats()
        .filter(|(id, _)| if id == seat { available } else { map.is_available(id) })
        .map(|(id, _)| id.to_string());
    SeatMap::from_available(map.bus_id.clone(), map.capacity, seats)
}

fn summary(map: &SeatMap) -> BusSummary {
    let total = u32::from(map.capacity);
    let available = u32::try_from(map.available_count()).unwrap_or(total);
    let booked = total - available;

    BusSummary {
        bus_number: map.bus_id.to_string(),
        route: None,
        total_seats: total,
        booked_seats: booked,
        available_seats: available,
        occupancy_rate: occupancy(u64::from(booked), u64::from(total)),
        price: None,
    }
}

impl BookingApi for MockBookingApi {
    fn list_buses(&self) -> ApiFuture<'_, Vec<BusSummary>> {
        self.record(ApiCall::ListBuses);
        let result = self.summaries();
        Box::pin(async move { result })
    }

    fn seat_map(&self, bus_id: BusId) -> ApiFuture<'_, SeatMap> {
        Box::pin(async move {
            let gate = {
                let mut inner = self.inner.lock().unwrap();
                inner.calls.push(ApiCall::SeatMap(bus_id.clone()));
                inner.gates.remove(&bus_id)
            };

            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }

            self.lookup_seat_map(&bus_id)
        })
    }

    fn list_tickets(&self, bus_id: Option<BusId>) -> ApiFuture<'_, Vec<Ticket>> {
        self.record(ApiCall::ListTickets(bus_id.clone()));
        let tickets = self
            .tickets()
            .into_iter()
            .filter(|ticket| bus_id.as_ref().is_none_or(|bus| ticket.bus == bus.as_str()))
            .collect();
        Box::pin(async move { Ok(tickets) })
    }

    fn create_ticket(&self, request: BookingRequest) -> ApiFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            self.record(ApiCall::CreateTicket(request.clone()));
            // Yield so a concurrent submit can observe the request in flight
            tokio::task::yield_now().await;
            self.book(&request).map(Some)
        })
    }

    fn update_ticket(&self, ticket_id: TicketId, name: String) -> ApiFuture<'_, Ticket> {
        self.record(ApiCall::UpdateTicket(ticket_id, name.clone()));
        let result = self.rename(ticket_id, &name);
        Box::pin(async move { result })
    }

    fn cancel_ticket(&self, ticket_id: TicketId) -> ApiFuture<'_, ()> {
        self.record(ApiCall::CancelTicket(ticket_id));
        let result = self.remove(ticket_id);
        Box::pin(async move { result })
    }

    fn stats(&self) -> ApiFuture<'_, Stats> {
        self.record(ApiCall::Stats);
        let result = self.totals();
        Box::pin(async move { result })
    }
}
