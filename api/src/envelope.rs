//! Decoding of the API's response envelopes.
//!
//! Every function takes the parsed JSON body of a 2xx response (status and
//! `success: false` have already been checked by the client) and digs the
//! payload out of whichever shape the endpoint used.

use bus_booking_core::api::ApiError;
use bus_booking_core::types::{BusId, BusSummary, SeatMap, Stats, Ticket, MAX_SEATS_PER_BUS};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Payload under `data.<key>`, falling back to `<key>` and then `data`.
fn payload<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get("data")
        .and_then(|data| data.get(key))
        .or_else(|| body.get(key))
        .or_else(|| body.get("data"))
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("malformed {what}: {e}")))
}

/// Message to surface for an error body, if the server sent one.
#[must_use]
pub fn error_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}

/// Server error code (`SEAT_NOT_AVAILABLE`), if present.
#[must_use]
pub fn error_code(body: &Value) -> Option<String> {
    body.get("error_code")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `GET /api/buses/{id}` → seat availability.
///
/// # Errors
///
/// Returns [`ApiError::InvalidResponse`] if no `available_seats_list` is present.
pub fn seat_map(bus_id: BusId, body: &Value) -> Result<SeatMap, ApiError> {
    let bus = payload(body, "bus").unwrap_or(body);

    let available = bus
        .get("available_seats_list")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ApiError::InvalidResponse(format!("bus {bus_id} response has no available_seats_list"))
        })?;

    let capacity = bus
        .get("total_seats")
        .and_then(Value::as_u64)
        .and_then(|n| u8::try_from(n).ok())
        .unwrap_or(MAX_SEATS_PER_BUS);

    Ok(SeatMap::from_available(
        bus_id,
        capacity,
        available.iter().filter_map(Value::as_str),
    ))
}

/// `GET /api/buses` → bus summaries sorted by bus id.
///
/// Accepts the keyed map the server sends (`{"BUS001": {...}}`) as well as a
/// plain list.
///
/// # Errors
///
/// Returns [`ApiError::InvalidResponse`] if the payload is neither.
pub fn buses(body: &Value) -> Result<Vec<BusSummary>, ApiError> {
    let mut buses = match payload(body, "buses") {
        Some(Value::Object(by_id)) => by_id
            .iter()
            .map(|(bus_id, summary)| {
                let mut summary = summary.clone();
                if let Value::Object(fields) = &mut summary {
                    fields
                        .entry("bus_number")
                        .or_insert_with(|| Value::String(bus_id.clone()));
                }
                decode::<BusSummary>(summary, "bus summary")
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(list @ Value::Array(_)) => decode(list.clone(), "bus list")?,
        _ => return Err(ApiError::InvalidResponse("bus list missing".to_string())),
    };

    buses.sort_by(|a, b| a.bus_number.cmp(&b.bus_number));
    Ok(buses)
}

/// `GET /api/tickets` → tickets sorted by id.
///
/// Accepts `data.tickets` as a map keyed by id or as a list, `data` as a
/// list, or a bare top-level list.
///
/// # Errors
///
/// Returns [`ApiError::InvalidResponse`] if no ticket collection is found.
pub fn tickets(body: &Value) -> Result<Vec<Ticket>, ApiError> {
    let collection = if body.is_array() {
        body
    } else {
        payload(body, "tickets")
            .ok_or_else(|| ApiError::InvalidResponse("ticket list missing".to_string()))?
    };

    let mut tickets: Vec<Ticket> = match collection {
        Value::Object(by_id) => by_id
            .values()
            .cloned()
            .map(|ticket| decode(ticket, "ticket"))
            .collect::<Result<_, _>>()?,
        Value::Array(_) => decode(collection.clone(), "ticket list")?,
        _ => return Err(ApiError::InvalidResponse("ticket list missing".to_string())),
    };

    tickets.sort_by_key(|ticket| ticket.id);
    Ok(tickets)
}

/// A single ticket from a create or update response.
///
/// A booking succeeded when the body is `{success: true, data: {ticket}}` or
/// when it is the ticket itself (carries an `id`).
///
/// # Errors
///
/// Returns [`ApiError::InvalidResponse`] if no ticket can be found.
pub fn ticket(body: &Value) -> Result<Ticket, ApiError> {
    let candidate = [
        body.get("data").and_then(|data| data.get("ticket")),
        body.get("ticket"),
        body.get("data").filter(|data| data.get("id").is_some()),
        Some(body).filter(|body| body.get("id").is_some()),
    ]
    .into_iter()
    .flatten()
    .next()
    .ok_or_else(|| ApiError::InvalidResponse("response carried no ticket".to_string()))?;

    decode(candidate.clone(), "ticket")
}

/// `POST /api/tickets` → the booked ticket, if the server sent it back.
///
/// A body with `success: true` confirms the booking even without a ticket.
///
/// # Errors
///
/// Returns [`ApiError::InvalidResponse`] if the body neither confirms the
/// booking nor carries a decodable ticket.
pub fn booking(body: &Value) -> Result<Option<Ticket>, ApiError> {
    match ticket(body) {
        Ok(ticket) => Ok(Some(ticket)),
        Err(_) if body.get("success").and_then(Value::as_bool) == Some(true) => {
            tracing::debug!("Booking confirmed without a ticket in the response");
            Ok(None)
        },
        Err(error) => Err(error),
    }
}

/// `GET /api/stats` → aggregate counters.
///
/// # Errors
///
/// Returns [`ApiError::InvalidResponse`] if the counters are missing.
pub fn stats(body: &Value) -> Result<Stats, ApiError> {
    let stats = payload(body, "stats").unwrap_or(body);
    decode(stats.clone(), "stats")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use bus_booking_core::types::{SeatId, TicketId};
    use serde_json::json;

    #[test]
    fn seat_map_reads_nested_bus() {
        let body = json!({
            "success": true,
            "data": {"bus": {"total_seats": 40, "available_seats_list": ["S01", "S02"]}}
        });
        let map = seat_map(BusId::parse("BUS001").unwrap(), &body).unwrap();

        assert_eq!(map.capacity, 40);
        assert!(map.is_available(&SeatId::parse("S02").unwrap()));
        assert!(!map.is_available(&SeatId::parse("S03").unwrap()));
    }

    #[test]
    fn seat_map_without_list_is_invalid() {
        let body = json!({"success": true, "data": {"bus": {"total_seats": 40}}});
        let err = seat_map(BusId::parse("BUS001").unwrap(), &body).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn buses_fill_in_id_from_map_key() {
        let body = json!({
            "success": true,
            "data": {"buses": {
                "BUS002": {"total_seats": 40, "booked_seats": 1, "available_seats": 39},
                "BUS001": {"total_seats": 40, "booked_seats": 0, "available_seats": 40}
            }, "count": 2}
        });
        let buses = buses(&body).unwrap();

        assert_eq!(buses.len(), 2);
        assert_eq!(buses[0].bus_number, "BUS001");
        assert_eq!(buses[1].booked_seats, 1);
    }

    #[test]
    fn tickets_accept_map_and_list_shapes() {
        let ticket = json!({"id": 3, "name": "Ann Lee", "bus": "BUS001", "seat": "S03"});
        let keyed = json!({"success": true, "data": {"tickets": {"3": ticket.clone()}, "count": 1}});
        let listed = json!({"success": true, "data": [ticket.clone()]});
        let bare = json!([ticket]);

        for body in [keyed, listed, bare] {
            let tickets = tickets(&body).unwrap();
            assert_eq!(tickets.len(), 1);
            assert_eq!(tickets[0].id, TicketId(3));
        }
    }

    #[test]
    fn ticket_found_in_envelope_or_bare() {
        let wrapped = json!({"success": true, "data": {"ticket": {
            "id": 1, "name": "John Doe", "bus": "BUS001", "seat": "S01", "fare": 97.5
        }}});
        let bare = json!({"id": 7, "name": "John Doe", "bus": "BUS001", "seat": "S01"});

        assert_eq!(ticket(&wrapped).unwrap().fare, Some(97.5));
        assert_eq!(ticket(&bare).unwrap().id, TicketId(7));
        assert!(ticket(&json!({"success": true})).is_err());
    }

    #[test]
    fn booking_confirmed_by_success_flag_alone() {
        let confirmed = json!({"success": true, "message": "Ticket booked successfully!", "data": {}});
        let with_ticket = json!({"success": true, "data": {"ticket": {
            "id": 4, "name": "Ann Lee", "bus": "BUS002", "seat": "S10"
        }}});

        assert_eq!(booking(&confirmed).unwrap(), None);
        assert_eq!(booking(&with_ticket).unwrap().map(|t| t.id), Some(TicketId(4)));
        assert!(matches!(
            booking(&json!({"message": "ok"})),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn error_message_prefers_message_then_error() {
        assert_eq!(
            error_message(&json!({"message": "Seat taken", "error": "x"})).as_deref(),
            Some("Seat taken")
        );
        assert_eq!(error_message(&json!({"error": "boom"})).as_deref(), Some("boom"));
        assert_eq!(error_message(&json!({"message": "  "})), None);
    }
}
