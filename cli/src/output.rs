//! Rendering of tickets, buses and stats for the terminal and for files.

use bus_booking_core::types::{BusSummary, Stats, Ticket};
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use std::io::{self, Write};

const TICKET_HEADER: [&str; 6] = ["ID", "Name", "Bus", "Seat", "Status", "BookingTime"];

/// Output format of `booking list`
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ListFormat {
    Table,
    Csv,
    Json,
}

/// File format of `booking export`
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

fn booking_time(ticket: &Ticket) -> String {
    ticket
        .booking_time
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn tickets_table(tickets: &[Ticket]) -> Table {
    let mut table = new_table();
    table.set_header(["ID", "Name", "Bus", "Seat", "Status", "Booking Time"]);

    for ticket in tickets {
        table.add_row([
            ticket.id.to_string(),
            ticket.name.clone(),
            ticket.bus.clone(),
            ticket.seat.clone(),
            ticket.status.to_string(),
            booking_time(ticket),
        ]);
    }
    table
}

/// Quote a CSV field when it contains a separator, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn write_tickets_csv(out: &mut impl Write, tickets: &[Ticket]) -> io::Result<()> {
    writeln!(out, "{}", TICKET_HEADER.join(","))?;
    for ticket in tickets {
        let row = [
            ticket.id.to_string(),
            csv_field(&ticket.name),
            csv_field(&ticket.bus),
            csv_field(&ticket.seat),
            ticket.status.to_string(),
            booking_time(ticket),
        ];
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}

pub fn write_tickets_json(out: &mut impl Write, tickets: &[Ticket]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, tickets)?;
    writeln!(out)
}

pub fn write_ticket_details(out: &mut impl Write, ticket: &Ticket) -> io::Result<()> {
    writeln!(out, "Ticket booked successfully!")?;
    writeln!(out, "Ticket ID: {}", ticket.id)?;
    writeln!(out, "Passenger: {}", ticket.name)?;
    writeln!(out, "Bus: {}", ticket.bus)?;
    writeln!(out, "Seat: {}", ticket.seat)?;
    if let Some(class) = &ticket.seat_type {
        writeln!(out, "Class: {class}")?;
    }
    if let Some(fare) = ticket.fare {
        writeln!(out, "Fare: ${fare:.2}")?;
    }
    Ok(())
}

pub fn buses_table(buses: &[BusSummary]) -> Table {
    let mut table = new_table();
    table.set_header(["Bus", "Route", "Seats", "Booked", "Available", "Occupancy"]);

    for bus in buses {
        table.add_row([
            bus.bus_number.clone(),
            bus.route.clone().unwrap_or_default(),
            bus.total_seats.to_string(),
            bus.booked_seats.to_string(),
            bus.available_seats.to_string(),
            format!("{:.1}%", bus.occupancy_rate),
        ]);
    }
    table
}

pub fn write_stats(out: &mut impl Write, stats: &Stats) -> io::Result<()> {
    writeln!(out, "=== System Statistics ===")?;
    writeln!(out, "Total Tickets: {}", stats.total_tickets)?;
    writeln!(out, "Total Buses: {}", stats.total_buses)?;
    if let Some(seats) = stats.total_seats {
        writeln!(out, "Total Seats: {seats}")?;
    }
    writeln!(out, "Booked Seats: {}", stats.booked_seats)?;
    writeln!(out, "Available Seats: {}", stats.available_seats)?;
    writeln!(out, "Occupancy Rate: {:.1}%", stats.overall_occupancy)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use bus_booking_core::types::{TicketId, TicketStatus};
    use bus_booking_core::{DateTime, Utc};

    fn ticket(id: u64, name: &str) -> Ticket {
        Ticket {
            id: TicketId(id),
            name: name.to_string(),
            bus: "BUS001".to_string(),
            seat: "S01".to_string(),
            status: TicketStatus::Confirmed,
            booking_time: DateTime::parse_from_rfc3339("2025-01-01T09:15:00Z")
                .ok()
                .map(|at| at.with_timezone(&Utc)),
            fare: Some(97.5),
            seat_type: None,
        }
    }

    #[test]
    fn csv_quotes_names_with_commas() {
        let mut out = Vec::new();
        write_tickets_csv(&mut out, &[ticket(1, "Doe, John"), ticket(2, "Ann \"Al\" Lee")]).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID,Name,Bus,Seat,Status,BookingTime");
        assert_eq!(
            lines[1],
            "1,\"Doe, John\",BUS001,S01,confirmed,2025-01-01 09:15:00"
        );
        assert_eq!(
            lines[2],
            "2,\"Ann \"\"Al\"\" Lee\",BUS001,S01,confirmed,2025-01-01 09:15:00"
        );
    }

    #[test]
    fn json_is_a_ticket_array() {
        let mut out = Vec::new();
        write_tickets_json(&mut out, &[ticket(3, "John Doe")]).unwrap();

        let parsed: Vec<Ticket> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0].id, TicketId(3));
    }

    #[test]
    fn ticket_details_show_fare() {
        let mut out = Vec::new();
        write_ticket_details(&mut out, &ticket(1, "John Doe")).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Ticket ID: 1"));
        assert!(text.contains("Fare: $97.50"));
    }

    #[test]
    fn table_lists_every_ticket() {
        let rendered = tickets_table(&[ticket(1, "John Doe"), ticket(2, "Ann Lee")]).to_string();
        assert!(rendered.contains("John Doe"));
        assert!(rendered.contains("Ann Lee"));
        assert!(rendered.contains("Booking Time"));
    }
}
