//! Ticket command handlers.

use anyhow::{Context, Result};
use bus_booking_core::types::{BusId, TicketId};
use bus_booking_session::BookingSession;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{bus_id, seat_id};
use crate::output::{self, ExportFormat, ListFormat};

pub async fn list(
    session: &BookingSession,
    bus: Option<&str>,
    format: ListFormat,
    out: &mut impl Write,
) -> Result<()> {
    let bus = bus.map(bus_id).transpose()?;
    let tickets = session
        .list_tickets(bus.as_ref().map(BusId::as_str))
        .await
        .context("list tickets")?;

    if tickets.is_empty() {
        writeln!(out, "No tickets found.")?;
        return Ok(());
    }

    match format {
        ListFormat::Table => writeln!(out, "{}", output::tickets_table(&tickets))?,
        ListFormat::Csv => output::write_tickets_csv(out, &tickets)?,
        ListFormat::Json => output::write_tickets_json(out, &tickets)?,
    }
    Ok(())
}

pub async fn book(
    session: &BookingSession,
    name: &str,
    bus: &str,
    seat: &str,
    out: &mut impl Write,
) -> Result<()> {
    let bus = bus_id(bus)?;
    let seat = seat_id(seat)?;

    session
        .select_bus(bus.as_str())
        .await
        .with_context(|| format!("load seats for {bus}"))?;
    session.select_seat(seat.as_str()).await.context("Booking failed")?;
    match session.submit_booking(name).await.context("Booking failed")? {
        Some(ticket) => output::write_ticket_details(out, &ticket)?,
        None => writeln!(out, "Ticket booked successfully! ({bus} {seat})")?,
    }
    Ok(())
}

pub async fn update(
    session: &BookingSession,
    ticket_id: TicketId,
    name: &str,
    out: &mut impl Write,
) -> Result<()> {
    session
        .update_ticket(ticket_id, name)
        .await
        .context("Update failed")?;
    writeln!(out, "Ticket {ticket_id} updated successfully!")?;
    Ok(())
}

pub async fn cancel(session: &BookingSession, ticket_id: TicketId, out: &mut impl Write) -> Result<()> {
    session
        .cancel_ticket(ticket_id)
        .await
        .context("Cancellation failed")?;
    writeln!(out, "Ticket {ticket_id} cancelled successfully!")?;
    Ok(())
}

pub async fn export(
    session: &BookingSession,
    path: &Path,
    format: ExportFormat,
    out: &mut impl Write,
) -> Result<()> {
    let tickets = session.list_tickets(None).await.context("list tickets")?;

    let file = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    let written = match format {
        ExportFormat::Csv => output::write_tickets_csv(&mut writer, &tickets),
        ExportFormat::Json => output::write_tickets_json(&mut writer, &tickets),
    };
    written
        .and_then(|()| writer.flush())
        .with_context(|| format!("write '{}'", path.display()))?;

    writeln!(out, "Exported {} tickets to {}", tickets.len(), path.display())?;
    Ok(())
}
