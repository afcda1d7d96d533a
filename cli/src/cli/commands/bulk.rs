//! Bulk booking from a `name,bus,seat` CSV file.

use anyhow::{Context, Result};
use bus_booking_core::types::{BusId, SeatId, Ticket};
use bus_booking_session::{BookingSession, SessionError};
use std::io::Write;
use std::path::Path;

use super::{bus_id, seat_id};

/// One booking read from the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkEntry {
    pub name: String,
    pub bus: BusId,
    pub seat: SeatId,
}

/// A data line and what it parsed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkLine {
    /// 1-based line number in the file
    pub number: usize,
    pub entry: Result<BulkEntry, String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BulkSummary {
    pub successful: usize,
    pub failed: usize,
}

fn parse_line(line: &str) -> Result<BulkEntry, String> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    let [name, bus, seat, ..] = parts.as_slice() else {
        return Err("Invalid format (need: name,bus,seat)".to_string());
    };

    Ok(BulkEntry {
        name: (*name).to_string(),
        bus: bus_id(bus).map_err(|e| e.to_string())?,
        seat: seat_id(seat).map_err(|e| e.to_string())?,
    })
}

/// Parse the file contents, skipping blank lines and a `name,...` header
pub fn parse(content: &str) -> Vec<BulkLine> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .peekable();

    if lines
        .peek()
        .is_some_and(|(_, line)| line.trim().to_lowercase().starts_with("name"))
    {
        lines.next();
    }

    lines
        .map(|(index, line)| BulkLine {
            number: index + 1,
            entry: parse_line(line),
        })
        .collect()
}

async fn book_one(
    session: &BookingSession,
    entry: &BulkEntry,
) -> Result<Option<Ticket>, SessionError> {
    session.select_bus(entry.bus.as_str()).await?;
    session.select_seat(entry.seat.as_str()).await?;
    session.submit_booking(&entry.name).await
}

/// Book every parsed line in order, reporting each outcome
pub async fn book_all(
    session: &BookingSession,
    lines: &[BulkLine],
    out: &mut impl Write,
) -> Result<BulkSummary> {
    let mut summary = BulkSummary::default();

    for line in lines {
        let entry = match &line.entry {
            Ok(entry) => entry,
            Err(message) => {
                writeln!(out, "Line {}: {message}", line.number)?;
                summary.failed += 1;
                continue;
            },
        };

        match book_one(session, entry).await {
            Ok(ticket) => {
                write!(out, "✓ Booked: {} - {} {}", entry.name, entry.bus, entry.seat)?;
                match ticket {
                    Some(ticket) => writeln!(out, " (ID: {})", ticket.id)?,
                    None => writeln!(out)?,
                }
                summary.successful += 1;
            },
            Err(error) => {
                tracing::debug!(line = line.number, %error, "Bulk booking line failed");
                writeln!(out, "✗ Failed: {} - {error}", entry.name)?;
                summary.failed += 1;
            },
        }
    }

    Ok(summary)
}

pub async fn run(session: &BookingSession, path: &Path, out: &mut impl Write) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read '{}'", path.display()))?;

    let summary = book_all(session, &parse(&content), out).await?;
    writeln!(
        out,
        "\nBulk booking completed: {} successful, {} failed",
        summary.successful, summary.failed
    )?;
    Ok(())
}
