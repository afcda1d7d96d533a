//! Bus and statistics command handlers.

use anyhow::{Context, Result};
use bus_booking_session::BookingSession;
use std::io::Write;

use super::bus_id;
use crate::output;

pub async fn show(session: &BookingSession, bus: Option<&str>, out: &mut impl Write) -> Result<()> {
    let Some(bus) = bus else {
        let buses = session.load_buses().await.context("load buses")?;
        if buses.is_empty() {
            writeln!(out, "No buses found.")?;
        } else {
            writeln!(out, "{}", output::buses_table(&buses))?;
        }
        return Ok(());
    };

    let bus = bus_id(bus)?;
    session
        .select_bus(bus.as_str())
        .await
        .with_context(|| format!("load seats for {bus}"))?;

    let grid = session
        .seat_grid()
        .await
        .with_context(|| format!("no seat map for {bus}"))?;
    write!(out, "{grid}")?;
    writeln!(out, "(X = booked)")?;
    Ok(())
}

pub async fn stats(session: &BookingSession, out: &mut impl Write) -> Result<()> {
    let stats = session.refresh_stats().await.context("load statistics")?;
    output::write_stats(out, &stats)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::cli::commands::fixtures::{output, session};
    use bus_booking_testing::MockBookingApi;

    fn api() -> MockBookingApi {
        MockBookingApi::new()
            .with_bus("BUS001", 8, &["S01", "S02", "S03"])
            .with_empty_bus("BUS002", 40)
    }

    #[tokio::test]
    async fn seat_layout_for_one_bus() {
        let session = session(&api());
        let mut out = Vec::new();

        show(&session, Some("1"), &mut out).await.unwrap();

        let text = output(out);
        assert!(text.starts_with("BUS001: 3 available, 5 booked\n"));
        assert!(text.contains(" S01 "));
        assert!(text.ends_with("(X = booked)\n"));
    }

    #[tokio::test]
    async fn bus_table_lists_every_bus() {
        let session = session(&api());
        let mut out = Vec::new();

        show(&session, None, &mut out).await.unwrap();

        let text = output(out);
        assert!(text.contains("BUS001"));
        assert!(text.contains("BUS002"));
    }

    #[tokio::test]
    async fn unknown_bus_is_an_error() {
        let session = session(&api());

        let err = show(&session, Some("BUS404"), &mut Vec::new()).await.unwrap_err();

        assert_eq!(format!("{err:#}"), "load seats for BUS404: Bus BUS404 not found");
    }

    #[tokio::test]
    async fn stats_are_printed() {
        let session = session(&api());
        let mut out = Vec::new();

        stats(&session, &mut out).await.unwrap();

        let text = output(out);
        assert!(text.contains("Total Buses: 2"));
        assert!(text.contains("Available Seats: 43"));
    }
}
