//! CLI entry and dispatch.

use anyhow::{Context, Result};
use bus_booking_core::types::TicketId;
use bus_booking_session::{BookingSession, SessionConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::output::{ExportFormat, ListFormat};

mod commands;

#[derive(Parser)]
#[command(name = "booking")]
#[command(version)]
#[command(about = "Book and manage bus tickets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (overrides BOOKING_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List booked tickets
    List {
        /// Only tickets on this bus (e.g. BUS001 or 1)
        #[arg(long)]
        bus: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: ListFormat,
    },

    /// Book a seat
    Book {
        /// Passenger name
        name: String,
        /// Bus (e.g. BUS001 or 1)
        bus: String,
        /// Seat (e.g. S01 or 1)
        seat: String,
    },

    /// Change the passenger name on a ticket
    Update {
        /// Ticket id
        #[arg(value_name = "TICKET_ID")]
        id: u64,
        /// New passenger name
        name: String,
    },

    /// Cancel a ticket
    Cancel {
        /// Ticket id
        #[arg(value_name = "TICKET_ID")]
        id: u64,
    },

    /// Show buses, or the seat layout of one bus
    Buses {
        /// Bus to show seats for
        #[arg(long)]
        bus: Option<String>,
    },

    /// Show booking statistics
    Stats,

    /// Book every `name,bus,seat` line of a CSV file
    BulkBook {
        /// CSV file path
        #[arg(value_name = "CSV_FILE")]
        csv_file: PathBuf,
    },

    /// Write all tickets to a file
    Export {
        /// Output file path
        output: PathBuf,

        /// File format
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,bus_booking=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = SessionConfig::from_env();
    if let Some(url) = cli.url {
        config = config.with_api_url(url);
    }

    let session = BookingSession::from_config(&config).context("create booking session")?;
    let mut stdout = std::io::stdout().lock();

    let outcome = match cli.command {
        Commands::List { bus, format } => {
            commands::tickets::list(&session, bus.as_deref(), format, &mut stdout).await
        },
        Commands::Book { name, bus, seat } => {
            commands::tickets::book(&session, &name, &bus, &seat, &mut stdout).await
        },
        Commands::Update { id, name } => {
            commands::tickets::update(&session, TicketId(id), &name, &mut stdout).await
        },
        Commands::Cancel { id } => {
            commands::tickets::cancel(&session, TicketId(id), &mut stdout).await
        },
        Commands::Buses { bus } => commands::buses::show(&session, bus.as_deref(), &mut stdout).await,
        Commands::Stats => commands::buses::stats(&session, &mut stdout).await,
        Commands::BulkBook { csv_file } => {
            commands::bulk::run(&session, &csv_file, &mut stdout).await
        },
        Commands::Export { output, format } => {
            commands::tickets::export(&session, &output, format, &mut stdout).await
        },
    };

    let shutdown = session
        .shutdown(Duration::from_secs(5))
        .await
        .context("shut down booking session");
    outcome.and(shutdown)
}
