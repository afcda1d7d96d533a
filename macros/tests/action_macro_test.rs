//! Tests for #[derive(Action)] macro

use bus_booking_core::types::TicketId;
use bus_booking_macros::Action;

#[derive(Action, Clone, Debug, PartialEq)]
enum TicketAction {
    #[command]
    CancelTicket { ticket_id: TicketId },

    #[command]
    RefreshStats,

    #[event]
    TicketCancelled { ticket_id: TicketId },

    #[event]
    StatsLoaded(u64),

    Tick,
}

#[test]
fn test_is_command() {
    let action = TicketAction::CancelTicket {
        ticket_id: TicketId(1),
    };
    assert!(action.is_command());
    assert!(!action.is_event());
    assert!(TicketAction::RefreshStats.is_command());
}

#[test]
fn test_is_event() {
    let action = TicketAction::TicketCancelled {
        ticket_id: TicketId(1),
    };
    assert!(!action.is_command());
    assert!(action.is_event());
    assert!(TicketAction::StatsLoaded(3).is_event());
}

#[test]
fn test_unmarked_variant_is_neither() {
    assert!(!TicketAction::Tick.is_command());
    assert!(!TicketAction::Tick.is_event());
}

#[test]
fn test_name_covers_every_shape() {
    assert_eq!(
        TicketAction::CancelTicket {
            ticket_id: TicketId(2)
        }
        .name(),
        "CancelTicket"
    );
    assert_eq!(TicketAction::RefreshStats.name(), "RefreshStats");
    assert_eq!(TicketAction::StatsLoaded(0).name(), "StatsLoaded");
    assert_eq!(TicketAction::Tick.name(), "Tick");
}
