//! Sync state models shared between the engine and its hosts.

use serde::{Deserialize, Serialize};

/// Where the poll cursor is in its lifecycle.
///
/// Only `Armed` holds a live timer. Every other state means some round trip
/// (or the initial load) owns the device and writes must wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorState {
    /// Nothing scheduled and nothing in flight; the initial load has not run.
    Unarmed,
    Loading,
    Armed,
    Refreshing,
    Writing,
}

impl CursorState {
    pub fn is_armed(&self) -> bool {
        matches!(self, CursorState::Armed)
    }

    /// True while a Transport round trip owns the cursor.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            CursorState::Loading | CursorState::Refreshing | CursorState::Writing
        )
    }
}

/// Kind of round trip, used for logging and tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundTripKind {
    Load,
    Refresh,
    Write,
}

/// Ordering token issued when a round trip starts.
///
/// Tickets grow monotonically per store; a response carrying a ticket older
/// than the installed snapshot's is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundTrip {
    pub seq: u64,
    pub kind: RoundTripKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_state_serialization_is_snake_case() {
        let actual = [
            CursorState::Unarmed,
            CursorState::Loading,
            CursorState::Armed,
            CursorState::Refreshing,
            CursorState::Writing,
        ]
        .iter()
        .map(|state| serde_json::to_string(state).expect("serialize cursor state"))
        .collect::<Vec<_>>();

        assert_eq!(
            actual,
            vec![
                "\"unarmed\"",
                "\"loading\"",
                "\"armed\"",
                "\"refreshing\"",
                "\"writing\"",
            ]
        );
    }

    #[test]
    fn only_round_trip_states_are_in_flight() {
        assert!(CursorState::Writing.is_in_flight());
        assert!(!CursorState::Armed.is_in_flight());
        assert!(!CursorState::Unarmed.is_in_flight());
    }

    #[test]
    fn tickets_compare_by_sequence_and_kind() {
        let load = RoundTrip {
            seq: 1,
            kind: RoundTripKind::Load,
        };
        let write = RoundTrip {
            seq: 1,
            kind: RoundTripKind::Write,
        };
        assert_ne!(load, write);
        assert_eq!(
            load,
            RoundTrip {
                seq: 1,
                kind: RoundTripKind::Load,
            }
        );
    }
}
