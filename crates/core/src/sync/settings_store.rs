//! Last-known-good settings and status snapshots.

use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::panel_sync_model::{RoundTrip, RoundTripKind};
use crate::settings::{SettingsSnapshot, StatusSnapshot};

/// A snapshot together with the round trip that produced it.
#[derive(Debug)]
pub struct Installed<T> {
    pub ticket: RoundTrip,
    pub snapshot: Arc<T>,
}

impl<T> Clone for Installed<T> {
    fn clone(&self) -> Self {
        Self {
            ticket: self.ticket,
            snapshot: Arc::clone(&self.snapshot),
        }
    }
}

pub type SettingsSlot = Option<Installed<SettingsSnapshot>>;
pub type StatusSlot = Option<Installed<StatusSnapshot>>;

/// Holds exactly one settings snapshot and one status snapshot.
///
/// Replacement swaps the whole `Arc`; readers either see the old snapshot or
/// the new one. No field-level updates exist. Responses whose ticket is older
/// than the installed snapshot's are dropped.
#[derive(Debug)]
pub struct SettingsStore {
    settings: watch::Sender<SettingsSlot>,
    status: watch::Sender<StatusSlot>,
    next_seq: AtomicU64,
}

impl SettingsStore {
    pub fn new() -> Self {
        let (settings, _) = watch::channel(None);
        let (status, _) = watch::channel(None);
        Self {
            settings,
            status,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Issue the ticket for a round trip that is about to start.
    pub fn issue_ticket(&self, kind: RoundTripKind) -> RoundTrip {
        RoundTrip {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            kind,
        }
    }

    /// Swap in a new settings snapshot. Returns false if it was stale.
    pub fn replace_settings(&self, ticket: RoundTrip, snapshot: SettingsSnapshot) -> bool {
        let installed = replace_if_newer(&self.settings, ticket, snapshot);
        if !installed {
            debug!(
                "[PanelSync] Dropping stale settings from {:?} #{}",
                ticket.kind, ticket.seq
            );
        }
        installed
    }

    /// Swap in a new status snapshot. Returns false if it was stale.
    pub fn replace_status(&self, ticket: RoundTrip, snapshot: StatusSnapshot) -> bool {
        let installed = replace_if_newer(&self.status, ticket, snapshot);
        if !installed {
            debug!(
                "[PanelSync] Dropping stale status from {:?} #{}",
                ticket.kind, ticket.seq
            );
        }
        installed
    }

    pub fn settings(&self) -> Option<Arc<SettingsSnapshot>> {
        self.settings
            .borrow()
            .as_ref()
            .map(|installed| Arc::clone(&installed.snapshot))
    }

    pub fn status(&self) -> Option<Arc<StatusSnapshot>> {
        self.status
            .borrow()
            .as_ref()
            .map(|installed| Arc::clone(&installed.snapshot))
    }

    pub fn settings_ticket(&self) -> Option<RoundTrip> {
        self.settings.borrow().as_ref().map(|installed| installed.ticket)
    }

    pub fn status_ticket(&self) -> Option<RoundTrip> {
        self.status.borrow().as_ref().map(|installed| installed.ticket)
    }

    /// Receiver that wakes whenever a new settings snapshot is installed.
    pub fn subscribe_settings(&self) -> watch::Receiver<SettingsSlot> {
        self.settings.subscribe()
    }

    /// Receiver that wakes whenever a new status snapshot is installed.
    pub fn subscribe_status(&self) -> watch::Receiver<StatusSlot> {
        self.status.subscribe()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

fn replace_if_newer<T>(
    slot: &watch::Sender<Option<Installed<T>>>,
    ticket: RoundTrip,
    snapshot: T,
) -> bool {
    let snapshot = Arc::new(snapshot);
    slot.send_if_modified(|current| {
        if let Some(existing) = current {
            if existing.ticket.seq > ticket.seq {
                return false;
            }
        }
        *current = Some(Installed { ticket, snapshot });
        true
    })
}
