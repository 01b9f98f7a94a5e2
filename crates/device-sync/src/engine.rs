//! Sync engine: initial load, serialized writes and the background poll loop.
//!
//! The poll cursor is the only concurrency control. While it is armed a
//! refresh timer is pending and nothing talks to the device. Whoever takes
//! the cursor (the timer firing, a write, a load) owns the device until its
//! round trip settles, then re-arms the cursor. A write that finds the cursor
//! already taken waits until it is armed again, so at most one Transport call
//! is ever outstanding.

use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use clockpanel_core::settings::{SettingsPatch, SettingsSnapshot, StatusSnapshot};
use clockpanel_core::sync::{CursorState, RoundTripKind, SettingsStore, SyncConfig};

use crate::error::{Result, SyncError};
use crate::transport::Transport;

/// The live refresh timer.
#[derive(Debug)]
struct PollTimer {
    id: u64,
    handle: JoinHandle<()>,
}

/// Single-slot owner of the refresh timer.
#[derive(Debug)]
struct PollCursor {
    timer: Option<PollTimer>,
    state: CursorState,
    next_id: u64,
}

impl PollCursor {
    fn new() -> Self {
        Self {
            timer: None,
            state: CursorState::Unarmed,
            next_id: 0,
        }
    }

    /// Cancel the pending timer and hand the cursor to `next`.
    fn take(&mut self, next: CursorState) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.handle.abort();
                self.state = next;
                true
            }
            None => false,
        }
    }
}

/// Tracks the "disable until load" controls owed to the presentation layer.
///
/// Controls start disabled, are disabled while any load or write is pending
/// and come back once every pending call has settled.
#[derive(Debug)]
struct InteractionGate {
    pending: Mutex<usize>,
    enabled: watch::Sender<bool>,
}

impl InteractionGate {
    fn new() -> Self {
        let (enabled, _) = watch::channel(false);
        Self {
            pending: Mutex::new(0),
            enabled,
        }
    }

    fn hold(&self) -> InteractionHold<'_> {
        let mut pending = lock_unpoisoned(&self.pending);
        *pending += 1;
        self.enabled.send_replace(false);
        InteractionHold { gate: self }
    }
}

struct InteractionHold<'a> {
    gate: &'a InteractionGate,
}

impl Drop for InteractionHold<'_> {
    fn drop(&mut self) {
        let mut pending = lock_unpoisoned(&self.gate.pending);
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.gate.enabled.send_replace(true);
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct Shared<T> {
    transport: T,
    store: Arc<SettingsStore>,
    config: SyncConfig,
    cursor: Mutex<PollCursor>,
    armed: Notify,
    write_turn: tokio::sync::Mutex<()>,
    controls: InteractionGate,
}

impl<T> Shared<T> {
    fn lock_cursor(&self) -> MutexGuard<'_, PollCursor> {
        lock_unpoisoned(&self.cursor)
    }
}

impl<T: Transport> Shared<T> {
    /// Read settings, then status, installing each one that succeeds.
    ///
    /// The reads run back to back rather than concurrently so the device never
    /// sees two requests from this client at once.
    async fn read_round(&self, kind: RoundTripKind) -> Result<()> {
        let ticket = self.store.issue_ticket(kind);
        debug!("[PanelSync] {:?} #{} reading settings and status", kind, ticket.seq);

        let settings = match self.transport.read_settings().await {
            Ok(snapshot) => {
                self.store.replace_settings(ticket, snapshot);
                Ok(())
            }
            Err(err) => {
                warn!("[PanelSync] {:?} #{} settings read failed: {}", kind, ticket.seq, err);
                Err(err)
            }
        };

        let status = match self.transport.read_status().await {
            Ok(snapshot) => {
                self.store.replace_status(ticket, snapshot);
                Ok(())
            }
            Err(err) => {
                warn!("[PanelSync] {:?} #{} status read failed: {}", kind, ticket.seq, err);
                Err(err)
            }
        };

        settings.and(status)
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let cursor = self.cursor.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = cursor.timer.take() {
            timer.handle.abort();
        }
    }
}

/// Ownership of the device for one round trip. Re-arms the cursor on drop,
/// including when the owning future is cancelled mid-flight.
struct CursorLease<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Drop for CursorLease<T> {
    fn drop(&mut self) {
        arm(&self.shared);
    }
}

/// Schedule the next refresh and wake any deferred writers.
fn arm<T: Transport>(shared: &Arc<Shared<T>>) {
    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
            warn!("[PanelSync] No async runtime available; poll loop not re-armed");
            shared.lock_cursor().state = CursorState::Unarmed;
            return;
        }
    };

    let weak = Arc::downgrade(shared);
    let delay = shared.config.poll_interval;
    let mut cursor = shared.lock_cursor();
    cursor.next_id += 1;
    let id = cursor.next_id;
    let handle = runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        // Every engine handle is gone: the hosting context was torn down.
        if let Some(shared) = weak.upgrade() {
            refresh(shared, id).await;
        }
    });
    if let Some(stale) = cursor.timer.replace(PollTimer { id, handle }) {
        stale.handle.abort();
    }
    cursor.state = CursorState::Armed;
    drop(cursor);

    shared.armed.notify_waiters();
}

/// Timer body: claim the cursor if this timer still owns it, read, re-arm.
async fn refresh<T: Transport>(shared: Arc<Shared<T>>, id: u64) {
    let lease = {
        let mut cursor = shared.lock_cursor();
        match cursor.timer.as_ref() {
            Some(timer) if timer.id == id => {}
            _ => return,
        }
        cursor.timer = None;
        cursor.state = CursorState::Refreshing;
        CursorLease {
            shared: Arc::clone(&shared),
        }
    };

    // Failures are already logged; the lease re-arms either way.
    let _ = shared.read_round(RoundTripKind::Refresh).await;
    drop(lease);
}

fn try_take<T: Transport>(shared: &Arc<Shared<T>>, next: CursorState) -> Option<CursorLease<T>> {
    let mut cursor = shared.lock_cursor();
    if cursor.take(next) {
        Some(CursorLease {
            shared: Arc::clone(shared),
        })
    } else {
        None
    }
}

/// Wait until the cursor is armed, then cancel its timer and own the device.
async fn acquire<T: Transport>(shared: &Arc<Shared<T>>, next: CursorState) -> CursorLease<T> {
    loop {
        let notified = shared.armed.notified();
        tokio::pin!(notified);
        let _ = notified.as_mut().enable();

        if let Some(lease) = try_take(shared, next) {
            return lease;
        }

        debug!(
            "[PanelSync] Poll cursor busy ({:?}); deferring {:?}",
            shared.lock_cursor().state,
            next
        );
        // The notification normally arrives first; the timeout is a backstop.
        let _ = tokio::time::timeout(shared.config.write_retry_delay, notified).await;
    }
}

/// Keeps a view of one device's settings consistent with the device.
///
/// Cloning is cheap and every clone drives the same poll loop. The loop runs
/// until the last handle is dropped.
pub struct SyncEngine<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for SyncEngine<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> SyncEngine<T> {
    pub fn new(transport: T, config: SyncConfig) -> Self {
        Self::with_store(transport, Arc::new(SettingsStore::new()), config)
    }

    pub fn with_store(transport: T, store: Arc<SettingsStore>, config: SyncConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                store,
                config,
                cursor: Mutex::new(PollCursor::new()),
                armed: Notify::new(),
                write_turn: tokio::sync::Mutex::new(()),
                controls: InteractionGate::new(),
            }),
        }
    }

    /// Read settings and status, install what arrives and start the poll loop.
    ///
    /// The loop is armed even when a read fails; the error is still returned
    /// so the caller can report it. Calling this again later forces a full
    /// re-read, serialized like any other round trip.
    pub async fn load_initial(&self) -> Result<()> {
        let _hold = self.shared.controls.hold();

        let first_load = {
            let mut cursor = self.shared.lock_cursor();
            if cursor.state == CursorState::Unarmed && cursor.timer.is_none() {
                cursor.state = CursorState::Loading;
                true
            } else {
                false
            }
        };
        let lease = if first_load {
            CursorLease {
                shared: Arc::clone(&self.shared),
            }
        } else {
            acquire(&self.shared, CursorState::Loading).await
        };

        let result = self.shared.read_round(RoundTripKind::Load).await;
        drop(lease);

        match &result {
            Ok(()) => info!("[PanelSync] Loaded settings and status"),
            Err(err) => warn!("[PanelSync] Load incomplete, polling anyway: {}", err),
        }
        result
    }

    /// Apply one patch on the device.
    ///
    /// Waits for its turn behind earlier writes and for any in-flight refresh
    /// to settle, cancels the pending refresh, posts the patch, installs the
    /// returned settings and re-arms the loop. On failure the snapshot is left
    /// untouched, the loop is still re-armed and the error is returned.
    pub async fn submit_change(&self, patch: SettingsPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(SyncError::invalid_request("Settings patch is empty"));
        }

        let _hold = self.shared.controls.hold();
        let _turn = self.shared.write_turn.lock().await;
        let lease = acquire(&self.shared, CursorState::Writing).await;

        let ticket = self.shared.store.issue_ticket(RoundTripKind::Write);
        debug!("[PanelSync] Write #{} posting {:?}", ticket.seq, patch);

        let result = match self.shared.transport.write_settings(&patch).await {
            Ok(snapshot) => {
                self.shared.store.replace_settings(ticket, snapshot);
                Ok(())
            }
            Err(err) => {
                warn!("[PanelSync] Write #{} failed: {}", ticket.seq, err);
                Err(err)
            }
        };
        drop(lease);
        result
    }

    pub fn store(&self) -> Arc<SettingsStore> {
        Arc::clone(&self.shared.store)
    }

    pub fn settings(&self) -> Option<Arc<SettingsSnapshot>> {
        self.shared.store.settings()
    }

    pub fn status(&self) -> Option<Arc<StatusSnapshot>> {
        self.shared.store.status()
    }

    pub fn cursor_state(&self) -> CursorState {
        self.shared.lock_cursor().state
    }

    /// Whether "disable until load" controls should currently be enabled.
    pub fn controls_enabled(&self) -> bool {
        *self.shared.controls.enabled.borrow()
    }

    pub fn subscribe_controls(&self) -> watch::Receiver<bool> {
        self.shared.controls.enabled.subscribe()
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    pub fn config(&self) -> SyncConfig {
        self.shared.config
    }
}
