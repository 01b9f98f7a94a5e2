//! Interactive settings panel for the clock.
//!
//! Reads commands from stdin, submits each change through the sync engine and
//! prints the store whenever a new snapshot lands.

mod commands;
mod config;
mod render;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clockpanel_core::settings::SettingsPatch;
use clockpanel_core::sync::SettingsStore;
use clockpanel_device_sync::{DeviceClient, PreviewTransport, SyncEngine, SyncError, Transport};

use crate::commands::{parse_command, Command, HELP};
use crate::config::{DeviceTarget, PanelConfig};

type Engine = SyncEngine<Arc<dyn Transport>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_transport(target: &DeviceTarget) -> anyhow::Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match target {
        DeviceTarget::Http { base_url, timeout } => {
            info!("Using clock at {}", base_url);
            Arc::new(
                DeviceClient::with_timeout(base_url, *timeout)
                    .with_context(|| format!("Invalid device URL '{}'", base_url))?,
            )
        }
        DeviceTarget::Preview => {
            info!("Using in-memory preview device");
            Arc::new(PreviewTransport::new())
        }
    };
    Ok(transport)
}

fn print_store(store: &SettingsStore) {
    match store.settings() {
        Some(settings) => println!("{}", render::settings(&settings)),
        None => println!("settings: not loaded"),
    }
    match store.status() {
        Some(status) => println!("{}", render::status(&status)),
        None => println!("status: not loaded"),
    }
}

/// Print settings on every replacement and status only when it changes.
fn spawn_store_printer(store: Arc<SettingsStore>) -> tokio::task::JoinHandle<()> {
    let mut settings_rx = store.subscribe_settings();
    let mut status_rx = store.subscribe_status();
    tokio::spawn(async move {
        let mut last_status = None;
        loop {
            tokio::select! {
                changed = settings_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let line = settings_rx
                        .borrow_and_update()
                        .as_ref()
                        .map(|installed| render::settings(&installed.snapshot));
                    if let Some(line) = line {
                        println!("{}", line);
                    }
                }
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = status_rx
                        .borrow_and_update()
                        .as_ref()
                        .map(|installed| *installed.snapshot);
                    if status.is_some() && status != last_status {
                        last_status = status;
                        if let Some(status) = status {
                            println!("{}", render::status(&status));
                        }
                    }
                }
            }
        }
    })
}

/// Human wording for a failed change.
fn describe_failure(err: &SyncError) -> String {
    if err.is_rejected() {
        format!("Change rejected by the clock: {}", err)
    } else {
        format!("Change not applied, the next poll will show the clock's state: {}", err)
    }
}

fn spawn_change(pending: &mut JoinSet<()>, engine: &Engine, patch: SettingsPatch) {
    let engine = engine.clone();
    pending.spawn(async move {
        if !engine.controls_enabled() {
            info!("Another change is still pending; queued behind it");
        }
        match engine.submit_change(patch).await {
            Ok(()) => info!("Change applied"),
            Err(err) => warn!("{}", describe_failure(&err)),
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = PanelConfig::from_env()?;
    let transport = build_transport(&config.target)?;
    let engine: Engine = SyncEngine::new(transport, config.sync);
    let printer = spawn_store_printer(engine.store());

    if let Err(err) = engine.load_initial().await {
        warn!("Initial load incomplete, polling will retry: {}", err);
    }
    println!("{}", HELP);

    let mut pending = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Show) => print_store(&engine.store()),
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Change(patch)) => spawn_change(&mut pending, &engine, patch),
            Err(err) => eprintln!("{}", err),
        }
    }

    if !pending.is_empty() {
        info!("Waiting for {} pending change(s) before exit", pending.len());
    }
    while let Some(joined) = pending.join_next().await {
        if let Err(err) = joined {
            warn!("Change task failed: {}", err);
        }
    }

    printer.abort();
    Ok(())
}
