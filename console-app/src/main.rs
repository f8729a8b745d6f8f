//! siphost console host.
//!
//! Wires the session host to a simulated engine, spawns the
//! presentation screens, and turns stdin lines into host commands.

mod screens;
mod sim;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siphost_engine::create_host;
use siphost_ipc::{
    command_channel, event_channel, validate_registration, Credentials, Domain, HostCommand,
    ValidationError, DEFAULT_SIP_PORT,
};
use siphost_store::{settings_path_at, SettingsStore};

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "siphost=info,siphost_engine=debug,siphost_ipc=debug,siphost_store=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    info!("siphost starting");

    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .context("HOME is not set")?;
    let store = SettingsStore::new(settings_path_at(&home));

    let (command_tx, command_rx) = command_channel();
    let (event_tx, _event_rx) = event_channel();

    let engine = sim::SimulatedEngine::new();
    let controller = engine.controller();
    let pending: screens::PendingRegistration = Arc::new(Mutex::new(None));

    let registration_screen =
        screens::spawn_registration_screen(event_tx.subscribe(), store, Arc::clone(&pending));
    let call_screen = screens::spawn_call_screen(event_tx.subscribe());

    let host_events = event_tx.clone();
    let host_thread = thread::spawn(move || {
        let mut host = create_host(
            Box::new(engine),
            command_rx,
            host_events,
            Box::new(screens::CallScreenLauncher),
        );
        host.run();
    });

    let send = |command: HostCommand| {
        command_tx
            .send(command)
            .map_err(|e| anyhow!("failed to send command: {e}"))
    };

    // Fresh snapshot for the just-attached screens.
    send(HostCommand::RequestRegistrationState)?;

    println!(
        "commands: register <username> <host> [password] [port] | state | call-state | terminate | ring [remote] | exit"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("register") => {
                let username = parts.next().unwrap_or_default();
                let host = parts.next().unwrap_or_default();
                let password = parts.next().unwrap_or_default();
                let port = match parts.next() {
                    None => DEFAULT_SIP_PORT,
                    Some(raw) => match raw.parse() {
                        Ok(port) => port,
                        Err(_) => {
                            println!("{}", ValidationError::InvalidPort(raw.to_string()));
                            continue;
                        }
                    },
                };
                if let Err(e) = validate_registration(username, host) {
                    println!("{e}");
                    continue;
                }
                *pending.lock() = Some((
                    Domain {
                        host: host.to_string(),
                        port: Some(port),
                    },
                    Credentials {
                        login: username.to_string(),
                        password: password.to_string(),
                    },
                ));
                send(HostCommand::Register {
                    username: username.to_string(),
                    host: host.to_string(),
                    password: password.to_string(),
                    port,
                })?;
            }
            Some("state") => send(HostCommand::RequestRegistrationState)?,
            Some("call-state") => send(HostCommand::RequestCallState)?,
            Some("terminate") => send(HostCommand::TerminateCall)?,
            Some("ring") => controller.ring(parts.next().unwrap_or("sip:bob@sip.example.com")),
            Some("exit") => {
                send(HostCommand::Exit)?;
                break;
            }
            Some(other) => warn!(command = other, "unknown command ignored"),
            None => {}
        }
    }

    host_thread
        .join()
        .map_err(|_| anyhow!("session host panicked"))?;
    registration_screen.abort();
    call_screen.abort();
    info!("siphost stopped");
    Ok(())
}
