//! OS signal listening for the lifecycle manager.
//!
//! The listener task does nothing but record the termination cause and wake
//! the main control flow; shutdown itself happens on the main flow. It keeps
//! running after the first signal so repeats are logged instead of dropped.
//!
//! ## Unix
//! - **SIGTERM** is a termination request.
//! - **SIGINT** (Ctrl-C) is an interrupt.
//!
//! ## Windows
//! Only Ctrl-C is observed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::lifecycle::{Termination, TerminationCause};

fn observe(termination: &Termination, cause: TerminationCause) {
    if let Some(first) = termination.requested() {
        warn!("{:?} received while already shutting down after {:?}", cause, first);
        return;
    }
    match cause {
        TerminationCause::Signal => info!("SIGTERM detected, shutting down"),
        TerminationCause::Interrupt => info!("Interrupt received, shutting down"),
    }
    termination.request(cause);
}

/// Registers the signal listeners and spawns the task waiting on them.
///
/// Registration happens before returning so failures surface to the caller.
#[cfg(unix)]
pub fn spawn_listener(termination: Arc<Termination>) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            let cause = tokio::select! {
                Some(()) = sigterm.recv() => TerminationCause::Signal,
                Some(()) = sigint.recv() => TerminationCause::Interrupt,
                else => break,
            };
            observe(&termination, cause);
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_listener(termination: Arc<Termination>) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Unable to listen for Ctrl-C: {}", e);
                break;
            }
            observe(&termination, TerminationCause::Interrupt);
        }
    }))
}
