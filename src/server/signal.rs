// Signal handling module
//
// Supported signals:
// - SIGINT:  Graceful shutdown (Ctrl+C)
// - SIGTERM: Graceful shutdown (Unix only)

use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Spawn a background task that notifies `shutdown` on the first stop signal.
///
/// `notify_one` stores a permit, so a signal arriving while a connection is
/// being served still stops the loop at its next iteration.
pub fn start_signal_handler(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        if let Some(name) = wait_for_stop_signal().await {
            logger::log_info(&format!("{name} received, shutting down"));
            shutdown.notify_one();
        }
    });
}

#[cfg(unix)]
async fn wait_for_stop_signal() -> Option<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            logger::log_warning(&format!("Failed to register SIGTERM handler: {e}"));
            None
        }
    };

    let sigterm_recv = async {
        match sigterm.as_mut() {
            Some(s) => s.recv().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => Some("SIGINT"),
            Err(e) => {
                logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
                None
            }
        },
        _ = sigterm_recv => Some("SIGTERM"),
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
async fn wait_for_stop_signal() -> Option<&'static str> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => Some("Ctrl+C"),
        Err(e) => {
            logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
            None
        }
    }
}
