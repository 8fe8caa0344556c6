//! Process-level signal handling and crash logging.

use std::future::pending;
use tokio::signal;

/// Resolves on the first SIGINT (Ctrl+C) or, on unix, SIGTERM.
///
/// If a handler cannot be installed, that signal is logged and ignored; the
/// other one still triggers shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received SIGINT - shutting down."),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler.");
                pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM - shutting down.");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler.");
                pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Routes panics from any thread through `tracing` so they reach the log sinks.
///
/// Request handler panics are additionally answered with a 500 by the router's
/// catch-panic layer; the process keeps serving.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let thread = std::thread::current();
        tracing::error!(
            thread = thread.name().unwrap_or("<unnamed>"),
            panic = %info,
            "Uncaught panic."
        );
    }));
}
