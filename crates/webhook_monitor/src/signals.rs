//! Signal handling for graceful shutdown.
//!
//! The first termination signal starts a graceful shutdown through the
//! shared [`ShutdownState`]; the application treats a second one as a
//! request to exit immediately.

use monitor_events::ShutdownState;
use tokio::signal;
use tracing::info;

/// Waits for a termination signal, then initiates shutdown on `shutdown_state`.
///
/// # Platform Support
///
/// * **Unix platforms**: Handles SIGINT and SIGTERM signals
/// * **Windows**: Handles Ctrl+C signal
///
/// # Example
///
/// ```rust,no_run
/// use lib_webhook_monitor::signals::setup_signal_handlers;
/// use monitor_events::ShutdownState;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let shutdown_state = ShutdownState::new();
///     // Start the server with a clone of shutdown_state...
///
///     setup_signal_handlers(&shutdown_state).await?;
///     assert!(shutdown_state.is_shutdown_initiated());
///     Ok(())
/// }
/// ```
pub async fn setup_signal_handlers(
    shutdown_state: &ShutdownState,
) -> Result<(), Box<dyn std::error::Error>> {
    wait_for_signal().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    shutdown_state.initiate_shutdown();
    Ok(())
}

/// Waits for the next termination signal without logging.
pub async fn wait_for_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
