//! Signal-triggered close for hosts that opt in.

use super::Client;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Spawn a watcher that closes the client on SIGINT/SIGTERM.
///
/// The watcher stops silently when `cancel` fires first, which is what an
/// explicit [`Client::close`] does.
pub(super) fn spawn_signal_watcher(client: Client, cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            () = cancel.cancelled() => return,
            received = wait_for_signal() => {
                if !received {
                    return;
                }
            }
        }
        info!("shutdown signal received, closing event client");
        if let Err(e) = client.close().await {
            error!(error = %e, "signal-triggered close failed");
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> bool {
    let mut sigterm = match unix_signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            return false;
        }
    };

    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => {
                info!("received SIGINT (Ctrl+C)");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGINT");
                false
            }
        },
        _ = sigterm.recv() => {
            info!("received SIGTERM");
            true
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("received SIGINT (Ctrl+C)");
            true
        }
        Err(e) => {
            error!(error = %e, "failed to listen for SIGINT");
            false
        }
    }
}
