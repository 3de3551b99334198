//! Graceful shutdown on process signals.
//!
//! Signal handlers only cancel a shared token. The recorder polls the token at
//! every segment boundary and the GPS logger races it against the next report;
//! both release their resources on their own path.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared shutdown token handed to both daemon loops.
pub type ShutdownToken = CancellationToken;

/// Spawn a task that cancels `token` on SIGTERM or SIGINT.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be registered.
#[cfg(unix)]
pub fn install_signal_handlers(token: &ShutdownToken) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let token = token.clone();

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
        };
        info!(signal = name, "Received shutdown signal");
        token.cancel();
    });

    Ok(())
}

/// Spawn a task that cancels `token` on Ctrl+C.
///
/// # Errors
///
/// Never fails on this platform; the signature matches the Unix variant.
#[cfg(not(unix))]
pub fn install_signal_handlers(token: &ShutdownToken) -> std::io::Result<()> {
    let token = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C"),
            Err(e) => tracing::warn!(error = %e, "Failed to listen for Ctrl+C"),
        }
        token.cancel();
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clone_shares_state() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_install_signal_handlers() {
        let token = ShutdownToken::new();
        assert!(install_signal_handlers(&token).is_ok());
        assert!(!token.is_cancelled());
    }
}
