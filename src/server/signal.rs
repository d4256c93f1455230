// Signal handling module
//
// SIGTERM and SIGINT both request a graceful shutdown.

/// Wait for a shutdown signal and return its name
#[cfg(unix)]
pub async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!("failed to register signal handlers: {err}, falling back to ctrl-c");
                return ctrl_c().await;
            }
        };

    tracing::debug!("signal handlers registered, pid {}", std::process::id());

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Only Ctrl+C is available off Unix
#[cfg(not(unix))]
pub async fn shutdown_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
        // Nothing left to wait on; never resolve rather than shut down at once
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
