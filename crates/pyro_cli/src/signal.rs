//! Ctrl-C handling for build runs.

use pyro_build::CancelToken;

/// Cancels `cancel` when the process receives Ctrl-C.
///
/// The signal is awaited on a small current-thread runtime owned by a
/// helper thread, so the build itself stays synchronous. Running compiler
/// processes are killed by their workers once they see the token.
pub fn cancel_on_ctrl_c(cancel: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("pyro-ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!("cannot listen for Ctrl-C: {e}");
                    return;
                }
            };
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::warn!("interrupted, cancelling remaining scripts");
                        cancel.cancel();
                    }
                    Err(e) => tracing::warn!("cannot listen for Ctrl-C: {e}"),
                }
            });
        });

    if let Err(e) = spawned {
        tracing::warn!("cannot start Ctrl-C listener: {e}");
    }
}
