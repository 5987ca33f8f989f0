use color_eyre::eyre::Result;
use tracing::{error, info, Instrument};

use primus_config::Config;
use primus_engine::LogOnly;
use primus_metrics::SharedRegistry;

use crate::metrics::serve_metrics;

pub async fn run(config: Config) -> Result<()> {
    let span = tracing::error_span!("node", moniker = %config.moniker);

    async move {
        if config.metrics.enabled {
            tokio::spawn(serve_metrics(config.metrics.listen_addr).in_current_span());
        }

        info!("Node is starting...");

        let mut node = primus_engine::build(&config, LogOnly, SharedRegistry::global())?;
        let stop = node.stop_handle();

        #[cfg(unix)]
        tokio::spawn(shuffle_on_signal(node.shuffle_handle()).in_current_span());

        tokio::spawn(
            async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Shutting down...");
                        stop.stop();
                    }
                    Err(e) => error!("Failed to listen for Ctrl-C: {e}"),
                }
            }
            .in_current_span(),
        );

        node.run().await;

        Ok(())
    }
    .instrument(span)
    .await
}

/// Force a shuffle on every `SIGUSR1`.
#[cfg(unix)]
async fn shuffle_on_signal(handle: primus_engine::ShuffleHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut signals = match signal(SignalKind::user_defined1()) {
        Ok(signals) => signals,
        Err(e) => {
            error!("Failed to listen for SIGUSR1: {e}");
            return;
        }
    };

    while signals.recv().await.is_some() {
        info!("Received SIGUSR1, forcing a chain shuffle");
        handle.force_shuffle();
    }
}
