//! dam-daemon: runs a Dam against a simulated asset ledger.
//!
//! Loads `config.toml`, opens the first round with the configured deposit,
//! then closes each round as it comes due, signing the configured
//! distribution with the oracle key. Ctrl-C stops the scheduler.

mod config;
mod events;
mod rounds;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rounds::{now_secs, Operator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("dam={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!(data_dir = ?config.data_dir(), "Dam daemon starting");

    // 3. Create event bus and shutdown channel
    let event_bus = EventBus::new(1000);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // 4. Build the operator and open the first round
    let mut operator = Operator::from_config(&config)?;
    operator.start(
        now_secs(),
        config.upstream.period_secs,
        config.upstream.reinvestment_ratio_bp,
        config.upstream.auto_stream_ratio_bp,
    )?;
    event_bus.publish(operator.drain_events(), now_secs());
    let operator = Arc::new(Mutex::new(operator));

    // 5. Log every event at debug level
    let mut journal = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = journal.recv().await {
            debug!(
                event_type = ?event.event_type,
                payload = %event.payload,
                "event"
            );
        }
    });

    // 6. Run the scheduler until it finishes or Ctrl-C
    let tick = Duration::from_secs(config.advanced.tick_secs.max(1));
    let scheduler = tokio::spawn(rounds::run(
        operator.clone(),
        event_bus.clone(),
        tick,
        shutdown_rx,
    ));

    tokio::select! {
        result = scheduler => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(());
        }
    }

    let operator = operator.lock().await;
    let dam = operator.dam();
    info!(
        round = dam.round().id,
        principal = dam.principal(),
        redeemable = dam.redeemable_value(operator.ledger()).unwrap_or_default(),
        events = event_bus.sequence(),
        "Daemon stopped"
    );
    Ok(())
}
