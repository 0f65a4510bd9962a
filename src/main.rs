use shioaji_kafka_bridge::config::Config;
use shioaji_kafka_bridge::error::BridgeError;
use shioaji_kafka_bridge::kafka::TickProducer;
use shioaji_kafka_bridge::monotonic::{self, Monotonic};
use shioaji_kafka_bridge::probe::DownstreamProbe;
use shioaji_kafka_bridge::supervisor::Supervisor;
use shioaji_kafka_bridge::upstream::placeholder::UnimplementedQuoteSource;
use shioaji_kafka_bridge::upstream::SessionManager;
use shioaji_kafka_bridge::{AppResult, cli::Cli, init_logging};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    let config = match Config::load_from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("startup configuration error: {e:#}");
            // `Config::validate` only ever produces `MissingCredential`, which
            // the error-kind table marks fatal; `is_fatal()` is the boundary
            // that decides exit code here rather than a bare `exit(1)`.
            let exit_code = e
                .downcast_ref::<BridgeError>()
                .map(|be| if be.is_fatal() { 1 } else { 0 })
                .unwrap_or(1);
            std::process::exit(exit_code);
        }
    };

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log.level.clone());
    init_logging(&log_level)?;

    tracing::info!(instrument = %cli.instrument_code, "shioaji-kafka-bridge starting");

    if cli.dry_run {
        tracing::info!("configuration validated, dry-run requested, exiting");
        return Ok(());
    }

    let producer = match TickProducer::new(&config.kafka.broker, config.kafka.topic.clone()) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            tracing::error!(error = %e, fatal = e.is_fatal(), "producer init failed");
            std::process::exit(if e.is_fatal() { 1 } else { 0 });
        }
    };

    let monotonic = Monotonic::new();
    let last_tick_at: Arc<AtomicU64> = Arc::new(AtomicU64::new(monotonic.now_millis()));

    let on_tick = {
        let producer = producer.clone();
        let monotonic = monotonic.clone();
        let last_tick_at = last_tick_at.clone();
        Arc::new(move |tick: shioaji_kafka_bridge::tick::Tick| {
            producer.produce_tick(&tick);
            monotonic::mark_now(&monotonic, &last_tick_at);
        })
    };

    let on_subscribed = {
        let monotonic = monotonic.clone();
        let last_tick_at = last_tick_at.clone();
        Arc::new(move || {
            monotonic::mark_now(&monotonic, &last_tick_at);
        })
    };

    let source = Arc::new(UnimplementedQuoteSource::new());
    let session_manager = Arc::new(SessionManager::new(
        source,
        config.credentials.clone(),
        cli.instrument_code.clone(),
        on_tick,
        on_subscribed,
    ));
    session_manager.wire_session_down();

    let probe = DownstreamProbe::new(config.kafka.broker.clone());

    let mut supervisor = Supervisor::new(
        config,
        session_manager,
        producer,
        probe,
        monotonic,
        last_tick_at,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    supervisor.run(shutdown_rx).await;
    supervisor.shutdown().await;
    signal_task.abort();

    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
