//! virality-analyzer entry point.
//!
//! Runs the startup preflight, then the Kafka consumer and the HTTP server
//! side by side until Ctrl-C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use virality_analyzer::api;
use virality_analyzer::app_state::AppState;
use virality_analyzer::bootstrap::{self, KafkaProbe, RetryPolicy};
use virality_analyzer::config::AnalyzerConfig;
use virality_analyzer::consumer::{self, KafkaSource, MessageConsumer};
use virality_analyzer::service::QueryService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AnalyzerConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    init_tracing(config.log_json);

    if let Err(err) = run(config).await {
        tracing::error!(error = %format!("{err:#}"), "virality-analyzer stopped");
        return Err(err);
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: AnalyzerConfig) -> anyhow::Result<()> {
    tracing::info!(
        addr = %config.listen_addr,
        backend = config.store_backend.as_str(),
        topic = %config.kafka_topic,
        "starting virality-analyzer"
    );

    // Preflight: store with retry, then the message source
    let store = bootstrap::connect_store(&config, &RetryPolicy::default()).await?;
    bootstrap::check_message_source(
        &KafkaProbe::default(),
        &config.kafka_brokers,
        &config.kafka_topic,
    )
    .await?;

    // Consumer task
    let source = KafkaSource::subscribe(
        &config.kafka_brokers,
        &config.kafka_topic,
        &config.kafka_group_id,
    )?;
    let (stop_consumer, shutdown) = consumer::shutdown_channel();
    let consumer_task =
        tokio::spawn(MessageConsumer::new(source, Arc::clone(&store)).run(shutdown));

    // HTTP server
    if config.internal_api_key.is_none() {
        tracing::warn!("INTERNAL_API_KEY is not set; /internal routes are open");
    }
    let state = AppState::new(
        QueryService::new(Arc::clone(&store)),
        config.internal_api_key.clone(),
    );
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let served = axum::serve(listener, api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Drain the consumer whether or not the server stopped cleanly
    tracing::info!("stopping consumer");
    let _ = stop_consumer.send(true);
    match consumer_task.await {
        Ok(stats) => tracing::info!(
            processed = stats.processed,
            dropped = stats.decode_failures + stats.persistence_failures,
            "consumer drained"
        ),
        Err(err) => tracing::error!(error = %err, "consumer task failed"),
    }
    store.close().await;

    served.context("http server")?;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
