//! Webhook server and process wiring.

use crate::config::RelayConfig;
use crate::error::ServeError;
use crate::inbound::{InboundRouter, Intake};
use crate::pipeline::SettlePipeline;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chat_relay_ai::{AnswerBackend, AnswerGenerator};
use chat_relay_conversation::InboundEvent;
use chat_relay_integration::{
    HttpGateway, MessagingClient, PacedDelivery, Transcriber, WhisperApi,
};
use chat_relay_scheduler::{DebounceScheduler, SettleHandler};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Builds the HTTP routes.
///
/// - `POST /webhook` accepts an inbound event; voice notes are transcribed
///   in the background
/// - `GET /health` returns `ok`
pub fn router<H: SettleHandler>(inbound: Arc<InboundRouter<H>>) -> Router {
    Router::new()
        .route("/webhook", post(webhook::<H>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(inbound)
}

async fn webhook<H: SettleHandler>(
    State(inbound): State<Arc<InboundRouter<H>>>,
    Json(event): Json<InboundEvent>,
) -> StatusCode {
    // Accepting before spawning keeps the conversation's arrival order.
    if let Intake::Transcribe(voice) = inbound.accept(event) {
        tokio::spawn(async move {
            inbound.complete(voice).await;
        });
    }
    StatusCode::ACCEPTED
}

async fn health() -> &'static str {
    "ok"
}

/// Wires the relay from configuration and serves until shutdown.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the HTTP client cannot be
/// built, or the listener fails.
pub async fn run(config: RelayConfig) -> chat_relay_core::Result<(), ServeError> {
    config.validate().map_err(ServeError::from)?;

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| ServeError::HttpClient {
            reason: e.to_string(),
        })?;

    let generator = config
        .answer_generator(http.clone())
        .map_err(ServeError::from)?;
    let whisper = config.whisper().map_err(ServeError::from)?;
    info!(backend = %generator.kind(), model = generator.model(), "answer backend selected");

    let client: Arc<dyn MessagingClient> = Arc::new(HttpGateway::new(
        http.clone(),
        config.gateway_url.clone(),
        config.gateway_token(),
    ));
    let pipeline: Arc<SettlePipeline<AnswerGenerator>> = Arc::new(SettlePipeline::new(
        generator,
        client.clone(),
        PacedDelivery::new(config.delivery),
    ));
    let scheduler = DebounceScheduler::new(pipeline);
    let transcriber = Transcriber::new(
        Arc::new(WhisperApi::new(http, whisper)),
        config.staging_dir(),
    );
    let inbound = Arc::new(InboundRouter::new(scheduler.clone(), transcriber, client));

    let addr = config.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServeError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
    info!(%addr, "listening for webhooks");

    axum::serve(listener, router(inbound))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServeError::Server {
            reason: e.to_string(),
        })?;

    let discarded = scheduler.cancel_all();
    info!(discarded, "relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
