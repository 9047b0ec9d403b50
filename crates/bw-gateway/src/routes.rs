//! Gateway routes and logging callback handlers

use axum::routing::get;
use axum::{Json, Router};
use bw_core::{CallbackEvent, CallbackEventType};
use bw_web::{Bandwidth, BandwidthContext, BandwidthRouterExt, CallbackHandler};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub fn app(bandwidth: Bandwidth) -> Router {
    Router::new()
        .route("/", get(context))
        .route("/health", get(health))
        .use_bandwidth(bandwidth)
        .layer(TraceLayer::new_for_http())
}

/// Resources provisioned for this host
async fn context(context: BandwidthContext) -> Json<BandwidthContext> {
    Json(context)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn call_logger() -> CallbackHandler {
    CallbackHandler::all(log_call_event)
        .on(CallbackEventType::IncomingCall, log_incoming_call)
        .on(CallbackEventType::Answer, log_call_event)
        .on(CallbackEventType::Hangup, log_hangup)
}

/// Logs messages; anything else posted to the message URL is reported as a failure
pub fn message_logger() -> CallbackHandler {
    CallbackHandler::all(reject_non_message)
        .on(CallbackEventType::Sms, log_sms)
        .on(CallbackEventType::Mms, log_mms)
}

async fn log_incoming_call(event: CallbackEvent, context: BandwidthContext) -> anyhow::Result<()> {
    tracing::info!(
        "Incoming call {} from {} to {} (application {})",
        event.call_id.as_deref().unwrap_or("-"),
        event.from.as_deref().unwrap_or("-"),
        event.to.as_deref().unwrap_or("-"),
        context.application_id
    );
    Ok(())
}

async fn log_call_event(event: CallbackEvent, _context: BandwidthContext) -> anyhow::Result<()> {
    tracing::info!(
        "{:?} event for call {}",
        event.event_type,
        event.call_id.as_deref().unwrap_or("-")
    );
    Ok(())
}

async fn log_hangup(event: CallbackEvent, _context: BandwidthContext) -> anyhow::Result<()> {
    tracing::info!(
        "Call {} ended: {}",
        event.call_id.as_deref().unwrap_or("-"),
        event.extra_str("cause").unwrap_or("unknown cause")
    );
    Ok(())
}

async fn reject_non_message(event: CallbackEvent, _context: BandwidthContext) -> anyhow::Result<()> {
    anyhow::ensure!(
        event.event_type.is_message(),
        "{:?} event posted to the message callback",
        event.event_type
    );
    tracing::debug!("Ignoring {:?} message", event.event_type);
    Ok(())
}

async fn log_sms(event: CallbackEvent, _context: BandwidthContext) -> anyhow::Result<()> {
    tracing::info!(
        "SMS from {}: {}",
        event.from.as_deref().unwrap_or("-"),
        event.text.as_deref().unwrap_or("")
    );
    Ok(())
}

async fn log_mms(event: CallbackEvent, _context: BandwidthContext) -> anyhow::Result<()> {
    tracing::info!(
        "MMS from {} with {} media item(s)",
        event.from.as_deref().unwrap_or("-"),
        event.media.len()
    );
    Ok(())
}
