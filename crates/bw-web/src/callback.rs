//! Provider event callbacks
//!
//! A [`CallbackHandler`] maps event types to async handlers. Handlers bound
//! with [`CallbackHandler::on`] take precedence over the catch-all set with
//! [`CallbackHandler::all`]; events with neither are acknowledged and dropped.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::{HeaderMap, header};
use bw_core::{CallbackEvent, CallbackEventType};
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::context::BandwidthContext;
use crate::error::Result;

/// Boxed async handler for one callback event
pub type EventHandler =
    Arc<dyn Fn(CallbackEvent, BandwidthContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// What happened to a dispatched callback
#[derive(Debug)]
pub enum DispatchOutcome {
    Handled(CallbackEventType),
    /// No handler is bound to this event type
    Unhandled(CallbackEventType),
    HandlerFailed(CallbackEventType, anyhow::Error),
}

#[derive(Clone, Default)]
pub struct CallbackHandler {
    handlers: HashMap<CallbackEventType, EventHandler>,
    catch_all: Option<EventHandler>,
}

impl CallbackHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler receiving every event
    pub fn all<F, Fut>(handler: F) -> Self
    where
        F: Fn(CallbackEvent, BandwidthContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            handlers: HashMap::new(),
            catch_all: Some(boxed(handler)),
        }
    }

    /// Bind `handler` to events of `event_type`
    pub fn on<F, Fut>(mut self, event_type: CallbackEventType, handler: F) -> Self
    where
        F: Fn(CallbackEvent, BandwidthContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.handlers.insert(event_type, boxed(handler));
        self
    }

    pub fn handler_for(&self, event_type: CallbackEventType) -> Option<&EventHandler> {
        self.handlers.get(&event_type).or(self.catch_all.as_ref())
    }

    /// Parse `body` and run the matching handler
    ///
    /// Only a malformed payload is an error; handler errors and panics are
    /// reported through [`DispatchOutcome::HandlerFailed`].
    pub async fn dispatch(&self, body: &[u8], context: BandwidthContext) -> Result<DispatchOutcome> {
        debug!("Callback body: {}", String::from_utf8_lossy(body));

        let event: CallbackEvent = serde_json::from_slice(body)?;
        let event_type = event.event_type;

        let Some(handler) = self.handler_for(event_type) else {
            return Ok(DispatchOutcome::Unhandled(event_type));
        };

        Ok(match AssertUnwindSafe(handler(event, context)).catch_unwind().await {
            Ok(Ok(())) => DispatchOutcome::Handled(event_type),
            Ok(Err(e)) => DispatchOutcome::HandlerFailed(event_type, e),
            Err(panic) => DispatchOutcome::HandlerFailed(
                event_type,
                anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
            ),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .field("catch_all", &self.catch_all.is_some())
            .finish()
    }
}

fn boxed<F, Fut>(handler: F) -> EventHandler
where
    F: Fn(CallbackEvent, BandwidthContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event: CallbackEvent, context: BandwidthContext| handler(event, context).boxed())
}

/// Whether the request declares a JSON body (`application/json`, `text/json`, ...)
pub fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> BandwidthContext {
        BandwidthContext {
            application_id: "a-1".to_string(),
            phone_number: None,
            domain_id: None,
        }
    }

    fn counting(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn(CallbackEvent, BandwidthContext) -> futures::future::Ready<anyhow::Result<()>> + Send + Sync + 'static
    {
        let counter = Arc::clone(counter);
        move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_bound_handler_runs_once() {
        let sms = Arc::new(AtomicUsize::new(0));
        let handler = CallbackHandler::new().on(CallbackEventType::Sms, counting(&sms));

        let outcome = handler
            .dispatch(br#"{"eventType":"sms","text":"hi"}"#, context())
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Handled(CallbackEventType::Sms)));
        assert_eq!(sms.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbound_event_is_not_handled() {
        let mms = Arc::new(AtomicUsize::new(0));
        let handler = CallbackHandler::new().on(CallbackEventType::Mms, counting(&mms));

        let outcome = handler.dispatch(br#"{"eventType":"sms"}"#, context()).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Unhandled(CallbackEventType::Sms)));
        assert_eq!(mms.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bound_handler_wins_over_catch_all() {
        let all = Arc::new(AtomicUsize::new(0));
        let answer = Arc::new(AtomicUsize::new(0));
        let handler = CallbackHandler::all(counting(&all)).on(CallbackEventType::Answer, counting(&answer));

        handler.dispatch(br#"{"eventType":"answer"}"#, context()).await.unwrap();
        handler.dispatch(br#"{"eventType":"hangup"}"#, context()).await.unwrap();
        handler.dispatch(br#"{"eventType":"somethingnew"}"#, context()).await.unwrap();

        assert_eq!(answer.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handler_receives_event_and_context() {
        let handler = CallbackHandler::all(|event: CallbackEvent, context: BandwidthContext| async move {
            anyhow::ensure!(event.call_id.as_deref() == Some("c-1"), "wrong call");
            anyhow::ensure!(context.application_id == "a-1", "wrong application");
            Ok::<(), anyhow::Error>(())
        });

        let outcome = handler
            .dispatch(br#"{"eventType":"incomingcall","callId":"c-1"}"#, context())
            .await
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Handled(CallbackEventType::IncomingCall)));
    }

    #[tokio::test]
    async fn test_handler_failure_is_reported() {
        let handler = CallbackHandler::all(|_, _| async { Err::<(), _>(anyhow::anyhow!("handler exploded")) });

        let outcome = handler.dispatch(br#"{"eventType":"sms"}"#, context()).await.unwrap();
        match outcome {
            DispatchOutcome::HandlerFailed(event_type, e) => {
                assert_eq!(event_type, CallbackEventType::Sms);
                assert_eq!(e.to_string(), "handler exploded");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handler_panic_is_reported() {
        let handler = CallbackHandler::all(|event: CallbackEvent, _| async move {
            let call_id = event.call_id.as_deref().unwrap();
            tracing::info!("call {}", call_id);
            Ok::<(), anyhow::Error>(())
        });

        let outcome = handler.dispatch(br#"{"eventType":"answer"}"#, context()).await.unwrap();
        match outcome {
            DispatchOutcome::HandlerFailed(event_type, e) => {
                assert_eq!(event_type, CallbackEventType::Answer);
                assert!(e.to_string().starts_with("handler panicked"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_is_an_error() {
        let handler = CallbackHandler::all(|_, _| async { Ok::<(), anyhow::Error>(()) });
        assert!(handler.dispatch(b"not json", context()).await.is_err());
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(header::CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        assert!(is_json(&headers));

        headers.insert(header::CONTENT_TYPE, "application/x-www-form-urlencoded".parse().unwrap());
        assert!(!is_json(&headers));
    }
}
