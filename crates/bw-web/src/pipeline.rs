//! Request pipeline hook
//!
//! Every request first resolves the configured Bandwidth resources through the
//! shared [`MemoCache`], so only the first request for a host talks to the
//! provider. The result is published as a [`BandwidthContext`] extension.
//! Callback POSTs are answered here and never reach the router.

use std::sync::Arc;

use axum::Router;
use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use bw_core::{BandwidthServices, CancellationToken, CreateApplicationData};
use bw_extra::{
    CALL_CALLBACK_PATH, MESSAGE_CALLBACK_PATH, MemoCache, application, domain, phone_number,
};
use http::uri::Authority;
use tracing::{debug, error};

use crate::callback::{CallbackHandler, DispatchOutcome, is_json};
use crate::context::BandwidthContext;
use crate::error::WebError;
use crate::options::BandwidthOptions;

/// Host used when the request carries none
pub const DEFAULT_HOST: &str = "localhost";

/// Largest callback body read before giving up
pub const CALLBACK_BODY_LIMIT: usize = 1024 * 1024;

/// Provisioning state shared by every request
#[derive(Clone)]
pub struct Bandwidth {
    services: BandwidthServices,
    cache: MemoCache<String>,
    options: Arc<BandwidthOptions>,
}

impl Bandwidth {
    pub fn new(services: BandwidthServices, options: BandwidthOptions) -> Self {
        Self::with_cache(services, MemoCache::new(), options)
    }

    /// Use an existing cache, e.g. one shared with another router
    pub fn with_cache(services: BandwidthServices, cache: MemoCache<String>, options: BandwidthOptions) -> Self {
        Self {
            services,
            cache,
            options: Arc::new(options),
        }
    }

    pub fn cache(&self) -> &MemoCache<String> {
        &self.cache
    }

    pub fn options(&self) -> &BandwidthOptions {
        &self.options
    }

    /// Resolve the configured resources for requests addressed to `host`
    ///
    /// The application is resolved first; the phone number is keyed by its id.
    pub async fn resolve(&self, host: &str, cancel: &CancellationToken) -> bw_extra::Result<BandwidthContext> {
        let options = &self.options;
        let services = &self.services;

        let app_key = format!("{}##{}", options.application_name, host);
        let application_id = self
            .cache
            .cached_call(&app_key, || {
                application::get_or_create_with(
                    services.application.as_ref(),
                    CreateApplicationData::named(options.application_name.as_str()),
                    host,
                    options.use_https_callbacks,
                    options.strategy,
                    cancel,
                )
            })
            .await?;

        let phone_number = match &options.phone_number {
            Some(phone) => {
                let number = self
                    .cache
                    .cached_call(&application_id, || async {
                        let name = phone.name.as_deref();
                        match &phone.local_query {
                            Some(query) => {
                                phone_number::get_or_create_local(
                                    services.phone_number.as_ref(),
                                    services.available_number.as_ref(),
                                    &application_id,
                                    Some(query.clone()),
                                    name,
                                    cancel,
                                )
                                .await
                            }
                            None => {
                                phone_number::get_or_create_toll_free(
                                    services.phone_number.as_ref(),
                                    services.available_number.as_ref(),
                                    &application_id,
                                    name,
                                    cancel,
                                )
                                .await
                            }
                        }
                    })
                    .await?;
                Some(number)
            }
            None => None,
        };

        let domain_id = match &options.domain_name {
            Some(name) => Some(
                self.cache
                    .cached_call(name, || {
                        domain::get_or_create_with(services.domain.as_ref(), name, options.strategy, cancel)
                    })
                    .await?,
            ),
            None => None,
        };

        Ok(BandwidthContext {
            application_id,
            phone_number,
            domain_id,
        })
    }

    fn callback_for(&self, request: &Request) -> Option<&CallbackHandler> {
        if request.method() != Method::POST || !is_json(request.headers()) {
            return None;
        }
        match request.uri().path() {
            CALL_CALLBACK_PATH => self.options.call_callback.as_ref(),
            MESSAGE_CALLBACK_PATH => self.options.message_callback.as_ref(),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Bandwidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bandwidth")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Middleware resolving the Bandwidth context and answering callbacks
pub async fn bandwidth_middleware(State(bandwidth): State<Bandwidth>, mut request: Request, next: Next) -> Response {
    // Cancels in-flight provider calls when the client goes away
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let host = request_host(&request);
    let context = match bandwidth.resolve(&host, &cancel).await {
        Ok(context) => context,
        Err(e) => {
            error!("Bandwidth provisioning for {} failed: {}", host, e);
            return WebError::from(e).into_response();
        }
    };
    request.extensions_mut().insert(context.clone());

    if let Some(handler) = bandwidth.callback_for(&request) {
        return handle_callback(handler, request, context).await;
    }

    next.run(request).await
}

async fn handle_callback(handler: &CallbackHandler, request: Request, context: BandwidthContext) -> Response {
    let path = request.uri().path().to_string();

    let result = match to_bytes(request.into_body(), CALLBACK_BODY_LIMIT).await {
        Ok(body) => handler.dispatch(&body, context).await,
        Err(e) => Err(WebError::Body(e.to_string())),
    };

    match result {
        Ok(DispatchOutcome::Handled(event_type)) => {
            debug!("Handled {:?} callback on {}", event_type, path);
        }
        Ok(DispatchOutcome::Unhandled(event_type)) => {
            debug!("No handler for {:?} callback on {}", event_type, path);
        }
        Ok(DispatchOutcome::HandlerFailed(event_type, e)) => {
            error!("Handler for {:?} callback on {} failed: {:#}", event_type, path, e);
        }
        Err(e) => {
            error!("Failed to process callback on {}: {}", path, e);
        }
    }

    // Always acknowledged, whatever the outcome
    StatusCode::OK.into_response()
}

/// Host the request was addressed to, without port
fn request_host(request: &Request) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Authority>().ok())
        .map(|authority| authority.host().to_string())
        .or_else(|| request.uri().host().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// Installs the Bandwidth middleware on a router
pub trait BandwidthRouterExt {
    /// Applies to every route added so far and to the fallback
    fn use_bandwidth(self, bandwidth: Bandwidth) -> Self;
}

impl<S> BandwidthRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn use_bandwidth(self, bandwidth: Bandwidth) -> Self {
        self.layer(middleware::from_fn_with_state(bandwidth, bandwidth_middleware))
    }
}
