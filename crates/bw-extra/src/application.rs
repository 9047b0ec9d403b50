//! Application provisioning
//!
//! Applications are shared by every deployment that uses the same provider
//! account, so the requested name is qualified with the host the application
//! serves (`"{name} on {host}"`).

use bw_core::{
    Application, ApplicationApi, ApplicationQuery, CallbackHttpMethod, CancellationToken,
    CreateApplicationData,
};
use tracing::info;

use crate::Result;
use crate::finder::{self, APPLICATION_PAGE_SIZE};
use crate::strategy::{self, ProvisionStrategy};

/// Path the provider posts call events to
pub const CALL_CALLBACK_PATH: &str = "/bandwidth/callback/call";

/// Path the provider posts message events to
pub const MESSAGE_CALLBACK_PATH: &str = "/bandwidth/callback/message";

/// All applications in one request
pub async fn list_all<A>(api: &A, cancel: &CancellationToken) -> Result<Vec<Application>>
where
    A: ApplicationApi + ?Sized,
{
    let query = ApplicationQuery {
        size: Some(APPLICATION_PAGE_SIZE),
    };
    Ok(api.list(&query, cancel).await?)
}

/// Application with exactly this name, if any
pub async fn get_by_name<A>(api: &A, name: &str, cancel: &CancellationToken) -> Result<Option<Application>>
where
    A: ApplicationApi + ?Sized,
{
    finder::find(|| list_all(api, cancel), |app| app.name == name).await
}

/// Name the application is stored under for `host`
pub fn search_name(name: &str, host: &str) -> String {
    format!("{} on {}", name, host)
}

/// `http[s]://{host}`
pub fn base_url(host: &str, use_https: bool) -> String {
    format!("{}://{}", if use_https { "https" } else { "http" }, host)
}

/// Creation payload for `data` served from `host`
///
/// Qualifies the name and fills callback URLs, auto-answer and callback
/// method, keeping any value the caller already set.
pub fn creation_payload(data: CreateApplicationData, host: &str, use_https: bool) -> CreateApplicationData {
    let base_url = base_url(host, use_https);
    CreateApplicationData {
        name: search_name(&data.name, host),
        incoming_call_url: data
            .incoming_call_url
            .or_else(|| Some(format!("{}{}", base_url, CALL_CALLBACK_PATH))),
        incoming_message_url: data
            .incoming_message_url
            .or_else(|| Some(format!("{}{}", base_url, MESSAGE_CALLBACK_PATH))),
        auto_answer: data.auto_answer.or(Some(true)),
        callback_http_method: data.callback_http_method.or(Some(CallbackHttpMethod::Post)),
    }
}

/// Id of the application for `data.name` on `host`, creating it when missing
pub async fn get_or_create<A>(
    api: &A,
    data: CreateApplicationData,
    host: &str,
    use_https: bool,
    cancel: &CancellationToken,
) -> Result<String>
where
    A: ApplicationApi + ?Sized,
{
    get_or_create_with(api, data, host, use_https, ProvisionStrategy::default(), cancel).await
}

/// [`get_or_create`] with an explicit [`ProvisionStrategy`]
pub async fn get_or_create_with<A>(
    api: &A,
    data: CreateApplicationData,
    host: &str,
    use_https: bool,
    strategy: ProvisionStrategy,
    cancel: &CancellationToken,
) -> Result<String>
where
    A: ApplicationApi + ?Sized,
{
    let name = search_name(&data.name, host);
    if let Some(app) = get_by_name(api, &name, cancel).await? {
        return Ok(app.id);
    }

    let payload = creation_payload(data, host, use_https);
    let id = api.create(&payload, cancel).await?;
    info!("Created application {:?} ({})", name, id);

    match strategy {
        ProvisionStrategy::ListThenCreate => Ok(id),
        ProvisionStrategy::CreateThenReconcile => {
            let matches = finder::find_all(|| list_all(api, cancel), |app| app.name == name).await?;
            Ok(strategy::reconcile("application", &name, id, &matches, |app| app.id.as_str()))
        }
    }
}

/// [`get_or_create`] from a bare name
pub async fn get_or_create_by_name<A>(
    api: &A,
    name: &str,
    host: &str,
    use_https: bool,
    cancel: &CancellationToken,
) -> Result<String>
where
    A: ApplicationApi + ?Sized,
{
    get_or_create(api, CreateApplicationData::named(name), host, use_https, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bw_core::InMemoryBandwidth;

    fn existing(id: &str, name: &str) -> Application {
        Application {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_creation_payload_defaults() {
        let payload = creation_payload(CreateApplicationData::named("app"), "localhost", true);
        assert_eq!(payload.name, "app on localhost");
        assert_eq!(
            payload.incoming_call_url.as_deref(),
            Some("https://localhost/bandwidth/callback/call")
        );
        assert_eq!(
            payload.incoming_message_url.as_deref(),
            Some("https://localhost/bandwidth/callback/message")
        );
        assert_eq!(payload.auto_answer, Some(true));
        assert_eq!(payload.callback_http_method, Some(CallbackHttpMethod::Post));
    }

    #[test]
    fn test_creation_payload_keeps_caller_values() {
        let data = CreateApplicationData {
            incoming_call_url: Some("https://calls.example.com/hook".to_string()),
            auto_answer: Some(false),
            callback_http_method: Some(CallbackHttpMethod::Get),
            ..CreateApplicationData::named("app")
        };
        let payload = creation_payload(data, "example.com", false);
        assert_eq!(payload.incoming_call_url.as_deref(), Some("https://calls.example.com/hook"));
        assert_eq!(
            payload.incoming_message_url.as_deref(),
            Some("http://example.com/bandwidth/callback/message")
        );
        assert_eq!(payload.auto_answer, Some(false));
        assert_eq!(payload.callback_http_method, Some(CallbackHttpMethod::Get));
    }

    #[tokio::test]
    async fn test_get_by_name() {
        let backend = InMemoryBandwidth::new()
            .with_application(existing("a-1", "one on host"))
            .with_application(existing("a-2", "two on host"));
        let cancel = CancellationToken::new();

        let found = get_by_name(&backend, "two on host", &cancel).await.unwrap();
        assert_eq!(found.map(|a| a.id), Some("a-2".to_string()));

        let missing = get_by_name(&backend, "three on host", &cancel).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing_without_write() {
        let backend = InMemoryBandwidth::new().with_application(existing("appId", "Test on localhost"));

        let id = get_or_create_by_name(&backend, "Test", "localhost", true, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, "appId");
        assert_eq!(backend.counts().application_create, 0);
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let backend = InMemoryBandwidth::new();
        let cancel = CancellationToken::new();

        let first = get_or_create_by_name(&backend, "App", "example.com", true, &cancel)
            .await
            .unwrap();
        let second = get_or_create_by_name(&backend, "App", "example.com", true, &cancel)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.counts().application_create, 1);

        let apps = backend.applications().await;
        assert_eq!(apps[0].name, "App on example.com");
        assert_eq!(
            apps[0].incoming_call_url.as_deref(),
            Some("https://example.com/bandwidth/callback/call")
        );
    }

    #[tokio::test]
    async fn test_same_name_on_other_host_is_separate() {
        let backend = InMemoryBandwidth::new();
        let cancel = CancellationToken::new();

        let a = get_or_create_by_name(&backend, "App", "one.example.com", true, &cancel)
            .await
            .unwrap();
        let b = get_or_create_by_name(&backend, "App", "two.example.com", true, &cancel)
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(backend.counts().application_create, 2);
    }

    /// Another process creates the same application between our lookup and our create
    struct RacingProvider {
        inner: InMemoryBandwidth,
    }

    #[async_trait::async_trait]
    impl ApplicationApi for RacingProvider {
        async fn list(&self, query: &ApplicationQuery, cancel: &CancellationToken) -> bw_core::Result<Vec<Application>> {
            ApplicationApi::list(&self.inner, query, cancel).await
        }

        async fn create(&self, data: &CreateApplicationData, cancel: &CancellationToken) -> bw_core::Result<String> {
            ApplicationApi::create(&self.inner, data, cancel).await?;
            ApplicationApi::create(&self.inner, data, cancel).await
        }
    }

    #[tokio::test]
    async fn test_strategies_after_concurrent_create() {
        let cancel = CancellationToken::new();

        let racing = RacingProvider { inner: InMemoryBandwidth::new() };
        let plain = get_or_create(&racing, CreateApplicationData::named("App"), "host", true, &cancel)
            .await
            .unwrap();
        let twins = racing.inner.applications().await;
        assert_eq!(twins.len(), 2);
        assert_eq!(plain, twins[1].id);

        let racing = RacingProvider { inner: InMemoryBandwidth::new() };
        let reconciled = get_or_create_with(
            &racing,
            CreateApplicationData::named("App"),
            "host",
            true,
            ProvisionStrategy::CreateThenReconcile,
            &cancel,
        )
        .await
        .unwrap();
        let twins = racing.inner.applications().await;
        assert_eq!(reconciled, twins[0].id);
        assert_eq!(racing.inner.counts().application_list, 2);
    }
}
