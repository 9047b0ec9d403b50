//! Bandwidth catapult v1 REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header::LOCATION};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::api::*;
use crate::config::BandwidthConfig;
use crate::error::{Error, Result};
use crate::models::*;

/// REST client implementing every resource trait
#[derive(Clone)]
pub struct BandwidthClient {
    client: Client,
    base_url: String,
    user_id: String,
    api_token: String,
    api_secret: String,
}

impl BandwidthClient {
    /// Create a new client; fails when credentials are missing
    pub fn new(config: &BandwidthConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            api_token: config.api_token.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn user_url(&self, path: &str) -> String {
        format!("{}/users/{}/{}", self.base_url, self.user_id, path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send with auth, racing the cancellation token, and map non-2xx to an error
    async fn execute(&self, request: RequestBuilder, cancel: &CancellationToken) -> Result<Response> {
        let request = request.basic_auth(&self.api_token, Some(&self.api_secret));

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let message = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                text = response.text() => text.unwrap_or_default(),
            };
            error!("Bandwidth API call failed: {} {} - {}", status, url, message);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response, cancel: &CancellationToken) -> Result<T> {
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = response.bytes() => body?,
        };
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_list<T, Q>(&self, url: String, query: &Q, cancel: &CancellationToken) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        debug!("GET {}", url);
        let response = self.execute(self.client.get(&url).query(query), cancel).await?;
        Self::read_json(response, cancel).await
    }

    /// POST a creation payload and return the id from the `Location` header
    async fn create_resource<B: Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<String> {
        debug!("POST {}", url);
        let response = self.execute(self.client.post(&url).json(body), cancel).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::MissingLocation(url.clone()))?;

        let id = last_path_segment(location);
        if id.is_empty() {
            return Err(Error::MissingLocation(url));
        }
        Ok(id.to_string())
    }

    async fn search_and_order<Q: Serialize + ?Sized>(
        &self,
        kind: &str,
        query: &Q,
        cancel: &CancellationToken,
    ) -> Result<Vec<OrderedNumber>> {
        let url = self.url(&format!("availableNumbers/{}", kind));
        debug!("POST {}", url);
        let response = self.execute(self.client.post(&url).query(query), cancel).await?;
        Self::read_json(response, cancel).await
    }
}

impl std::fmt::Debug for BandwidthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandwidthClient")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ApplicationApi for BandwidthClient {
    async fn list(&self, query: &ApplicationQuery, cancel: &CancellationToken) -> Result<Vec<Application>> {
        self.get_list(self.user_url("applications"), query, cancel).await
    }

    async fn create(&self, data: &CreateApplicationData, cancel: &CancellationToken) -> Result<String> {
        self.create_resource(self.user_url("applications"), data, cancel).await
    }
}

#[async_trait]
impl DomainApi for BandwidthClient {
    async fn list(&self, query: &DomainQuery, cancel: &CancellationToken) -> Result<Vec<Domain>> {
        self.get_list(self.user_url("domains"), query, cancel).await
    }

    async fn create(&self, data: &CreateDomainData, cancel: &CancellationToken) -> Result<String> {
        self.create_resource(self.user_url("domains"), data, cancel).await
    }
}

#[async_trait]
impl EndpointApi for BandwidthClient {
    async fn list(
        &self,
        domain_id: &str,
        query: &EndpointQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Endpoint>> {
        let url = self.user_url(&format!("domains/{}/endpoints", domain_id));
        self.get_list(url, query, cancel).await
    }

    async fn create(&self, data: &CreateEndpointData, cancel: &CancellationToken) -> Result<String> {
        let url = self.user_url(&format!("domains/{}/endpoints", data.domain_id));
        self.create_resource(url, data, cancel).await
    }

    async fn get(&self, domain_id: &str, id: &str, cancel: &CancellationToken) -> Result<Endpoint> {
        let url = self.user_url(&format!("domains/{}/endpoints/{}", domain_id, id));
        debug!("GET {}", url);
        let response = self.execute(self.client.get(&url), cancel).await?;
        Self::read_json(response, cancel).await
    }
}

#[async_trait]
impl PhoneNumberApi for BandwidthClient {
    async fn list(&self, query: &PhoneNumberQuery, cancel: &CancellationToken) -> Result<Vec<PhoneNumber>> {
        self.get_list(self.user_url("phoneNumbers"), query, cancel).await
    }

    async fn update(&self, id: &str, data: &UpdatePhoneNumberData, cancel: &CancellationToken) -> Result<()> {
        let url = self.user_url(&format!("phoneNumbers/{}", id));
        debug!("POST {}", url);
        self.execute(self.client.post(&url).json(data), cancel).await?;
        Ok(())
    }
}

#[async_trait]
impl AvailableNumberApi for BandwidthClient {
    async fn search_and_order_local(
        &self,
        query: &LocalNumberQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<OrderedNumber>> {
        self.search_and_order("local", query, cancel).await
    }

    async fn search_and_order_toll_free(
        &self,
        query: &TollFreeNumberQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<OrderedNumber>> {
        self.search_and_order("tollFree", query, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> BandwidthClient {
        let config = BandwidthConfig::new("u-1", "token", "secret").with_base_url(server.uri());
        BandwidthClient::new(&config).unwrap()
    }

    #[test]
    fn test_client_requires_credentials() {
        let err = BandwidthClient::new(&BandwidthConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_list_applications() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u-1/applications"))
            .and(query_param("size", "1000"))
            .and(basic_auth("token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "a-1", "name": "App on example.com", "autoAnswer": true, "callbackHttpMethod": "post"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let apps = ApplicationApi::list(
            &client,
            &ApplicationQuery { size: Some(1000) },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, "a-1");
        assert_eq!(apps[0].callback_http_method, Some(CallbackHttpMethod::Post));
    }

    #[tokio::test]
    async fn test_create_application_returns_id_from_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/u-1/applications"))
            .and(body_json(json!({"name": "App", "autoAnswer": true})))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", "https://api.example.com/v1/users/u-1/applications/a-42"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let data = CreateApplicationData {
            auto_answer: Some(true),
            ..CreateApplicationData::named("App")
        };
        let id = ApplicationApi::create(&client, &data, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(id, "a-42");
    }

    #[tokio::test]
    async fn test_create_without_location_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/u-1/domains"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let data = CreateDomainData {
            name: "d".to_string(),
            description: None,
        };
        let err = DomainApi::create(&client, &data, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingLocation(_)));
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u-1/domains"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = DomainApi::list(&client, &DomainQuery { size: Some(100) }, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad credentials");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_endpoint_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u-1/domains/d-1/endpoints/e-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "e-1",
                "name": "alice",
                "domainId": "d-1",
                "applicationId": "a-1",
                "enabled": true,
                "sipUri": "sip:alice@demo.bwapp.bwsipp.io",
                "credentials": {"realm": "demo.bwapp.bwsipp.io", "username": "alice"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let endpoint = EndpointApi::get(&client, "d-1", "e-1", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(endpoint.application_id, "a-1");
        assert_eq!(endpoint.credentials.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_phone_number_list_and_update() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u-1/phoneNumbers"))
            .and(query_param("applicationId", "a-1"))
            .and(query_param("name", "Service Number"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "n-1", "number": "+19195551234", "applicationId": "a-1", "name": "Service Number"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/u-1/phoneNumbers/n-1"))
            .and(body_json(json!({"applicationId": "a-1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let cancel = CancellationToken::new();
        let query = PhoneNumberQuery {
            size: Some(1000),
            application_id: Some("a-1".to_string()),
            name: Some("Service Number".to_string()),
        };
        let numbers = PhoneNumberApi::list(&client, &query, &cancel).await.unwrap();
        assert_eq!(numbers[0].number, "+19195551234");

        let update = UpdatePhoneNumberData {
            application_id: Some("a-1".to_string()),
            name: None,
        };
        PhoneNumberApi::update(&client, "n-1", &update, &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_search_and_order_local() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/availableNumbers/local"))
            .and(query_param("areaCode", "910"))
            .and(query_param("quantity", "1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                {
                    "number": "+19195551212",
                    "nationalNumber": "(919) 555-1212",
                    "price": "2.00",
                    "location": "https://api.catapult.inetwork.com/v1/users/u-1/phoneNumbers/n-9"
                }
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let query = LocalNumberQuery {
            quantity: Some(1),
            ..LocalNumberQuery::area_code("910")
        };
        let ordered = client
            .search_and_order_local(&query, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id(), "n-9");
    }

    #[tokio::test]
    async fn test_cancelled_call_returns_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u-1/applications"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ApplicationApi::list(&client, &ApplicationQuery::default(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_error_body() {
        use tokio::io::AsyncWriteExt;

        // Headers and part of the body arrive, the rest never does
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 1000\r\n\r\npartial")
                .await
                .unwrap();
            std::future::pending::<()>().await;
        });

        let config = BandwidthConfig::new("u-1", "token", "secret").with_base_url(format!("http://{}", addr));
        let client = BandwidthClient::new(&config).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            ApplicationApi::list(&client, &ApplicationQuery::default(), &cancel),
        )
        .await
        .expect("cancellation did not interrupt the error body");
        assert!(result.unwrap_err().is_cancelled());
    }
}
