//! Remote resource contracts
//!
//! One trait per provider resource. [`BandwidthClient`](crate::BandwidthClient)
//! implements them over HTTP and [`InMemoryBandwidth`](crate::InMemoryBandwidth)
//! implements them in process. Every call takes the caller's cancellation token;
//! a cancelled call returns [`Error::Cancelled`](crate::Error::Cancelled).

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::models::*;

#[async_trait]
pub trait ApplicationApi: Send + Sync {
    /// List applications (one page of `query.size` items)
    async fn list(&self, query: &ApplicationQuery, cancel: &CancellationToken) -> Result<Vec<Application>>;

    /// Create an application and return its id
    async fn create(&self, data: &CreateApplicationData, cancel: &CancellationToken) -> Result<String>;
}

#[async_trait]
pub trait DomainApi: Send + Sync {
    async fn list(&self, query: &DomainQuery, cancel: &CancellationToken) -> Result<Vec<Domain>>;

    async fn create(&self, data: &CreateDomainData, cancel: &CancellationToken) -> Result<String>;
}

#[async_trait]
pub trait EndpointApi: Send + Sync {
    async fn list(
        &self,
        domain_id: &str,
        query: &EndpointQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Endpoint>>;

    /// Create an endpoint under `data.domain_id` and return its id
    async fn create(&self, data: &CreateEndpointData, cancel: &CancellationToken) -> Result<String>;

    async fn get(&self, domain_id: &str, id: &str, cancel: &CancellationToken) -> Result<Endpoint>;
}

#[async_trait]
pub trait PhoneNumberApi: Send + Sync {
    async fn list(&self, query: &PhoneNumberQuery, cancel: &CancellationToken) -> Result<Vec<PhoneNumber>>;

    async fn update(&self, id: &str, data: &UpdatePhoneNumberData, cancel: &CancellationToken) -> Result<()>;
}

#[async_trait]
pub trait AvailableNumberApi: Send + Sync {
    /// Search local numbers and order the matches in one call
    async fn search_and_order_local(
        &self,
        query: &LocalNumberQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<OrderedNumber>>;

    /// Search toll-free numbers and order the matches in one call
    async fn search_and_order_toll_free(
        &self,
        query: &TollFreeNumberQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<OrderedNumber>>;
}

/// The remote sub-clients, shared by everything that provisions resources
#[derive(Clone)]
pub struct BandwidthServices {
    pub application: Arc<dyn ApplicationApi>,
    pub domain: Arc<dyn DomainApi>,
    pub endpoint: Arc<dyn EndpointApi>,
    pub phone_number: Arc<dyn PhoneNumberApi>,
    pub available_number: Arc<dyn AvailableNumberApi>,
}

impl BandwidthServices {
    /// Use one backend for every resource
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ApplicationApi + DomainApi + EndpointApi + PhoneNumberApi + AvailableNumberApi + 'static,
    {
        Self {
            application: backend.clone(),
            domain: backend.clone(),
            endpoint: backend.clone(),
            phone_number: backend.clone(),
            available_number: backend,
        }
    }

    /// Build services backed by the REST client
    pub fn connect(config: &crate::BandwidthConfig) -> Result<Self> {
        let client = crate::BandwidthClient::new(config)?;
        Ok(Self::from_backend(Arc::new(client)))
    }
}

impl std::fmt::Debug for BandwidthServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandwidthServices").finish_non_exhaustive()
    }
}
