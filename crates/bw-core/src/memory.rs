//! In-process Bandwidth backend
//!
//! Implements every resource trait over in-memory vectors. Used for offline
//! runs of the gateway and as the remote double in tests; it counts calls so
//! callers can assert how many writes reached the "provider".

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::*;
use crate::error::{Error, Result};
use crate::models::*;

const DEFAULT_AREA_CODE: &str = "919";
const TOLL_FREE_PREFIX: &str = "800";

#[derive(Debug, Default)]
struct CallCounters {
    application_list: AtomicUsize,
    application_create: AtomicUsize,
    domain_list: AtomicUsize,
    domain_create: AtomicUsize,
    endpoint_list: AtomicUsize,
    endpoint_create: AtomicUsize,
    endpoint_get: AtomicUsize,
    phone_number_list: AtomicUsize,
    phone_number_update: AtomicUsize,
    number_order: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// Number of calls made against an [`InMemoryBandwidth`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub application_list: usize,
    pub application_create: usize,
    pub domain_list: usize,
    pub domain_create: usize,
    pub endpoint_list: usize,
    pub endpoint_create: usize,
    pub endpoint_get: usize,
    pub phone_number_list: usize,
    pub phone_number_update: usize,
    pub number_order: usize,
}

/// In-memory implementation of the Bandwidth resources
#[derive(Debug, Default)]
pub struct InMemoryBandwidth {
    applications: RwLock<Vec<Application>>,
    domains: RwLock<Vec<Domain>>,
    endpoints: RwLock<Vec<Endpoint>>,
    phone_numbers: RwLock<Vec<PhoneNumber>>,
    /// Numbers handed out by the next orders, before synthesised ones
    inventory: RwLock<VecDeque<String>>,
    latency: Option<Duration>,
    next_id: AtomicU64,
    counters: CallCounters,
}

impl InMemoryBandwidth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call, as a remote round-trip would
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_application(mut self, application: Application) -> Self {
        self.applications.get_mut().push(application);
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domains.get_mut().push(domain);
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.get_mut().push(endpoint);
        self
    }

    pub fn with_phone_number(mut self, phone_number: PhoneNumber) -> Self {
        self.phone_numbers.get_mut().push(phone_number);
        self
    }

    /// Queue a number for the next search-and-order call
    pub fn with_available_number(mut self, number: impl Into<String>) -> Self {
        self.inventory.get_mut().push_back(number.into());
        self
    }

    pub async fn applications(&self) -> Vec<Application> {
        self.applications.read().await.clone()
    }

    pub async fn domains(&self) -> Vec<Domain> {
        self.domains.read().await.clone()
    }

    pub async fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.read().await.clone()
    }

    pub async fn phone_numbers(&self) -> Vec<PhoneNumber> {
        self.phone_numbers.read().await.clone()
    }

    pub fn counts(&self) -> CallCounts {
        let c = &self.counters;
        let load = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        CallCounts {
            application_list: load(&c.application_list),
            application_create: load(&c.application_create),
            domain_list: load(&c.domain_list),
            domain_create: load(&c.domain_create),
            endpoint_list: load(&c.endpoint_list),
            endpoint_create: load(&c.endpoint_create),
            endpoint_get: load(&c.endpoint_get),
            phone_number_list: load(&c.phone_number_list),
            phone_number_update: load(&c.phone_number_update),
            number_order: load(&c.number_order),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }

    /// Simulated round-trip: honours latency and cancellation
    async fn round_trip(&self, cancel: &CancellationToken) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    async fn order(&self, prefix: &str, quantity: u32) -> Vec<OrderedNumber> {
        let mut inventory = self.inventory.write().await;
        let mut numbers = self.phone_numbers.write().await;

        (0..quantity.max(1))
            .map(|_| {
                let id = self.next_id("n");
                let number = inventory.pop_front().unwrap_or_else(|| {
                    let seq = self.next_id.load(Ordering::SeqCst) % 10_000;
                    format!("+1{}555{:04}", prefix, seq)
                });
                numbers.push(PhoneNumber {
                    id: id.clone(),
                    number: number.clone(),
                    ..Default::default()
                });
                debug!("Ordered number {} ({})", number, id);
                OrderedNumber {
                    number,
                    national_number: None,
                    price: None,
                    location: format!("memory://phoneNumbers/{}", id),
                }
            })
            .collect()
    }
}

fn page<T: Clone>(items: &[T], size: Option<u32>) -> Vec<T> {
    let size = size.map(|s| s as usize).unwrap_or(items.len());
    items.iter().take(size).cloned().collect()
}

#[async_trait]
impl ApplicationApi for InMemoryBandwidth {
    async fn list(&self, query: &ApplicationQuery, cancel: &CancellationToken) -> Result<Vec<Application>> {
        bump(&self.counters.application_list);
        self.round_trip(cancel).await?;
        Ok(page(&self.applications.read().await, query.size))
    }

    async fn create(&self, data: &CreateApplicationData, cancel: &CancellationToken) -> Result<String> {
        bump(&self.counters.application_create);
        self.round_trip(cancel).await?;

        let id = self.next_id("a");
        self.applications.write().await.push(Application {
            id: id.clone(),
            name: data.name.clone(),
            incoming_call_url: data.incoming_call_url.clone(),
            incoming_message_url: data.incoming_message_url.clone(),
            auto_answer: data.auto_answer,
            callback_http_method: data.callback_http_method,
        });
        Ok(id)
    }
}

#[async_trait]
impl DomainApi for InMemoryBandwidth {
    async fn list(&self, query: &DomainQuery, cancel: &CancellationToken) -> Result<Vec<Domain>> {
        bump(&self.counters.domain_list);
        self.round_trip(cancel).await?;
        Ok(page(&self.domains.read().await, query.size))
    }

    async fn create(&self, data: &CreateDomainData, cancel: &CancellationToken) -> Result<String> {
        bump(&self.counters.domain_create);
        self.round_trip(cancel).await?;

        let id = self.next_id("rd");
        self.domains.write().await.push(Domain {
            id: id.clone(),
            name: data.name.clone(),
            description: data.description.clone(),
        });
        Ok(id)
    }
}

#[async_trait]
impl EndpointApi for InMemoryBandwidth {
    async fn list(
        &self,
        domain_id: &str,
        query: &EndpointQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Endpoint>> {
        bump(&self.counters.endpoint_list);
        self.round_trip(cancel).await?;

        let endpoints: Vec<Endpoint> = self
            .endpoints
            .read()
            .await
            .iter()
            .filter(|e| e.domain_id == domain_id)
            .cloned()
            .collect();
        Ok(page(&endpoints, query.size))
    }

    async fn create(&self, data: &CreateEndpointData, cancel: &CancellationToken) -> Result<String> {
        bump(&self.counters.endpoint_create);
        self.round_trip(cancel).await?;

        let domain_name = self
            .domains
            .read()
            .await
            .iter()
            .find(|d| d.id == data.domain_id)
            .map(|d| d.name.clone())
            .ok_or_else(|| Error::NotFound(format!("domain {}", data.domain_id)))?;

        let id = self.next_id("re");
        let realm = format!("{}.bwapp.bwsipp.io", domain_name);
        self.endpoints.write().await.push(Endpoint {
            id: id.clone(),
            name: data.name.clone(),
            domain_id: data.domain_id.clone(),
            application_id: data.application_id.clone(),
            enabled: data.enabled.unwrap_or(true),
            description: data.description.clone(),
            sip_uri: Some(format!("sip:{}@{}", data.name, realm)),
            credentials: EndpointCredentials {
                realm: Some(realm),
                username: Some(data.name.clone()),
            },
        });
        Ok(id)
    }

    async fn get(&self, domain_id: &str, id: &str, cancel: &CancellationToken) -> Result<Endpoint> {
        bump(&self.counters.endpoint_get);
        self.round_trip(cancel).await?;

        self.endpoints
            .read()
            .await
            .iter()
            .find(|e| e.domain_id == domain_id && e.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("endpoint {}", id)))
    }
}

#[async_trait]
impl PhoneNumberApi for InMemoryBandwidth {
    async fn list(&self, query: &PhoneNumberQuery, cancel: &CancellationToken) -> Result<Vec<PhoneNumber>> {
        bump(&self.counters.phone_number_list);
        self.round_trip(cancel).await?;

        let numbers: Vec<PhoneNumber> = self
            .phone_numbers
            .read()
            .await
            .iter()
            .filter(|n| {
                query
                    .application_id
                    .as_ref()
                    .is_none_or(|app| n.application_id.as_ref() == Some(app))
            })
            .filter(|n| query.name.as_ref().is_none_or(|name| n.name.as_ref() == Some(name)))
            .cloned()
            .collect();
        Ok(page(&numbers, query.size))
    }

    async fn update(&self, id: &str, data: &UpdatePhoneNumberData, cancel: &CancellationToken) -> Result<()> {
        bump(&self.counters.phone_number_update);
        self.round_trip(cancel).await?;

        let mut numbers = self.phone_numbers.write().await;
        let number = numbers
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(format!("phone number {}", id)))?;

        if let Some(application_id) = &data.application_id {
            number.application_id = Some(application_id.clone());
        }
        if let Some(name) = &data.name {
            number.name = Some(name.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl AvailableNumberApi for InMemoryBandwidth {
    async fn search_and_order_local(
        &self,
        query: &LocalNumberQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<OrderedNumber>> {
        bump(&self.counters.number_order);
        self.round_trip(cancel).await?;

        let area_code = query.area_code.as_deref().unwrap_or(DEFAULT_AREA_CODE);
        Ok(self.order(area_code, query.quantity.unwrap_or(1)).await)
    }

    async fn search_and_order_toll_free(
        &self,
        query: &TollFreeNumberQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<OrderedNumber>> {
        bump(&self.counters.number_order);
        self.round_trip(cancel).await?;

        Ok(self.order(TOLL_FREE_PREFIX, query.quantity.unwrap_or(1)).await)
    }
}
