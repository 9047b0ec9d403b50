//! SIP endpoint provisioning

use bw_core::{
    CancellationToken, CreateEndpointCredentials, CreateEndpointData, Endpoint, EndpointApi,
    EndpointQuery,
};
use tracing::info;
use uuid::Uuid;

use crate::Result;
use crate::finder::{self, ENDPOINT_PAGE_SIZE};

pub async fn list_all<E>(api: &E, domain_id: &str, cancel: &CancellationToken) -> Result<Vec<Endpoint>>
where
    E: EndpointApi + ?Sized,
{
    let query = EndpointQuery {
        size: Some(ENDPOINT_PAGE_SIZE),
    };
    Ok(api.list(domain_id, &query, cancel).await?)
}

pub async fn get_by_name<E>(
    api: &E,
    domain_id: &str,
    name: &str,
    cancel: &CancellationToken,
) -> Result<Option<Endpoint>>
where
    E: EndpointApi + ?Sized,
{
    finder::find(|| list_all(api, domain_id, cancel), |e| e.name == name).await
}

/// Endpoint `data.name` in `data.domain_id`, creating it from `data` when missing
///
/// The create call only yields an id, so a new endpoint is read back. If that
/// read fails the endpoint exists remotely but the error is returned.
pub async fn get_or_create<E>(api: &E, data: &CreateEndpointData, cancel: &CancellationToken) -> Result<Endpoint>
where
    E: EndpointApi + ?Sized,
{
    if let Some(endpoint) = get_by_name(api, &data.domain_id, &data.name, cancel).await? {
        return Ok(endpoint);
    }

    let id = api.create(data, cancel).await?;
    info!("Created endpoint {:?} in domain {} ({})", data.name, data.domain_id, id);
    Ok(api.get(&data.domain_id, &id, cancel).await?)
}

/// [`get_or_create`] with a generated password
pub async fn get_or_create_for<E>(
    api: &E,
    application_id: &str,
    domain_id: &str,
    name: &str,
    cancel: &CancellationToken,
) -> Result<Endpoint>
where
    E: EndpointApi + ?Sized,
{
    let data = CreateEndpointData {
        name: name.to_string(),
        domain_id: domain_id.to_string(),
        application_id: application_id.to_string(),
        description: None,
        enabled: None,
        credentials: CreateEndpointCredentials {
            password: generate_password(),
        },
    };
    get_or_create(api, &data, cancel).await
}

/// Fresh random credential secret (32 hex chars)
pub fn generate_password() -> String {
    Uuid::new_v4().simple().to_string()
}
