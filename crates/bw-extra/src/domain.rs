//! SIP domain provisioning

use bw_core::{CancellationToken, CreateDomainData, Domain, DomainApi, DomainQuery};
use tracing::info;

use crate::Result;
use crate::finder::{self, DOMAIN_PAGE_SIZE};
use crate::strategy::{self, ProvisionStrategy};

pub async fn list_all<D>(api: &D, cancel: &CancellationToken) -> Result<Vec<Domain>>
where
    D: DomainApi + ?Sized,
{
    let query = DomainQuery {
        size: Some(DOMAIN_PAGE_SIZE),
    };
    Ok(api.list(&query, cancel).await?)
}

pub async fn get_by_name<D>(api: &D, name: &str, cancel: &CancellationToken) -> Result<Option<Domain>>
where
    D: DomainApi + ?Sized,
{
    finder::find(|| list_all(api, cancel), |domain| domain.name == name).await
}

/// Id of the domain called `name`, creating it when missing
pub async fn get_or_create<D>(api: &D, name: &str, cancel: &CancellationToken) -> Result<String>
where
    D: DomainApi + ?Sized,
{
    get_or_create_with(api, name, ProvisionStrategy::default(), cancel).await
}

pub async fn get_or_create_with<D>(
    api: &D,
    name: &str,
    strategy: ProvisionStrategy,
    cancel: &CancellationToken,
) -> Result<String>
where
    D: DomainApi + ?Sized,
{
    if let Some(domain) = get_by_name(api, name, cancel).await? {
        return Ok(domain.id);
    }

    let data = CreateDomainData {
        name: name.to_string(),
        description: None,
    };
    let id = api.create(&data, cancel).await?;
    info!("Created domain {:?} ({})", name, id);

    match strategy {
        ProvisionStrategy::ListThenCreate => Ok(id),
        ProvisionStrategy::CreateThenReconcile => {
            let matches = finder::find_all(|| list_all(api, cancel), |d| d.name == name).await?;
            Ok(strategy::reconcile("domain", name, id, &matches, |d| d.id.as_str()))
        }
    }
}
