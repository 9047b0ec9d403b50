//! Phone number allocation
//!
//! A number belongs to the application it is assigned to. Allocation orders
//! exactly one number and then assigns it (and the optional name) to the
//! application with a single update.

use bw_core::{
    AvailableNumberApi, CancellationToken, LocalNumberQuery, OrderedNumber, PhoneNumber,
    PhoneNumberApi, PhoneNumberQuery, TollFreeNumberQuery, UpdatePhoneNumberData,
};
use tracing::info;

use crate::finder::{self, PHONE_NUMBER_PAGE_SIZE};
use crate::{ProvisionError, Result};

/// Numbers assigned to `application_id`
pub async fn list_all_for_application<P>(
    api: &P,
    application_id: &str,
    cancel: &CancellationToken,
) -> Result<Vec<PhoneNumber>>
where
    P: PhoneNumberApi + ?Sized,
{
    let query = PhoneNumberQuery {
        size: Some(PHONE_NUMBER_PAGE_SIZE),
        application_id: Some(application_id.to_string()),
        name: None,
    };
    Ok(api.list(&query, cancel).await?)
}

/// First number of `application_id`, restricted to `name` when given
pub async fn get_by_name<P>(
    api: &P,
    application_id: &str,
    name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Option<PhoneNumber>>
where
    P: PhoneNumberApi + ?Sized,
{
    let query = PhoneNumberQuery {
        size: Some(PHONE_NUMBER_PAGE_SIZE),
        application_id: Some(application_id.to_string()),
        name: name.map(str::to_string),
    };
    finder::find(
        || async { api.list(&query, cancel).await.map_err(ProvisionError::from) },
        |number| name.is_none_or(|name| number.name.as_deref() == Some(name)),
    )
    .await
}

/// Order one local number and assign it to `application_id`
pub async fn create_local<P, N>(
    phone_numbers: &P,
    available_numbers: &N,
    application_id: &str,
    query: Option<LocalNumberQuery>,
    name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String>
where
    P: PhoneNumberApi + ?Sized,
    N: AvailableNumberApi + ?Sized,
{
    let query = LocalNumberQuery {
        quantity: Some(1),
        ..query.unwrap_or_default()
    };
    let ordered = available_numbers.search_and_order_local(&query, cancel).await?;
    assign_first(phone_numbers, ordered, application_id, name, cancel).await
}

/// Order one toll-free number and assign it to `application_id`
pub async fn create_toll_free<P, N>(
    phone_numbers: &P,
    available_numbers: &N,
    application_id: &str,
    name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String>
where
    P: PhoneNumberApi + ?Sized,
    N: AvailableNumberApi + ?Sized,
{
    let query = TollFreeNumberQuery {
        quantity: Some(1),
        pattern: None,
    };
    let ordered = available_numbers.search_and_order_toll_free(&query, cancel).await?;
    assign_first(phone_numbers, ordered, application_id, name, cancel).await
}

async fn assign_first<P>(
    api: &P,
    ordered: Vec<OrderedNumber>,
    application_id: &str,
    name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String>
where
    P: PhoneNumberApi + ?Sized,
{
    let number = ordered
        .into_iter()
        .next()
        .ok_or(ProvisionError::NoNumbersAvailable)?;

    let data = UpdatePhoneNumberData {
        application_id: Some(application_id.to_string()),
        name: name.map(str::to_string),
    };
    api.update(number.id(), &data, cancel).await?;
    info!("Assigned {} to application {}", number.number, application_id);
    Ok(number.number)
}

/// Number of `application_id` (named `name`), ordering a local one when missing
pub async fn get_or_create_local<P, N>(
    phone_numbers: &P,
    available_numbers: &N,
    application_id: &str,
    query: Option<LocalNumberQuery>,
    name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String>
where
    P: PhoneNumberApi + ?Sized,
    N: AvailableNumberApi + ?Sized,
{
    if let Some(existing) = get_by_name(phone_numbers, application_id, name, cancel).await? {
        return Ok(existing.number);
    }
    create_local(phone_numbers, available_numbers, application_id, query, name, cancel).await
}

/// Number of `application_id` (named `name`), ordering a toll-free one when missing
pub async fn get_or_create_toll_free<P, N>(
    phone_numbers: &P,
    available_numbers: &N,
    application_id: &str,
    name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String>
where
    P: PhoneNumberApi + ?Sized,
    N: AvailableNumberApi + ?Sized,
{
    if let Some(existing) = get_by_name(phone_numbers, application_id, name, cancel).await? {
        return Ok(existing.number);
    }
    create_toll_free(phone_numbers, available_numbers, application_id, name, cancel).await
}
