//! First-match lookup over a single listing page
//!
//! Listings are fetched once with a fixed page size. Accounts are assumed to
//! stay within one page; later pages are never requested.

use std::future::Future;

use crate::Result;

pub const APPLICATION_PAGE_SIZE: u32 = 1000;
pub const DOMAIN_PAGE_SIZE: u32 = 100;
pub const ENDPOINT_PAGE_SIZE: u32 = 1000;
pub const PHONE_NUMBER_PAGE_SIZE: u32 = 1000;

/// Return the first listed item matching `predicate`
///
/// Errors from the listing call are returned as-is.
pub async fn find<R, F, Fut, P>(list_all: F, predicate: P) -> Result<Option<R>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<R>>>,
    P: FnMut(&R) -> bool,
{
    let items = list_all().await?;
    Ok(items.into_iter().find(predicate))
}

/// All listed items matching `predicate`, in listing order
pub async fn find_all<R, F, Fut, P>(list_all: F, mut predicate: P) -> Result<Vec<R>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<R>>>,
    P: FnMut(&R) -> bool,
{
    let items = list_all().await?;
    Ok(items.into_iter().filter(|item| predicate(item)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProvisionError;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
    }

    async fn listing(items: Vec<Item>) -> Result<Vec<Item>> {
        Ok(items)
    }

    #[tokio::test]
    async fn test_find_returns_none_without_match() {
        let found = find(|| listing(vec![Item { name: "a" }, Item { name: "b" }]), |i| i.name == "c")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_returns_single_match() {
        let found = find(|| listing(vec![Item { name: "a" }, Item { name: "b" }]), |i| i.name == "b")
            .await
            .unwrap();
        assert_eq!(found, Some(Item { name: "b" }));
    }

    #[tokio::test]
    async fn test_find_returns_first_of_many() {
        let found = find(
            || listing(vec![Item { name: "x" }, Item { name: "dup" }, Item { name: "dup" }]),
            |i| i.name == "dup",
        )
        .await
        .unwrap();
        assert_eq!(found, Some(Item { name: "dup" }));

        let all = find_all(
            || listing(vec![Item { name: "x" }, Item { name: "dup" }, Item { name: "dup" }]),
            |i| i.name == "dup",
        )
        .await
        .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_find_propagates_listing_error() {
        let result = find(
            || async { Err::<Vec<Item>, _>(ProvisionError::Remote(bw_core::Error::Cancelled)) },
            |_| true,
        )
        .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
