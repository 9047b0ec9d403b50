//! bw-extra: get-or-create provisioning on top of bw-core
//!
//! Each provisioner looks a resource up by name and creates it only when it
//! is missing. [`MemoCache`] keeps the result so a process provisions each
//! resource at most once.

pub mod application;
pub mod cache;
pub mod domain;
pub mod endpoint;
pub mod error;
pub mod finder;
pub mod phone_number;
pub mod strategy;

pub use application::{CALL_CALLBACK_PATH, MESSAGE_CALLBACK_PATH};
pub use cache::MemoCache;
pub use error::{ProvisionError, Result};
pub use strategy::ProvisionStrategy;
