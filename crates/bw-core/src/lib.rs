//! bw-core: Bandwidth API building blocks
//!
//! Resource models, the async traits that describe the provider's remote
//! resources, a REST client for the catapult v1 API, an in-memory backend
//! and configuration loading.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod models;

pub use api::{
    ApplicationApi, AvailableNumberApi, BandwidthServices, DomainApi, EndpointApi, PhoneNumberApi,
};
pub use client::BandwidthClient;
pub use config::{ApplicationConfig, BandwidthConfig, Config, PhoneNumberConfig, ServerConfig};
pub use error::{Error, Result};
pub use events::{CallbackEvent, CallbackEventType};
pub use memory::{CallCounts, InMemoryBandwidth};
pub use models::*;

pub use tokio_util::sync::CancellationToken;
