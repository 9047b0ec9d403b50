//! bw-web: Bandwidth provisioning for axum applications
//!
//! ```ignore
//! let bandwidth = Bandwidth::new(
//!     BandwidthServices::connect(&config.bandwidth)?,
//!     BandwidthOptions::new("my-app").with_domain("my-domain"),
//! );
//! let app = Router::new()
//!     .route("/", get(|ctx: BandwidthContext| async move { ctx.application_id }))
//!     .use_bandwidth(bandwidth);
//! ```

pub mod callback;
pub mod context;
pub mod error;
pub mod options;
pub mod pipeline;

pub use callback::{CallbackHandler, DispatchOutcome, EventHandler};
pub use context::BandwidthContext;
pub use error::{Result, WebError};
pub use options::{BandwidthOptions, PhoneNumberOptions};
pub use pipeline::{Bandwidth, BandwidthRouterExt, bandwidth_middleware};
