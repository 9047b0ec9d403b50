//! Per-request provisioning results

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use serde::Serialize;

/// Resources resolved for the current request
///
/// Inserted into the request extensions by the Bandwidth layer. `phone_number`
/// and `domain_id` are only present when the layer was configured to
/// provision them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandwidthContext {
    pub application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
}

impl<S> FromRequestParts<S> for BandwidthContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<BandwidthContext>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Bandwidth context missing: the Bandwidth layer is not installed",
        ))
    }
}
