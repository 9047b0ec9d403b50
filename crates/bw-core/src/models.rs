//! Catapult v1 resource models
//!
//! Field names follow the provider's camelCase JSON. Optional fields that are
//! `None` are left out of request bodies and query strings.

use serde::{Deserialize, Serialize};

/// HTTP method the provider uses to deliver callbacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackHttpMethod {
    Get,
    #[default]
    Post,
}

// ============================================================================
// Applications
// ============================================================================

/// Application as returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_call_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_message_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_answer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_http_method: Option<CallbackHttpMethod>,
}

/// Payload for creating an application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_call_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_message_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_answer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_http_method: Option<CallbackHttpMethod>,
}

impl CreateApplicationData {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

// ============================================================================
// Domains
// ============================================================================

/// SIP domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDomainData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

// ============================================================================
// Endpoints
// ============================================================================

/// SIP endpoint registered under a domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain_id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sip_uri: Option<String>,
    #[serde(default)]
    pub credentials: EndpointCredentials,
}

fn default_enabled() -> bool {
    true
}

/// Endpoint credentials as reported by the provider (never includes the password)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEndpointData {
    pub name: String,
    pub domain_id: String,
    pub application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub credentials: CreateEndpointCredentials,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEndpointCredentials {
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

// ============================================================================
// Phone numbers
// ============================================================================

/// Phone number owned by the account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    #[serde(default)]
    pub id: String,
    /// E.164 number, e.g. `+19195551234`
    #[serde(default)]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhoneNumberData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ============================================================================
// Available numbers
// ============================================================================

/// Search criteria for ordering local numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNumberQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_local_calling_area: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl LocalNumberQuery {
    pub fn area_code(area_code: impl Into<String>) -> Self {
        Self {
            area_code: Some(area_code.into()),
            ..Default::default()
        }
    }
}

/// Search criteria for ordering toll-free numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TollFreeNumberQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// Number returned by a search-and-order call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedNumber {
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// URL of the phone number resource that was ordered
    pub location: String,
}

impl OrderedNumber {
    /// Phone number id, taken from the last segment of `location`
    pub fn id(&self) -> &str {
        last_path_segment(&self.location)
    }
}

/// Last non-empty `/`-separated segment of a URL or path
pub fn last_path_segment(location: &str) -> &str {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}
