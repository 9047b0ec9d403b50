//! Inbound callback events
//!
//! The provider POSTs these to the application's incoming call / message URLs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type discriminator of a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackEventType {
    Answer,
    Hangup,
    #[serde(rename = "incomingcall")]
    IncomingCall,
    Gather,
    Dtmf,
    Playback,
    Speak,
    Recording,
    Transcription,
    Timeout,
    Redirect,
    Reject,
    #[serde(rename = "transfercomplete")]
    TransferComplete,
    Conference,
    #[serde(rename = "conference-member")]
    ConferenceMember,
    #[serde(rename = "conference-playback")]
    ConferencePlayback,
    #[serde(rename = "conference-speak")]
    ConferenceSpeak,
    Sms,
    Mms,
    Error,
    #[serde(other)]
    Unknown,
}

impl CallbackEventType {
    /// Whether this event is delivered to the message callback URL
    pub fn is_message(&self) -> bool {
        matches!(self, CallbackEventType::Sms | CallbackEventType::Mms)
    }
}

/// Callback event posted by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackEvent {
    pub event_type: CallbackEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Fields not modelled above (digits, recordingUri, cause, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CallbackEvent {
    /// Parse a callback body
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up a field that is not modelled explicitly
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}
