//! Payloads carried by the shared push channel.

use crate::{deserialize_cell, deserialize_opt_cell, LeadType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_NEW_LEAD: &str = "new-lead";
pub const EVENT_STATUS_UPDATE: &str = "status-update";
pub const EVENT_LEAD_EDITED: &str = "lead-edited";
pub const EVENT_NEW_CHAT: &str = "new-chat";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLeadPayload {
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub agent: String,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub amount: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdatePayload {
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub client: String,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub status: String,
    #[serde(default, deserialize_with = "deserialize_opt_cell")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadEditedPayload {
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub id: String,
    #[serde(default)]
    pub client: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    NewLead(NewLeadPayload),
    StatusUpdate(StatusUpdatePayload),
    LeadEdited(LeadEditedPayload),
}

impl RealtimeEvent {
    pub fn lead_type(&self) -> LeadType {
        match self {
            RealtimeEvent::NewLead(payload) => payload.lead_type,
            RealtimeEvent::StatusUpdate(payload) => payload.lead_type,
            RealtimeEvent::LeadEdited(payload) => payload.lead_type,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::NewLead(_) => EVENT_NEW_LEAD,
            RealtimeEvent::StatusUpdate(_) => EVENT_STATUS_UPDATE,
            RealtimeEvent::LeadEdited(_) => EVENT_LEAD_EDITED,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub sender: String,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub message: String,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub role: String,
    #[serde(default, deserialize_with = "deserialize_opt_cell")]
    pub dept: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

impl ChatMessage {
    /// Messages without a department are visible everywhere.
    pub fn is_for(&self, department: LeadType) -> bool {
        match self.dept.as_deref() {
            Some(dept) => dept.eq_ignore_ascii_case(department.as_str()),
            None => true,
        }
    }
}

/// Anything the channel can deliver that the client reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Lead(RealtimeEvent),
    Chat(ChatMessage),
}

impl ChannelEvent {
    /// Decode a named channel event. Unknown names yield `Ok(None)`.
    pub fn from_parts(name: &str, data: Value) -> Result<Option<Self>, serde_json::Error> {
        let event = match name {
            EVENT_NEW_LEAD => {
                ChannelEvent::Lead(RealtimeEvent::NewLead(serde_json::from_value(data)?))
            }
            EVENT_STATUS_UPDATE => {
                ChannelEvent::Lead(RealtimeEvent::StatusUpdate(serde_json::from_value(data)?))
            }
            EVENT_LEAD_EDITED => {
                ChannelEvent::Lead(RealtimeEvent::LeadEdited(serde_json::from_value(data)?))
            }
            EVENT_NEW_CHAT => ChannelEvent::Chat(serde_json::from_value(data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
