use crate::events::ChannelEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const PUSHER_PROTOCOL_VERSION: u8 = 7;
pub const DEFAULT_CHANNEL: &str = "techware-channel";
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

const EVENT_CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
const EVENT_SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
const EVENT_SUBSCRIBE: &str = "pusher:subscribe";
const EVENT_PING: &str = "pusher:ping";
const EVENT_PONG: &str = "pusher:pong";
const EVENT_ERROR: &str = "pusher:error";

/// Raw frame shape on the websocket, both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PusherFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    ConnectionEstablished {
        socket_id: String,
        activity_timeout_secs: Option<u64>,
    },
    SubscriptionSucceeded {
        channel: String,
    },
    Ping,
    Pong,
    Error {
        code: Option<u32>,
        message: String,
    },
    Channel {
        channel: String,
        event: ChannelEvent,
    },
    /// Internal or unknown events nobody reacts to.
    Ignored {
        event: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("frame exceeds max size: {size} > {max}")]
    OversizedFrame { size: usize, max: usize },
    #[error("frame decode failed: {0}")]
    Decode(String),
    #[error("invalid payload for {event}: {reason}")]
    Payload { event: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct ConnectionEstablishedData {
    socket_id: String,
    #[serde(default)]
    activity_timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorData {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

/// Websocket endpoint for a hosted cluster.
pub fn socket_url(app_key: &str, cluster: &str) -> String {
    format!(
        "wss://ws-{cluster}.pusher.com/app/{app_key}?protocol={PUSHER_PROTOCOL_VERSION}&client=lead-desk&version={}&flash=false",
        env!("CARGO_PKG_VERSION")
    )
}

pub fn subscribe_frame(channel: &str) -> String {
    encode(&PusherFrame {
        event: EVENT_SUBSCRIBE.to_string(),
        channel: None,
        data: serde_json::json!({ "channel": channel }),
    })
}

pub fn ping_frame() -> String {
    encode(&PusherFrame {
        event: EVENT_PING.to_string(),
        channel: None,
        data: serde_json::json!({}),
    })
}

pub fn pong_frame() -> String {
    encode(&PusherFrame {
        event: EVENT_PONG.to_string(),
        channel: None,
        data: serde_json::json!({}),
    })
}

fn encode(frame: &PusherFrame) -> String {
    // PusherFrame holds only strings and JSON values, serialization cannot fail.
    serde_json::to_string(frame).unwrap_or_default()
}

/// Pusher double-encodes `data` as a JSON string; some servers inline it.
fn unwrap_data(event: &str, data: Value) -> Result<Value, WireError> {
    match data {
        Value::String(raw) if raw.trim().is_empty() => Ok(Value::Null),
        Value::String(raw) => serde_json::from_str(&raw).map_err(|err| WireError::Payload {
            event: event.to_string(),
            reason: err.to_string(),
        }),
        other => Ok(other),
    }
}

pub fn decode_frame(text: &str, max_frame_bytes: usize) -> Result<InboundFrame, WireError> {
    if text.len() > max_frame_bytes {
        return Err(WireError::OversizedFrame {
            size: text.len(),
            max: max_frame_bytes,
        });
    }
    let frame: PusherFrame =
        serde_json::from_str(text).map_err(|err| WireError::Decode(err.to_string()))?;
    let event = frame.event.as_str();
    match event {
        EVENT_PING => Ok(InboundFrame::Ping),
        EVENT_PONG => Ok(InboundFrame::Pong),
        EVENT_CONNECTION_ESTABLISHED => {
            let data = unwrap_data(event, frame.data)?;
            let parsed: ConnectionEstablishedData =
                serde_json::from_value(data).map_err(|err| WireError::Payload {
                    event: frame.event.clone(),
                    reason: err.to_string(),
                })?;
            Ok(InboundFrame::ConnectionEstablished {
                socket_id: parsed.socket_id,
                activity_timeout_secs: parsed.activity_timeout,
            })
        }
        EVENT_SUBSCRIPTION_SUCCEEDED => Ok(InboundFrame::SubscriptionSucceeded {
            channel: frame.channel.unwrap_or_default(),
        }),
        EVENT_ERROR => {
            let data = unwrap_data(event, frame.data).unwrap_or(Value::Null);
            let parsed: ErrorData = serde_json::from_value(data).unwrap_or_default();
            Ok(InboundFrame::Error {
                code: parsed.code,
                message: parsed.message.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
        _ => {
            let Some(channel) = frame.channel.clone() else {
                return Ok(InboundFrame::Ignored {
                    event: frame.event,
                });
            };
            if event.starts_with("pusher") {
                return Ok(InboundFrame::Ignored {
                    event: frame.event,
                });
            }
            let data = unwrap_data(event, frame.data)?;
            match ChannelEvent::from_parts(event, data) {
                Ok(Some(parsed)) => Ok(InboundFrame::Channel {
                    channel,
                    event: parsed,
                }),
                Ok(None) => Ok(InboundFrame::Ignored {
                    event: frame.event,
                }),
                Err(err) => Err(WireError::Payload {
                    event: frame.event,
                    reason: err.to_string(),
                }),
            }
        }
    }
}
