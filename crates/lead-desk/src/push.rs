//! Realtime channel subscription over the Pusher websocket protocol.

use crate::app::AppEvent;
use futures_util::{SinkExt, StreamExt};
use lead_core::events::ChannelEvent;
use lead_core::push_wire::{
    decode_frame, ping_frame, pong_frame, subscribe_frame, InboundFrame, DEFAULT_MAX_FRAME_BYTES,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);
const PONG_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct PushConfig {
    pub url: Url,
    pub channel: String,
    pub max_frame_bytes: usize,
}

impl PushConfig {
    pub fn new(url: Url, channel: impl Into<String>) -> Self {
        Self {
            url,
            channel: channel.into(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushEvent {
    Connected { socket_id: String },
    Subscribed { channel: String },
    Disconnected,
    Channel(ChannelEvent),
}

/// What one inbound text frame asks of the loop.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FrameAction {
    pub reply: Option<String>,
    pub event: Option<PushEvent>,
    pub activity_timeout: Option<Duration>,
    pub pong: bool,
}

pub fn handle_text(text: &str, config: &PushConfig) -> FrameAction {
    let frame = match decode_frame(text, config.max_frame_bytes) {
        Ok(frame) => frame,
        Err(err) => {
            warn!("push_decode_error: {err}");
            return FrameAction::default();
        }
    };
    match frame {
        InboundFrame::ConnectionEstablished {
            socket_id,
            activity_timeout_secs,
        } => FrameAction {
            reply: Some(subscribe_frame(&config.channel)),
            event: Some(PushEvent::Connected { socket_id }),
            activity_timeout: activity_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            pong: false,
        },
        InboundFrame::SubscriptionSucceeded { channel } => FrameAction {
            event: Some(PushEvent::Subscribed { channel }),
            ..FrameAction::default()
        },
        InboundFrame::Ping => FrameAction {
            reply: Some(pong_frame()),
            ..FrameAction::default()
        },
        InboundFrame::Pong => FrameAction {
            pong: true,
            ..FrameAction::default()
        },
        InboundFrame::Error { code, message } => {
            warn!("push_server_error: code={code:?} message={message}");
            FrameAction::default()
        }
        InboundFrame::Channel { channel, event } if channel == config.channel => FrameAction {
            event: Some(PushEvent::Channel(event)),
            ..FrameAction::default()
        },
        InboundFrame::Channel { channel, .. } => {
            debug!("push_foreign_channel: {channel}");
            FrameAction::default()
        }
        InboundFrame::Ignored { event } => {
            debug!("push_ignored_event: {event}");
            FrameAction::default()
        }
    }
}

pub fn next_backoff(current: Duration) -> Duration {
    let next = current + current;
    if next > MAX_BACKOFF {
        MAX_BACKOFF
    } else {
        next
    }
}

/// Runs until the application side of `tx` is dropped.
pub async fn push_loop(config: PushConfig, tx: mpsc::Sender<AppEvent>) {
    let mut backoff = Duration::from_secs(1);
    loop {
        let (mut ws, _) = match connect_async(config.url.as_str()).await {
            Ok(value) => value,
            Err(err) => {
                warn!("push_connect_error: {err}");
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
                continue;
            }
        };
        backoff = Duration::from_secs(1);
        info!("push_connected: {}", config.url.host_str().unwrap_or_default());

        let mut activity_timeout = DEFAULT_ACTIVITY_TIMEOUT;
        let mut awaiting_pong = false;
        let idle = tokio::time::sleep(activity_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                msg = ws.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => {
                            warn!("push_read_error: {err}");
                            break;
                        }
                    };
                    let action = handle_text(&text, &config);
                    if let Some(timeout) = action.activity_timeout {
                        activity_timeout = timeout;
                    }
                    awaiting_pong = false;
                    idle.as_mut().reset(tokio::time::Instant::now() + activity_timeout);
                    if let Some(reply) = action.reply {
                        if ws.send(Message::Text(reply)).await.is_err() {
                            warn!("push_send_error");
                            break;
                        }
                    }
                    if let Some(event) = action.event {
                        if tx.send(AppEvent::Push(event)).await.is_err() {
                            let _ = ws.close(None).await;
                            return;
                        }
                    }
                }
                _ = &mut idle => {
                    if awaiting_pong {
                        warn!("push_pong_timeout");
                        break;
                    }
                    if ws.send(Message::Text(ping_frame())).await.is_err() {
                        break;
                    }
                    awaiting_pong = true;
                    idle.as_mut().reset(tokio::time::Instant::now() + PONG_TIMEOUT);
                }
            }
        }

        let _ = ws.close(None).await;
        if tx.send(AppEvent::Push(PushEvent::Disconnected)).await.is_err() {
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_core::events::RealtimeEvent;

    fn config() -> PushConfig {
        PushConfig::new(
            Url::parse("ws://127.0.0.1:9/app/key").expect("url"),
            "techware-channel",
        )
    }

    #[test]
    fn backoff_doubles_to_ten_seconds() {
        let mut backoff = Duration::from_secs(1);
        let mut seen = Vec::new();
        for _ in 0..6 {
            backoff = next_backoff(backoff);
            seen.push(backoff.as_secs());
        }
        assert_eq!(seen, vec![2, 4, 8, 10, 10, 10]);
    }

    #[test]
    fn connection_established_triggers_subscribe() {
        let action = handle_text(
            r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"1.2\",\"activity_timeout\":30}"}"#,
            &config(),
        );
        let reply = action.reply.expect("subscribe reply");
        assert!(reply.contains("pusher:subscribe"));
        assert!(reply.contains("techware-channel"));
        assert_eq!(action.activity_timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            action.event,
            Some(PushEvent::Connected {
                socket_id: "1.2".to_string()
            })
        );
    }

    #[test]
    fn ping_is_answered_and_pong_noted() {
        let ping = handle_text(r#"{"event":"pusher:ping","data":{}}"#, &config());
        assert!(ping.reply.expect("pong").contains("pusher:pong"));
        let pong = handle_text(r#"{"event":"pusher:pong","data":{}}"#, &config());
        assert!(pong.pong);
        assert!(pong.reply.is_none());
    }

    #[test]
    fn only_configured_channel_is_forwarded() {
        let frame = |channel: &str| {
            format!(
                r#"{{"event":"lead-edited","channel":"{channel}","data":"{{\"type\":\"billing\",\"id\":\"A1\"}}"}}"#
            )
        };
        let ours = handle_text(&frame("techware-channel"), &config());
        assert!(matches!(
            ours.event,
            Some(PushEvent::Channel(ChannelEvent::Lead(RealtimeEvent::LeadEdited(_))))
        ));
        assert_eq!(handle_text(&frame("other"), &config()), FrameAction::default());
    }

    #[test]
    fn malformed_frames_are_skipped() {
        assert_eq!(handle_text("{", &config()), FrameAction::default());
        assert_eq!(
            handle_text(
                r#"{"event":"new-lead","channel":"techware-channel","data":"{\"agent\":1}"}"#,
                &config()
            ),
            FrameAction::default()
        );
    }
}
