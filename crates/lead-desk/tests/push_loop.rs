use futures_util::{SinkExt, StreamExt};
use lead_core::events::{ChannelEvent, RealtimeEvent};
use lead_core::LeadType;
use lead_desk::app::AppEvent;
use lead_desk::push::{push_loop, PushConfig, PushEvent};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const ESTABLISHED: &str = r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"9.9\",\"activity_timeout\":120}"}"#;
const SUBSCRIBED: &str = r#"{"event":"pusher_internal:subscription_succeeded","channel":"techware-channel","data":"{}"}"#;
const NEW_LEAD: &str = r#"{"event":"new-lead","channel":"techware-channel","data":"{\"type\":\"billing\",\"agent\":\"Haziq\",\"amount\":\"$120\"}"}"#;
const FOREIGN: &str = r#"{"event":"new-lead","channel":"other-channel","data":"{\"type\":\"billing\",\"agent\":\"Sam\",\"amount\":\"$5\"}"}"#;

async fn next_push(rx: &mut mpsc::Receiver<AppEvent>) -> PushEvent {
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("push event in time")
        .expect("channel open");
    match event {
        AppEvent::Push(event) => event,
        other => panic!("unexpected app event: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscribes_forwards_channel_events_and_reports_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        ws.send(Message::Text(ESTABLISHED.to_string()))
            .await
            .expect("send established");
        let subscribe = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                other => panic!("expected subscribe frame, got {other:?}"),
            }
        };
        for frame in [SUBSCRIBED, "{not json", FOREIGN, NEW_LEAD] {
            ws.send(Message::Text(frame.to_string()))
                .await
                .expect("send frame");
        }
        let _ = ws.close(None).await;
        subscribe
    });

    let url = Url::parse(&format!("ws://{addr}/app/test-key")).expect("url");
    let (tx, mut rx) = mpsc::channel(16);
    let client = tokio::spawn(push_loop(PushConfig::new(url, "techware-channel"), tx));

    assert_eq!(
        next_push(&mut rx).await,
        PushEvent::Connected {
            socket_id: "9.9".to_string()
        }
    );
    assert_eq!(
        next_push(&mut rx).await,
        PushEvent::Subscribed {
            channel: "techware-channel".to_string()
        }
    );
    match next_push(&mut rx).await {
        PushEvent::Channel(ChannelEvent::Lead(RealtimeEvent::NewLead(payload))) => {
            assert_eq!(payload.lead_type, LeadType::Billing);
            assert_eq!(payload.agent, "Haziq");
            assert_eq!(payload.amount, "$120");
        }
        other => panic!("expected new-lead, got {other:?}"),
    }
    assert_eq!(next_push(&mut rx).await, PushEvent::Disconnected);

    let subscribe = server.await.expect("server task");
    let frame: serde_json::Value = serde_json::from_str(&subscribe).expect("subscribe json");
    assert_eq!(frame["event"], "pusher:subscribe");
    assert_eq!(frame["data"]["channel"], "techware-channel");

    drop(rx);
    client.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loop_ends_when_the_app_is_gone() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        let _ = ws.send(Message::Text(ESTABLISHED.to_string())).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let url = Url::parse(&format!("ws://{addr}/app/test-key")).expect("url");
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        push_loop(PushConfig::new(url, "techware-channel"), tx),
    )
    .await;
    assert!(finished.is_ok());
}
