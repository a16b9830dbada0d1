//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered audit events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{AuditEvent, CollectionId};
use crate::service::PoolFactory;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<AuditEvent>,
    factory: Arc<PoolFactory>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs, &factory).await;
                        if let Ok(json) = serde_json::to_string(&response)
                            && ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(audit) => {
                        if subs.matches(&audit) {
                            let Ok(payload) = serde_json::to_value(&audit) else {
                                continue;
                            };
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                payload,
                            );
                            let Ok(json) = serde_json::to_string(&msg) else {
                                continue;
                            };
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Splits raw collection entries into parsed IDs and the wildcard flag.
fn parse_collections(raw: &[String]) -> Result<(Vec<CollectionId>, bool), String> {
    let mut ids = Vec::with_capacity(raw.len());
    let mut wildcard = false;
    for entry in raw {
        if entry == "*" {
            wildcard = true;
        } else {
            let id = entry
                .parse::<CollectionId>()
                .map_err(|e| format!("{entry}: {e}"))?;
            ids.push(id);
        }
    }
    Ok((ids, wildcard))
}

/// Handles a text message from the client and builds the reply.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    factory: &PoolFactory,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error(String::new(), 400, "malformed JSON");
    };
    if msg.msg_type != WsMessageType::Command {
        return WsMessage::error(msg.id, 400, "expected a command message");
    }
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(msg.id, 404, "unknown command");
    };

    match command {
        WsCommand::Subscribe { collections } => match parse_collections(&collections) {
            Ok((ids, wildcard)) => {
                subs.subscribe(&ids, wildcard);
                WsMessage::new(
                    msg.id,
                    WsMessageType::Response,
                    serde_json::json!({
                        "subscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                        "count": subs.count(),
                        "wildcard": subs.is_subscribed_all(),
                    }),
                )
            }
            Err(bad) => WsMessage::error(msg.id, 400, &format!("invalid collection {bad}")),
        },
        WsCommand::Unsubscribe { collections } => match parse_collections(&collections) {
            Ok((ids, wildcard)) => {
                subs.unsubscribe(&ids, wildcard);
                WsMessage::new(
                    msg.id,
                    WsMessageType::Response,
                    serde_json::json!({
                        "unsubscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                        "remaining_count": subs.count(),
                        "wildcard": subs.is_subscribed_all(),
                    }),
                )
            }
            Err(bad) => WsMessage::error(msg.id, 400, &format!("invalid collection {bad}")),
        },
        WsCommand::GetPool { collection } => match collection.parse::<CollectionId>() {
            Ok(id) => {
                let info = factory.pool_info(id).await;
                WsMessage::new(
                    msg.id,
                    WsMessageType::Response,
                    serde_json::json!({
                        "collection": id.to_string(),
                        "pool": info.pool.to_string(),
                        "exists": info.exists,
                    }),
                )
            }
            Err(e) => WsMessage::error(msg.id, 400, &format!("invalid collection {collection}: {e}")),
        },
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Address, EventBus, PoolEndpointId};
    use crate::endpoint::InMemoryEnvironment;

    fn factory_with(env: Arc<InMemoryEnvironment>) -> PoolFactory {
        PoolFactory::new(
            Address::from_low_byte(1),
            Address::from_low_byte(0xfa),
            env,
            EventBus::new(16),
        )
    }

    fn factory() -> PoolFactory {
        factory_with(Arc::new(InMemoryEnvironment::new()))
    }

    fn command(payload: serde_json::Value) -> String {
        serde_json::json!({ "id": "req-1", "type": "command", "payload": payload }).to_string()
    }

    #[tokio::test]
    async fn malformed_json_is_error() {
        let mut subs = SubscriptionManager::new();
        let reply = handle_text_message("{nope", &mut subs, &factory()).await;
        assert_eq!(reply.msg_type, WsMessageType::Error);
        assert_eq!(reply.payload["code"], 400);
    }

    #[tokio::test]
    async fn subscribe_wildcard_and_collection() {
        let mut subs = SubscriptionManager::new();
        let text = command(serde_json::json!({
            "command": "subscribe",
            "collections": ["*", "0x0000000000000000000000000000000000000005"],
        }));
        let reply = handle_text_message(&text, &mut subs, &factory()).await;
        assert_eq!(reply.msg_type, WsMessageType::Response);
        assert_eq!(reply.id, "req-1");
        assert_eq!(reply.payload["count"], 1);
        assert_eq!(reply.payload["wildcard"], true);
        assert!(subs.is_subscribed_all());
    }

    #[tokio::test]
    async fn subscribe_with_bad_address_changes_nothing() {
        let mut subs = SubscriptionManager::new();
        let text = command(serde_json::json!({
            "command": "subscribe",
            "collections": ["0x0000000000000000000000000000000000000005", "0xbad"],
        }));
        let reply = handle_text_message(&text, &mut subs, &factory()).await;
        assert_eq!(reply.msg_type, WsMessageType::Error);
        assert_eq!(subs.count(), 0);
    }

    #[tokio::test]
    async fn get_pool_reports_registration() {
        let env = Arc::new(InMemoryEnvironment::new());
        let collection = CollectionId::new(Address::from_low_byte(5));
        let pool = PoolEndpointId::new(Address::from_low_byte(6));
        env.deploy_code(pool.address());
        let factory = factory_with(env);
        let Ok(()) = factory
            .register_pool(Address::from_low_byte(1), collection, pool)
            .await
        else {
            panic!("registration failed");
        };

        let mut subs = SubscriptionManager::new();
        let text = command(serde_json::json!({
            "command": "get_pool",
            "collection": collection.to_string(),
        }));
        let reply = handle_text_message(&text, &mut subs, &factory).await;
        assert_eq!(reply.payload["exists"], true);
        assert_eq!(reply.payload["pool"], pool.to_string());
    }

    #[tokio::test]
    async fn unknown_command_is_not_found() {
        let mut subs = SubscriptionManager::new();
        let text = command(serde_json::json!({ "command": "swap" }));
        let reply = handle_text_message(&text, &mut subs, &factory()).await;
        assert_eq!(reply.payload["code"], 404);
    }
}
