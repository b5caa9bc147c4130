//! Drives a plugin through a real WebSocket host on localhost.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use spotter_plugin_api::{
    HandlerError, PluginMessage, PluginOption, SessionState, Spotter, SpotterConfig, SpotterPlugin,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

struct ScenarioPlugin;

impl SpotterPlugin for ScenarioPlugin {
    fn on_query(&self, query: &str) -> Vec<PluginOption> {
        match query {
            "-ml" => vec![PluginOption::new("-ml").with_action(|| async { Ok(true) })],
            "nested" => vec![PluginOption::new("open").with_action(|| async {
                Ok(vec![
                    PluginOption::new("first").with_hint("1"),
                    PluginOption::new("second").with_query(|text| async move {
                        Ok(vec![PluginOption::new(text)])
                    }),
                ])
            })],
            "broken" => vec![PluginOption::new("broken")
                .with_action(|| async { Err::<bool, _>(HandlerError::failed("no clipboard")) })],
            _ => Vec::new(),
        }
    }
}

async fn bind() -> (TcpListener, SpotterConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = SpotterConfig {
        endpoint: format!("ws://{}", listener.local_addr().unwrap()),
        ..SpotterConfig::default()
    };
    (listener, config)
}

async fn accept(listener: TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn send(ws: &mut WebSocketStream<TcpStream>, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

async fn next_message(ws: &mut WebSocketStream<TcpStream>) -> PluginMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("plugin did not answer")
            .expect("plugin closed the connection")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_query_then_exec_action() {
    let (listener, config) = bind().await;
    let spotter = Spotter::new(ScenarioPlugin, &config);

    let host = async move {
        let mut ws = accept(listener).await;

        send(&mut ws, json!({"id": "1", "type": "onQuery", "query": "-ml"})).await;
        let response = next_message(&mut ws).await;
        assert_eq!(response.id, "1");
        assert!(!response.complete);
        assert_eq!(response.options.len(), 1);
        assert_eq!(response.options[0].name, "-ml");
        let action_id = response.options[0].action_id.clone().unwrap();
        assert!(response.options[0].on_query_id.is_none());

        send(&mut ws, json!({"id": "2", "type": "execAction", "actionId": action_id})).await;
        assert_eq!(next_message(&mut ws).await, PluginMessage::completed("2", true));

        ws.close(None).await.unwrap();
    };

    let (result, ()) = tokio::join!(spotter.run(), host);
    result.unwrap();
    assert_eq!(*spotter.subscribe().borrow(), SessionState::Closed);
}

#[tokio::test]
async fn test_malformed_payload_keeps_session_open() {
    let (listener, config) = bind().await;
    let spotter = Spotter::new(ScenarioPlugin, &config);

    let host = async move {
        let mut ws = accept(listener).await;

        ws.send(Message::Text("{this is not json".to_string()))
            .await
            .unwrap();
        ws.send(Message::Binary(vec![0xff, 0x00])).await.unwrap();
        send(&mut ws, json!({"id": "7", "type": "onQuery", "query": "-ml"})).await;

        let response = next_message(&mut ws).await;
        assert_eq!(response.id, "7");
        assert_eq!(response.options[0].name, "-ml");

        ws.close(None).await.unwrap();
    };

    let (result, ()) = tokio::join!(spotter.run(), host);
    result.unwrap();
}

#[tokio::test]
async fn test_nested_options_and_failures() {
    let (listener, config) = bind().await;
    let spotter = Spotter::new(ScenarioPlugin, &config);

    let host = async move {
        let mut ws = accept(listener).await;

        send(&mut ws, json!({"id": "1", "type": "onQuery", "query": "nested"})).await;
        let open = next_message(&mut ws).await.options[0].action_id.clone().unwrap();

        send(&mut ws, json!({"id": "2", "type": "execAction", "actionId": open})).await;
        let response = next_message(&mut ws).await;
        assert!(!response.complete);
        assert_eq!(response.options.len(), 2);
        assert_eq!(response.options[0].hint.as_deref(), Some("1"));
        let on_query_id = response.options[1].on_query_id.clone().unwrap();

        send(
            &mut ws,
            json!({"id": "3", "type": "onOptionQuery", "onQueryId": on_query_id, "query": "abc"}),
        )
        .await;
        let response = next_message(&mut ws).await;
        assert_eq!(response.id, "3");
        assert_eq!(response.options[0].name, "abc");

        send(&mut ws, json!({"id": "4", "type": "execAction", "actionId": "no-such-id"})).await;
        assert_eq!(next_message(&mut ws).await, PluginMessage::empty("4"));

        send(&mut ws, json!({"id": "5", "type": "onQuery", "query": "broken"})).await;
        let broken = next_message(&mut ws).await.options[0].action_id.clone().unwrap();
        send(&mut ws, json!({"id": "6", "type": "execAction", "actionId": broken})).await;
        assert_eq!(next_message(&mut ws).await, PluginMessage::empty("6"));

        ws.close(None).await.unwrap();
    };

    let (result, ()) = tokio::join!(spotter.run(), host);
    result.unwrap();
}

#[tokio::test]
async fn test_suggest_is_pushed_without_id() {
    let (listener, config) = bind().await;
    let spotter = Spotter::new(ScenarioPlugin, &config);
    let outbox = spotter.outbox();
    let mut state = spotter.subscribe();

    let host = async move {
        let mut ws = accept(listener).await;

        state
            .wait_for(|s| *s == SessionState::Connected)
            .await
            .unwrap();
        // Attached by the time the first response arrives
        send(&mut ws, json!({"id": "1", "type": "onQuery", "query": "none"})).await;
        next_message(&mut ws).await;

        assert!(outbox.suggest("apps/Safari"));
        let message = next_message(&mut ws).await;
        assert!(message.is_suggestion());
        assert_eq!(message.ml_global_action_path.as_deref(), Some("apps/Safari"));

        ws.close(None).await.unwrap();
    };

    let (result, ()) = tokio::join!(spotter.run(), host);
    result.unwrap();
}
