// Spawns a real SMSpit server on ephemeral ports for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use smspit_server::{AppState, Server, ServerConfig};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct TestApp {
    pub api_address: String,
    pub web_address: String,
    pub api_addr: SocketAddr,
    pub web_addr: SocketAddr,
    pub state: AppState,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
}

impl TestApp {
    pub fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_address, path)
    }

    pub fn web(&self, path: &str) -> String {
        format!("{}{}", self.web_address, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.web_addr)
    }

    /// POST a native capture and return the stored id
    pub async fn send(&self, to: &str, body: &str) -> String {
        let response = self
            .client
            .post(self.api("/send"))
            .json(&serde_json::json!({ "to": to, "body": body }))
            .send()
            .await
            .expect("send request failed");
        assert_eq!(response.status(), 200);

        let value: serde_json::Value = response.json().await.expect("invalid send response");
        value["id"].as_str().expect("missing id").to_string()
    }

    /// Poll until the broadcaster has exactly `expected` subscribers
    pub async fn wait_for_subscribers(&self, expected: usize) {
        for _ in 0..100 {
            if self.state.broadcaster.subscriber_count().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {} subscribers, found {}",
            expected,
            self.state.broadcaster.subscriber_count().await
        );
    }

    /// Trigger graceful shutdown and wait for the server to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .expect("server task panicked")
                .expect("server returned an error");
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        web_port: 0,
        api_port: 0,
        shutdown_grace_secs: 1,
        ..ServerConfig::default()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with<F>(tweak: F) -> TestApp
where
    F: FnOnce(&mut ServerConfig),
{
    let mut config = test_config();
    tweak(&mut config);

    let server = Server::bind(config).await.expect("failed to bind test server");
    let api_addr = server.api_addr().expect("api addr");
    let web_addr = server.web_addr().expect("web addr");
    let state = server.state().clone();

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run(async move {
        let _ = rx.await;
    }));

    TestApp {
        api_address: format!("http://{}", api_addr),
        api_addr,
        web_address: format!("http://{}", web_addr),
        web_addr,
        state,
        client: reqwest::Client::new(),
        shutdown: Some(tx),
        handle: Some(handle),
    }
}
