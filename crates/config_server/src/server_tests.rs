//! Tests for server module

use super::*;
use config_core::{BundleCache, ConfigService, FilesystemBackend, MergeEngine, ServiceOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

fn test_app_state(temp_dir: &TempDir) -> AppState {
    let service = ConfigService::new(
        Arc::new(FilesystemBackend::new(temp_dir.path())),
        MergeEngine::new(Arc::new(HashMap::<String, String>::new())),
        BundleCache::new(),
        ServiceOptions::default(),
    );
    AppState::new(Arc::new(service))
}

#[test]
fn test_default_config() {
    let config = ApiConfig::default();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.host, "0.0.0.0");
}

#[test]
fn test_config_from_settings() {
    let lookup = |name: &str| match name {
        "CONFIG_SERVER_HOST" => Some("127.0.0.1".to_string()),
        "CONFIG_SERVER_PORT" => Some("9001".to_string()),
        _ => None,
    };
    let settings = ServerSettings::from_lookup(lookup).unwrap();
    let config = ApiConfig::from(&settings);

    assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:9001".parse::<SocketAddr>().unwrap());
}

#[test]
fn test_socket_addr_names_invalid_host() {
    let config = ApiConfig {
        port: 8888,
        host: "config.internal".to_string(),
    };

    let err = config.socket_addr().unwrap_err();
    assert!(err.to_string().contains("config.internal"));
}

#[test]
fn test_server_creation() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let server = ApiServer::new(ApiConfig::default(), test_app_state(&temp_dir));
    let _router = server.router();
}

#[tokio::test]
async fn test_serve_on_answers_requests_until_shutdown() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    std::fs::write(temp_dir.path().join("orders.yml"), "a: 1\n").unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = ApiServer::new(ApiConfig::default(), test_app_state(&temp_dir));
    let handle = tokio::spawn(server.serve_on(listener, async move {
        let _ = stop_rx.await;
    }));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /orders/default HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {}", raw);
    assert!(raw.contains("\"name\":\"orders\""));

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_serve_rejects_invalid_host() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = ApiConfig {
        port: 0,
        host: "not-an-ip".to_string(),
    };

    let result = ApiServer::new(config, test_app_state(&temp_dir)).serve().await;
    assert!(result.is_err());
}
