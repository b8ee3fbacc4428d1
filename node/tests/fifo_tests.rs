// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![cfg(unix)]

use std::sync::mpsc;
use std::time::Duration;

use ems_kernel::wire::{ConnectRequest, Request};
use ems_node::config::ServerConfig;
use ems_node::registry::PendingConnection;
use ems_node::server::Server;
use ems_node::transport::{ensure_fifo, remove_fifo, FifoTransport, SessionTransport};
use tokio::fs::OpenOptions;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_fifo_transport_pairs_with_client_opens() {
    let dir = tempfile::tempdir().unwrap();
    let req = dir.path().join("client_req");
    let resp = dir.path().join("client_resp");
    ensure_fifo(&req).unwrap();
    ensure_fifo(&req).unwrap();
    ensure_fifo(&resp).unwrap();

    let pending = PendingConnection {
        request_channel: req.to_string_lossy().into_owned(),
        response_channel: resp.to_string_lossy().into_owned(),
    };
    let server = tokio::spawn(async move { FifoTransport.open(&pending).await });

    // Client side opens in the same order: its writer, then its reader.
    let mut client_req = OpenOptions::new().write(true).open(&req).await.unwrap();
    let mut client_resp = OpenOptions::new().read(true).open(&resp).await.unwrap();
    let (mut reader, mut writer) = server.await.unwrap().unwrap();

    client_req.write_all(b"ping").await.unwrap();
    client_req.flush().await.unwrap();
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    writer.write_all(b"pong").await.unwrap();
    writer.flush().await.unwrap();
    client_resp.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"pong");

    drop(writer);
    assert_eq!(client_resp.read(&mut buf).await.unwrap(), 0);

    remove_fifo(&req).unwrap();
    remove_fifo(&req).unwrap();
    assert!(!req.exists());
}

#[test]
fn test_ensure_fifo_rejects_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("pipe");
    assert!(ensure_fifo(&path).is_err());
}

#[test]
fn test_shutdown_with_absent_client_releases_runtime() {
    let dir = tempfile::Builder::new().prefix("ems").tempdir_in("/tmp").unwrap();
    let req = dir.path().join("gone_req");
    let resp = dir.path().join("gone_resp");
    ensure_fifo(&req).unwrap();
    ensure_fifo(&resp).unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let result = runtime.block_on(async {
        let config = ServerConfig { max_sessions: 1, ..Default::default() };
        let server = Server::new(config, FifoTransport).unwrap();
        let (mut connect_tx, connect_rx) = duplex(1024);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(connect_rx, shutdown.clone()));

        // The client announces its channels and never opens them.
        let connect = Request::Connect(ConnectRequest {
            request_channel: req.to_string_lossy().into_owned(),
            response_channel: resp.to_string_lossy().into_owned(),
        });
        connect_tx.write_all(&connect.encode().unwrap()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown.cancel();
        handle.await.unwrap()
    });
    assert!(result.is_ok());

    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        drop(runtime);
        let _ = done_tx.send(());
    });
    assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
}
