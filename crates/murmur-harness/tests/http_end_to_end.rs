//! Full stack over real sockets: `HttpRelay` engines against a running
//! relay server, on the production environment.

#![allow(clippy::unwrap_used)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use murmur_client::{ClientError, HttpRelay, MemoryStateStore, SyncConfig, SyncEngine};
use murmur_core::{KeyDirectory, MemoryDirectory, SystemEnv};
use murmur_proto::ParticipantId;
use murmur_server::{RelayConfig, Server};
use tokio::{sync::oneshot, task::JoinHandle};

type Engine = SyncEngine<SystemEnv, HttpRelay, MemoryStateStore>;

fn id(s: &str) -> ParticipantId {
    ParticipantId::new(s).unwrap()
}

struct RunningRelay {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RunningRelay {
    async fn start(max_envelope_bytes: usize) -> Self {
        let config = RelayConfig { bind_address: "127.0.0.1:0".to_owned(), max_envelope_bytes };
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            server
                .run_until(async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });
        Self { addr, shutdown, handle }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.handle.await.unwrap();
    }
}

fn engine(name: &str, url: &str, directory: &Arc<dyn KeyDirectory>) -> Engine {
    let config = SyncConfig { relay_timeout: Duration::from_secs(2), ..SyncConfig::default() };
    SyncEngine::new(
        SystemEnv::new(),
        id(name),
        Arc::clone(directory),
        HttpRelay::new(url),
        MemoryStateStore::new(),
        config,
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hello_over_http() {
    let relay = RunningRelay::start(64 * 1024).await;
    let directory: Arc<dyn KeyDirectory> = Arc::new(MemoryDirectory::new());
    let mut alice = engine("Alice", &relay.url(), &directory);
    let mut bob = engine("Bob", &relay.url(), &directory);

    let message_id = alice.send_message(&id("Bob"), "hello").await.unwrap();
    assert_eq!(message_id.len(), 32);

    let report = bob.tick().await;
    assert!(report.poll_error.is_none());
    assert_eq!((report.received, report.merged), (1, 1));
    assert_eq!(bob.get_thread(&id("Alice"))[0].id, message_id);

    // Mailbox was drained by the first poll.
    let report = bob.tick().await;
    assert_eq!(report.received, 0);

    relay.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_message_is_rejected_not_retried() {
    let relay = RunningRelay::start(256).await;
    let directory: Arc<dyn KeyDirectory> = Arc::new(MemoryDirectory::new());
    let mut alice = engine("Alice", &relay.url(), &directory);
    let _bob = engine("Bob", &relay.url(), &directory);

    let err = alice.send_message(&id("Bob"), "x".repeat(1024)).await.unwrap_err();
    assert!(matches!(err, ClientError::BadRequest { .. }), "{err:?}");
    assert_eq!(alice.outbox_len(), 0);
    assert!(alice.get_thread(&id("Bob")).is_empty());

    relay.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_relay_defers() {
    // Reserve a port, then free it so nothing is listening.
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let url = format!("http://{addr}");
    let directory: Arc<dyn KeyDirectory> = Arc::new(MemoryDirectory::new());
    let mut alice = engine("Alice", &url, &directory);
    let _bob = engine("Bob", &url, &directory);

    alice.send_message(&id("Bob"), "later").await.unwrap();
    assert_eq!(alice.outbox_len(), 1);

    let report = alice.tick().await;
    assert_eq!(report.deferred, 1);
    assert!(matches!(
        report.poll_error,
        Some(ClientError::Transport { .. } | ClientError::TransportTimeout)
    ));
}
