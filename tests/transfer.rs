//! End-to-end transfers between `Server` and `Client` over an in-memory mesh.
//!
//! Tokio time is paused, so deadlines elapse instantly once every task is
//! idle.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use futures::StreamExt;
use log::Level;
use minihttp::{
    Client,
    FetchError,
    Fragment,
    FragmentIndex,
    Message,
    Request,
    Server,
    ServerError,
    Status,
    Transport,
    config::SessionConfig,
    hooks::TransferHooks,
    session::NoRetry,
    store::MemoryStore,
    transport::Incoming,
};
use minihttp_testing::{
    Fate,
    LoggerHandle,
    MemoryMesh,
    MeshEndpoint,
    NodeId,
    ascii_document,
    logger,
    multibyte_document,
    path,
};
use rstest::rstest;
use tokio::{sync::oneshot, task::JoinHandle, time};

const SERVER: NodeId = NodeId(0x0a1b_2c3d);
const CLIENT: NodeId = NodeId(0x0a1b_2c3e);
const TIMEOUT: Duration = Duration::from_secs(5);

struct RunningServer {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .expect("join server task")
            .expect("server stopped cleanly");
    }
}

fn spawn_server(mesh: &MemoryMesh, store: MemoryStore) -> RunningServer {
    spawn_configured(Server::new(Arc::new(mesh.endpoint(SERVER)), Arc::new(store)))
}

fn spawn_configured(server: Server<MeshEndpoint, MemoryStore>) -> RunningServer {
    let (shutdown, rx) = oneshot::channel();
    let handle = tokio::spawn(server.run_with_shutdown(async {
        let _ = rx.await;
    }));
    RunningServer { shutdown, handle }
}

fn client(mesh: &MemoryMesh) -> Client<MeshEndpoint> {
    let config = SessionConfig::default().request_timeout(TIMEOUT);
    Client::new(Arc::new(mesh.endpoint(CLIENT)), SERVER).with_config(config)
}

fn store_with(documents: &[(&str, &str)]) -> MemoryStore {
    documents
        .iter()
        .map(|(name, content)| (path(name), Bytes::from(content.to_string())))
        .collect()
}

/// Collect frames until the link stays quiet for a second of tokio time.
async fn drain(incoming: &mut Incoming<NodeId>) -> Vec<Message> {
    let mut messages = Vec::new();
    while let Ok(Some(delivery)) = time::timeout(Duration::from_secs(1), incoming.next()).await {
        messages.push(Message::from_bytes(&delivery.frame).expect("server frames decode"));
    }
    messages
}

#[tokio::test(start_paused = true)]
async fn fetches_480_byte_document_in_four_fragments() {
    let mesh = MemoryMesh::new();
    let document = ascii_document(480);
    let server = spawn_server(&mesh, store_with(&[("/index.html", &document)]));
    let mut client = client(&mesh);

    let content = client.fetch(path("/index.html")).await.expect("fetch");

    assert_eq!(content, document.into_bytes());
    assert_eq!(mesh.stats().sent, 5);
    assert_eq!(client.buffered_transfers(), 0);
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn empty_document_arrives_as_single_empty_fragment() {
    let mesh = MemoryMesh::new();
    let server = spawn_server(&mesh, store_with(&[("/empty.html", "")]));
    let mut client = client(&mesh);

    let content = client.fetch(path("/empty.html")).await.expect("fetch");

    assert!(content.is_empty());
    assert_eq!(mesh.stats().sent, 2);
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn multibyte_document_survives_fragmentation() {
    let mesh = MemoryMesh::new();
    let document = multibyte_document(2_000);
    let server = spawn_server(&mesh, store_with(&[("/utf8.html", &document)]));
    let mut client = client(&mesh);

    let content = client.fetch(path("/utf8.html")).await.expect("fetch");

    assert_eq!(String::from_utf8(content).expect("utf-8"), document);
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reordered_and_duplicated_fragments_still_complete() {
    let mesh = MemoryMesh::new();
    let document = ascii_document(480);
    let server = spawn_server(&mesh, store_with(&[("/index.html", &document)]));
    mesh.set_rule(|frame| match frame.fragment().map(|fragment| fragment.seq.get()) {
        Some(1) => Fate::Delay,
        Some(3) => Fate::Duplicate,
        _ => Fate::Deliver,
    });
    let mut client = client(&mesh);

    let content = client.fetch(path("/index.html")).await.expect("fetch");

    assert_eq!(content, document.into_bytes());
    let stats = mesh.stats();
    assert_eq!((stats.delayed, stats.duplicated), (1, 1));
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn lost_fragment_is_recovered_by_requesting_again() {
    let mesh = MemoryMesh::new();
    let document = ascii_document(480);
    let server = spawn_server(&mesh, store_with(&[("/index.html", &document)]));
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);
    let mut dropped = false;
    mesh.set_rule(move |frame| {
        if frame.is_request() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        match frame.fragment() {
            Some(fragment) if fragment.seq.get() == 2 && !dropped => {
                dropped = true;
                Fate::Drop
            }
            _ => Fate::Deliver,
        }
    });
    let mut client = client(&mesh);
    let started = time::Instant::now();

    let content = client.fetch(path("/index.html")).await.expect("fetch");

    assert_eq!(content, document.into_bytes());
    assert_eq!(requests.load(Ordering::SeqCst), 2);
    assert_eq!(mesh.stats().dropped, 1);
    assert!(started.elapsed() >= TIMEOUT);
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts_when_every_fragment_is_lost() {
    let mesh = MemoryMesh::new();
    let server = spawn_server(&mesh, store_with(&[("/index.html", "<p>hi</p>")]));
    mesh.set_rule(|frame| {
        if frame.fragment().is_some() {
            Fate::Drop
        } else {
            Fate::Deliver
        }
    });
    let mut client = client(&mesh);
    let started = time::Instant::now();

    let error = client
        .fetch(path("/index.html"))
        .await
        .expect_err("every fragment is dropped");

    assert_eq!(error, FetchError::TimedOut { attempts: 3 });
    assert!(started.elapsed() >= TIMEOUT * 3);
    assert_eq!(client.buffered_transfers(), 0);
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn missing_resource_fails_without_waiting_for_timeout() {
    let mesh = MemoryMesh::new();
    let server = spawn_server(&mesh, MemoryStore::new());
    let mut client = client(&mesh);
    let started = time::Instant::now();

    let error = client
        .fetch(path("/missing.html"))
        .await
        .expect_err("resource is absent");

    assert!(error.is_not_found(), "unexpected error: {error}");
    assert!(started.elapsed() < TIMEOUT);
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn oversized_resource_is_rejected_with_413() {
    let mesh = MemoryMesh::new();
    let document = ascii_document(122 * 99 + 1);
    let server = spawn_server(&mesh, store_with(&[("/big.html", &document)]));
    let mut client = client(&mesh);

    let error = client.fetch(path("/big.html")).await.expect_err("too large");

    assert!(matches!(
        error,
        FetchError::Rejected(ref response) if response.status == Status::ContentTooLarge
    ));
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn escape_heavy_content_is_rejected_with_500() {
    let mesh = MemoryMesh::new();
    let document = "\n".repeat(122);
    let server = spawn_server(&mesh, store_with(&[("/lines.html", &document)]));
    let mut client = client(&mesh);

    let error = client.fetch(path("/lines.html")).await.expect_err("unencodable");

    assert!(matches!(
        error,
        FetchError::Rejected(ref response) if response.status == Status::InternalError
    ));
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn conflicting_fragments_fail_the_fetch() {
    let mesh = MemoryMesh::new();
    let rogue = mesh.endpoint(SERVER);
    let mut requests = rogue.incoming();
    let mut client = Client::new(Arc::new(mesh.endpoint(CLIENT)), SERVER).with_retry_policy(NoRetry);
    let two = FragmentIndex::new(2).expect("in range");

    let fake_server = async {
        let delivery = requests.next().await.expect("request arrives");
        assert_eq!(delivery.peer, CLIENT);
        for data in ["first", "second"] {
            let fragment = Fragment {
                path: path("/index.html"),
                seq: FragmentIndex::FIRST,
                total: two,
                data: data.into(),
            };
            let frame = Message::from(fragment).to_bytes().expect("encode");
            rogue.send(&CLIENT, Bytes::from(frame)).await.expect("send");
        }
    };
    let (result, ()) = tokio::join!(client.fetch(path("/index.html")), fake_server);

    assert!(
        matches!(result, Err(FetchError::Conflict { attempts: 1, .. })),
        "unexpected result: {result:?}"
    );
    assert_eq!(client.buffered_transfers(), 0);
}

#[tokio::test(start_paused = true)]
async fn single_fragment_request_returns_only_that_fragment() {
    let mesh = MemoryMesh::new();
    let server = spawn_server(&mesh, store_with(&[("/index.html", &ascii_document(480))]));
    let peer = mesh.endpoint(CLIENT);
    let mut incoming = peer.incoming();
    let second = FragmentIndex::new(2).expect("in range");

    let request = Message::from(Request::single(path("/index.html"), second));
    peer.send(&SERVER, Bytes::from(request.to_bytes().expect("encode")))
        .await
        .expect("send");
    let messages = drain(&mut incoming).await;

    assert_eq!(messages.len(), 1);
    let Message::Fragment(fragment) = &messages[0] else {
        panic!("expected fragment, got {:?}", messages[0]);
    };
    assert_eq!(fragment.seq, second);
    assert_eq!(fragment.total.get(), 4);
    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn repeated_request_during_transfer_is_dropped() {
    let mesh = MemoryMesh::new();
    let server = spawn_server(&mesh, store_with(&[("/index.html", &ascii_document(480))]));
    let peer = mesh.endpoint(CLIENT);
    let mut incoming = peer.incoming();
    let frame = Bytes::from(
        Message::from(Request::new(path("/index.html")))
            .to_bytes()
            .expect("encode"),
    );

    peer.send(&SERVER, frame.clone()).await.expect("send");
    peer.send(&SERVER, frame.clone()).await.expect("send");
    let first = drain(&mut incoming).await;

    peer.send(&SERVER, frame).await.expect("send");
    let second = drain(&mut incoming).await;

    assert_eq!(first.len(), 4);
    assert_eq!(second.len(), 4);
    server.stop().await;
}

/// Prefixes every frame with a marker byte and rejects frames without it.
struct Marker;

impl TransferHooks for Marker {
    fn seal(&self, frame: &mut Vec<u8>) { frame.insert(0, b'#'); }

    fn open(&self, frame: &mut Vec<u8>) -> bool {
        if frame.first() == Some(&b'#') {
            frame.remove(0);
            true
        } else {
            false
        }
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn hooks_seal_and_open_every_envelope(mut logger: LoggerHandle) {
    let mesh = MemoryMesh::new();
    let document = ascii_document(300);
    let server = spawn_configured(
        Server::new(
            Arc::new(mesh.endpoint(SERVER)),
            Arc::new(store_with(&[("/index.html", &document)])),
        )
        .with_hooks(Arc::new(Marker)),
    );
    let mut sealed = client(&mesh).with_hooks(Arc::new(Marker));

    let content = sealed.fetch(path("/index.html")).await.expect("fetch");
    assert_eq!(content, document.into_bytes());

    // A client without the hooks sends unmarked frames, which the server drops.
    let mut plain = client(&mesh).with_retry_policy(NoRetry);
    let error = plain.fetch(path("/index.html")).await.expect_err("dropped");
    assert_eq!(error, FetchError::TimedOut { attempts: 1 });
    assert!(logger.drain_contains(Level::Warn, "frame rejected by hooks"));
    server.stop().await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn undecodable_frames_are_logged_and_dropped(mut logger: LoggerHandle) {
    let mesh = MemoryMesh::new();
    let server = spawn_server(&mesh, store_with(&[("/index.html", "<p>ok</p>")]));
    let noise = mesh.endpoint(NodeId(0x0000_0099));
    noise
        .send(&SERVER, Bytes::from_static(b"{\"type\":\"HB\"}"))
        .await
        .expect("send");
    noise
        .send(&SERVER, Bytes::from_static(b"not json"))
        .await
        .expect("send");
    let mut client = client(&mesh);

    let content = client.fetch(path("/index.html")).await.expect("fetch");

    assert_eq!(content, b"<p>ok</p>");
    assert!(logger.drain_contains(Level::Warn, "dropping undecodable frame"));
    server.stop().await;
}
