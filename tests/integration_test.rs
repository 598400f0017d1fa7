//! Integration tests for the record/replay cycle

use std::cell::Cell;
use std::convert::Infallible;
use std::future::Future;
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use http_body_util::{Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper_util::rt::TokioIo;
use tempfile::TempDir;

use cassette::archive::{encode, Headers};
use cassette::transport::{
    AsyncTransport, BlockingHttpTransport, BoxError, HttpTransport, Transport, TransportResponse,
};
use cassette::{
    Archive, AsyncCassetteClient, CassetteClient, CassetteError, Interaction, RecordMode, Request,
    Response, Session,
};

/// Blocking transport answering with a numbered body per call
#[derive(Default)]
struct CountingTransport {
    calls: Cell<usize>,
}

impl Transport for CountingTransport {
    type Body = Cursor<Vec<u8>>;

    fn request(&self, request: &Request) -> Result<TransportResponse<Self::Body>, BoxError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        Ok(TransportResponse {
            version: "HTTP/1.1".to_string(),
            status: "200 OK".to_string(),
            headers: Headers::from([("X-Call".to_string(), call.to_string())]),
            body: Cursor::new(format!("live {} {} #{call}", request.method, request.url).into_bytes()),
        })
    }
}

/// Blocking transport that always fails to connect
struct RefusingTransport;

impl Transport for RefusingTransport {
    type Body = Cursor<Vec<u8>>;

    fn request(&self, _request: &Request) -> Result<TransportResponse<Self::Body>, BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

fn recorded(method: &str, url: &str, body: &str) -> Interaction {
    Interaction {
        recorded_at: "2024-05-01T12:30:00".to_string(),
        request: Request::new(method, url),
        response: Response {
            version: "HTTP/1.1".to_string(),
            status: "200 OK".to_string(),
            headers: Headers::from([("Content-Type".to_string(), "text/plain".to_string())]),
            body: body.to_string(),
        },
    }
}

fn seed(path: &Path, interactions: Vec<Interaction>) {
    std::fs::write(path, encode(&Archive::from(interactions)).unwrap()).unwrap();
}

#[test]
fn test_replay_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seeded.json");
    seed(
        &path,
        vec![
            recorded("GET", "http://api.test/a", "response A"),
            recorded("GET", "http://api.test/b", "response B"),
        ],
    );

    let transport = CountingTransport::default();
    let mut client = CassetteClient::open(&path, RecordMode::None, &transport).unwrap();

    let b1 = client.get("http://api.test/b").unwrap();
    let a1 = client.get("http://api.test/a").unwrap();
    let b2 = client.get("http://api.test/b").unwrap();

    assert_eq!(a1.body, "response A");
    assert_eq!(b1.body, "response B");
    assert_eq!(b1, b2);
    assert_eq!(b1.headers["Content-Type"], "text/plain");
    assert_eq!(transport.calls.get(), 0);
    client.dispose().unwrap();
}

#[test]
fn test_once_mode_locks_existing_cassette() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("locked.json");
    seed(&path, vec![recorded("GET", "http://api.test/other", "other")]);

    let transport = CountingTransport::default();
    let mut client = CassetteClient::open(&path, RecordMode::Once, &transport).unwrap();

    let error = client.get("x").unwrap_err();
    assert!(
        matches!(&error, CassetteError::CannotRecord { mode: RecordMode::Once, url, method }
            if url == "x" && method == "GET")
    );
    assert_eq!(transport.calls.get(), 0);
    assert!(!client.session().is_dirty());

    // The refusal is scoped to that request
    assert_eq!(client.get("http://api.test/other").unwrap().body, "other");
}

#[test]
fn test_once_mode_records_freely_while_blank() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fresh.json");
    let transport = CountingTransport::default();

    let mut client = CassetteClient::open(&path, RecordMode::Once, &transport).unwrap();
    client.get("http://api.test/1").unwrap();
    client.get("http://api.test/2").unwrap();
    client.get("http://api.test/1").unwrap();
    assert_eq!(transport.calls.get(), 2);
    assert_eq!(client.session().len(), 2);
    client.dispose().unwrap();

    // Next run against the written file is locked
    let mut client = CassetteClient::open(&path, RecordMode::Once, &transport).unwrap();
    assert!(!client.session().was_blank());
    assert!(client.get("http://api.test/3").unwrap_err().is_cannot_record());
    assert!(client.get("http://api.test/2").is_ok());
    assert_eq!(transport.calls.get(), 2);
}

#[test]
fn test_none_mode_refuses_on_blank_cassette() {
    let temp_dir = TempDir::new().unwrap();
    let transport = CountingTransport::default();
    let mut client =
        CassetteClient::open(temp_dir.path().join("none.json"), RecordMode::None, &transport)
            .unwrap();

    assert!(client.get("x").unwrap_err().is_cannot_record());
    assert_eq!(transport.calls.get(), 0);
    client.dispose().unwrap();
    assert!(!temp_dir.path().join("none.json").exists());
}

#[test]
fn test_new_episodes_grows_cassette() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("grow.json");
    let transport = CountingTransport::default();

    let mut client = CassetteClient::open(&path, RecordMode::NewEpisodes, &transport).unwrap();
    assert!(client.session().was_blank());

    let first = client.get("x").unwrap();
    assert_eq!(transport.calls.get(), 1);
    assert_eq!(client.session().len(), 1);

    let second = client.get("x").unwrap();
    assert_eq!(transport.calls.get(), 1);
    assert_eq!(first, second);
    client.dispose().unwrap();

    // An existing cassette keeps growing
    let mut client = CassetteClient::open(&path, RecordMode::NewEpisodes, &transport).unwrap();
    client.get("y").unwrap();
    assert_eq!(transport.calls.get(), 2);
    client.dispose().unwrap();

    let session = Session::open(&path, RecordMode::None).unwrap();
    let urls: Vec<_> = session
        .interactions()
        .iter()
        .map(|i| i.request.url.as_str())
        .collect();
    assert_eq!(urls, ["x", "y"]);
}

#[test]
fn test_all_mode_always_fetches() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("all.json");
    seed(&path, vec![recorded("GET", "x", "stale")]);
    let transport = CountingTransport::default();

    let mut client = CassetteClient::open(&path, RecordMode::All, &transport).unwrap();
    let first = client.get("x").unwrap();
    let second = client.get("x").unwrap();

    assert_eq!(transport.calls.get(), 2);
    assert_eq!(first.body, "live GET x #1");
    assert_eq!(second.body, "live GET x #2");

    let interactions = client.session().interactions();
    assert_eq!(interactions.len(), 3);
    assert_eq!(interactions[0].response.body, "stale");
    assert_eq!(interactions[1].request, interactions[2].request);
    client.dispose().unwrap();
}

#[test]
fn test_replay_only_session_leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("untouched.json");
    // Compact JSON: any rewrite would pretty-print it
    let original = serde_json::to_vec(&Archive::from(vec![recorded("GET", "x", "kept")])).unwrap();
    std::fs::write(&path, &original).unwrap();

    let mut client =
        CassetteClient::open(&path, RecordMode::NewEpisodes, CountingTransport::default()).unwrap();
    client.get("x").unwrap();
    client.get("x").unwrap();
    client.dispose().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), original);
}

#[test]
fn test_first_match_wins() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dupes.json");
    seed(
        &path,
        vec![
            recorded("GET", "x", "earlier"),
            recorded("POST", "x", "post"),
            recorded("GET", "x", "later"),
        ],
    );

    let mut client =
        CassetteClient::open(&path, RecordMode::None, CountingTransport::default()).unwrap();
    assert_eq!(client.get("x").unwrap().body, "earlier");
    assert_eq!(
        client.request(Request::new("POST", "x")).unwrap().body,
        "post"
    );
}

#[test]
fn test_malformed_cassette_fails_construction() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.json");
    std::fs::write(&path, r#"[{"recordedAt": "2024-05-01T12:30:00"}]"#).unwrap();

    let result = CassetteClient::open(&path, RecordMode::NewEpisodes, CountingTransport::default());
    assert!(result.err().unwrap().is_invalid_archive());
}

#[test]
fn test_transport_error_propagates_without_recording() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("refused.json");
    let mut client = CassetteClient::open(&path, RecordMode::NewEpisodes, RefusingTransport).unwrap();

    let error = client.get("http://api.test/down").unwrap_err();
    let source = error.transport_source().unwrap();
    assert_eq!(
        source.downcast_ref::<std::io::Error>().unwrap().kind(),
        std::io::ErrorKind::ConnectionRefused
    );
    assert!(client.session().is_empty());
    assert!(!client.session().is_dirty());

    client.dispose().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_dropping_without_dispose_loses_recordings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dropped.json");

    {
        let mut client =
            CassetteClient::open(&path, RecordMode::NewEpisodes, CountingTransport::default())
                .unwrap();
        client.get("x").unwrap();
    }

    assert!(!path.exists());
}

/// Suspending transport counting calls
#[derive(Default)]
struct AsyncCountingTransport {
    calls: AtomicUsize,
}

impl AsyncTransport for AsyncCountingTransport {
    type Body = Full<Bytes>;

    fn request(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, BoxError>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let body = format!("live {} {} #{call}", request.method, request.url);
        async move {
            tokio::task::yield_now().await;
            Ok(TransportResponse {
                version: "HTTP/1.1".to_string(),
                status: "200 OK".to_string(),
                headers: Headers::new(),
                body: Full::new(Bytes::from(body)),
            })
        }
    }
}

/// Suspending transport that never produces a response
struct StalledTransport;

impl AsyncTransport for StalledTransport {
    type Body = Full<Bytes>;

    fn request(
        &self,
        _request: &Request,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, BoxError>> + Send {
        std::future::pending()
    }
}

type PendingBody = StreamBody<futures_util::stream::Pending<Result<Frame<Bytes>, Infallible>>>;

/// Suspending transport whose response body never finishes
struct StalledBodyTransport;

impl AsyncTransport for StalledBodyTransport {
    type Body = PendingBody;

    fn request(
        &self,
        _request: &Request,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, BoxError>> + Send {
        std::future::ready(Ok(TransportResponse {
            version: "HTTP/1.1".to_string(),
            status: "200 OK".to_string(),
            headers: Headers::new(),
            body: StreamBody::new(futures_util::stream::pending()),
        }))
    }
}

#[tokio::test]
async fn test_async_new_episodes_grows_cassette() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("async.json");
    let transport = AsyncCountingTransport::default();

    let mut client = AsyncCassetteClient::open(&path, RecordMode::NewEpisodes, &transport).unwrap();
    let first = client.get("x").await.unwrap();
    let second = client.get("x").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    client.dispose().unwrap();

    let mut client = AsyncCassetteClient::open(&path, RecordMode::Once, &transport).unwrap();
    assert!(client.get("y").await.unwrap_err().is_cannot_record());
}

#[tokio::test]
async fn test_async_all_mode_always_fetches() {
    let temp_dir = TempDir::new().unwrap();
    let transport = AsyncCountingTransport::default();
    let mut client =
        AsyncCassetteClient::open(temp_dir.path().join("all.json"), RecordMode::All, &transport)
            .unwrap();

    client.get("x").await.unwrap();
    client.get("x").await.unwrap();

    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    assert_eq!(client.session().len(), 2);
    client.dispose().unwrap();
}

#[test]
fn test_cancelled_request_records_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let mut client = AsyncCassetteClient::open(
        temp_dir.path().join("cancel.json"),
        RecordMode::NewEpisodes,
        StalledTransport,
    )
    .unwrap();

    assert!(client.get("x").now_or_never().is_none());
    assert!(client.session().is_empty());
    assert!(!client.session().is_dirty());
}

#[test]
fn test_cancelled_body_records_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let mut client = AsyncCassetteClient::open(
        temp_dir.path().join("cancel_body.json"),
        RecordMode::NewEpisodes,
        StalledBodyTransport,
    )
    .unwrap();

    assert!(client.get("x").now_or_never().is_none());
    assert!(client.session().is_empty());
    assert!(!client.session().is_dirty());
}

async fn spawn_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let service = hyper::service::service_fn(
                    |request: hyper::Request<hyper::body::Incoming>| async move {
                        let body = format!("served {} {}", request.method(), request.uri().path());
                        Ok::<_, Infallible>(
                            hyper::Response::builder()
                                .header("x-served-by", "test-server")
                                .body(Full::new(Bytes::from(body)))
                                .unwrap(),
                        )
                    },
                );
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

#[tokio::test]
async fn test_http_transport_record_and_replay() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("http.json");
    let addr = spawn_server().await;
    let url = format!("http://{addr}/api/items");

    let transport = HttpTransport::new();
    let mut client = AsyncCassetteClient::open(&path, RecordMode::Once, &transport).unwrap();
    let live = client.get(&url).await.unwrap();
    assert_eq!(live.version, "HTTP/1.1");
    assert_eq!(live.status, "200 OK");
    assert_eq!(live.status_code(), Some(200));
    assert_eq!(live.headers["x-served-by"], "test-server");
    assert_eq!(live.body, "served GET /api/items");
    client.close();
    client.dispose().unwrap();
    assert!(transport.is_closed());

    // Replay works with the transport closed
    let mut client = AsyncCassetteClient::open(&path, RecordMode::None, &transport).unwrap();
    assert_eq!(client.get(&url).await.unwrap(), live);
}

#[test]
fn test_blocking_http_transport_record_and_replay() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let addr = runtime.block_on(spawn_server());
    let url = format!("http://{addr}/blocking");

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("blocking.json");
    let transport = BlockingHttpTransport::new().unwrap();

    let live = CassetteClient::scoped(&path, RecordMode::NewEpisodes, &transport, |client| {
        let post = client.request(Request::new("POST", url.as_str()).with_body("payload"))?;
        assert_eq!(post.body, "served POST /blocking");
        client.get(&url)
    })
    .unwrap();
    assert_eq!(live.body, "served GET /blocking");

    let session = Session::open(&path, RecordMode::None).unwrap();
    assert_eq!(session.len(), 2);
    assert_eq!(session.interactions()[0].request.body, "payload");
    assert_eq!(session.interactions()[1].response, live);
}
