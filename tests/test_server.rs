//! End-to-end tests over real TCP connections.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use lanshare::http::connection::Connection;
use lanshare::sandbox::SandboxRoot;
use lanshare::server::listener;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start(dir: &Path) -> TestServer {
    let root = SandboxRoot::open(dir).await.unwrap();
    let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(listener::run(socket, root, async move {
        let _ = stopped.await;
    }));

    TestServer { addr, stop, handle }
}

impl TestServer {
    async fn shutdown(self) {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

async fn request(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

fn split_head(response: &[u8]) -> (String, &[u8]) {
    let end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no head terminator");
    (
        String::from_utf8(response[..end + 4].to_vec()).unwrap(),
        &response[end + 4..],
    )
}

fn shared_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("readme.txt"), "hello world").unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    for i in 0..5 {
        fs::write(dir.path().join(format!("docs/file{}.txt", i)), "x".repeat(i)).unwrap();
    }
    fs::create_dir(dir.path().join("docs/inner")).unwrap();
    fs::create_dir(dir.path().join("empty")).unwrap();
    dir
}

#[tokio::test]
async fn test_get_file() {
    let dir = shared_dir();
    let server = start(dir.path()).await;

    let response = request(server.addr, b"GET /readme.txt HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Length: 11\r\n"));
    assert!(text.contains("Content-Disposition: attachment;filename=\"readme.txt\"\r\n"));
    assert!(text.contains("Connection: close\r\n"));
    assert!(text.ends_with("\r\n\r\nhello world"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_get_binary_file_is_byte_exact() {
    let dir = shared_dir();
    let content: Vec<u8> = (0..300_000u32).map(|i| (i * 7 % 251) as u8).collect();
    fs::write(dir.path().join("docs/blob.bin"), &content).unwrap();
    let server = start(dir.path()).await;

    let response = request(server.addr, b"GET /docs/blob.bin HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let (head, body) = split_head(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", content.len())));
    assert!(head.contains("filename=\"blob.bin\""));
    assert_eq!(body, content.as_slice());

    server.shutdown().await;
}

#[tokio::test]
async fn test_only_download_headers_are_sent() {
    let dir = shared_dir();
    let server = start(dir.path()).await;

    let response = request(server.addr, b"GET /readme.txt HTTP/1.1\r\n\r\n").await;
    let (head, _) = split_head(&response);
    let header_names: Vec<&str> = head
        .lines()
        .skip(1)
        .filter(|l| !l.is_empty())
        .map(|l| l.split(':').next().unwrap())
        .collect();

    assert_eq!(
        header_names,
        vec!["Content-Disposition", "Content-Length", "Connection"]
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_get_directory_lists_every_child() {
    let dir = shared_dir();
    let server = start(dir.path()).await;

    for target in ["/docs", "/docs/"] {
        let raw = format!("GET {} HTTP/1.1\r\n\r\n", target);
        let response = request(server.addr, raw.as_bytes()).await;
        let text = String::from_utf8(response).unwrap();

        let body = text.strip_prefix("HTTP/1.1 200 OK\r\n\r\n").unwrap();
        let expected_intro = format!("you asked for {}\n\n", target);
        let entries = body.strip_prefix(expected_intro.as_str()).unwrap();

        let lines: Vec<&str> = entries.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines.iter().any(|l| l.ends_with(" inner/")));
        assert!(lines.iter().any(|l| l.ends_with(" file0.txt")));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_get_root_and_empty_directory() {
    let dir = shared_dir();
    let server = start(dir.path()).await;

    let text = String::from_utf8(request(server.addr, b"GET / HTTP/1.1\r\n\r\n").await).unwrap();
    let entries = text
        .strip_prefix("HTTP/1.1 200 OK\r\n\r\nyou asked for /\n\n")
        .unwrap();
    assert_eq!(entries.lines().count(), 3);

    let text =
        String::from_utf8(request(server.addr, b"GET /empty HTTP/1.1\r\n\r\n").await).unwrap();
    assert_eq!(text, "HTTP/1.1 200 OK\r\n\r\nyou asked for /empty\n\n");

    server.shutdown().await;
}

#[tokio::test]
async fn test_favicon_is_no_content() {
    let dir = shared_dir();
    // Even an existing favicon is never read.
    fs::write(dir.path().join("favicon.ico"), "icon").unwrap();
    let server = start(dir.path()).await;

    let response = request(server.addr, b"GET /favicon.ico HTTP/1.1\r\n\r\n").await;
    assert_eq!(response, b"HTTP/1.1 204 No Content\r\n\r\n");

    server.shutdown().await;
}

#[tokio::test]
async fn test_missing_path_is_not_found() {
    let dir = shared_dir();
    let server = start(dir.path()).await;

    let response = request(server.addr, b"GET /nope.txt HTTP/1.1\r\n\r\n").await;
    assert_eq!(response, b"HTTP/1.1 404 Not Found\r\n\r\nNot Found");

    server.shutdown().await;
}

#[tokio::test]
async fn test_traversal_is_not_found() {
    let outer = tempfile::tempdir().unwrap();
    fs::write(outer.path().join("secret"), "top secret").unwrap();
    fs::create_dir(outer.path().join("shared")).unwrap();
    let server = start(&outer.path().join("shared")).await;

    for target in ["/../secret", "/..", "/../", "/./../secret", "/%2e%2e/secret"] {
        let raw = format!("GET {} HTTP/1.1\r\n\r\n", target);
        let response = request(server.addr, raw.as_bytes()).await;
        let text = String::from_utf8_lossy(&response);

        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"), "{}: {}", target, text);
        assert!(!text.contains("top secret"));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_malformed_requests_are_bad_request() {
    let dir = shared_dir();
    let server = start(dir.path()).await;

    for raw in [
        &b"POST /readme.txt HTTP/1.1\r\n\r\n"[..],
        b"HEAD /readme.txt HTTP/1.1\r\n\r\n",
        b"get /readme.txt HTTP/1.1\r\n\r\n",
        b"GET /readme.txt HTTP/1.0\r\n\r\n",
        b"GET /readme.txt\r\n\r\n",
        b"GET /readme.txt HTTP/1.1 x\r\n\r\n",
        b"GET  /readme.txt HTTP/1.1\r\n\r\n",
        b"garbage\r\n\r\n",
    ] {
        let response = request(server.addr, raw).await;
        assert!(
            response.starts_with(b"HTTP/1.1 400 Bad Request\r\n\r\n"),
            "{:?}",
            String::from_utf8_lossy(raw)
        );
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_empty_request_is_bad_request() {
    let dir = shared_dir();
    let server = start(dir.path()).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();

    assert_eq!(response, b"HTTP/1.1 400 Bad Request\r\n\r\nBad Request");

    server.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_clients() {
    let dir = shared_dir();
    let server = start(dir.path()).await;

    let clients: Vec<_> = (0..32)
        .map(|_| {
            let addr = server.addr;
            tokio::spawn(async move { request(addr, b"GET /readme.txt HTTP/1.1\r\n\r\n").await })
        })
        .collect();

    for client in clients {
        let response = client.await.unwrap();
        assert!(response.ends_with(b"hello world"));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_connection_over_in_memory_pipe() {
    let dir = shared_dir();
    let root = SandboxRoot::open(dir.path()).await.unwrap();
    let (mut client, server_side) = tokio::io::duplex(4096);
    let peer: SocketAddr = "192.0.2.1:50000".parse().unwrap();

    let serve = Connection::new(server_side, peer, root).run();
    let talk = async {
        client
            .write_all(b"GET /readme.txt HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        response
    };

    let (served, response) = tokio::join!(serve, talk);
    served.unwrap();
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with(b"\r\n\r\nhello world"));
}
