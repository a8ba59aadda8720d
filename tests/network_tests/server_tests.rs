//! Server Tests
//!
//! Tests for the stub server: session loop, dispatch, rejection of bad
//! frames and shutdown.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use twiniverse::network::{HandlerFn, RequestHandler, RunningServer, Server, StubHandler};
use twiniverse::protocol::{
    decode_login_result, encode_credentials, encode_image_batch, read_response, write_request,
    CommandType, Credentials, LoginResult, Request, Response, ResponseShape,
};
use twiniverse::ServerConfig;

// =============================================================================
// Helper Functions
// =============================================================================

fn start(handler: Arc<dyn RequestHandler>, max_request_size: usize) -> RunningServer {
    start_with_read_timeout(handler, max_request_size, 5_000)
}

fn start_with_read_timeout(
    handler: Arc<dyn RequestHandler>,
    max_request_size: usize,
    read_timeout_ms: u64,
) -> RunningServer {
    let config = ServerConfig::builder()
        .listen_addr("127.0.0.1:0")
        .workers(2)
        .read_timeout_ms(read_timeout_ms)
        .write_timeout_ms(5_000)
        .max_request_size(max_request_size)
        .build();
    Server::bind(config, handler).unwrap().spawn().unwrap()
}

fn connect(server: &RunningServer) -> TcpStream {
    let stream = TcpStream::connect(server.addr()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

/// True once the server has closed its side of the connection
fn closed_by_peer(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 1];
    matches!(stream.read(&mut buf), Ok(0) | Err(_))
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_multiple_requests_on_one_connection() {
    let handler = StubHandler::new()
        .with_account("bob", "pw")
        .with_video_result("vid", b"model".to_vec());
    let server = start(Arc::new(handler), 1024 * 1024);
    let mut stream = connect(&server);

    let login = encode_credentials(&Credentials::new("bob", "pw")).unwrap();
    write_request(&mut stream, &Request::new(CommandType::Login, login)).unwrap();
    let response = read_response(&mut stream, ResponseShape::Data).unwrap();
    assert_eq!(
        decode_login_result(&response.data).unwrap(),
        LoginResult::accepted()
    );

    write_request(&mut stream, &Request::new(CommandType::Video, b"mp4".to_vec())).unwrap();
    let response = read_response(&mut stream, ResponseShape::NamedData).unwrap();
    assert_eq!(response.filename.as_deref(), Some("vid.glb"));
    assert_eq!(response.data, b"model");

    write_request(&mut stream, &Request::new(CommandType::GetByHash, b"vid".to_vec())).unwrap();
    let response = read_response(&mut stream, ResponseShape::Data).unwrap();
    assert_eq!(response.data, b"model");
}

#[test]
fn test_image_without_configured_result_sends_placeholder() {
    let server = start(Arc::new(StubHandler::new()), 1024 * 1024);
    let mut stream = connect(&server);

    let batch = encode_image_batch(&[b"jpg".to_vec()]).unwrap();
    write_request(&mut stream, &Request::new(CommandType::Image, batch)).unwrap();

    let response = read_response(&mut stream, ResponseShape::NamedData).unwrap();
    assert_eq!(response.filename.as_deref(), Some("NullName"));
    assert!(response.data.is_empty());
}

#[test]
fn test_custom_handler_sees_each_request() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let handler = HandlerFn(move |request: &Request| {
        counter.fetch_add(1, Ordering::SeqCst);
        Response::data(request.payload.clone())
    });
    let server = start(Arc::new(handler), 1024);

    for i in 0..3u8 {
        let mut stream = connect(&server);
        write_request(&mut stream, &Request::new(CommandType::GetByHash, vec![i; 5])).unwrap();
        let response = read_response(&mut stream, ResponseShape::Data).unwrap();
        assert_eq!(response.data, vec![i; 5]);
    }

    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_unknown_command_closes_connection() {
    let server = start(Arc::new(StubHandler::new()), 1024);
    let mut stream = connect(&server);

    stream.write_all(&[0x09, 0x00, 0x00, 0x00, 0x00]).unwrap();
    assert!(closed_by_peer(&mut stream));
}

#[test]
fn test_oversized_request_closes_connection() {
    let server = start(Arc::new(StubHandler::new()), 16);
    let mut stream = connect(&server);

    stream.write_all(&[0x03, 0x00, 0x00, 0x01, 0x00]).unwrap();
    assert!(closed_by_peer(&mut stream));
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_stop_releases_listener() {
    let server = start(Arc::new(StubHandler::new()), 1024);
    let addr = server.addr();

    server.stop().unwrap();
    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn test_stop_closes_idle_connections() {
    // No read timeout: only shutdown can end these sessions
    let server = start_with_read_timeout(Arc::new(StubHandler::new()), 1024, 0);

    let mut active = connect(&server);
    write_request(&mut active, &Request::new(CommandType::GetByHash, b"x".to_vec())).unwrap();
    read_response(&mut active, ResponseShape::Data).unwrap();
    let mut idle = connect(&server);

    let (done_tx, done_rx) = crossbeam::channel::bounded(1);
    thread::spawn(move || {
        let _ = done_tx.send(server.stop().is_ok());
    });

    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    assert!(closed_by_peer(&mut active));
    assert!(closed_by_peer(&mut idle));
}
