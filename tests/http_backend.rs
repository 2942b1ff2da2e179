//! HTTP backend against a mock origin.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tftp_gateway::backend::http::FORWARDED_FOR;
use tftp_gateway::backend::{Backend, HttpSource, ResponseSource, SourceError, SourceErrorKind};
use tftp_gateway::session::{self, WriterSink};
use tftp_gateway::transport::{ErrorCode, Options};

mod common;
use common::OriginReply;

fn client_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, 42))
}

async fn read_all(source: &mut HttpSource) -> Result<Vec<u8>, SourceError> {
    let mut out = Vec::new();
    loop {
        let chunk = source.read(512).await?;
        out.extend_from_slice(&chunk);
        if chunk.len() < 512 {
            return Ok(out);
        }
    }
}

#[tokio::test]
async fn test_streams_body_and_forwards_client_ip() {
    let body: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();
    let served = body.clone();
    let (addr, mut heads) = common::start_origin(move |_| OriginReply::ok(served.clone())).await;

    let url = format!("http://{}/boot/pxe.img", addr);
    let mut source = HttpSource::open(&reqwest::Client::new(), url, client_ip())
        .await
        .unwrap();
    assert_eq!(source.size(), 1500);

    assert_eq!(read_all(&mut source).await.unwrap(), body);

    let head = heads.recv().await.unwrap().to_lowercase();
    assert!(head.starts_with("get /boot/pxe.img "), "{head}");
    assert!(
        head.contains(&format!("{}: 10.0.0.42", FORWARDED_FOR.to_lowercase())),
        "{head}"
    );
}

#[tokio::test]
async fn test_error_status_is_unavailable() {
    let (addr, _heads) = common::start_origin(|path| match path {
        "/missing" => OriginReply::status(404),
        "/secret" => OriginReply::status(403),
        _ => OriginReply::status(500),
    })
    .await;
    let client = reqwest::Client::new();

    let err = HttpSource::open(&client, format!("http://{}/missing", addr), client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), SourceErrorKind::Unavailable);
    assert_eq!(err.error_code(), ErrorCode::FileNotFound);

    let err = HttpSource::open(&client, format!("http://{}/secret", addr), client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AccessViolation);

    let err = HttpSource::open(&client, format!("http://{}/broken", addr), client_ip())
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::UpstreamStatus { .. }));
    assert_eq!(err.error_code(), ErrorCode::NotDefined);
}

#[tokio::test]
async fn test_missing_content_length_is_refused() {
    let (addr, _heads) =
        common::start_origin(|_| OriginReply::ok("no length here").declared(None)).await;

    let err = HttpSource::open(&reqwest::Client::new(), format!("http://{}/x", addr), client_ip())
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::MissingLength { .. }), "{err}");
    assert_eq!(err.kind(), SourceErrorKind::Unavailable);
}

#[tokio::test]
async fn test_short_body_interrupts_stream() {
    let (addr, _heads) =
        common::start_origin(|_| OriginReply::ok(vec![7u8; 100]).declared(Some(4096))).await;

    let mut source = HttpSource::open(&reqwest::Client::new(), format!("http://{}/x", addr), client_ip())
        .await
        .unwrap();
    assert_eq!(source.size(), 4096);

    let err = read_all(&mut source).await.unwrap_err();
    assert_eq!(err.kind(), SourceErrorKind::Interrupted, "{err}");
}

#[tokio::test]
async fn test_source_stays_failed_after_short_body() {
    let (addr, _heads) =
        common::start_origin(|_| OriginReply::ok(vec![7u8; 100]).declared(Some(4096))).await;

    let mut source = HttpSource::open(&reqwest::Client::new(), format!("http://{}/x", addr), client_ip())
        .await
        .unwrap();

    let first = source.read(512).await.unwrap_err();
    assert_eq!(first.kind(), SourceErrorKind::Interrupted, "{first}");

    // Bytes buffered before the failure never come back as a short block.
    for _ in 0..2 {
        let err = source.read(512).await.unwrap_err();
        assert!(matches!(err, SourceError::Closed), "{err}");
    }
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (addr, _heads) = common::start_origin(|_| OriginReply::ok(vec![3u8; 2048])).await;

    let mut source = HttpSource::open(&reqwest::Client::new(), format!("http://{}/x", addr), client_ip())
        .await
        .unwrap();
    assert_eq!(source.read(512).await.unwrap().len(), 512);

    source.close();
    source.close();
    assert_eq!(source.size(), 2048);

    let err = source.read(512).await.unwrap_err();
    assert!(matches!(err, SourceError::Closed), "{err}");
}

#[tokio::test]
async fn test_unreachable_origin_is_unavailable() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpSource::open(&reqwest::Client::new(), format!("http://{}/x", addr), client_ip())
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Upstream { .. }), "{err}");
    assert_eq!(err.kind(), SourceErrorKind::Unavailable);
}

#[tokio::test]
async fn test_session_through_http_backend() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let (addr, mut heads) = common::start_origin(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        OriginReply::ok(vec![1u8; 1024])
    })
    .await;

    let backend = Backend::http(&format!("http://{}/tftp/", addr), reqwest::Client::new()).unwrap();
    let (gateway, captured) = common::gateway(backend);
    let request = common::request(
        "10.0.0.42:35457",
        "grub/grub.cfg",
        Options::new().with("tsize", "0"),
    );

    let mut sink = WriterSink::new(Vec::new());
    let stats = session::serve(&gateway, &request, &mut sink).await;

    assert!(stats.is_success(), "{:?}", stats.error());
    assert_eq!(stats.bytes_sent(), 1024);
    // 512 + 512 + empty terminating block.
    assert_eq!(stats.packets_sent(), 3);
    assert_eq!(sink.accepted().unwrap().get("tsize"), Some("1024"));
    assert_eq!(sink.into_inner(), vec![1u8; 1024]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let head = heads.recv().await.unwrap();
    assert!(head.starts_with("GET /tftp/grub/grub.cfg "), "{head}");

    let lines = captured.stats_lines();
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains(r#"file_path="grub/grub.cfg""#), "{}", lines[0]);
}

#[tokio::test]
async fn test_session_origin_404_sends_file_not_found() {
    let (addr, _heads) = common::start_origin(|_| OriginReply::status(404)).await;

    let backend = Backend::http(&format!("http://{}", addr), reqwest::Client::new()).unwrap();
    let (gateway, captured) = common::gateway(backend);
    let request = common::request("10.0.0.42:35457", "/nope.img", Options::new());

    let mut sink = WriterSink::new(Vec::new());
    let stats = session::serve(&gateway, &request, &mut sink).await;

    assert!(!stats.is_success());
    assert_eq!(stats.packets_sent(), 0);
    assert_eq!(sink.error().map(|(code, _)| code), Some(ErrorCode::FileNotFound));
    assert_eq!(sink.blocks(), 0);

    let lines = captured.stats_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("WARN"), "{}", lines[0]);
}
