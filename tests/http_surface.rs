//! HTTP surface tests against a live server on an ephemeral port.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use ppe_sentinel::alert::{AlertDispatcher, AlertThrottle, AudioCue, NullCuePlayer, NullNotifier};
use ppe_sentinel::annotate::FrameAnnotator;
use ppe_sentinel::camera::{shared_camera, CameraConfig};
use ppe_sentinel::detect::{DetectorAdapter, ScriptedBackend};
use ppe_sentinel::pipeline::DetectionPipeline;
use ppe_sentinel::server::{ServerConfig, ServerHandle, StreamServer};

fn spawn_server() -> Result<ServerHandle> {
    let camera = shared_camera(CameraConfig {
        device_template: "stub://cam{index}".to_string(),
        width: 64,
        height: 48,
    });
    let pipeline = Arc::new(Mutex::new(DetectionPipeline::new(
        DetectorAdapter::new(Box::new(ScriptedBackend::new(Vec::new())), 64, 48, 0.5),
        FrameAnnotator::new(),
        AlertThrottle::default(),
        AudioCue::new(Box::new(NullCuePlayer)),
        AlertDispatcher::new(Box::new(NullNotifier)),
    )));
    let server = StreamServer::new(
        ServerConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        camera,
        pipeline,
    );
    server.spawn()
}

#[test]
fn health_endpoint_responds_ok() -> Result<()> {
    let handle = spawn_server()?;

    let response = ureq::get(&format!("http://{}/health", handle.addr)).call()?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.into_string()?, r#"{"status":"ok"}"#);

    handle.stop()
}

#[test]
fn unknown_paths_return_not_found() -> Result<()> {
    let handle = spawn_server()?;

    let err = ureq::get(&format!("http://{}/nope", handle.addr))
        .call()
        .expect_err("404 expected");
    match err {
        ureq::Error::Status(status, _) => assert_eq!(status, 404),
        other => panic!("unexpected error: {}", other),
    }

    handle.stop()
}

#[test]
fn raw_feed_streams_multipart_jpeg_frames() -> Result<()> {
    let handle = spawn_server()?;

    let mut stream = TcpStream::connect(handle.addr)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    write!(stream, "GET /raw_feed HTTP/1.1\r\nHost: test\r\n\r\n")?;

    // Read until the response header, the part boundary, and the JPEG
    // magic bytes have all come through.
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while data.len() < 256 * 1024 {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if contains(&data, b"\xff\xd8") {
            break;
        }
    }

    assert!(contains(&data, b"HTTP/1.1 200 OK"));
    assert!(contains(
        &data,
        b"Content-Type: multipart/x-mixed-replace; boundary=frame"
    ));
    assert!(contains(&data, b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
    assert!(contains(&data, b"\xff\xd8"), "JPEG SOI marker present");

    drop(stream);
    handle.stop()
}

#[test]
fn select_camera_switches_the_device_index() -> Result<()> {
    let handle = spawn_server()?;

    let response = ureq::post(&format!("http://{}/select_camera", handle.addr))
        .send_form(&[("camera", "2")])?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.into_string()?, r#"{"status":"ok","camera":2}"#);

    let err = ureq::post(&format!("http://{}/select_camera", handle.addr))
        .send_form(&[("other", "1")])
        .expect_err("missing camera field is a bad request");
    match err {
        ureq::Error::Status(status, _) => assert_eq!(status, 400),
        other => panic!("unexpected error: {}", other),
    }

    handle.stop()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
