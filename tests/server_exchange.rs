mod common;

use anyhow::Result;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;
use tempfile::tempdir;

use common::{sample_boundary, sample_expected, sample_scene, scene_orchestrator, write_scene};
use roi_counter::client::send_request;
use roi_counter::protocol::{decode_response, read_message, write_message};
use roi_counter::{ColorTag, Framing, ListenerConfig, Response, RoiServer, ServerHandle};

const TIMEOUT: Option<Duration> = Some(Duration::from_secs(30));

fn start_server(dir: &std::path::Path, framing: Framing) -> Result<ServerHandle> {
    let cfg = ListenerConfig {
        addr: "127.0.0.1:0".to_string(),
        framing,
        max_request_bytes: 4096,
        read_timeout: Duration::from_secs(2),
    };
    RoiServer::new(cfg, scene_orchestrator(dir)).spawn()
}

#[test]
fn length_prefixed_exchange_returns_histograms() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "sample", &sample_scene())?;
    let server = start_server(dir.path(), Framing::LengthPrefixed)?;
    let addr = server.addr.to_string();

    let response = send_request(
        &addr,
        &[sample_boundary(ColorTag::Blue, "sample")],
        Framing::LengthPrefixed,
        TIMEOUT,
    )?;
    assert_eq!(response, Response::Results(vec![sample_expected(ColorTag::Blue)]));

    // the server returns to listening after each connection
    let response = send_request(
        &addr,
        &[sample_boundary(ColorTag::Red, "missing")],
        Framing::LengthPrefixed,
        TIMEOUT,
    )?;
    assert!(response.is_error());

    server.stop()?;
    Ok(())
}

#[test]
fn legacy_client_without_half_close_gets_a_raw_response() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "sample", &sample_scene())?;
    let server = start_server(dir.path(), Framing::Legacy)?;

    let mut stream = TcpStream::connect(server.addr)?;
    stream.set_read_timeout(TIMEOUT)?;
    stream.write_all(br#"[{"start":[0,200],"end":[400,200],"color":"blue","video":"sample"}]"#)?;
    let mut body = Vec::new();
    stream.read_to_end(&mut body)?;

    assert_eq!(decode_response(&body)?, Response::Results(vec![sample_expected(ColorTag::Blue)]));
    assert!(body.starts_with(b"[{\"person\":"));

    server.stop()?;
    Ok(())
}

#[test]
fn legacy_client_helper_round_trips() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "sample", &sample_scene())?;
    let server = start_server(dir.path(), Framing::Legacy)?;

    let response = send_request(
        &server.addr.to_string(),
        &[sample_boundary(ColorTag::Green, "sample")],
        Framing::Legacy,
        TIMEOUT,
    )?;
    assert_eq!(response, Response::Results(vec![sample_expected(ColorTag::Green)]));

    server.stop()?;
    Ok(())
}

#[test]
fn malformed_request_closes_without_response() -> Result<()> {
    let dir = tempdir()?;
    let server = start_server(dir.path(), Framing::LengthPrefixed)?;

    let mut stream = TcpStream::connect(server.addr)?;
    stream.set_read_timeout(TIMEOUT)?;
    write_message(&mut stream, Framing::LengthPrefixed, b"{\"start\": nope")?;
    let reply = read_message(&mut stream, Framing::LengthPrefixed, 4096)?;
    assert!(reply.is_empty());

    // oversized length prefix is refused the same way
    let mut stream = TcpStream::connect(server.addr)?;
    stream.set_read_timeout(TIMEOUT)?;
    stream.write_all(&100_000u32.to_be_bytes())?;
    let reply = read_message(&mut stream, Framing::LengthPrefixed, 4096)?;
    assert!(reply.is_empty());

    server.stop()?;
    Ok(())
}

#[test]
fn empty_region_list_gets_an_error_body() -> Result<()> {
    let dir = tempdir()?;
    let server = start_server(dir.path(), Framing::LengthPrefixed)?;

    let response = send_request(&server.addr.to_string(), &[], Framing::LengthPrefixed, TIMEOUT)?;
    assert_eq!(response, Response::error("request contains no regions"));

    server.stop()?;
    Ok(())
}
