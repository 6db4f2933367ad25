//! Wire format and message framing.
//!
//! Payloads are UTF-8 JSON: the request is an array of line boundaries, the response is
//! either an array of region results or `{"error": ...}`. Two framings are supported:
//!
//! - `LengthPrefixed`: 4-byte big-endian length, then the payload, in both directions.
//! - `Legacy`: raw JSON. The reader stops once the bytes form a complete JSON value or the
//!   peer closes its write side. Responses end with connection close.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::str::FromStr;

use crate::roi::{LineBoundary, Response};

/// Largest accepted message unless configured otherwise.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

const LENGTH_PREFIX_BYTES: usize = 4;
const READ_CHUNK: usize = 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    #[default]
    LengthPrefixed,
    Legacy,
}

impl FromStr for Framing {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length-prefixed" | "length_prefixed" => Ok(Framing::LengthPrefixed),
            "legacy" | "raw" => Ok(Framing::Legacy),
            other => Err(anyhow!(
                "unknown framing '{}' (expected length-prefixed or legacy)",
                other
            )),
        }
    }
}

pub fn encode_request(request: &[LineBoundary]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(request)?)
}

pub fn decode_request(payload: &[u8]) -> Result<Vec<LineBoundary>> {
    serde_json::from_slice(payload).context("malformed request payload")
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(response)?)
}

pub fn decode_response(payload: &[u8]) -> Result<Response> {
    serde_json::from_slice(payload).context("malformed response payload")
}

/// Read one message. Returns an empty payload if the peer closed before sending anything.
pub fn read_message<R: Read>(reader: &mut R, framing: Framing, max_bytes: usize) -> Result<Vec<u8>> {
    match framing {
        Framing::LengthPrefixed => read_length_prefixed(reader, max_bytes),
        Framing::Legacy => read_until_complete(reader, max_bytes),
    }
}

pub fn write_message<W: Write>(writer: &mut W, framing: Framing, payload: &[u8]) -> Result<()> {
    if framing == Framing::LengthPrefixed {
        let len = u32::try_from(payload.len())
            .map_err(|_| anyhow!("message of {} bytes is too large to frame", payload.len()))?;
        writer.write_all(&len.to_be_bytes())?;
    }
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

fn read_length_prefixed<R: Read>(reader: &mut R, max_bytes: usize) -> Result<Vec<u8>> {
    let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
    match reader.read_exact(&mut prefix) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(Vec::new()),
        Err(err) => return Err(err).context("failed to read message length"),
    }
    let len = u32::from_be_bytes(prefix) as usize;
    if len > max_bytes {
        bail!("message of {} bytes exceeds limit of {} bytes", len, max_bytes);
    }
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .with_context(|| format!("message truncated before {} bytes", len))?;
    Ok(payload)
}

fn read_until_complete<R: Read>(reader: &mut R, max_bytes: usize) -> Result<Vec<u8>> {
    let mut buf = [0u8; READ_CHUNK];
    let mut data = Vec::new();
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > max_bytes {
            bail!("message exceeds limit of {} bytes", max_bytes);
        }
        if !opens_container(&data) {
            // not a JSON array or object; stop and let the decoder report it
            break;
        }
        if !may_close_value(&buf[..n]) {
            continue;
        }
        match serde_json::from_slice::<serde_json::Value>(&data) {
            Ok(_) => break,
            Err(err) if err.is_eof() => continue,
            Err(_) => break,
        }
    }
    Ok(data)
}

/// False once the first non-whitespace byte is known and is neither `[` nor `{`.
fn opens_container(data: &[u8]) -> bool {
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(&b) => b == b'[' || b == b'{',
        None => true,
    }
}

/// A complete array or object can only end in a chunk whose last non-whitespace byte
/// closes one.
fn may_close_value(chunk: &[u8]) -> bool {
    matches!(
        chunk.iter().rev().copied().find(|b| !b.is_ascii_whitespace()),
        Some(b']' | b'}')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::{ColorTag, Point, RoiResult};
    use std::io::Cursor;

    const SAMPLE: &str = r#"[{"start":[0,200],"end":[400,200],"color":"blue","video":"sample"}]"#;

    #[test]
    fn request_reencodes_byte_for_byte() -> Result<()> {
        let request = decode_request(SAMPLE.as_bytes())?;
        assert_eq!(
            request,
            vec![LineBoundary::new(
                Point(0, 200),
                Point(400, 200),
                ColorTag::Blue,
                "sample"
            )]
        );
        assert_eq!(encode_request(&request)?, SAMPLE.as_bytes());
        Ok(())
    }

    #[test]
    fn request_rejects_unknown_colours_and_float_points() {
        assert!(decode_request(br#"[{"start":[0,0],"end":[1,1],"color":"pink","video":"v"}]"#).is_err());
        assert!(decode_request(br#"[{"start":[0.5,0],"end":[1,1],"color":"red","video":"v"}]"#).is_err());
        assert!(decode_request(b"{\"start\":").is_err());
    }

    #[test]
    fn length_prefixed_round_trip() -> Result<()> {
        let response = Response::Results(vec![RoiResult::empty(ColorTag::Red)]);
        let payload = encode_response(&response)?;
        let mut wire = Vec::new();
        write_message(&mut wire, Framing::LengthPrefixed, &payload)?;
        assert_eq!(&wire[..4], &(payload.len() as u32).to_be_bytes());

        let read = read_message(&mut Cursor::new(wire), Framing::LengthPrefixed, 4096)?;
        assert_eq!(decode_response(&read)?, response);
        Ok(())
    }

    #[test]
    fn length_prefix_over_limit_is_rejected() {
        let mut wire = 5000u32.to_be_bytes().to_vec();
        wire.extend(vec![b' '; 5000]);
        let err = read_message(&mut Cursor::new(wire), Framing::LengthPrefixed, 4096).unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn closed_before_sending_reads_empty() -> Result<()> {
        let mut empty = Cursor::new(Vec::new());
        assert!(read_message(&mut empty, Framing::LengthPrefixed, 64)?.is_empty());
        let mut empty = Cursor::new(Vec::new());
        assert!(read_message(&mut empty, Framing::Legacy, 64)?.is_empty());
        Ok(())
    }

    /// Delivers its data in small pieces, then blocks forever if read again.
    struct Trickle {
        chunks: Vec<Vec<u8>>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.chunks.is_empty() {
                panic!("reader kept reading after a complete value");
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn legacy_stops_at_complete_value_without_close() -> Result<()> {
        let (head, tail) = SAMPLE.as_bytes().split_at(20);
        let mut reader = Trickle {
            chunks: vec![head.to_vec(), tail.to_vec()],
        };
        let data = read_message(&mut reader, Framing::Legacy, 4096)?;
        assert_eq!(data, SAMPLE.as_bytes());
        Ok(())
    }

    #[test]
    fn legacy_keeps_reading_past_inner_closing_brackets() -> Result<()> {
        // the first chunk ends on the `]` of the start point, mid-value
        let split = SAMPLE.find("],").map(|i| i + 1).unwrap();
        let (head, tail) = SAMPLE.as_bytes().split_at(split);
        assert_eq!(head.last(), Some(&b']'));
        let mut reader = Trickle {
            chunks: vec![head.to_vec(), tail.to_vec()],
        };
        let data = read_message(&mut reader, Framing::Legacy, 4096)?;
        assert_eq!(data, SAMPLE.as_bytes());
        Ok(())
    }

    #[test]
    fn legacy_stops_early_on_non_json() -> Result<()> {
        let mut reader = Trickle {
            chunks: vec![b"GET / HTTP/1.1\r\n".to_vec()],
        };
        let data = read_message(&mut reader, Framing::Legacy, 4096)?;
        assert!(decode_request(&data).is_err());
        Ok(())
    }

    #[test]
    fn only_closing_chunks_are_parsed() {
        assert!(may_close_value(b"\"sample\"}]"));
        assert!(may_close_value(b"}\r\n"));
        assert!(!may_close_value(b"\"video\":\"sam"));
        assert!(!may_close_value(b"   "));
        assert!(opens_container(b"  [{"));
        assert!(opens_container(b" "));
        assert!(!opens_container(b"hello"));
    }

    #[test]
    fn legacy_enforces_limit() {
        let big = format!("[{}]", vec!["1"; 3000].join(","));
        let err = read_message(&mut Cursor::new(big.into_bytes()), Framing::Legacy, 1024).unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn framing_parses_from_config_strings() -> Result<()> {
        assert_eq!("legacy".parse::<Framing>()?, Framing::Legacy);
        assert_eq!("Length-Prefixed".parse::<Framing>()?, Framing::LengthPrefixed);
        assert!("udp".parse::<Framing>().is_err());
        Ok(())
    }
}
