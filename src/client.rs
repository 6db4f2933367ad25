//! Requester side of the protocol.

use anyhow::{anyhow, bail, Context, Result};
use std::io::Read;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::detect::ObjectClass;
use crate::protocol::{self, Framing, DEFAULT_MAX_MESSAGE_BYTES};
use crate::roi::{ColorTag, LineBoundary, Point, Response, RoiResult};

/// Send one request and wait for the response. `timeout` bounds each read; processing a
/// long video can take minutes, so `None` waits indefinitely.
pub fn send_request(
    addr: &str,
    request: &[LineBoundary],
    framing: Framing,
    timeout: Option<Duration>,
) -> Result<Response> {
    let mut stream =
        TcpStream::connect(addr).with_context(|| format!("failed to connect to {}", addr))?;
    stream.set_read_timeout(timeout)?;

    let payload = protocol::encode_request(request)?;
    protocol::write_message(&mut stream, framing, &payload)?;

    let body = match framing {
        Framing::LengthPrefixed => {
            protocol::read_message(&mut stream, framing, DEFAULT_MAX_MESSAGE_BYTES)?
        }
        Framing::Legacy => {
            // the response is delimited by the server closing the connection
            stream.shutdown(Shutdown::Write)?;
            let mut body = Vec::new();
            stream.read_to_end(&mut body)?;
            body
        }
    };
    if body.is_empty() {
        bail!("server closed connection without a response");
    }
    protocol::decode_response(&body)
}

/// Per-class crossing totals for one region, as printed by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoiSummary {
    pub color: ColorTag,
    /// Persons not accounted for by cyclists; riders are detected as persons too.
    pub pedestrians: u64,
    pub cyclists: u64,
    pub motorcycles: u64,
    pub cars: u64,
    pub buses: u64,
    pub trucks: u64,
}

pub fn summarize(result: &RoiResult) -> RoiSummary {
    let person = result.total(ObjectClass::Person);
    let bicycle = result.total(ObjectClass::Bicycle);
    RoiSummary {
        color: result.color,
        pedestrians: person.saturating_sub(bicycle),
        cyclists: bicycle,
        motorcycles: result.total(ObjectClass::Motorcycle),
        cars: result.total(ObjectClass::Car),
        buses: result.total(ObjectClass::Bus),
        trucks: result.total(ObjectClass::Truck),
    }
}

/// Parse `color:x0,y0:x1,y1`, e.g. `blue:0,200:400,200`.
pub fn parse_roi_arg(arg: &str, video: &str) -> Result<LineBoundary> {
    let mut parts = arg.split(':');
    let (Some(color), Some(start), Some(end), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("region '{}' must look like color:x0,y0:x1,y1", arg);
    };
    Ok(LineBoundary::new(
        parse_point(start)?,
        parse_point(end)?,
        color.parse()?,
        video,
    ))
}

fn parse_point(raw: &str) -> Result<Point> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("point '{}' must look like x,y", raw))?;
    let x = x
        .trim()
        .parse()
        .with_context(|| format!("invalid x coordinate in '{}'", raw))?;
    let y = y
        .trim()
        .parse()
        .with_context(|| format!("invalid y coordinate in '{}'", raw))?;
    Ok(Point(x, y))
}
