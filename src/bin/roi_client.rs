//! roi_client - submit line boundaries for a video and print crossing counts
//!
//! Example:
//!   roi_client --video sample --roi blue:0,200:400,200 --roi red:50,0:50,300

use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

use roi_counter::client::{parse_roi_arg, send_request, summarize};
use roi_counter::{Framing, LineBoundary, Response};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Submit line boundaries to an roi_server and print per-class crossing counts"
)]
struct Args {
    /// Server address.
    #[arg(long, env = "ROI_COUNTER_ADDR", default_value = "127.0.0.1:4000")]
    addr: String,

    /// Video identifier, resolved by the server under its assets directory.
    #[arg(long)]
    video: String,

    /// Region as color:x0,y0:x1,y1 (repeatable).
    #[arg(long = "roi", value_name = "REGION", required = true)]
    rois: Vec<String>,

    /// Raw JSON framing without length prefixes.
    #[arg(long)]
    legacy: bool,

    /// Per-read timeout in seconds; 0 waits indefinitely.
    #[arg(long, default_value_t = 0)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let request = args
        .rois
        .iter()
        .map(|raw| parse_roi_arg(raw, &args.video))
        .collect::<Result<Vec<LineBoundary>>>()?;
    let framing = if args.legacy {
        Framing::Legacy
    } else {
        Framing::LengthPrefixed
    };
    let timeout = (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs));

    log::info!(
        "sending {} region(s) for '{}' to {}",
        request.len(),
        args.video,
        args.addr
    );
    let results = match send_request(&args.addr, &request, framing, timeout)? {
        Response::Error(err) => bail!("server error: {}", err.error),
        Response::Results(results) => results,
    };
    if results.len() < request.len() {
        println!(
            "{} zero-length region(s) were skipped",
            request.len() - results.len()
        );
    }

    for result in &results {
        let summary = summarize(result);
        println!("region {}:", summary.color);
        println!(
            "  pedestrians {}  cyclists {}  motorcycles {}  cars {}  buses {}  trucks {}",
            summary.pedestrians,
            summary.cyclists,
            summary.motorcycles,
            summary.cars,
            summary.buses,
            summary.trucks
        );
        println!("  interval   {}", interval_header(result.car.len()));
        for (name, counts) in [
            ("person", &result.person),
            ("bicycle", &result.bicycle),
            ("motorcycle", &result.motorcycle),
            ("car", &result.car),
            ("bus", &result.bus),
            ("truck", &result.truck),
        ] {
            let row: Vec<String> = counts.iter().map(|c| format!("{:>4}", c)).collect();
            println!("  {:<10} {}", name, row.join(""));
        }
    }
    Ok(())
}

fn interval_header(buckets: usize) -> String {
    (1..=buckets).map(|i| format!("{:>4}", i)).collect()
}
