use anyhow::{anyhow, Context, Result};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::orchestrator::RequestOrchestrator;
use crate::protocol::{self, Framing, DEFAULT_MAX_MESSAGE_BYTES};

const DEFAULT_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub struct ListenerConfig {
    pub addr: String,
    pub framing: Framing,
    pub max_request_bytes: usize,
    /// Bounds the wait for a request; processing itself is never timed out.
    pub read_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            framing: Framing::default(),
            max_request_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting and wait for the loop to exit. A request already being processed
    /// runs to completion first.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("roi server thread panicked"))?;
        }
        Ok(())
    }
}

/// Single-connection-at-a-time counting server.
pub struct RoiServer {
    cfg: ListenerConfig,
    orchestrator: RequestOrchestrator,
}

impl RoiServer {
    pub fn new(cfg: ListenerConfig, orchestrator: RequestOrchestrator) -> Self {
        Self { cfg, orchestrator }
    }

    pub fn spawn(self) -> Result<ServerHandle> {
        let configured_addr: SocketAddr = self
            .cfg
            .addr
            .parse()
            .with_context(|| format!("invalid listen address '{}'", self.cfg.addr))?;
        let listener = TcpListener::bind(configured_addr)
            .with_context(|| format!("failed to bind {}", configured_addr))?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        log::info!(
            "roi server listening on {} ({:?} framing)",
            addr,
            self.cfg.framing
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_server(listener, &self.cfg, &self.orchestrator, shutdown_thread) {
                log::error!("roi server stopped: {:#}", err);
            }
        });

        Ok(ServerHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_server(
    listener: TcpListener,
    cfg: &ListenerConfig,
    orchestrator: &RequestOrchestrator,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                log::info!("connection from {}", peer);
                if let Err(err) = handle_connection(stream, cfg, orchestrator) {
                    log::warn!("request from {} rejected: {:#}", peer, err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) if is_listener_fatal(&err) => {
                return Err(anyhow!(err).context("listener unusable"));
            }
            Err(err) => {
                // aborted handshakes and fd exhaustion only affect this attempt
                log::warn!("accept failed: {}", err);
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
    log::info!("roi server shut down");
    Ok(())
}

/// Errors that mean the listening socket itself is broken rather than one pending
/// connection.
fn is_listener_fatal(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::InvalidInput | ErrorKind::Unsupported | ErrorKind::NotConnected
    )
}

/// AWAIT_REQUEST, PROCESSING, RESPONDING, then close on drop. An undecodable request
/// closes the connection without a response.
fn handle_connection(
    mut stream: TcpStream,
    cfg: &ListenerConfig,
    orchestrator: &RequestOrchestrator,
) -> Result<()> {
    // accepted sockets inherit the listener's non-blocking mode on some platforms
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(cfg.read_timeout))?;

    let payload = protocol::read_message(&mut stream, cfg.framing, cfg.max_request_bytes)?;
    if payload.is_empty() {
        return Err(anyhow!("peer closed without sending a request"));
    }
    let request = protocol::decode_request(&payload)?;
    log::info!("processing request with {} region(s)", request.len());

    let response = orchestrator.handle(&request);
    let body = protocol::encode_response(&response)?;
    protocol::write_message(&mut stream, cfg.framing, &body)?;
    log::info!(
        "responded with {}",
        if response.is_error() { "error" } else { "results" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn transient_accept_errors_keep_the_listener() {
        for kind in [
            ErrorKind::ConnectionAborted,
            ErrorKind::ConnectionReset,
            ErrorKind::Interrupted,
            ErrorKind::TimedOut,
            ErrorKind::OutOfMemory,
        ] {
            assert!(!is_listener_fatal(&Error::from(kind)), "{:?}", kind);
        }
        // EMFILE: the process ran out of descriptors, which clears as connections close
        assert!(!is_listener_fatal(&Error::from_raw_os_error(24)));
    }

    #[test]
    fn broken_listener_stops_the_loop() {
        assert!(is_listener_fatal(&Error::from(ErrorKind::InvalidInput)));
        assert!(is_listener_fatal(&Error::from(ErrorKind::Unsupported)));
    }
}
