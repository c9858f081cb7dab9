//! Socket sink for remote log collection
//!
//! Sends each encoded record to a collector over UDP (one datagram per
//! record) or TCP (one `write_all` per record on a persistent stream).

use crate::core::{Level, LoggerError, Result, Sink};
use crossbeam_channel::{bounded, RecvTimeoutError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound for the single connection attempt made at construction,
/// name resolution included
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Transport used by [`SocketSink`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketKind {
    #[default]
    Udp,
    Tcp,
}

impl SocketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketKind::Udp => "udp",
            SocketKind::Tcp => "tcp",
        }
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocketKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "udp" => Ok(SocketKind::Udp),
            "tcp" => Ok(SocketKind::Tcp),
            other => Err(format!("unknown socket type '{}' (expected udp or tcp)", other)),
        }
    }
}

enum Connection {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

/// Sink that ships records to a remote collector
///
/// The connection is made once, at construction. There is no reconnect:
/// a write that fails is reported by the router and the next record tries
/// the same socket again.
///
/// # Example
///
/// ```no_run
/// use rust_tee_logger::sinks::{SocketKind, SocketSink};
///
/// let sink = SocketSink::connect(SocketKind::Udp, "127.0.0.1:9990")
///     .expect("collector reachable");
/// ```
pub struct SocketSink {
    kind: SocketKind,
    address: String,
    connection: Mutex<Connection>,
}

impl SocketSink {
    /// Connect to `address` (`host:port`)
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::SinkConnect`] if the address does not resolve
    /// and connect within [`CONNECT_TIMEOUT`]
    pub fn connect(kind: SocketKind, address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let connect_error =
            |message: String| LoggerError::sink_connect(kind.as_str(), address.clone(), message);

        let deadline = Instant::now() + CONNECT_TIMEOUT;
        let target = resolve_within(&address, CONNECT_TIMEOUT, system_lookup)
            .map_err(connect_error)?;

        let connection = match kind {
            SocketKind::Udp => {
                let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                let socket = UdpSocket::bind(local).map_err(|e| connect_error(e.to_string()))?;
                socket
                    .connect(target)
                    .map_err(|e| connect_error(e.to_string()))?;
                socket
                    .set_write_timeout(Some(CONNECT_TIMEOUT))
                    .map_err(|e| connect_error(e.to_string()))?;
                Connection::Udp(socket)
            }
            SocketKind::Tcp => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(connect_error("connect deadline exceeded".to_string()));
                }
                let stream = TcpStream::connect_timeout(&target, remaining)
                    .map_err(|e| connect_error(e.to_string()))?;
                stream
                    .set_write_timeout(Some(CONNECT_TIMEOUT))
                    .map_err(|e| connect_error(e.to_string()))?;
                // Low latency matters more than packet count for log lines
                stream
                    .set_nodelay(true)
                    .map_err(|e| connect_error(e.to_string()))?;
                Connection::Tcp(stream)
            }
        };

        Ok(Self {
            kind,
            address,
            connection: Mutex::new(connection),
        })
    }

    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

fn system_lookup(address: &str) -> io::Result<Vec<SocketAddr>> {
    address.to_socket_addrs().map(|addrs| addrs.collect())
}

/// Resolve `address` to its first socket address, giving up after `limit`
///
/// Literal `ip:port` addresses skip the lookup. Host names are looked up on
/// a helper thread; a lookup that outlives `limit` is abandoned and its
/// thread finishes on its own.
fn resolve_within<F>(
    address: &str,
    limit: Duration,
    lookup: F,
) -> std::result::Result<SocketAddr, String>
where
    F: FnOnce(&str) -> io::Result<Vec<SocketAddr>> + Send + 'static,
{
    if let Ok(literal) = address.parse::<SocketAddr>() {
        return Ok(literal);
    }

    let (tx, rx) = bounded(1);
    let host = address.to_string();
    thread::Builder::new()
        .name("socket-sink-resolve".to_string())
        .spawn(move || {
            // The receiver is gone once the caller timed out
            let _ = tx.send(lookup(&host));
        })
        .map_err(|e| format!("cannot start name lookup: {}", e))?;

    match rx.recv_timeout(limit) {
        Ok(Ok(addrs)) => addrs
            .into_iter()
            .next()
            .ok_or_else(|| "address did not resolve".to_string()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(RecvTimeoutError::Timeout) => {
            Err(format!("name lookup did not finish within {:?}", limit))
        }
        Err(RecvTimeoutError::Disconnected) => Err("name lookup failed".to_string()),
    }
}

impl Sink for SocketSink {
    fn write(&self, _level: Level, bytes: &[u8]) -> Result<()> {
        let mut connection = self.connection.lock();
        match &mut *connection {
            Connection::Udp(socket) => {
                let sent = socket.send(bytes).map_err(|e| {
                    LoggerError::io_operation("sending log datagram", self.address.clone(), e)
                })?;
                if sent != bytes.len() {
                    return Err(LoggerError::writer(format!(
                        "datagram truncated: sent {} of {} bytes",
                        sent,
                        bytes.len()
                    )));
                }
                Ok(())
            }
            Connection::Tcp(stream) => stream.write_all(bytes).map_err(|e| {
                LoggerError::io_operation("writing to log stream", self.address.clone(), e)
            }),
        }
    }

    fn flush(&self) -> Result<()> {
        let mut connection = self.connection.lock();
        match &mut *connection {
            Connection::Udp(_) => Ok(()),
            Connection::Tcp(stream) => stream.flush().map_err(|e| {
                LoggerError::io_operation("flushing log stream", self.address.clone(), e)
            }),
        }
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }
}
