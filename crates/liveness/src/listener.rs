use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Acknowledgement written to every inbound connection.
pub const ACK: &[u8] = b"OK\n";

/// Pause after a failed `accept`, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Failed to bind liveness listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Answers liveness probes from peers.
///
/// Stateless: every inbound connection gets [`ACK`] and is closed.
#[derive(Debug)]
pub struct LivenessListener {
    addr: SocketAddr,
    running: Option<Running>,
}

#[derive(Debug)]
struct Running {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl LivenessListener {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            running: None,
        }
    }

    /// Bind the port and start serving in the background.
    ///
    /// Calling it again while running does nothing and returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr, ListenerError> {
        if let Some(running) = &self.running {
            if !running.task.is_finished() {
                return Ok(running.local_addr);
            }
        }

        let listener = bind(self.addr).map_err(|source| ListenerError::Bind {
            addr: self.addr,
            source,
        })?;

        let local_addr = listener.local_addr().unwrap_or(self.addr);
        info!(address = %local_addr, "Liveness listener started");

        let task = tokio::spawn(serve(listener));
        self.running = Some(Running { local_addr, task });

        Ok(local_addr)
    }

    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
            info!(address = %running.local_addr, "Liveness listener stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// The bound address, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }
}

impl Drop for LivenessListener {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}

fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(128)
}

async fn serve(listener: TcpListener) {
    let listener = &listener;
    accept_loop(move || listener.accept()).await
}

async fn accept_loop<A, F, S>(mut accept: A)
where
    A: FnMut() -> F,
    F: Future<Output = io::Result<(S, SocketAddr)>>,
    S: AsyncWrite + Unpin + Send + 'static,
{
    loop {
        match accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(acknowledge(stream, peer));
            }
            Err(e) => {
                warn!("Failed to accept liveness connection: {e}");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn acknowledge<S>(mut stream: S, peer: SocketAddr)
where
    S: AsyncWrite + Unpin,
{
    debug!(%peer, "Liveness probe received");

    if let Err(e) = stream.write_all(ACK).await {
        debug!(%peer, "Failed to acknowledge liveness probe: {e}");
        return;
    }

    let _ = stream.shutdown().await;
}
