//! The per-connection I/O worker.
//!
//! Each `connect` starts one OS thread running a single-threaded tokio
//! runtime. On that runtime:
//!
//! - the **main task** dials, then loops over socket reads, heartbeat
//!   ticks and the shutdown signal;
//! - a **writer task** drains the outbound queue, so a slow write never
//!   stalls reads or heartbeats.
//!
//! ```text
//!   app thread                     rtype-session-io thread
//!   ──────────                     ───────────────────────
//!   send_*() ──mpsc──────────────→ writer task ──→ socket
//!   disconnect() ──watch─────────→ main task  ←── socket
//!   poll_event() ←──EventQueue──── main task (dispatch)
//! ```
//!
//! When the main task returns, the runtime is dropped, which cancels the
//! writer task and closes both halves of the socket.

use std::sync::Arc;
use std::thread::JoinHandle;

use rtype_protocol::Reassembler;
use rtype_session::HeartbeatMonitor;
use rtype_transport::{ConnectionId, Dialer, TransportError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use crate::shared::Shared;
use crate::ClientError;

/// Name given to every worker thread.
pub(crate) const WORKER_THREAD_NAME: &str = "rtype-session-io";

/// Where to connect and how to label the attempt in logs.
pub(crate) struct Target {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) id: ConnectionId,
    /// Session epoch this attempt belongs to. Every state change the
    /// worker makes is keyed on it, so a superseded worker cannot touch
    /// the connection that replaced it.
    pub(crate) epoch: u64,
}

/// Worker-side ends of the channels created by `connect`.
pub(crate) struct WorkerChannels {
    pub(crate) outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

/// Starts the worker thread for one connection attempt.
pub(crate) fn spawn<D: Dialer>(
    shared: Arc<Shared>,
    dialer: Arc<D>,
    target: Target,
    channels: WorkerChannels,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(WORKER_THREAD_NAME.into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    shared.report_live(target.epoch, &ClientError::Runtime(e.to_string()));
                    shared.teardown(target.epoch);
                    return;
                }
            };
            let span = tracing::info_span!(
                "session",
                conn = %target.id,
                host = %target.host,
                port = target.port
            );
            runtime.block_on(run(shared, dialer, target, channels).instrument(span));
            tracing::debug!("session worker exiting");
        })
}

/// Resolves once the shutdown flag is raised or its sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn run<D: Dialer>(
    shared: Arc<Shared>,
    dialer: Arc<D>,
    target: Target,
    channels: WorkerChannels,
) {
    let WorkerChannels {
        outbound,
        mut shutdown,
    } = channels;
    let epoch = target.epoch;

    tracing::info!("connecting");
    let dialed = tokio::select! {
        res = dialer.dial(&target.host, target.port) => res,
        _ = shutdown_requested(&mut shutdown) => {
            tracing::debug!("connect cancelled");
            return;
        }
    };
    let stream = match dialed {
        Ok(stream) => stream,
        Err(e) => {
            shared.report_live(epoch, &e.into());
            shared.teardown(epoch);
            return;
        }
    };

    if !shared.state.mark_connected(epoch) {
        tracing::debug!("connection torn down while dialing");
        return;
    }
    tracing::info!("connected");
    shared.notify_connected();

    let result = drive(&shared, epoch, stream, outbound, &mut shutdown).await;
    if let Err(e) = result {
        shared.report_live(epoch, &e);
    }
    shared.teardown(epoch);
}

/// Runs an established connection until it fails or is shut down.
///
/// `Ok(())` means an orderly local shutdown; any `Err` is reported by
/// the caller before teardown.
async fn drive<S>(
    shared: &Arc<Shared>,
    epoch: u64,
    stream: S,
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let writer_task = tokio::spawn(write_loop(writer, outbound, Arc::clone(shared), epoch));

    let heartbeat = HeartbeatMonitor::from_config(&shared.config.session);
    shared.send_heartbeat(epoch);
    let mut ticker = heartbeat.ticker();

    let mut reassembler = Reassembler::new(shared.config.max_payload_size);
    let mut buf = vec![0u8; shared.config.read_buffer_size.max(1)];

    let result = loop {
        tokio::select! {
            _ = shutdown_requested(shutdown) => break Ok(()),

            _ = ticker.tick() => {
                if let Err(e) = heartbeat.check() {
                    break Err(e.into());
                }
                shared.send_heartbeat(epoch);
            }

            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    break Err(TransportError::ConnectionClosed(
                        "peer closed the connection".into(),
                    )
                    .into());
                }
                Ok(n) => {
                    reassembler.feed(&buf[..n]);
                    if let Err(e) = drain_frames(shared, epoch, &mut reassembler, &heartbeat) {
                        break Err(e);
                    }
                }
                Err(e) => break Err(TransportError::ReceiveFailed(e).into()),
            },
        }
    };

    reassembler.clear();
    writer_task.abort();
    result
}

/// Dispatches every complete frame currently buffered.
fn drain_frames(
    shared: &Shared,
    epoch: u64,
    reassembler: &mut Reassembler,
    heartbeat: &HeartbeatMonitor,
) -> Result<(), ClientError> {
    while let Some(frame) = reassembler.try_extract_frame()? {
        heartbeat.touch();
        shared.dispatch(&frame, epoch);
        if !shared.state.is_live(epoch) {
            break;
        }
    }
    Ok(())
}

/// Writes queued frames in order. A failed write is reported but does
/// not end the session; the read side notices a dead socket on its own.
async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    shared: Arc<Shared>,
    epoch: u64,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = outbound.recv().await {
        match writer.write_all(&bytes).await {
            Ok(()) => tracing::trace!(bytes = bytes.len(), "frame written"),
            Err(e) => shared.report_live(epoch, &TransportError::SendFailed(e).into()),
        }
    }
    let _ = writer.shutdown().await;
}
