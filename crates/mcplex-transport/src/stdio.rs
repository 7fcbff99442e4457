//! Reference transport over standard input/output.
//!
//! This is the canonical illustration of the concurrency contract a
//! transport must uphold. Exactly one session exists for the process.
//!
//! Two independent single-consumer contexts own the streams:
//!
//! - the **reader task** exclusively reads newline-delimited frames from
//!   the input stream and dispatches each to the session concurrently
//!   (multiple requests may be in flight at once);
//! - the **writer task** exclusively drains a bounded outbound queue in
//!   enqueue order, so the session's wire output is never interleaved
//!   mid-frame.
//!
//! The two contexts share nothing but the queue: a slow writer cannot
//! corrupt interleaved output and a slow reader cannot stall decoding.
//! On shutdown the reader observes the closing signal and stops, the
//! writer drains and stops; the streams are never force-closed mid-write.
//!
//! # Wire format
//!
//! One JSON document per line. Any line break embedded in an encoded
//! frame is replaced by its literal escape before the line is emitted, so
//! framing survives multi-line text fields.

use crate::error::TransportError;
use crate::traits::{Connection, ServerTransport, SessionFactory, SessionHandle};
use async_trait::async_trait;
use mcplex_core::jsonrpc::{Message, Notification};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Capacity of the bounded outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// How long shutdown waits for the reader and writer to finish.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

enum Outbound {
    Frame {
        message: Box<Message>,
        ack: oneshot::Sender<Result<(), TransportError>>,
    },
    Shutdown,
}

/// Server transport reading frames from an input stream and writing
/// frames to an output stream.
///
/// Use [`StdioServerTransport::new`] for process stdin/stdout, or
/// [`StdioServerTransport::with_streams`] to drive the transport over
/// arbitrary streams in tests.
pub struct StdioServerTransport<R = tokio::io::Stdin, W = tokio::io::Stdout> {
    streams: Mutex<Option<(R, W)>>,
    outbound_tx: mpsc::Sender<Outbound>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Outbound>>>,
    session: OnceLock<Arc<dyn SessionHandle>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closing: AtomicBool,
}

impl StdioServerTransport {
    /// Create a transport over process stdin/stdout.
    ///
    /// Anything the process logs must go to stderr; stdout belongs to the
    /// protocol.
    #[must_use]
    pub fn new() -> Self {
        Self::with_streams(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioServerTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioServerTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a transport over arbitrary streams.
    #[must_use]
    pub fn with_streams(input: R, output: W) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            streams: Mutex::new(Some((input, output))),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            session: OnceLock::new(),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            closing: AtomicBool::new(false),
        }
    }

    /// The session, once `serve` has built it.
    #[must_use]
    pub fn session(&self) -> Option<Arc<dyn SessionHandle>> {
        self.session.get().cloned()
    }

    fn take_streams(&self) -> Option<(R, W)> {
        self.streams.lock().ok().and_then(|mut guard| guard.take())
    }

    fn take_outbound_rx(&self) -> Option<mpsc::Receiver<Outbound>> {
        self.outbound_rx
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
    }

    fn track_task(&self, handle: JoinHandle<()>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(handle);
        }
    }
}

#[async_trait]
impl<R, W> ServerTransport for StdioServerTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn serve(&self, factory: SessionFactory) -> Result<(), TransportError> {
        let (input, output) = self
            .take_streams()
            .ok_or_else(|| TransportError::protocol("stdio transport already serving"))?;
        let outbound_rx = self
            .take_outbound_rx()
            .ok_or_else(|| TransportError::protocol("stdio transport already serving"))?;

        let connection = Arc::new(StdioConnection {
            outbound: self.outbound_tx.clone(),
            open: AtomicBool::new(true),
        });
        let session = factory(connection);
        if self.session.set(Arc::clone(&session)).is_err() {
            return Err(TransportError::protocol("stdio transport already serving"));
        }

        self.track_task(tokio::spawn(run_writer(output, outbound_rx)));
        self.track_task(tokio::spawn(run_reader(
            input,
            session,
            self.shutdown_tx.subscribe(),
        )));

        Ok(())
    }

    async fn broadcast(&self, notification: Notification) {
        let Some(session) = self.session.get() else {
            return;
        };
        if let Err(err) = session.notify(notification).await {
            tracing::warn!(
                session = %session.id(),
                error = %err,
                "broadcast delivery failed, skipping session"
            );
        }
    }

    async fn shutdown(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);

        if let Some(session) = self.session.get() {
            session.close_gracefully().await;
        }

        // The control frame queues behind every already-enqueued frame,
        // so the writer drains in order before stopping.
        let _ = self.outbound_tx.send(Outbound::Shutdown).await;

        let handles = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect::<Vec<_>>(),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                tracing::warn!("transport task did not finish within the shutdown grace period");
            }
        }
    }
}

async fn run_writer<W>(mut output: W, mut outbound: mpsc::Receiver<Outbound>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame { message, ack } => {
                let result = write_frame(&mut output, &message).await;
                if let Err(err) = &result {
                    tracing::error!(error = %err, "failed to write outbound frame");
                }
                let _ = ack.send(result);
            }
            Outbound::Shutdown => break,
        }
    }
    if let Err(err) = output.flush().await {
        tracing::debug!(error = %err, "final flush failed during writer shutdown");
    }
}

async fn write_frame<W>(output: &mut W, message: &Message) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)?;
    let line = escape_line_breaks(&json);
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

/// Replace raw line breaks in an encoded frame with their escapes.
///
/// The JSON encoder already escapes line breaks inside string values;
/// this guards the framing invariant itself, whatever produced the text.
fn escape_line_breaks(json: &str) -> Cow<'_, str> {
    if json.contains('\n') || json.contains('\r') {
        Cow::Owned(json.replace('\r', "\\r").replace('\n', "\\n"))
    } else {
        Cow::Borrowed(json)
    }
}

async fn run_reader<R>(
    input: R,
    session: Arc<dyn SessionHandle>,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::debug!("reader observed closing signal");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let frame = line.trim();
                    if frame.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Message>(frame) {
                        Ok(message) => {
                            // Inbound frames dispatch concurrently; a slow
                            // handler never blocks the next read.
                            let session = Arc::clone(&session);
                            tokio::spawn(async move { session.accept(message).await });
                        }
                        Err(err) => {
                            tracing::error!(
                                session = %session.id(),
                                error = %err,
                                "undecodable inbound frame, tearing session down"
                            );
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("input stream reached EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!(error = %err, "read from input stream failed");
                    break;
                }
            }
        }
    }
    session.close_gracefully().await;
}

struct StdioConnection {
    outbound: mpsc::Sender<Outbound>,
    open: AtomicBool,
}

#[async_trait]
impl Connection for StdioConnection {
    async fn send(&self, message: Message) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        self.outbound
            .send(Outbound::Frame {
                message: Box::new(message),
                ack: ack_tx,
            })
            .await
            .map_err(|_| TransportError::ConnectionClosed)?;
        ack_rx.await.map_err(|_| TransportError::ConnectionClosed)?
    }

    async fn close_gracefully(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
