// ── Protocol client ──
//
// One TCP connection to one appliance. Commands go out through `send`;
// everything the appliance says comes back on a single `ResponseStream`.
//
// Lifecycle: Connecting → Connected → Closed | Failed. A client never
// reconnects; build a new one instead.
//
// Pre-connect policy: fail fast. `send` outside `Connected` returns
// `CoreError::NotConnected` and writes nothing. Nothing is queued.

use std::sync::{Arc, OnceLock, PoisonError};

use futures_util::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use tivoctl_api::{CommandRequest, ResponseCodec, ResponseEvent};

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::stream::ResponseStream;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Closed by the caller or by the appliance.
    Closed,
    /// A transport error ended the connection.
    Failed,
}

impl ConnectionState {
    /// `Closed` and `Failed` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

// ── ClientEvent ──────────────────────────────────────────────────

/// An item on a client's response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A line from the appliance, in arrival order.
    Response(ResponseEvent),
    /// The transport failed. Emitted at most once, always last.
    ConnectionError { reason: String },
}

// ── ProtocolClient ───────────────────────────────────────────────

/// Client for the appliance's TCP remote protocol.
///
/// [`connect`](Self::connect) returns at once with the client in
/// [`Connecting`](ConnectionState::Connecting); the TCP handshake and the
/// read loop run on a spawned task. Use [`wait_connected`](Self::wait_connected)
/// or [`subscribe_state`](Self::subscribe_state) to follow progress.
///
/// Failures are never retried. A transport error moves the client to
/// [`Failed`](ConnectionState::Failed), puts one
/// [`ClientEvent::ConnectionError`] on the response stream and ends it.
/// This holds wherever the error is noticed: connecting, reading, or
/// writing from [`send`](Self::send), which also returns it.
pub struct ProtocolClient {
    shared: Arc<Shared>,
    responses: Option<ResponseStream>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    address: String,
    state: watch::Sender<ConnectionState>,
    writer: Mutex<Option<BoxedWriter>>,
    failure: OnceLock<String>,
    cancel: CancellationToken,
    /// Sending half of the response stream. Taken once the stream ends.
    events: std::sync::Mutex<Option<mpsc::UnboundedSender<ClientEvent>>>,
}

impl Shared {
    fn new(
        address: String,
        state: ConnectionState,
        writer: Option<BoxedWriter>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        let (state, _) = watch::channel(state);
        Self {
            address,
            state,
            writer: Mutex::new(writer),
            failure: OnceLock::new(),
            cancel: CancellationToken::new(),
            events: std::sync::Mutex::new(Some(events)),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Move to `Failed` unless already terminal. Returns `true` if this
    /// call made the transition.
    fn fail(&self, reason: &str) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = ConnectionState::Failed;
                true
            }
        });
        if changed {
            let _ = self.failure.set(reason.to_owned());
            warn!(address = %self.address, reason, "connection failed");
            self.cancel.cancel();

            // The error and the end of the stream go out under one lock so
            // no response can follow it.
            let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(tx) = events.take() {
                let _ = tx.send(ClientEvent::ConnectionError {
                    reason: reason.to_owned(),
                });
            }
        }
        changed
    }

    /// Push an event onto the response stream, if it is still open.
    fn emit(&self, event: ClientEvent) {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        match events.as_ref() {
            Some(tx) if tx.send(event).is_ok() => {}
            _ => trace!("response stream dropped"),
        }
    }

    /// End the response stream.
    fn close_events(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Move to `Closed` unless already terminal.
    fn finish(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        })
    }

    /// Install the writer and go `Connecting → Connected`. Returns `false`
    /// (and drops the writer) if the client was closed in the meantime.
    async fn attach(&self, writer: BoxedWriter) -> bool {
        let mut slot = self.writer.lock().await;
        *slot = Some(writer);
        let connected = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Connected;
                true
            } else {
                false
            }
        });
        if !connected {
            *slot = None;
        }
        connected
    }

    async fn release_writer(&self) {
        self.writer.lock().await.take();
    }
}

impl ProtocolClient {
    /// Start connecting to `address` on the configured port.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(address: impl Into<String>, config: ClientConfig) -> Result<Self, CoreError> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(CoreError::Config {
                message: "appliance address is empty".into(),
            });
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(
            address,
            ConnectionState::Connecting,
            None,
            events_tx,
        ));

        let task = tokio::spawn(connect_task(Arc::clone(&shared), config));

        Ok(Self {
            shared,
            responses: Some(ResponseStream::new(events_rx)),
            task: Some(task),
        })
    }

    /// Wrap an already-established transport. The client starts out
    /// `Connected`.
    pub fn from_io<R, W>(address: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(
            address.into(),
            ConnectionState::Connected,
            Some(Box::new(writer)),
            events_tx,
        ));

        let task_shared = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            read_loop(&task_shared, reader).await;
        });

        Self {
            shared,
            responses: Some(ResponseStream::new(events_rx)),
            task: Some(task),
        }
    }

    /// The address this client talks to.
    pub fn address(&self) -> &str {
        &self.shared.address
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Wait until the connection attempt has finished.
    ///
    /// Resolves `Ok` once `Connected`. A failed attempt yields
    /// `ConnectionFailed` carrying the transport's reason.
    pub async fn wait_connected(&self) -> Result<(), CoreError> {
        let mut rx = self.shared.state.subscribe();
        let state = *rx
            .wait_for(|state| *state != ConnectionState::Connecting)
            .await
            .map_err(|_| CoreError::Internal("connection state channel closed".into()))?;

        match state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Failed => Err(CoreError::ConnectionFailed {
                address: self.shared.address.clone(),
                reason: self
                    .shared
                    .failure
                    .get()
                    .cloned()
                    .unwrap_or_else(|| "connection failed".into()),
            }),
            state => Err(CoreError::NotConnected { state }),
        }
    }

    /// Take the response stream. There is exactly one per client; later
    /// calls return `None`.
    pub fn responses(&mut self) -> Option<ResponseStream> {
        self.responses.take()
    }

    /// Encode `request` and write it with a single write call.
    ///
    /// Any write failure is fatal: the client moves to `Failed`, drops its
    /// writer, emits one [`ClientEvent::ConnectionError`] and returns the
    /// error. A short write returns [`CoreError::PartialWrite`] and is not
    /// retried, the appliance's view of the framing is now unknown.
    pub async fn send(&self, request: &CommandRequest) -> Result<(), CoreError> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(CoreError::NotConnected { state });
        }

        let wire = request.to_wire();
        let mut slot = self.shared.writer.lock().await;
        let Some(writer) = slot.as_mut() else {
            return Err(CoreError::NotConnected {
                state: self.state(),
            });
        };

        let result = match writer.write(&wire).await {
            Ok(written) if written == wire.len() => writer.flush().await.map_err(|e| {
                CoreError::ConnectionFailed {
                    address: self.shared.address.clone(),
                    reason: e.to_string(),
                }
            }),
            Ok(written) => Err(CoreError::PartialWrite {
                command: request.encode(),
                written,
                expected: wire.len(),
            }),
            Err(e) => Err(CoreError::ConnectionFailed {
                address: self.shared.address.clone(),
                reason: e.to_string(),
            }),
        };

        match result {
            Ok(()) => {
                debug!(address = %self.shared.address, command = %request, "sent command");
                Ok(())
            }
            Err(err) => {
                *slot = None;
                self.shared.fail(&err.to_string());
                Err(err)
            }
        }
    }

    /// Close the connection and wait for the read loop to stop.
    ///
    /// No events are emitted after this returns.
    pub async fn close(&mut self) {
        self.shared.cancel.cancel();
        self.shared.finish();
        self.shared.close_events();

        let writer = self.shared.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "socket shutdown failed (non-fatal)");
            }
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!(address = %self.shared.address, "connection closed");
    }
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn connect_task(shared: Arc<Shared>, config: ClientConfig) {
    let result = tokio::select! {
        biased;
        () = shared.cancel.cancelled() => None,
        result = config.transport.connect(&shared.address) => Some(result),
    };

    match result {
        Some(Ok(stream)) => {
            let (reader, writer) = stream.into_split();
            if shared.attach(Box::new(writer)).await {
                info!(address = %shared.address, "connected");
                read_loop(&shared, reader).await;
            } else {
                debug!(address = %shared.address, "closed before connection completed");
            }
        }
        Some(Err(e)) => {
            shared.fail(&CoreError::from(e).to_string());
        }
        None => {}
    }
    shared.close_events();
}

/// Decode lines until EOF, a transport error or cancellation.
async fn read_loop<R>(shared: &Shared, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, ResponseCodec::new());

    loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            frame = frames.next() => match frame {
                Some(Ok(event)) => {
                    trace!(address = %shared.address, %event, "response");
                    shared.emit(ClientEvent::Response(event));
                }
                Some(Err(e)) => {
                    shared.fail(&e.to_string());
                    break;
                }
                None => {
                    if shared.finish() {
                        info!(address = %shared.address, "appliance closed the connection");
                    }
                    break;
                }
            }
        }
    }

    shared.release_writer().await;
    shared.close_events();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ConnectionState::Connecting.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Failed.is_terminal());
    }

    #[test]
    fn state_displays_lowercase() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Failed.to_string(), "failed");
    }

    fn shared() -> (Shared, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Shared::new("10.0.0.1".into(), ConnectionState::Connected, None, tx);
        (shared, rx)
    }

    #[test]
    fn failure_is_recorded_once() {
        let (shared, _rx) = shared();
        assert!(shared.fail("reset"));
        assert!(!shared.fail("again"));
        assert_eq!(shared.state(), ConnectionState::Failed);
        assert_eq!(shared.failure.get().unwrap(), "reset");
        assert!(shared.cancel.is_cancelled());
    }

    #[test]
    fn failure_ends_stream_with_one_error() {
        let (shared, mut rx) = shared();
        shared.emit(ClientEvent::Response(ResponseEvent::ChannelChanged {
            channel: "0042".into(),
            source: "LOCAL".into(),
        }));
        shared.fail("reset");
        shared.fail("again");
        shared.emit(ClientEvent::Response(ResponseEvent::Acknowledged {
            kind: "LIVETV_READY".into(),
        }));

        assert!(matches!(rx.try_recv().unwrap(), ClientEvent::Response(_)));
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::ConnectionError {
                reason: "reset".into()
            }
        );
        assert_eq!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        );
    }

    #[test]
    fn finish_does_not_override_failure() {
        let (shared, _rx) = shared();
        shared.fail("reset");
        assert!(!shared.finish());
        assert_eq!(shared.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn empty_address_is_rejected() {
        let err = ProtocolClient::connect("", ClientConfig::default()).err().unwrap();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[tokio::test]
    async fn response_stream_is_handed_out_once() {
        let (ours, _theirs) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(ours);
        let mut client = ProtocolClient::from_io("test", reader, writer);

        assert!(client.responses().is_some());
        assert!(client.responses().is_none());
    }
}
