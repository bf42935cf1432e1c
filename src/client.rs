// ABOUTME: The connection multiplexer. Owns the transport, spawns the reader loop, and exposes
// ABOUTME: one-shot calls, subscription openers, and a convenience method per agent command.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::codec::{RequestHeader, ResponseHeader};
use crate::config::Config;
use crate::connection::{self, Reader, Writer};
use crate::dispatch::DispatchTable;
use crate::error::{Error, Result};
use crate::handler::{CallbackHandler, Handler, HandlerSignal, QueryHandler, RecordHandler};
use crate::messages::{
    AuthRequest, EventRecord, EventRequest, ForceLeaveRequest, GetCoordinateRequest, GetCoordinateResponse,
    HandshakeRequest, JoinRequest, JoinResponse, KeyRequest, KeyResponse, Member, MembersFilteredRequest,
    MembersResponse, MonitorRequest, QueryAck, QueryRequest, QueryResponseRecord, RespondRequest, Stats,
    StopRequest, StreamRequest, TagsRequest,
};
use crate::seq::SequenceAllocator;

/// The IPC version this client advertises in its `handshake` request.
const IPC_VERSION: i32 = 1;

/// One-shot terminal signal shared by every task that needs to observe
/// client shutdown: a flag for the already-closed case, a broadcast for
/// everyone currently waiting.
#[derive(Debug)]
struct Shutdown {
    closed: Mutex<bool>,
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    fn new() -> Self {
        let (tx, _rx) = broadcast::channel(1);
        Self { closed: Mutex::new(false), tx }
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }

    /// Mark the client closed and wake every waiter. Returns `false` if it
    /// was already closed (idempotent).
    fn close(&self) -> bool {
        let mut closed = self.closed.lock().unwrap();
        if *closed {
            return false;
        }
        *closed = true;
        let _ = self.tx.send(());
        true
    }

    /// Resolve once the client is (or becomes) closed. Subscribing before
    /// the closed-check ensures a concurrent `close()` can't land between
    /// the two and get missed.
    async fn wait_closed(&self) {
        let mut rx = self.tx.subscribe();
        if self.is_closed() {
            return;
        }
        let _ = rx.recv().await;
    }
}

/// An async client for a cluster-membership agent's persistent RPC
/// channel. See the crate root for the protocol this multiplexes.
#[derive(Debug)]
pub struct Client {
    config: Config,
    dispatch: Arc<DispatchTable>,
    seq: Arc<SequenceAllocator>,
    writer: Arc<tokio::sync::Mutex<Writer>>,
    shutdown: Arc<Shutdown>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Dial `config.addr`, perform the handshake (and auth, if configured),
    /// and return a client ready for use. Any failure after the dial
    /// succeeds closes the transport and stops the reader loop before
    /// returning the error.
    pub async fn connect(config: Config) -> Result<Self> {
        let dial = TcpStream::connect(&config.addr);
        let stream = tokio::time::timeout(config.timeout, dial)
            .await
            .map_err(|_| Error::Transport(io::Error::new(io::ErrorKind::TimedOut, "connect deadline exceeded")))??;

        let (reader, writer) = connection::split(stream);
        let dispatch = Arc::new(DispatchTable::new());
        let shutdown = Arc::new(Shutdown::new());
        let writer = Arc::new(tokio::sync::Mutex::new(writer));
        let seq = Arc::new(SequenceAllocator::new());

        let reader_task = tokio::spawn(run_reader_loop(
            reader,
            Arc::clone(&dispatch),
            Arc::clone(&shutdown),
            Arc::clone(&writer),
        ));

        let client = Client {
            config,
            dispatch,
            seq,
            writer,
            shutdown,
            reader_task: Mutex::new(Some(reader_task)),
        };

        if let Err(err) = client.handshake().await {
            client.close().await;
            return Err(err);
        }

        if let Some(auth_key) = client.config.auth_key.clone() {
            if let Err(err) = client.auth(&auth_key).await {
                client.close().await;
                return Err(err);
            }
        }

        Ok(client)
    }

    /// Idempotent shutdown: marks the client closed, aborts the reader
    /// loop (even if it is blocked on a read that will never arrive),
    /// drains the dispatch table, and closes the transport. Safe to call
    /// from any task, any number of times.
    pub async fn close(&self) {
        if !self.shutdown.close() {
            return;
        }

        if let Some(task) = self.reader_task.lock().unwrap().take() {
            task.abort();
            let _ = task.await;
        }

        teardown(&self.dispatch, &self.writer).await;
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }

    async fn send<H, B>(&self, header: &H, body: Option<&B>) -> Result<()>
    where
        H: Serialize,
        B: Serialize,
    {
        let mut writer = self.writer.lock().await;
        if self.shutdown.is_closed() {
            return Err(Error::ClientClosed);
        }
        writer.write_framed(header, body, self.config.timeout).await
    }

    /// One-shot call primitive. `expects_response` controls whether the
    /// handler attempts to decode a body following a successful reply.
    async fn call_raw<Req>(&self, command: &str, body: Option<&Req>, expects_response: bool) -> Result<Option<rmpv::Value>>
    where
        Req: Serialize,
    {
        let seq = self.seq.next();
        let header = RequestHeader { command: command.to_string(), seq };
        let (tx, rx) = oneshot::channel();
        let handler = Arc::new(Handler::Callback(CallbackHandler::new(expects_response, tx)));
        self.dispatch.register(seq, handler);

        if let Err(err) = self.send(&header, body).await {
            self.dispatch.deregister(seq);
            return Err(err);
        }

        let outcome: Result<Option<rmpv::Value>> = tokio::select! {
            received = rx => match received {
                Ok(inner) => inner,
                Err(_) => Err(Error::ClientClosed),
            },
            _ = self.shutdown.wait_closed() => Err(Error::ClientClosed),
        };

        self.dispatch.deregister(seq);
        outcome
    }

    async fn call_unit<Req: Serialize>(&self, command: &str, body: Option<&Req>) -> Result<()> {
        self.call_raw(command, body, false).await?;
        Ok(())
    }

    async fn call_typed<Req, Resp>(&self, command: &str, body: Option<&Req>) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let value = self
            .call_raw(command, body, true)
            .await?
            .ok_or_else(|| Error::Protocol(format!("{command}: agent did not send a response body")))?;
        rmpv::ext::from_value(value).map_err(|err| Error::Protocol(err.to_string()))
    }

    /// Shared skeleton of the three subscription openers: register, send,
    /// wait for the first of init, shutdown, or timeout.
    async fn open_subscription<Req>(
        &self,
        command: &str,
        body: Option<&Req>,
        timeout: Duration,
        make_handler: impl FnOnce(oneshot::Sender<Result<()>>) -> Handler,
    ) -> Result<u64>
    where
        Req: Serialize,
    {
        let seq = self.seq.next();
        let header = RequestHeader { command: command.to_string(), seq };
        let (init_tx, init_rx) = oneshot::channel();
        let handler = Arc::new(make_handler(init_tx));
        self.dispatch.register(seq, handler);

        if let Err(err) = self.send(&header, body).await {
            self.dispatch.deregister(seq);
            return Err(err);
        }

        let init_result: Result<()> = tokio::select! {
            received = init_rx => match received {
                Ok(inner) => inner,
                Err(_) => Err(Error::StreamClosed),
            },
            _ = self.shutdown.wait_closed() => Err(Error::ClientClosed),
            _ = tokio::time::sleep(timeout) => Err(Error::RequestTimeout),
        };

        match init_result {
            Ok(()) => Ok(seq),
            Err(err) => {
                self.dispatch.deregister(seq);
                Err(err)
            }
        }
    }

    async fn handshake(&self) -> Result<()> {
        let body = HandshakeRequest { version: IPC_VERSION };
        self.call_unit("handshake", Some(&body)).await
    }

    async fn auth(&self, auth_key: &str) -> Result<()> {
        let body = AuthRequest { auth_key: auth_key.to_string() };
        self.call_unit("auth", Some(&body)).await
    }

    pub async fn join(&self, existing: Vec<String>, replay: bool) -> Result<i32> {
        let body = JoinRequest { existing, replay };
        let response: JoinResponse = self.call_typed("join", Some(&body)).await?;
        Ok(response.num)
    }

    pub async fn members(&self) -> Result<Vec<Member>> {
        let response: MembersResponse = self.call_typed::<(), _>("members", None).await?;
        Ok(response.members)
    }

    pub async fn members_filtered(&self, filter: MembersFilteredRequest) -> Result<Vec<Member>> {
        let response: MembersResponse = self.call_typed("members-filtered", Some(&filter)).await?;
        Ok(response.members)
    }

    pub async fn leave(&self) -> Result<()> {
        self.call_unit::<()>("leave", None).await
    }

    pub async fn force_leave(&self, node: impl Into<String>, prune: bool) -> Result<()> {
        let body = ForceLeaveRequest { node: node.into(), prune };
        self.call_unit("force-leave", Some(&body)).await
    }

    pub async fn event(&self, name: impl Into<String>, payload: Vec<u8>, coalesce: bool) -> Result<()> {
        let body = EventRequest { name: name.into(), payload, coalesce };
        self.call_unit("event", Some(&body)).await
    }

    pub async fn tags(&self, tags: HashMap<String, String>, delete_tags: Vec<String>) -> Result<()> {
        let body = TagsRequest { tags, delete_tags };
        self.call_unit("tags", Some(&body)).await
    }

    pub async fn install_key(&self, key: impl Into<String>) -> Result<KeyResponse> {
        let body = KeyRequest { key: key.into() };
        self.call_typed("install-key", Some(&body)).await
    }

    pub async fn use_key(&self, key: impl Into<String>) -> Result<KeyResponse> {
        let body = KeyRequest { key: key.into() };
        self.call_typed("use-key", Some(&body)).await
    }

    pub async fn remove_key(&self, key: impl Into<String>) -> Result<KeyResponse> {
        let body = KeyRequest { key: key.into() };
        self.call_typed("remove-key", Some(&body)).await
    }

    pub async fn list_keys(&self) -> Result<KeyResponse> {
        self.call_typed::<(), _>("list-keys", None).await
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.call_typed::<(), _>("stats", None).await
    }

    pub async fn get_coordinate(&self, node: impl Into<String>) -> Result<GetCoordinateResponse> {
        let body = GetCoordinateRequest { node: node.into() };
        self.call_typed("get-coordinate", Some(&body)).await
    }

    pub async fn respond(&self, id: u64, payload: Vec<u8>) -> Result<()> {
        let body = RespondRequest { id, payload };
        self.call_unit("respond", Some(&body)).await
    }

    /// Subscribe to log lines at `log_level` or coarser. Records are
    /// delivered on a channel of the given `buffer` capacity; a full
    /// channel drops records rather than stalling the reader loop.
    pub async fn monitor(&self, log_level: impl Into<String>, buffer: usize) -> Result<(u64, mpsc::Receiver<String>)> {
        let (tx, rx) = mpsc::channel(buffer);
        let body = MonitorRequest { log_level: log_level.into() };
        let seq = self
            .open_subscription("monitor", Some(&body), self.config.timeout, |init_tx| {
                Handler::Monitor(RecordHandler::new(init_tx, tx))
            })
            .await?;
        Ok((seq, rx))
    }

    /// Subscribe to cluster event records of `event_type` (`"*"` for all).
    pub async fn stream(&self, event_type: impl Into<String>, buffer: usize) -> Result<(u64, mpsc::Receiver<EventRecord>)> {
        let (tx, rx) = mpsc::channel(buffer);
        let body = StreamRequest { event_type: event_type.into() };
        let seq = self
            .open_subscription("stream", Some(&body), self.config.timeout, |init_tx| {
                Handler::Stream(RecordHandler::new(init_tx, tx))
            })
            .await?;
        Ok((seq, rx))
    }

    /// Run a distributed query. `request.timeout` bounds subscription init
    /// together with (whichever is lower) the client's configured timeout;
    /// it does not bound delivery of ack/response records after init.
    pub async fn query(
        &self,
        request: QueryRequest,
        ack_buffer: usize,
        response_buffer: usize,
    ) -> Result<(u64, mpsc::Receiver<QueryAck>, mpsc::Receiver<QueryResponseRecord>)> {
        let (ack_tx, ack_rx) = mpsc::channel(ack_buffer);
        let (response_tx, response_rx) = mpsc::channel(response_buffer);
        let timeout = self.config.timeout.min(request.timeout);
        let seq = self
            .open_subscription("query", Some(&request), timeout, |init_tx| {
                Handler::Query(QueryHandler::new(init_tx, ack_tx, response_tx))
            })
            .await?;
        Ok((seq, ack_rx, response_rx))
    }

    /// Cancel a subscription. Deregisters locally first so any record
    /// already in flight between the decoder and the handler is dropped,
    /// then asks the agent to release its side. A failure on the RPC does
    /// not revive the now-closed local subscription.
    pub async fn stop(&self, handle: u64) -> Result<()> {
        self.dispatch.deregister(handle);
        let body = StopRequest { stop: handle };
        self.call_unit("stop", Some(&body)).await
    }
}

/// Shared half of teardown: drain the dispatch table and close the
/// transport. Run exactly once, by whichever of `Client::close` or the
/// reader loop's own exit first flips the shutdown flag.
async fn teardown(dispatch: &DispatchTable, writer: &tokio::sync::Mutex<Writer>) {
    dispatch.drain();
    let mut writer = writer.lock().await;
    let _ = writer.shutdown().await;
}

/// Single long-lived consumer of the inbound stream: decode one response
/// header, dispatch it to the sequence's handler, repeat until the
/// transport fails or the header turns out to belong to nobody.
async fn run_reader_loop(mut reader: Reader, dispatch: Arc<DispatchTable>, shutdown: Arc<Shutdown>, writer: Arc<tokio::sync::Mutex<Writer>>) {
    loop {
        let header: ResponseHeader = match reader.read_value().await {
            Ok(header) => header,
            Err(err) => {
                if !shutdown.is_closed() {
                    tracing::error!(error = %err, "reader loop terminated, closing client");
                }
                break;
            }
        };

        let seq = header.seq;
        let Some(handler) = dispatch.lookup(seq) else {
            tracing::debug!(seq, "no handler registered for sequence, discarding frame");
            continue;
        };

        match handler.on_response(header, &mut reader).await {
            Ok(HandlerSignal::Continue) => {}
            Ok(HandlerSignal::Deregister) => dispatch.deregister(seq),
            Err(err) => {
                tracing::error!(seq, error = %err, "failed to decode frame body, deregistering");
                dispatch.deregister(seq);
            }
        }
    }

    // Reached only by the loop's own exit, never by `Client::close`
    // aborting this task, so there is no JoinHandle to reconcile here.
    if shutdown.close() {
        teardown(&dispatch, &writer).await;
    }
}
