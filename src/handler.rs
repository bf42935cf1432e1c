// ABOUTME: The four handler variants the dispatch table stores one of per sequence. Each owns
// ABOUTME: its own init-waiter and delivery channels; only the reader loop ever calls into these.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};

use crate::codec::ResponseHeader;
use crate::connection::Reader;
use crate::error::{Error, Result};
use crate::messages::{EventRecord, QueryAck, QueryRecord, QueryRecordType, QueryResponseRecord};

/// What the reader loop should do with this sequence after `on_response`
/// returns. Deregistration itself always happens on the reader loop, never
/// inside a handler, so a handler never has to call back into the
/// dispatch table while holding its own lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerSignal {
    Continue,
    Deregister,
}

/// Sum type over the four handler variants sharing the `on_response` /
/// `on_cleanup` contract. A concrete enum avoids the ceremony of boxed
/// async trait objects for what is, in practice, a closed set of four
/// shapes.
pub enum Handler {
    Callback(CallbackHandler),
    Monitor(RecordHandler<String>),
    Stream(RecordHandler<EventRecord>),
    Query(QueryHandler),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Handler::Callback(_) => "Callback",
            Handler::Monitor(_) => "Monitor",
            Handler::Stream(_) => "Stream",
            Handler::Query(_) => "Query",
        };
        f.debug_tuple(name).finish()
    }
}

impl Handler {
    pub async fn on_response(&self, header: ResponseHeader, reader: &mut Reader) -> Result<HandlerSignal> {
        match self {
            Handler::Callback(h) => h.on_response(header, reader).await,
            Handler::Monitor(h) => h.on_response(header, reader).await,
            Handler::Stream(h) => h.on_response(header, reader).await,
            Handler::Query(h) => h.on_response(header, reader).await,
        }
    }

    pub fn on_cleanup(&self) {
        match self {
            Handler::Callback(h) => h.on_cleanup(),
            Handler::Monitor(h) => h.on_cleanup(),
            Handler::Stream(h) => h.on_cleanup(),
            Handler::Query(h) => h.on_cleanup(),
        }
    }
}

/// Classifies a response header for the paths that never read a body
/// either way (subscription init replies): success or a generic agent
/// error, with no distinction drawn for the auth sentinel since no body
/// follows a subscription's init reply regardless of which it is.
fn header_result(header: &ResponseHeader) -> Result<()> {
    if !header.is_ok() {
        Err(Error::Agent(header.error.clone()))
    } else {
        Ok(())
    }
}

/// One-shot request/reply handler. Its single invocation — whichever of
/// "response arrived" or "cleaned up without one" happens first —
/// completes the caller's result channel exactly once.
pub struct CallbackHandler {
    expects_body: bool,
    init_sent: AtomicBool,
    result_tx: Mutex<Option<oneshot::Sender<Result<Option<rmpv::Value>>>>>,
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("expects_body", &self.expects_body)
            .field("init_sent", &self.init_sent.load(Ordering::Relaxed))
            .finish()
    }
}

impl CallbackHandler {
    pub fn new(expects_body: bool, result_tx: oneshot::Sender<Result<Option<rmpv::Value>>>) -> Self {
        Self {
            expects_body,
            init_sent: AtomicBool::new(false),
            result_tx: Mutex::new(Some(result_tx)),
        }
    }

    async fn on_response(&self, header: ResponseHeader, reader: &mut Reader) -> Result<HandlerSignal> {
        // The auth-required sentinel is the only error that suppresses body
        // decoding: the agent sends no body alongside it. Any other error
        // still carries a body when a response target was requested, and
        // that body must still be read off the wire to keep framing in
        // sync, even though the call as a whole resolves to the error.
        let result = if header.is_auth_required() {
            Err(Error::Agent(header.error.clone()))
        } else if self.expects_body {
            match reader.read_value::<rmpv::Value>().await {
                Ok(value) if header.is_ok() => Ok(Some(value)),
                Ok(_) => Err(Error::Agent(header.error.clone())),
                Err(err) => Err(err),
            }
        } else if header.is_ok() {
            Ok(None)
        } else {
            Err(Error::Agent(header.error.clone()))
        };
        self.complete(result);
        Ok(HandlerSignal::Deregister)
    }

    fn complete(&self, result: Result<Option<rmpv::Value>>) {
        if self.init_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.result_tx.lock().unwrap().take() {
            let _ = tx.send(result);
        }
    }

    fn on_cleanup(&self) {
        self.complete(Err(Error::ClientClosed));
    }
}

struct RecordInner<T> {
    closed: bool,
    tx: Option<mpsc::Sender<T>>,
}

/// Shared shape of the monitor (`T = String`) and stream (`T =
/// EventRecord`) subscriptions: an initial reply, then an unbounded series
/// of same-shaped records delivered to a bounded consumer channel.
pub struct RecordHandler<T> {
    init_sent: AtomicBool,
    init_tx: Mutex<Option<oneshot::Sender<Result<()>>>>,
    inner: Mutex<RecordInner<T>>,
}

impl<T> std::fmt::Debug for RecordHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordHandler")
            .field("init_sent", &self.init_sent.load(Ordering::Relaxed))
            .field("closed", &self.inner.lock().unwrap().closed)
            .finish()
    }
}

impl<T: DeserializeOwned + Send + 'static> RecordHandler<T> {
    pub fn new(init_tx: oneshot::Sender<Result<()>>, tx: mpsc::Sender<T>) -> Self {
        Self {
            init_sent: AtomicBool::new(false),
            init_tx: Mutex::new(Some(init_tx)),
            inner: Mutex::new(RecordInner { closed: false, tx: Some(tx) }),
        }
    }

    async fn on_response(&self, header: ResponseHeader, reader: &mut Reader) -> Result<HandlerSignal> {
        if !self.init_sent.swap(true, Ordering::SeqCst) {
            let result = header_result(&header);
            let failed = result.is_err();
            if let Some(tx) = self.init_tx.lock().unwrap().take() {
                let _ = tx.send(result);
            }
            return Ok(if failed { HandlerSignal::Deregister } else { HandlerSignal::Continue });
        }

        let record: T = reader.read_value().await?;
        let inner = self.inner.lock().unwrap();
        if !inner.closed {
            if let Some(tx) = &inner.tx {
                if tx.try_send(record).is_err() {
                    tracing::warn!("dropping subscription record: consumer channel full or closed");
                }
            }
        }
        Ok(HandlerSignal::Continue)
    }

    fn on_cleanup(&self) {
        if !self.init_sent.swap(true, Ordering::SeqCst) {
            if let Some(tx) = self.init_tx.lock().unwrap().take() {
                let _ = tx.send(Err(Error::StreamClosed));
            }
        }
        let mut inner = self.inner.lock().unwrap();
        if !inner.closed {
            inner.closed = true;
            inner.tx = None;
        }
    }
}

struct QueryInner {
    closed: bool,
    ack_tx: Option<mpsc::Sender<QueryAck>>,
    response_tx: Option<mpsc::Sender<QueryResponseRecord>>,
}

/// Distributed-query subscription: an initial reply, then a mix of `ack`
/// and `response` records terminated by a `done` marker.
pub struct QueryHandler {
    init_sent: AtomicBool,
    init_tx: Mutex<Option<oneshot::Sender<Result<()>>>>,
    inner: Mutex<QueryInner>,
}

impl std::fmt::Debug for QueryHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHandler")
            .field("init_sent", &self.init_sent.load(Ordering::Relaxed))
            .field("closed", &self.inner.lock().unwrap().closed)
            .finish()
    }
}

impl QueryHandler {
    pub fn new(
        init_tx: oneshot::Sender<Result<()>>,
        ack_tx: mpsc::Sender<QueryAck>,
        response_tx: mpsc::Sender<QueryResponseRecord>,
    ) -> Self {
        Self {
            init_sent: AtomicBool::new(false),
            init_tx: Mutex::new(Some(init_tx)),
            inner: Mutex::new(QueryInner {
                closed: false,
                ack_tx: Some(ack_tx),
                response_tx: Some(response_tx),
            }),
        }
    }

    async fn on_response(&self, header: ResponseHeader, reader: &mut Reader) -> Result<HandlerSignal> {
        if !self.init_sent.swap(true, Ordering::SeqCst) {
            let result = header_result(&header);
            let failed = result.is_err();
            if let Some(tx) = self.init_tx.lock().unwrap().take() {
                let _ = tx.send(result);
            }
            return Ok(if failed { HandlerSignal::Deregister } else { HandlerSignal::Continue });
        }

        let record: QueryRecord = reader.read_value().await?;
        match record.r#type {
            QueryRecordType::Ack => {
                let inner = self.inner.lock().unwrap();
                if !inner.closed {
                    if let Some(tx) = &inner.ack_tx {
                        if tx.try_send(QueryAck { from: record.from }).is_err() {
                            tracing::warn!("dropping query ack: consumer channel full or closed");
                        }
                    }
                }
                Ok(HandlerSignal::Continue)
            }
            QueryRecordType::Response => {
                let inner = self.inner.lock().unwrap();
                if !inner.closed {
                    if let Some(tx) = &inner.response_tx {
                        let response = QueryResponseRecord { from: record.from, payload: record.payload };
                        if tx.try_send(response).is_err() {
                            tracing::warn!("dropping query response: consumer channel full or closed");
                        }
                    }
                }
                Ok(HandlerSignal::Continue)
            }
            // The handler lock from the arms above is already released by
            // the time we get here; `done` never has to drop a lock before
            // signaling deregistration to the reader loop.
            QueryRecordType::Done => Ok(HandlerSignal::Deregister),
        }
    }

    fn on_cleanup(&self) {
        if !self.init_sent.swap(true, Ordering::SeqCst) {
            if let Some(tx) = self.init_tx.lock().unwrap().take() {
                let _ = tx.send(Err(Error::StreamClosed));
            }
        }
        let mut inner = self.inner.lock().unwrap();
        if !inner.closed {
            inner.closed = true;
            inner.ack_tx = None;
            inner.response_tx = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ResponseHeader;

    fn ok_header(seq: u64) -> ResponseHeader {
        ResponseHeader { seq, error: String::new() }
    }

    fn err_header(seq: u64, error: &str) -> ResponseHeader {
        ResponseHeader { seq, error: error.to_string() }
    }

    #[test]
    fn callback_cleanup_without_response_signals_client_closed() {
        let (tx, rx) = oneshot::channel();
        let handler = CallbackHandler::new(false, tx);
        handler.on_cleanup();
        let result = rx.blocking_recv().unwrap();
        assert!(matches!(result, Err(Error::ClientClosed)));
    }

    #[test]
    fn callback_cleanup_after_completion_is_a_no_op() {
        let (tx, rx) = oneshot::channel();
        let handler = CallbackHandler::new(false, tx);
        handler.complete(Ok(None));
        handler.on_cleanup();
        let result = rx.blocking_recv().unwrap();
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn record_handler_init_failure_signals_deregister() {
        let (init_tx, init_rx) = oneshot::channel();
        let (tx, _rx) = mpsc::channel::<String>(1);
        let handler = RecordHandler::new(init_tx, tx);
        let mut reader = crate::connection::test_support::empty_reader().await;
        let signal = handler
            .on_response(err_header(1, "boom"), &mut reader)
            .await
            .unwrap();
        assert_eq!(signal, HandlerSignal::Deregister);
        assert!(init_rx.await.unwrap().is_err());
    }

    #[test]
    fn record_handler_cleanup_before_init_signals_stream_closed() {
        let (init_tx, init_rx) = oneshot::channel();
        let (tx, mut rx) = mpsc::channel::<String>(1);
        let handler = RecordHandler::new(init_tx, tx);
        handler.on_cleanup();
        assert!(matches!(init_rx.blocking_recv().unwrap(), Err(Error::StreamClosed)));
        assert!(rx.blocking_recv().is_none());
    }

    #[tokio::test]
    async fn query_done_returns_deregister_without_touching_init() {
        let (init_tx, init_rx) = oneshot::channel();
        let (ack_tx, _ack_rx) = mpsc::channel(1);
        let (resp_tx, _resp_rx) = mpsc::channel(1);
        let handler = QueryHandler::new(init_tx, ack_tx, resp_tx);

        let mut reader = crate::connection::test_support::empty_reader().await;
        let signal = handler.on_response(ok_header(9), &mut reader).await.unwrap();
        assert_eq!(signal, HandlerSignal::Continue);
        assert!(init_rx.await.unwrap().is_ok());

        let done = QueryRecord { r#type: QueryRecordType::Done, from: String::new(), payload: Vec::new() };
        let mut reader = crate::connection::test_support::reader_with_value(&done).await;
        let signal = handler.on_response(ok_header(9), &mut reader).await.unwrap();
        assert_eq!(signal, HandlerSignal::Deregister);
    }
}
