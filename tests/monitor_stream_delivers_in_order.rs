// ABOUTME: Scenario 3 (spec §8): a monitor subscription's init reply unblocks the opener, then
// ABOUTME: log lines arrive in order on the channel, and `stop` deregisters locally plus over the wire.

mod common;

use bytes::BytesMut;
use meshrpc::{Client, Config};

#[tokio::test]
async fn monitor_delivers_log_lines_in_order_then_stops() {
    let (addr, listener) = common::bind().await;

    let agent = tokio::spawn(async move {
        let mut stream = common::accept(listener).await;
        let mut buffer = BytesMut::new();

        let handshake = common::expect_request_with_body(&mut stream, &mut buffer, "handshake").await;
        common::reply_ok(&mut stream, handshake.seq).await;

        let monitor = common::expect_request_with_body(&mut stream, &mut buffer, "monitor").await;
        common::reply_ok(&mut stream, monitor.seq).await;
        for line in ["line-1", "line-2", "line-3"] {
            common::write_value(&mut stream, &meshrpc::codec::ResponseHeader { seq: monitor.seq, error: String::new() }).await;
            common::write_value(&mut stream, &line.to_string()).await;
        }

        let stop = common::expect_request_with_body(&mut stream, &mut buffer, "stop").await;
        common::reply_ok(&mut stream, stop.seq).await;
        stream
    });

    let config = Config::builder(addr).build().unwrap();
    let client = Client::connect(config).await.unwrap();

    let (handle, mut lines) = client.monitor("INFO", 8).await.unwrap();
    assert_eq!(lines.recv().await.unwrap(), "line-1");
    assert_eq!(lines.recv().await.unwrap(), "line-2");
    assert_eq!(lines.recv().await.unwrap(), "line-3");

    client.stop(handle).await.unwrap();

    client.close().await;
    agent.await.unwrap();
}
