// ABOUTME: Scenario 4 (spec §8): a query subscription fans its records out across two channels
// ABOUTME: by type, and both channels close (and the dispatch entry disappears) once `done` lands.

mod common;

use std::time::Duration;

use bytes::BytesMut;
use meshrpc::codec::ResponseHeader;
use meshrpc::messages::{QueryRecord, QueryRecordType, QueryRequest};
use meshrpc::{Client, Config};

#[tokio::test]
async fn query_delivers_acks_and_responses_then_closes() {
    let (addr, listener) = common::bind().await;

    let agent = tokio::spawn(async move {
        let mut stream = common::accept(listener).await;
        let mut buffer = BytesMut::new();

        let handshake = common::expect_request_with_body(&mut stream, &mut buffer, "handshake").await;
        common::reply_ok(&mut stream, handshake.seq).await;

        let query = common::expect_request_with_body(&mut stream, &mut buffer, "query").await;
        common::reply_ok(&mut stream, query.seq).await;

        let records = [
            QueryRecord { r#type: QueryRecordType::Ack, from: "a".into(), payload: Vec::new() },
            QueryRecord { r#type: QueryRecordType::Ack, from: "b".into(), payload: Vec::new() },
            QueryRecord { r#type: QueryRecordType::Response, from: "a".into(), payload: b"payload-a".to_vec() },
            QueryRecord { r#type: QueryRecordType::Response, from: "b".into(), payload: b"payload-b".to_vec() },
            QueryRecord { r#type: QueryRecordType::Done, from: String::new(), payload: Vec::new() },
        ];
        for record in &records {
            common::write_value(&mut stream, &ResponseHeader { seq: query.seq, error: String::new() }).await;
            common::write_value(&mut stream, record).await;
        }
        stream
    });

    let config = Config::builder(addr).build().unwrap();
    let client = Client::connect(config).await.unwrap();

    let request = QueryRequest {
        filter_nodes: Vec::new(),
        filter_tags: Default::default(),
        request_ack: true,
        relay_factor: 0,
        timeout: Duration::from_secs(5),
        name: "deploy".into(),
        payload: Vec::new(),
    };
    let (_handle, mut acks, mut responses) = client.query(request, 4, 4).await.unwrap();

    assert_eq!(acks.recv().await.unwrap().from, "a");
    assert_eq!(acks.recv().await.unwrap().from, "b");
    assert!(acks.recv().await.is_none());

    let first = responses.recv().await.unwrap();
    assert_eq!(first.from, "a");
    assert_eq!(first.payload, b"payload-a");
    let second = responses.recv().await.unwrap();
    assert_eq!(second.from, "b");
    assert_eq!(second.payload, b"payload-b");
    assert!(responses.recv().await.is_none());

    client.close().await;
    agent.await.unwrap();
}
