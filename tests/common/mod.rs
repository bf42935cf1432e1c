// ABOUTME: Shared mock-agent plumbing for the scenario tests below: a loopback TcpListener
// ABOUTME: that a test script drives by hand, reading requests and writing scripted replies.

use bytes::BytesMut;
use meshrpc::codec::{RequestHeader, ResponseHeader, encode_value, try_decode_value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Bind a loopback listener and report the address a client should dial.
pub async fn bind() -> (String, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (addr, listener)
}

pub async fn accept(listener: TcpListener) -> TcpStream {
    listener.accept().await.unwrap().0
}

/// Decode one self-delimited value from `stream`, reading more bytes into
/// `buffer` as needed. Mirrors `connection::Reader::read_value` but
/// without requiring a split stream, since the mock agent reads and
/// writes the same socket from one task.
pub async fn read_value<T: DeserializeOwned>(stream: &mut TcpStream, buffer: &mut BytesMut) -> T {
    loop {
        if let Some(value) = try_decode_value(buffer).unwrap() {
            return value;
        }
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed the connection before sending the expected frame");
        buffer.extend_from_slice(&chunk[..n]);
    }
}

pub async fn write_value<T: Serialize>(stream: &mut TcpStream, value: &T) {
    let mut bytes = Vec::new();
    encode_value(&mut bytes, value).unwrap();
    stream.write_all(&bytes).await.unwrap();
    stream.flush().await.unwrap();
}

pub async fn expect_request(stream: &mut TcpStream, buffer: &mut BytesMut, command: &str) -> RequestHeader {
    let header: RequestHeader = read_value(stream, buffer).await;
    assert_eq!(header.command, command);
    header
}

/// Like [`expect_request`], but also drains the request body frame that
/// follows the header on the wire (every command but a bodyless one sends
/// one). Discarding it here keeps `buffer` aligned on the next header.
pub async fn expect_request_with_body(stream: &mut TcpStream, buffer: &mut BytesMut, command: &str) -> RequestHeader {
    let header = expect_request(stream, buffer, command).await;
    let _body: rmpv::Value = read_value(stream, buffer).await;
    header
}

pub async fn reply_ok(stream: &mut TcpStream, seq: u64) {
    write_value(stream, &ResponseHeader { seq, error: String::new() }).await;
}

pub async fn reply_ok_with_body<T: Serialize>(stream: &mut TcpStream, seq: u64, body: &T) {
    reply_ok(stream, seq).await;
    write_value(stream, body).await;
}

pub async fn reply_error(stream: &mut TcpStream, seq: u64, error: &str) {
    write_value(stream, &ResponseHeader { seq, error: error.to_string() }).await;
}
