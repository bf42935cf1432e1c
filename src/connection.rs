// ABOUTME: Split TCP transport: an owned read half for the reader loop, an owned write half
// ABOUTME: for the request sender, each independently buffered. No read deadlines; see §4.1.

use crate::codec::{encode_value, try_decode_value};
use crate::error::{Error, Result};
use bytes::BytesMut;
use serde::{Serialize, de::DeserializeOwned};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Read half of the connection. Owned exclusively by the reader loop
/// task; nothing else ever calls into it, so no internal locking is
/// needed beyond that single-owner guarantee.
#[derive(Debug)]
pub struct Reader {
    stream: OwnedReadHalf,
    buffer: BytesMut,
}

impl Reader {
    /// Decode one value, blocking (asynchronously) until a complete
    /// encoded value has arrived or the peer closes the connection.
    pub async fn read_value<T: DeserializeOwned>(&mut self) -> Result<T> {
        use tokio::io::AsyncReadExt;

        loop {
            if let Some(value) = try_decode_value(&mut self.buffer)? {
                return Ok(value);
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return Err(Error::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )));
            }
        }
    }
}

/// Write half of the connection, buffered. Shared across callers behind
/// a mutex held by the request sender (see `client::send`); this struct
/// itself assumes exclusive access for the duration of one call.
#[derive(Debug)]
pub struct Writer {
    stream: BufWriter<OwnedWriteHalf>,
}

impl Writer {
    /// Encode `header`, optionally `body`, and flush, all before
    /// `deadline` elapses from the point this call starts.
    pub async fn write_framed<H, B>(&mut self, header: &H, body: Option<&B>, deadline: Duration) -> Result<()>
    where
        H: Serialize,
        B: Serialize,
    {
        let write = async {
            let mut out = Vec::new();
            encode_value(&mut out, header)?;
            if let Some(body) = body {
                encode_value(&mut out, body)?;
            }
            self.stream.write_all(&out).await?;
            self.stream.flush().await?;
            Ok::<_, Error>(())
        };

        match tokio::time::timeout(deadline, write).await {
            Ok(result) => result,
            Err(_) => Err(Error::Transport(io::Error::new(
                io::ErrorKind::TimedOut,
                "write deadline exceeded",
            ))),
        }
    }

    /// Close the write half. Called once, from client shutdown; errors are
    /// not actionable at that point so the caller only logs them.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(Error::from)
    }
}

/// Split a freshly connected socket into independent read/write halves.
pub fn split(stream: TcpStream) -> (Reader, Writer) {
    let (read_half, write_half) = stream.into_split();
    (
        Reader {
            stream: read_half,
            buffer: BytesMut::with_capacity(4 * 1024),
        },
        Writer {
            stream: BufWriter::new(write_half),
        },
    )
}

/// A `Reader` backed by a real loopback socket, for handler unit tests
/// that need something to hand `on_response` without standing up a whole
/// client. Not useful outside tests: there is no way to construct a
/// `Reader` except by splitting a connected `TcpStream`.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    pub async fn reader_preloaded_with(bytes: Vec<u8>) -> Reader {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (mut server, _) = listener.accept().await.unwrap();
        server.write_all(&bytes).await.unwrap();
        server.flush().await.unwrap();
        let (reader, writer) = split(client);
        // Keep the write half alive for the reader's lifetime; tests never
        // write through it, but dropping it would close the connection.
        std::mem::forget(writer);
        std::mem::forget(server);
        reader
    }

    pub async fn empty_reader() -> Reader {
        reader_preloaded_with(Vec::new()).await
    }

    pub async fn reader_with_value<T: Serialize>(value: &T) -> Reader {
        let mut bytes = Vec::new();
        encode_value(&mut bytes, value).unwrap();
        reader_preloaded_with(bytes).await
    }
}
