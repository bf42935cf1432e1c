// ABOUTME: Header shapes shared by every request/response, plus the typed encode/decode bridge
// ABOUTME: to the underlying self-delimiting MessagePack stream (no length prefix at this layer)

use crate::error::{Error, Result};
use bytes::{Buf, BytesMut};
use serde::{Serialize, de::DeserializeOwned};
use std::io::Cursor;

/// Sentinel returned in a response header's `error` field when the agent
/// requires (and did not receive, or rejected) authentication. This is
/// the one error string this layer understands by name, because it
/// changes whether a body follows the header on the wire.
pub const AUTH_REQUIRED: &str = "Authentication required";

/// Fixed shape of every outbound request: a command tag and the sequence
/// number that inbound frames for this request will be tagged with.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct RequestHeader {
    pub command: String,
    #[serde(rename = "sequence")]
    pub seq: u64,
}

/// Fixed shape of every inbound response frame.
///
/// An empty `error` means success. The [`AUTH_REQUIRED`] sentinel is the
/// one value that suppresses body decoding (the agent sends no body
/// alongside it). Any other non-empty string is a generic agent-reported
/// error; a body may still follow it, and callers that asked for one must
/// still decode it even though the call as a whole resolves to that error.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct ResponseHeader {
    #[serde(rename = "sequence")]
    pub seq: u64,
    #[serde(default)]
    pub error: String,
}

impl ResponseHeader {
    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }

    pub fn is_auth_required(&self) -> bool {
        self.error == AUTH_REQUIRED
    }
}

/// Encode `value` as one self-delimited MessagePack map and append it to
/// `buf`. Used for both headers and bodies; a caller that needs to send
/// header-then-body calls this twice before flushing.
pub fn encode_value<T: Serialize>(buf: &mut Vec<u8>, value: &T) -> Result<()> {
    rmp_serde::encode::write_named(buf, value).map_err(Error::from)
}

/// Attempt to decode one value from the front of `buffer`. Returns
/// `Ok(None)` if `buffer` does not yet contain a complete encoded value
/// (the caller should read more bytes and retry); on success, the
/// consumed bytes are advanced out of `buffer`.
pub fn try_decode_value<T: DeserializeOwned>(buffer: &mut BytesMut) -> Result<Option<T>> {
    let mut cursor = Cursor::new(&buffer[..]);
    let mut de = rmp_serde::Deserializer::new(&mut cursor);

    match T::deserialize(&mut de) {
        Ok(value) => {
            let consumed = cursor.position() as usize;
            buffer.advance(consumed);
            Ok(Some(value))
        }
        Err(err) if is_incomplete(&err) => Ok(None),
        Err(err) => Err(Error::from(err)),
    }
}

/// `rmp_serde` reports a short read the same way it reports a genuinely
/// malformed value: as an I/O error wrapping `UnexpectedEof` from the
/// underlying `Read` impl. Distinguishing the two is how streaming
/// decode-without-a-length-prefix works over a growable buffer.
fn is_incomplete(err: &rmp_serde::decode::Error) -> bool {
    use rmp_serde::decode::Error as DecodeError;

    let io_err = match err {
        DecodeError::InvalidMarkerRead(io) | DecodeError::InvalidDataRead(io) => io,
        _ => return false,
    };
    io_err.kind() == std::io::ErrorKind::UnexpectedEof
}
