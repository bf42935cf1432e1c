// ABOUTME: Per-command request/response body types. Framing (header, sequence, error string)
// ABOUTME: lives in `codec`; this module only has the command-specific payload shapes.

mod coordinate;
mod event;
mod join;
mod keyring;
mod members;
mod query;
mod stats;
mod stream;
mod tags;

pub use coordinate::{Coordinate, GetCoordinateRequest, GetCoordinateResponse};
pub use event::EventRequest;
pub use join::{JoinRequest, JoinResponse};
pub use keyring::{KeyRequest, KeyResponse};
pub use members::{ForceLeaveRequest, Member, MembersFilteredRequest, MembersResponse};
pub use query::{QueryAck, QueryRecord, QueryRecordType, QueryRequest, QueryResponseRecord};
pub use stats::Stats;
pub use stream::EventRecord;
pub use tags::TagsRequest;

use serde::{Deserialize, Serialize};

/// `handshake` request body: the IPC version this client speaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub version: i32,
}

/// `auth` request body: the shared key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub auth_key: String,
}

/// `stream` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    #[serde(rename = "type")]
    pub event_type: String,
}

/// `monitor` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorRequest {
    pub log_level: String,
}

/// `stop` request body: the sequence number of the subscription to cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRequest {
    pub stop: u64,
}

/// `respond` request body: answering a query the agent relayed to us.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub id: u64,
    pub payload: Vec<u8>,
}
