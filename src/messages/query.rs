use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `query` request body. `timeout` is carried on the wire as whole
/// nanoseconds, the convention this class of agent protocol uses for every
/// duration field.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryRequest {
    #[serde(default)]
    pub filter_nodes: Vec<String>,
    #[serde(default)]
    pub filter_tags: HashMap<String, String>,
    pub request_ack: bool,
    pub relay_factor: u8,
    #[serde(with = "duration_nanos")]
    pub timeout: Duration,
    pub name: String,
    pub payload: Vec<u8>,
}

mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_nanos() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}

/// Discriminates the three record shapes delivered on a `query` subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryRecordType {
    Ack,
    Response,
    Done,
}

/// One record delivered on a `query` subscription: an ack, a response, or
/// the terminal `done` marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    #[serde(rename = "type")]
    pub r#type: QueryRecordType,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub payload: Vec<u8>,
}

/// Convenience view over a `QueryRecord` known to be an ack.
#[derive(Debug, Clone)]
pub struct QueryAck {
    pub from: String,
}

/// Convenience view over a `QueryRecord` known to be a response.
#[derive(Debug, Clone)]
pub struct QueryResponseRecord {
    pub from: String,
    pub payload: Vec<u8>,
}
