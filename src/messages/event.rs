use serde::{Deserialize, Serialize};

/// `event` request body: a user event to fire cluster-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    pub name: String,
    pub payload: Vec<u8>,
    pub coalesce: bool,
}
