use serde::{Deserialize, Serialize};

/// `join` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub existing: Vec<String>,
    pub replay: bool,
}

/// `join` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub num: i32,
}
