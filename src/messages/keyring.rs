use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Shared request body for `install_key`, `use_key`, and `remove_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

/// Response body shared by the four keyring commands. `keys` and
/// `num_nodes` are only populated by `list_keys`; the other three leave
/// them `None` and report per-node failures in `messages`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeyResponse {
    #[serde(default)]
    pub messages: HashMap<String, String>,
    #[serde(default)]
    pub keys: Option<HashMap<String, i32>>,
    #[serde(default)]
    pub num_nodes: Option<i32>,
}
