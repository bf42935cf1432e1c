use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One cluster member, as reported by `members` / `members_filtered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub addr: Vec<u8>,
    pub port: u16,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub status: String,
    pub protocol_min: u8,
    pub protocol_max: u8,
    pub protocol_cur: u8,
    pub delegate_min: u8,
    pub delegate_max: u8,
    pub delegate_cur: u8,
}

/// `members` / `members_filtered` response body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MembersResponse {
    #[serde(default)]
    pub members: Vec<Member>,
}

/// `members_filtered` request body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MembersFilteredRequest {
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: String,
}

/// `force_leave` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceLeaveRequest {
    pub node: String,
    #[serde(default)]
    pub prune: bool,
}
