use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `tags` request body: tags to set and tags to delete in the same call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TagsRequest {
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub delete_tags: Vec<String>,
}
