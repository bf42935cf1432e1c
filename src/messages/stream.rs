use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One record delivered on a `stream` subscription. The agent's event
/// records are dynamically shaped maps; wrapping `rmpv::Value` here instead
/// of exposing it directly keeps `rmpv` as an implementation detail callers
/// don't need to know about by name.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EventRecord(pub HashMap<String, rmpv::Value>);

impl EventRecord {
    pub fn get(&self, key: &str) -> Option<&rmpv::Value> {
        self.0.get(key)
    }
}
