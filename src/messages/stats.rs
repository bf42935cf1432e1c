use std::collections::HashMap;

/// `stats` response body: a nested map of stat category to key/value pairs,
/// shaped however the agent's internal telemetry happens to report it.
pub type Stats = HashMap<String, HashMap<String, String>>;
