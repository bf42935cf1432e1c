use serde::{Deserialize, Serialize};

/// `get_coordinate` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCoordinateRequest {
    pub node: String,
}

/// Vivaldi network coordinate, as reported by `get_coordinate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub vec: Vec<f64>,
    pub error: f64,
    pub adjustment: f64,
    pub height: f64,
}

/// `get_coordinate` response body. `coord` is absent when the agent has no
/// coordinate estimate for the requested node yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCoordinateResponse {
    pub ok: bool,
    #[serde(default)]
    pub coord: Option<Coordinate>,
}
