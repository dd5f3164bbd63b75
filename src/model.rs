//! Reference data and observation types for the bus-location pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, geolocated boarding point along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStop {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One vertex of a route polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A fixed transit line: an ordered path and the stops served along it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRoute {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    pub path: Vec<PathPoint>,
    #[serde(default)]
    pub stops: Vec<BusStop>,
}

/// A point-in-time observation of a vehicle.
///
/// Built fresh on every fetch cycle and replaced wholesale by the next batch.
/// `raw_data` keeps the provider record untouched for diagnostics and is
/// `None` for simulated observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusLocation {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
    pub heading_name: String,
    pub speed: f64,
    pub route_id: u32,
    pub route_name: String,
    pub route_short_name: String,
    pub next_stop: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub raw_data: Option<Value>,
}

impl BusLocation {
    /// Returns `true` if this observation came from the simulator rather than
    /// the provider.
    pub fn is_simulated(&self) -> bool {
        self.raw_data.is_none() && self.id == crate::simulator::SIMULATED_ID
    }
}
