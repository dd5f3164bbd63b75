//! Static route and stop reference data.
//!
//! The table is loaded once at startup and shared read-only by the normalizer
//! and the simulator. It is stored on disk as a JSON array of routes:
//! ```json
//! [
//!   {
//!     "id": 0,
//!     "name": "Meridian/A&M",
//!     "short_name": "7",
//!     "path": [{ "latitude": 34.7295, "longitude": -86.5890 }],
//!     "stops": [{ "id": "meridian-1", "name": "Downtown Transit Center",
//!                 "latitude": 34.7295, "longitude": -86.5890 }]
//!   }
//! ]
//! ```

use anyhow::{Context, Result, bail};

use crate::model::BusRoute;

/// Id of the only route wired to the live provider.
pub const LIVE_ROUTE_ID: u32 = 0;

/// Returned by [`BusRoute::nearest_stop`] when no stop can be resolved.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

const DEFAULT_ROUTES: &str = include_str!("../data/routes.json");

/// The immutable set of known routes.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<BusRoute>,
    primary: usize,
}

impl RouteTable {
    /// Builds a table, checking that the live route exists and has a path.
    pub fn new(routes: Vec<BusRoute>) -> Result<Self> {
        let Some(primary) = routes.iter().position(|r| r.id == LIVE_ROUTE_ID) else {
            bail!("route table has no route with id {LIVE_ROUTE_ID}");
        };
        if routes[primary].path.is_empty() {
            bail!("route {LIVE_ROUTE_ID} ({}) has an empty path", routes[primary].name);
        }
        Ok(Self { routes, primary })
    }

    /// Parses a table from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        let routes: Vec<BusRoute> = serde_json::from_str(json).context("parsing route table")?;
        Self::new(routes)
    }

    /// Loads the table from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading route table '{path}'"))?;
        Self::from_json(&content)
    }

    /// The table bundled with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_ROUTES)
    }

    /// The route served by the live provider.
    pub fn primary(&self) -> &BusRoute {
        &self.routes[self.primary]
    }

    pub fn get(&self, id: u32) -> Option<&BusRoute> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BusRoute> {
        self.routes.iter()
    }
}

impl BusRoute {
    /// Name of the stop closest to `(latitude, longitude)`.
    ///
    /// Distance is plain Euclidean on degrees. The first stop wins a tie. A
    /// zero or non-finite coordinate, or a route without stops, yields
    /// [`UNKNOWN_LOCATION`].
    pub fn nearest_stop(&self, latitude: f64, longitude: f64) -> &str {
        if !is_set(latitude) || !is_set(longitude) {
            return UNKNOWN_LOCATION;
        }

        let mut nearest = None;
        let mut min_distance = f64::MAX;

        for stop in &self.stops {
            let distance =
                ((latitude - stop.latitude).powi(2) + (longitude - stop.longitude).powi(2)).sqrt();
            if distance < min_distance {
                min_distance = distance;
                nearest = Some(stop);
            }
        }

        nearest.map_or(UNKNOWN_LOCATION, |s| s.name.as_str())
    }
}

fn is_set(coordinate: f64) -> bool {
    coordinate.is_finite() && coordinate != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BusStop, PathPoint};

    fn stop(id: &str, name: &str, latitude: f64, longitude: f64) -> BusStop {
        BusStop {
            id: id.to_string(),
            name: name.to_string(),
            latitude,
            longitude,
        }
    }

    fn fixture_route() -> BusRoute {
        BusRoute {
            id: 0,
            name: "Test Line".to_string(),
            short_name: "T".to_string(),
            path: vec![PathPoint {
                latitude: 1.0,
                longitude: 1.0,
            }],
            stops: vec![
                stop("a", "Alpha", 1.0, 1.0),
                stop("b", "Bravo", 2.0, 2.0),
                stop("c", "Charlie", 3.0, 1.0),
            ],
        }
    }

    #[test]
    fn test_builtin_table_has_live_route() {
        let table = RouteTable::builtin().unwrap();
        let primary = table.primary();
        assert_eq!(primary.id, LIVE_ROUTE_ID);
        assert_eq!(primary.name, "Meridian/A&M");
        assert_eq!(primary.short_name, "7");
        assert!(primary.path.len() > 1);
        assert!(!primary.stops.is_empty());
    }

    #[test]
    fn test_table_without_live_route_is_rejected() {
        let mut route = fixture_route();
        route.id = 3;
        assert!(RouteTable::new(vec![route]).is_err());
    }

    #[test]
    fn test_table_with_empty_live_path_is_rejected() {
        let mut route = fixture_route();
        route.path.clear();
        assert!(RouteTable::new(vec![route]).is_err());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(RouteTable::from_json("{not json").is_err());
    }

    #[test]
    fn test_nearest_stop_picks_minimum_distance() {
        let route = fixture_route();
        assert_eq!(route.nearest_stop(1.9, 2.1), "Bravo");
        assert_eq!(route.nearest_stop(3.2, 0.9), "Charlie");
    }

    #[test]
    fn test_nearest_stop_tie_goes_to_first() {
        let route = fixture_route();
        // Equidistant from Alpha (1,1) and Charlie (3,1).
        assert_eq!(route.nearest_stop(2.0, 1.0), "Alpha");
    }

    #[test]
    fn test_nearest_stop_zero_coordinate_is_unknown() {
        let route = fixture_route();
        assert_eq!(route.nearest_stop(0.0, 0.0), UNKNOWN_LOCATION);
        assert_eq!(route.nearest_stop(0.0, 1.0), UNKNOWN_LOCATION);
        assert_eq!(route.nearest_stop(1.0, 0.0), UNKNOWN_LOCATION);
        assert_eq!(route.nearest_stop(f64::NAN, 1.0), UNKNOWN_LOCATION);
    }

    #[test]
    fn test_nearest_stop_without_stops_is_unknown() {
        let mut route = fixture_route();
        route.stops.clear();
        assert_eq!(route.nearest_stop(1.0, 1.0), UNKNOWN_LOCATION);
    }

    #[test]
    fn test_nearest_stop_is_deterministic() {
        let route = RouteTable::builtin().unwrap().primary().clone();
        let first = route.nearest_stop(34.75, -86.579).to_string();
        for _ in 0..10 {
            assert_eq!(route.nearest_stop(34.75, -86.579), first);
        }
        assert_eq!(first, "Meridian St & Oakwood Ave");
    }
}
