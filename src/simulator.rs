//! Synthetic bus positions used when the provider has nothing usable.

use chrono::Utc;
use rand::Rng;

use crate::model::{BusLocation, BusRoute};

/// Id carried by every simulated observation.
pub const SIMULATED_ID: &str = "meridian-single";

/// Heading label carried by every simulated observation.
///
/// Independent of the generated numeric heading; display code keys off it.
pub const SIMULATED_HEADING_NAME: &str = "NORTH";

/// Places one bus on a random vertex of `route`'s path.
///
/// The last vertex is never chosen. A single-point path always yields that
/// point. Always returns exactly one element.
pub fn simulate_single_bus<R: Rng>(route: &BusRoute, rng: &mut R) -> Vec<BusLocation> {
    let index = if route.path.len() > 1 {
        rng.random_range(0..route.path.len() - 1)
    } else {
        0
    };
    let (latitude, longitude) = route
        .path
        .get(index)
        .map_or((0.0, 0.0), |p| (p.latitude, p.longitude));

    vec![BusLocation {
        id: SIMULATED_ID.to_string(),
        latitude,
        longitude,
        heading: rng.random_range(0.0..360.0),
        heading_name: SIMULATED_HEADING_NAME.to_string(),
        speed: rng.random_range(15.0..25.0),
        route_id: route.id,
        route_name: route.name.clone(),
        route_short_name: route.short_name.clone(),
        next_stop: route.nearest_stop(latitude, longitude).to_string(),
        timestamp: Utc::now().timestamp_millis(),
        raw_data: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PathPoint;
    use crate::routes::RouteTable;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_simulated_bus_sits_on_path_excluding_last_point() {
        let table = RouteTable::builtin().unwrap();
        let route = table.primary();
        let last = *route.path.last().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let batch = simulate_single_bus(route, &mut rng);
            assert_eq!(batch.len(), 1);
            let bus = &batch[0];
            let on_path = route.path[..route.path.len() - 1]
                .iter()
                .any(|p| p.latitude == bus.latitude && p.longitude == bus.longitude);
            assert!(on_path, "({}, {}) not on path", bus.latitude, bus.longitude);
            assert!(!(bus.latitude == last.latitude && bus.longitude == last.longitude));
        }
    }

    #[test]
    fn test_simulated_bus_value_ranges() {
        let table = RouteTable::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let bus = simulate_single_bus(table.primary(), &mut rng).remove(0);
            assert!((0.0..360.0).contains(&bus.heading));
            assert!((15.0..25.0).contains(&bus.speed));
        }
    }

    #[test]
    fn test_simulated_bus_fixed_fields() {
        let table = RouteTable::builtin().unwrap();
        let route = table.primary();
        let mut rng = StdRng::seed_from_u64(1);

        let bus = simulate_single_bus(route, &mut rng).remove(0);

        assert_eq!(bus.id, "meridian-single");
        assert_eq!(bus.heading_name, "NORTH");
        assert_eq!(bus.route_id, 0);
        assert_eq!(bus.route_name, "Meridian/A&M");
        assert_eq!(bus.route_short_name, "7");
        assert_eq!(bus.next_stop, route.nearest_stop(bus.latitude, bus.longitude));
        assert!(bus.raw_data.is_none());
        assert!(bus.is_simulated());
        assert!(bus.timestamp > 0);
    }

    #[test]
    fn test_single_point_path() {
        let route = BusRoute {
            id: 0,
            name: "Stub".to_string(),
            short_name: "S".to_string(),
            path: vec![PathPoint {
                latitude: 10.0,
                longitude: 20.0,
            }],
            stops: vec![],
        };
        let mut rng = StdRng::seed_from_u64(3);

        let bus = simulate_single_bus(&route, &mut rng).remove(0);

        assert_eq!((bus.latitude, bus.longitude), (10.0, 20.0));
        assert_eq!(bus.next_stop, "Unknown location");
    }
}
