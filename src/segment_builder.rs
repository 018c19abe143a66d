/// Segment Builder - cut a routed path into ~100 m micro-segments
///
/// Walks every road's polyline, accumulating great-circle distance between
/// consecutive vertices. A segment is closed once the accumulation reaches the
/// target length or the road ends. Each segment carries the road's speed,
/// congestion and name, the speed change versus the previous road, and the
/// sinuosity of the walked path. The endpoints of all segments, deduplicated
/// in first-seen order, form the elevation query.
use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_m, CoordKey, Coordinate};
use crate::route_input::{Road, RoutedPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    pub target_length_m: f64,
    /// Used when a road reports neither a live nor a posted speed
    pub default_speed_kph: f64,
    pub coordinate_decimals: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        SegmentationConfig {
            target_length_m: 100.0,
            default_speed_kph: 30.0,
            coordinate_decimals: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub name: String,
    pub distance_m: f64,
    pub speed_kph: f64,
    pub congestion: u8,
    /// Speed of this road minus speed of the previous road
    pub delta_speed_kph: f64,
    pub start: Coordinate,
    pub end: Coordinate,
    /// Walked length / straight-line length, 1.0 when the endpoints coincide
    pub sinuosity: f64,
}

/// Ordered, de-duplicated set of coordinates that need an elevation.
#[derive(Debug, Clone, Default)]
pub struct ElevationQuery {
    coords: Vec<Coordinate>,
    index: HashMap<CoordKey, usize>,
}

impl ElevationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a coordinate unless an identical one is already queued.
    pub fn push(&mut self, coord: Coordinate) {
        let key = coord.key();
        if !self.index.contains_key(&key) {
            self.index.insert(key, self.coords.len());
            self.coords.push(coord);
        }
    }

    pub fn coords(&self) -> &[Coordinate] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Position of `coord` in the request order.
    pub fn position(&self, coord: &Coordinate) -> Option<usize> {
        self.index.get(&coord.key()).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SegmentedRoute {
    pub segments: Vec<RoadSegment>,
    pub query: ElevationQuery,
}

impl SegmentedRoute {
    pub fn total_distance_m(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_m).sum()
    }
}

/// Speed carried from one road to the next within a single route.
#[derive(Debug, Default)]
struct SpeedAccumulator {
    prev_speed_kph: f64,
}

pub fn build_segments(route: &RoutedPath, config: &SegmentationConfig) -> SegmentedRoute {
    let mut segments = Vec::new();
    let mut speeds = SpeedAccumulator::default();

    for road in route.roads() {
        let coords = road.coordinates(config.coordinate_decimals);
        if coords.is_empty() {
            continue;
        }

        let speed_kph = road.effective_speed_kph(config.default_speed_kph);
        let delta_speed_kph = speed_kph - speeds.prev_speed_kph;
        split_road(road, &coords, speed_kph, delta_speed_kph, config, &mut segments);
        speeds.prev_speed_kph = speed_kph;
    }

    let mut query = ElevationQuery::new();
    for seg in &segments {
        query.push(seg.start);
        query.push(seg.end);
    }

    debug!(
        "Segmented '{}': {} segments, {} elevation points",
        route.label,
        segments.len(),
        query.len()
    );

    SegmentedRoute { segments, query }
}

fn split_road(
    road: &Road,
    coords: &[Coordinate],
    speed_kph: f64,
    delta_speed_kph: f64,
    config: &SegmentationConfig,
    out: &mut Vec<RoadSegment>,
) {
    if coords.len() < 2 {
        return;
    }

    let last_step = coords.len() - 2;
    let mut start = coords[0];
    let mut walked_m = 0.0;

    for (i, step) in coords.windows(2).enumerate() {
        walked_m += haversine_m(&step[0], &step[1]);

        if walked_m >= config.target_length_m || i == last_step {
            let end = step[1];
            // a zero-length tail at the road end is not a segment
            if walked_m > 0.0 {
                let straight_m = haversine_m(&start, &end);
                let sinuosity = if straight_m > 0.0 { walked_m / straight_m } else { 1.0 };

                out.push(RoadSegment {
                    name: road.name.clone(),
                    distance_m: walked_m,
                    speed_kph,
                    congestion: road.traffic_state,
                    delta_speed_kph,
                    start,
                    end,
                    sinuosity,
                });
            }
            start = end;
            walked_m = 0.0;
        }
    }
}
