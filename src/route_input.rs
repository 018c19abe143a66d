/// Routed path as delivered by the navigation collaborator
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo_utils::Coordinate;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutedPath {
    /// Routing strategy the path was produced with (recommended, shortest, toll-free...)
    #[serde(default, rename = "strategy_label")]
    pub label: String,
    #[serde(default)]
    pub summary: RouteSummaryInfo,
    #[serde(default)]
    pub sections: Vec<RouteSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteSummaryInfo {
    /// Meters
    #[serde(default)]
    pub distance: f64,
    /// Seconds
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteSection {
    #[serde(default)]
    pub roads: Vec<Road>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Road {
    #[serde(default = "default_road_name")]
    pub name: String,
    #[serde(default)]
    pub traffic_speed: Option<f64>,
    #[serde(default)]
    pub limit_speed: Option<f64>,
    /// 0 = unknown, 1 = free flow .. 4 = jammed
    #[serde(default)]
    pub traffic_state: u8,
    /// Interleaved lon, lat pairs
    #[serde(default, alias = "vertex")]
    pub vertexes: Vec<f64>,
}

fn default_road_name() -> String {
    "unnamed road".to_string()
}

impl RoutedPath {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn roads(&self) -> impl Iterator<Item = &Road> {
        self.sections.iter().flat_map(|s| s.roads.iter())
    }
}

impl Road {
    /// Live traffic speed, falling back to the limit, then to `default_kph`.
    pub fn effective_speed_kph(&self, default_kph: f64) -> f64 {
        self.traffic_speed
            .filter(|s| *s > 0.0)
            .or(self.limit_speed.filter(|s| *s > 0.0))
            .unwrap_or(default_kph)
    }

    /// Decode the flat vertex list into rounded coordinates.
    /// A dangling trailing value and non-finite pairs are dropped.
    pub fn coordinates(&self, decimals: u32) -> Vec<Coordinate> {
        self.vertexes
            .chunks_exact(2)
            .filter_map(|pair| match Coordinate::rounded(pair[1], pair[0], decimals) {
                Ok(coord) => Some(coord),
                Err(e) => {
                    warn!("Skipping vertex on '{}': {}", self.name, e);
                    None
                }
            })
            .collect()
    }
}

/// Drop alternatives that are the same path under a different strategy:
/// distance within 100 m and duration within 60 s of a path already kept.
pub fn dedup_alternatives(routes: Vec<RoutedPath>) -> Vec<RoutedPath> {
    let mut kept: Vec<RoutedPath> = Vec::with_capacity(routes.len());
    for route in routes {
        let duplicate = kept.iter().any(|k| {
            (k.summary.distance - route.summary.distance).abs() < 100.0
                && (k.summary.duration - route.summary.duration).abs() < 60.0
        });
        if duplicate {
            log::debug!("Dropping duplicate alternative '{}'", route.label);
        } else {
            kept.push(route);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road(traffic: Option<f64>, limit: Option<f64>) -> Road {
        Road {
            name: "test".to_string(),
            traffic_speed: traffic,
            limit_speed: limit,
            traffic_state: 0,
            vertexes: vec![],
        }
    }

    #[test]
    fn test_speed_fallback_chain() {
        assert_eq!(road(Some(55.0), Some(80.0)).effective_speed_kph(30.0), 55.0);
        assert_eq!(road(Some(0.0), Some(80.0)).effective_speed_kph(30.0), 80.0);
        assert_eq!(road(None, Some(-1.0)).effective_speed_kph(30.0), 30.0);
        assert_eq!(road(None, None).effective_speed_kph(30.0), 30.0);
    }

    #[test]
    fn test_parse_route_json() {
        let json = r#"{
            "strategy_label": "RECOMMEND",
            "summary": {"distance": 1200, "duration": 180},
            "sections": [{"roads": [
                {"name": "경부고속도로", "traffic_speed": 85.0, "traffic_state": 1,
                 "vertexes": [127.0, 37.0, 127.001, 37.0, 127.002]},
                {"traffic_speed": 0, "vertex": [127.002, 37.0, 127.003, 37.0]}
            ]}]
        }"#;
        let route = RoutedPath::from_json(json).unwrap();
        assert_eq!(route.label, "RECOMMEND");
        assert_eq!(route.summary.duration, 180.0);

        let roads: Vec<&Road> = route.roads().collect();
        assert_eq!(roads.len(), 2);
        assert_eq!(roads[0].coordinates(6).len(), 2);
        assert_eq!(roads[1].name, "unnamed road");
        assert_eq!(roads[1].effective_speed_kph(30.0), 30.0);
        assert_eq!(roads[1].coordinates(6)[0].lon, 127.002);
    }

    #[test]
    fn test_dedup_alternatives() {
        let mk = |label: &str, distance: f64, duration: f64| RoutedPath {
            label: label.to_string(),
            summary: RouteSummaryInfo { distance, duration },
            sections: vec![],
        };
        let routes = vec![
            mk("recommend", 10_000.0, 900.0),
            mk("shortest", 10_050.0, 930.0),
            mk("free", 12_000.0, 1_200.0),
        ];
        let kept = dedup_alternatives(routes);
        let labels: Vec<&str> = kept.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["recommend", "free"]);
    }
}
