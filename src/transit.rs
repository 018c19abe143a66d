/// Transit Emission Model - per-passenger CO2 of a public-transit itinerary
///
/// Each leg starts from a per-mode base factor (g per passenger-km). Subway legs
/// are scaled by how efficient their line is, road-bound legs by time-of-day
/// occupancy and by how congested the corridor is for cars.
use chrono::Timelike;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum TrafficMode {
    Subway,
    Bus,
    Walk,
    Other(u8),
}

impl From<u8> for TrafficMode {
    fn from(code: u8) -> Self {
        match code {
            1 => TrafficMode::Subway,
            2 => TrafficMode::Bus,
            3 => TrafficMode::Walk,
            other => TrafficMode::Other(other),
        }
    }
}

impl From<TrafficMode> for u8 {
    fn from(mode: TrafficMode) -> Self {
        match mode {
            TrafficMode::Subway => 1,
            TrafficMode::Bus => 2,
            TrafficMode::Walk => 3,
            TrafficMode::Other(code) => code,
        }
    }
}

fn default_mode() -> TrafficMode {
    TrafficMode::Walk
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lane {
    #[serde(default, rename = "busNo")]
    pub bus_no: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Bus sub-type, 0 = ordinary city bus
    #[serde(default, rename = "type")]
    pub bus_type: u16,
}

impl Lane {
    pub fn label(&self) -> Option<&str> {
        self.bus_no.as_deref().or(self.name.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitLeg {
    #[serde(rename = "trafficType", default = "default_mode")]
    pub mode: TrafficMode,
    /// Meters
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub lane: Vec<Lane>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItineraryInfo {
    /// Meters
    #[serde(rename = "totalDistance", default)]
    pub total_distance: f64,
    /// Minutes
    #[serde(rename = "totalTime", default)]
    pub total_time: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitItinerary {
    /// 1 = subway only, 2 = bus only, 3 = mixed
    #[serde(rename = "pathType", default)]
    pub path_type: Option<u8>,
    #[serde(default)]
    pub info: ItineraryInfo,
    #[serde(rename = "subPath", default)]
    pub legs: Vec<TransitLeg>,
}

impl TransitItinerary {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn path_type_label(&self) -> &'static str {
        match self.path_type {
            Some(1) => "subway",
            Some(2) => "bus",
            _ => "mixed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitConfig {
    pub subway_factor: f64,
    pub bus_factor: f64,
    pub walk_factor: f64,
    pub express_bus_factor: f64,
    /// Express, suburban, seat, village and airport bus sub-types
    pub express_bus_types: Vec<u16>,
    /// Substring of the line name -> energy ratio; first match wins
    pub line_efficiency: Vec<(String, f64)>,
}

impl Default for TransitConfig {
    fn default() -> Self {
        let lines = [
            ("1호선", 1.2),
            ("2호선", 1.0),
            ("3호선", 1.1),
            ("4호선", 1.1),
            ("5호선", 1.0),
            ("6호선", 1.0),
            ("7호선", 1.0),
            ("8호선", 1.0),
            ("9호선", 0.9),
            ("신분당선", 0.8),
            ("GTX-A", 0.7),
        ];
        TransitConfig {
            subway_factor: 3.0,
            bus_factor: 38.0,
            walk_factor: 0.0,
            express_bus_factor: 50.0,
            express_bus_types: vec![10, 11, 12, 13, 14],
            line_efficiency: lines.iter().map(|(k, r)| (k.to_string(), *r)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitLegResult {
    pub mode: TrafficMode,
    pub name: String,
    pub distance_km: f64,
    /// Final g per passenger-km after all corrections
    pub factor: f64,
    pub co2_g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitResult {
    pub path_type: String,
    pub total_co2_g: f64,
    pub total_distance_km: f64,
    pub total_time_min: f64,
    pub legs: Vec<TransitLegResult>,
}

impl TransitResult {
    pub fn efficiency_g_per_km(&self) -> f64 {
        if self.total_distance_km > 0.0 {
            self.total_co2_g / self.total_distance_km
        } else {
            0.0
        }
    }
}

/// Occupancy multiplier by hour: 0.6 in commute peaks, 1.8 at night.
pub fn occupancy_factor(hour: u32) -> f64 {
    if (7..=9).contains(&hour) || (17..=19).contains(&hour) {
        0.6
    } else if hour >= 22 || hour <= 5 {
        1.8
    } else {
        1.0
    }
}

/// Local wall-clock hour, for callers that evaluate "now".
pub fn current_hour() -> u32 {
    chrono::Local::now().hour()
}

#[derive(Debug, Clone, Default)]
pub struct TransitModel {
    config: TransitConfig,
}

impl TransitModel {
    pub fn new(config: TransitConfig) -> Self {
        TransitModel { config }
    }

    pub fn is_express_bus(&self, bus_type: u16) -> bool {
        self.config.express_bus_types.contains(&bus_type)
    }

    /// Subway line energy ratio, 1.0 for lines not listed.
    pub fn line_ratio(&self, line_name: &str) -> f64 {
        self.config
            .line_efficiency
            .iter()
            .find(|(key, _)| line_name.contains(key.as_str()))
            .map(|(_, ratio)| *ratio)
            .unwrap_or(1.0)
    }

    /// Road-congestion penalty for buses, driven by the car speed on the same corridor.
    pub fn congestion_penalty(&self, mode: TrafficMode, bus_type: u16, avg_car_speed_kph: Option<f64>) -> f64 {
        let Some(speed) = avg_car_speed_kph else {
            return 1.0;
        };
        if matches!(mode, TrafficMode::Subway | TrafficMode::Walk) {
            return 1.0;
        }

        let express = self.is_express_bus(bus_type);
        if speed <= 20.0 {
            if express {
                1.1
            } else {
                1.5
            }
        } else if speed <= 40.0 {
            if express {
                1.05
            } else {
                1.2
            }
        } else {
            1.0
        }
    }

    fn base_factor(&self, mode: TrafficMode) -> f64 {
        match mode {
            TrafficMode::Subway => self.config.subway_factor,
            TrafficMode::Bus => self.config.bus_factor,
            TrafficMode::Walk => self.config.walk_factor,
            TrafficMode::Other(_) => 0.0,
        }
    }

    fn leg(&self, leg: &TransitLeg, time_factor: f64, avg_car_speed_kph: Option<f64>) -> TransitLegResult {
        let distance_km = leg.distance / 1000.0;
        let mut factor = self.base_factor(leg.mode);
        let mut name = "walk".to_string();
        let mut bus_type = 0;

        if let Some(lane) = leg.lane.first() {
            name = lane.label().unwrap_or_default().to_string();
            match leg.mode {
                TrafficMode::Bus => {
                    bus_type = lane.bus_type;
                    if self.is_express_bus(bus_type) {
                        factor = self.config.express_bus_factor;
                        name.push_str(" (express)");
                    }
                }
                TrafficMode::Subway => factor *= self.line_ratio(&name),
                _ => {}
            }
        }

        if leg.mode != TrafficMode::Walk {
            factor *= time_factor * self.congestion_penalty(leg.mode, bus_type, avg_car_speed_kph);
        }

        TransitLegResult {
            mode: leg.mode,
            name,
            distance_km,
            factor,
            co2_g: distance_km * factor,
        }
    }

    /// Emissions at a given hour of day; totals of distance and time come from
    /// the itinerary summary.
    pub fn calculate(&self, itinerary: &TransitItinerary, avg_car_speed_kph: Option<f64>, hour: u32) -> TransitResult {
        let time_factor = occupancy_factor(hour);
        let legs: Vec<TransitLegResult> = itinerary
            .legs
            .iter()
            .map(|leg| self.leg(leg, time_factor, avg_car_speed_kph))
            .collect();
        let total_co2_g = legs.iter().map(|l| l.co2_g).sum();

        debug!(
            "Transit itinerary ({}): {} legs, {:.1} g at hour {}",
            itinerary.path_type_label(),
            legs.len(),
            total_co2_g,
            hour
        );

        TransitResult {
            path_type: itinerary.path_type_label().to_string(),
            total_co2_g,
            total_distance_km: itinerary.info.total_distance / 1000.0,
            total_time_min: itinerary.info.total_time,
            legs,
        }
    }

    pub fn calculate_now(&self, itinerary: &TransitItinerary, avg_car_speed_kph: Option<f64>) -> TransitResult {
        self.calculate(itinerary, avg_car_speed_kph, current_hour())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(mode: u8, distance: f64, lane: Option<Lane>) -> TransitLeg {
        TransitLeg {
            mode: TrafficMode::from(mode),
            distance,
            lane: lane.into_iter().collect(),
        }
    }

    fn subway(name: &str) -> Lane {
        Lane {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn bus(no: &str, bus_type: u16) -> Lane {
        Lane {
            bus_no: Some(no.to_string()),
            bus_type,
            ..Default::default()
        }
    }

    fn itinerary(legs: Vec<TransitLeg>) -> TransitItinerary {
        TransitItinerary {
            path_type: Some(3),
            info: ItineraryInfo {
                total_distance: 12_345.0,
                total_time: 52.0,
            },
            legs,
        }
    }

    #[test]
    fn test_occupancy_windows() {
        assert_eq!(occupancy_factor(7), 0.6);
        assert_eq!(occupancy_factor(9), 0.6);
        assert_eq!(occupancy_factor(18), 0.6);
        assert_eq!(occupancy_factor(12), 1.0);
        assert_eq!(occupancy_factor(10), 1.0);
        assert_eq!(occupancy_factor(22), 1.8);
        assert_eq!(occupancy_factor(0), 1.8);
        assert_eq!(occupancy_factor(5), 1.8);
        assert_eq!(occupancy_factor(6), 1.0);
    }

    #[test]
    fn test_commute_hour_in_jammed_corridor() {
        let model = TransitModel::default();
        let trip = itinerary(vec![
            leg(1, 5000.0, Some(subway("우이신설선"))),
            leg(2, 5000.0, Some(bus("720", 0))),
        ]);
        let result = model.calculate(&trip, Some(15.0), 8);

        let subway_leg = &result.legs[0];
        let bus_leg = &result.legs[1];
        assert!((subway_leg.factor - 3.0 * 1.0 * 0.6 * 1.0).abs() < 1e-12);
        assert!((bus_leg.factor - 38.0 * 1.0 * 0.6 * 1.5).abs() < 1e-12);
        assert!((bus_leg.co2_g - 5.0 * bus_leg.factor).abs() < 1e-9);
        assert!((result.total_co2_g - (subway_leg.co2_g + bus_leg.co2_g)).abs() < 1e-9);
    }

    #[test]
    fn test_express_bus_and_penalties() {
        let model = TransitModel::default();
        assert_eq!(model.congestion_penalty(TrafficMode::Bus, 11, Some(18.0)), 1.1);
        assert_eq!(model.congestion_penalty(TrafficMode::Bus, 0, Some(35.0)), 1.2);
        assert_eq!(model.congestion_penalty(TrafficMode::Bus, 14, Some(35.0)), 1.05);
        assert_eq!(model.congestion_penalty(TrafficMode::Bus, 0, Some(55.0)), 1.0);
        assert_eq!(model.congestion_penalty(TrafficMode::Subway, 0, Some(5.0)), 1.0);
        assert_eq!(model.congestion_penalty(TrafficMode::Bus, 0, None), 1.0);

        let trip = itinerary(vec![leg(2, 10_000.0, Some(bus("M4101", 12)))]);
        let result = model.calculate(&trip, Some(30.0), 12);
        assert!((result.legs[0].factor - 50.0 * 1.05).abs() < 1e-12);
        assert_eq!(result.legs[0].name, "M4101 (express)");
    }

    #[test]
    fn test_wall_clock_hour() {
        let model = TransitModel::default();
        let trip = itinerary(vec![leg(1, 1000.0, Some(subway("2호선")))]);
        let result = model.calculate_now(&trip, None);

        assert!(current_hour() < 24);
        let factor = result.legs[0].factor;
        assert!([0.6, 1.0, 1.8].iter().any(|t| (factor - 3.0 * t).abs() < 1e-12));
    }

    #[test]
    fn test_line_efficiency() {
        let model = TransitModel::default();
        assert_eq!(model.line_ratio("수도권 1호선"), 1.2);
        assert_eq!(model.line_ratio("신분당선"), 0.8);
        assert_eq!(model.line_ratio("GTX-A"), 0.7);
        assert_eq!(model.line_ratio("Airport Railroad"), 1.0);
    }

    #[test]
    fn test_walk_and_unknown_modes() {
        let model = TransitModel::default();
        let trip = itinerary(vec![leg(3, 800.0, None), leg(7, 2000.0, Some(subway("ferry")))]);
        let result = model.calculate(&trip, Some(10.0), 23);

        assert_eq!(result.legs[0].name, "walk");
        assert_eq!(result.legs[0].co2_g, 0.0);
        assert_eq!(result.legs[1].mode, TrafficMode::Other(7));
        assert_eq!(result.legs[1].co2_g, 0.0);
        assert_eq!(result.total_co2_g, 0.0);
    }

    #[test]
    fn test_totals_come_from_summary() {
        let model = TransitModel::default();
        let result = model.calculate(&itinerary(vec![leg(1, 100.0, Some(subway("2호선")))]), None, 12);
        assert_eq!(result.total_distance_km, 12.345);
        assert_eq!(result.total_time_min, 52.0);
        assert_eq!(result.path_type, "mixed");
    }

    #[test]
    fn test_parse_itinerary_json() {
        let json = r#"{
            "pathType": 2,
            "info": {"totalDistance": 8200, "totalTime": 41},
            "subPath": [
                {"trafficType": 3, "distance": 300},
                {"trafficType": 2, "distance": 7600, "lane": [{"busNo": "3000", "type": 11}]},
                {"distance": 300}
            ]
        }"#;
        let trip = TransitItinerary::from_json(json).unwrap();
        assert_eq!(trip.path_type_label(), "bus");
        assert_eq!(trip.legs.len(), 3);
        assert_eq!(trip.legs[1].mode, TrafficMode::Bus);
        assert_eq!(trip.legs[1].lane[0].bus_type, 11);
        assert_eq!(trip.legs[2].mode, TrafficMode::Walk);

        let result = TransitModel::default().calculate(&trip, Some(50.0), 14);
        assert!((result.total_co2_g - 7.6 * 50.0).abs() < 1e-9);
    }
}
