/// Route-to-emission pipeline and the car vs. transit comparison
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::elevation_reconciler::{
    lookup_elevations, reconcile, CorrectedSegment, CorrectionStats, ElevationSource, GradeFilterConfig,
};
use crate::error::{Error, Result};
use crate::route_input::RoutedPath;
use crate::segment_builder::{build_segments, SegmentationConfig};
use crate::transit::TransitResult;
use crate::vehicle::VehicleSpec;
use crate::vsp_emission::EmissionEngine;
use crate::weather::WeatherState;

/// CO2 a mature pine absorbs per year, in grams
pub const PINE_TREE_G_PER_YEAR: f64 = 2770.0;

const UPHILL_GRADE_PCT: f64 = 5.0;
const CONGESTED_SPEED_KPH: f64 = 20.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub segmentation: SegmentationConfig,
    pub grade_filter: GradeFilterConfig,
}

/// Driving conditions worth flagging on a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteEvents {
    /// Segments steeper than 5 % either way
    pub uphill: usize,
    /// Segments slower than 20 km/h
    pub congestion: usize,
    pub weather_bad: bool,
}

impl RouteEvents {
    pub fn collect(segments: &[CorrectedSegment], weather: &WeatherState) -> Self {
        RouteEvents {
            uphill: segments.iter().filter(|s| s.grade_pct.abs() > UPHILL_GRADE_PCT).count(),
            congestion: segments
                .iter()
                .filter(|s| s.segment.speed_kph < CONGESTED_SPEED_KPH)
                .count(),
            weather_bad: weather.is_adverse(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteAnalysis {
    pub label: String,
    pub segments: Vec<CorrectedSegment>,
    pub stats: CorrectionStats,
    pub distance_km: f64,
    /// From the route summary, not recomputed from segment speeds
    pub time_min: f64,
    pub co2_g: f64,
    pub weather_delta_g: f64,
    pub weather_impact_pct: f64,
    pub events: RouteEvents,
}

impl RouteAnalysis {
    pub fn avg_speed_kph(&self) -> Option<f64> {
        if self.time_min > 0.0 {
            Some(self.distance_km / (self.time_min / 60.0))
        } else {
            None
        }
    }

    pub fn efficiency_g_per_km(&self) -> f64 {
        if self.distance_km > 0.0 {
            self.co2_g / self.distance_km
        } else {
            0.0
        }
    }
}

pub struct RouteAnalyzer<'a, E: ElevationSource + ?Sized> {
    elevation: &'a E,
    engine: EmissionEngine,
    weather: WeatherState,
    config: AnalysisConfig,
}

impl<'a, E: ElevationSource + ?Sized> RouteAnalyzer<'a, E> {
    pub fn new(elevation: &'a E, vehicle: VehicleSpec, weather: WeatherState, config: AnalysisConfig) -> Self {
        RouteAnalyzer {
            elevation,
            engine: EmissionEngine::new(vehicle),
            weather,
            config,
        }
    }

    pub fn vehicle(&self) -> &VehicleSpec {
        self.engine.vehicle()
    }

    /// Segment, reconcile elevations and compute emissions for one route.
    pub fn analyze(&self, route: &RoutedPath) -> Result<RouteAnalysis> {
        let segmented = build_segments(route, &self.config.segmentation);
        if segmented.segments.is_empty() {
            return Err(Error::EmptyRoute(route.label.clone()));
        }

        let elevations = lookup_elevations(self.elevation, &segmented.query);
        let reconciled = reconcile(
            segmented.segments,
            &segmented.query,
            &elevations,
            &self.config.grade_filter,
        );
        let mut segments = reconciled.segments;

        let impact = self.engine.weather_impact(&mut segments, &self.weather);
        let distance_km = segments.iter().map(|s| s.segment.distance_m).sum::<f64>() / 1000.0;
        let time_min = route.summary.duration / 60.0;
        let events = RouteEvents::collect(&segments, &self.weather);

        info!(
            "Route '{}': {:.1} km, {:.0} g CO2 (weather {:+.1}%)",
            route.label, distance_km, impact.co2_g, impact.delta_pct
        );

        Ok(RouteAnalysis {
            label: route.label.clone(),
            segments,
            stats: reconciled.stats,
            distance_km,
            time_min,
            co2_g: impact.co2_g,
            weather_delta_g: impact.delta_g,
            weather_impact_pct: impact.delta_pct,
            events,
        })
    }
}

impl<'a, E: ElevationSource + Sync + ?Sized> RouteAnalyzer<'a, E> {
    /// Analyse alternatives independently; degenerate routes are logged and skipped.
    /// Results keep the input order.
    pub fn analyze_all(&self, routes: &[RoutedPath]) -> Vec<RouteAnalysis> {
        routes
            .par_iter()
            .map(|route| self.analyze(route))
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|result| match result {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    warn!("Skipping route: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Mean of the per-route average speeds, over routes with a positive travel time.
pub fn average_car_speed(analyses: &[RouteAnalysis]) -> Option<f64> {
    let speeds: Vec<f64> = analyses.iter().filter_map(|a| a.avg_speed_kph()).collect();
    if speeds.is_empty() {
        None
    } else {
        Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub car_label: String,
    pub car_co2_g: f64,
    pub car_time_min: f64,
    pub transit_path_type: String,
    pub transit_co2_g: f64,
    pub transit_time_min: f64,
    pub saved_co2_g: f64,
    pub reduction_pct: f64,
    pub pine_tree_years: f64,
    /// Events of the representative car route
    pub car_events: RouteEvents,
}

/// First car route against the lowest-emission transit itinerary.
pub fn compare(car: &[RouteAnalysis], transit: &[TransitResult]) -> Option<ComparisonReport> {
    let rep_car = car.first()?;
    let rep_transit = transit
        .iter()
        .min_by(|a, b| a.total_co2_g.total_cmp(&b.total_co2_g))?;

    let saved_co2_g = rep_car.co2_g - rep_transit.total_co2_g;
    let reduction_pct = if rep_car.co2_g > 0.0 {
        saved_co2_g / rep_car.co2_g * 100.0
    } else {
        0.0
    };

    Some(ComparisonReport {
        car_label: rep_car.label.clone(),
        car_co2_g: rep_car.co2_g,
        car_time_min: rep_car.time_min,
        transit_path_type: rep_transit.path_type.clone(),
        transit_co2_g: rep_transit.total_co2_g,
        transit_time_min: rep_transit.total_time_min,
        saved_co2_g,
        reduction_pct,
        pine_tree_years: saved_co2_g / PINE_TREE_G_PER_YEAR,
        car_events: rep_car.events,
    })
}
