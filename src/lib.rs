//! Route-level CO2 estimation for cars and public transit.
//!
//! A routed car path is cut into ~100 m micro-segments, reconciled against an
//! elevation profile and run through a Vehicle-Specific-Power emission model.
//! Transit itineraries get a per-passenger estimate that reacts to time of day
//! and to how congested the same corridor is for cars.

pub mod analysis;
pub mod elevation_filter;
pub mod elevation_reconciler;
pub mod error;
pub mod geo_utils;
pub mod route_input;
pub mod segment_builder;
pub mod transit;
pub mod vehicle;
pub mod vsp_emission;
pub mod weather;

pub use analysis::{average_car_speed, compare, AnalysisConfig, ComparisonReport, RouteAnalysis, RouteAnalyzer, RouteEvents};
pub use elevation_reconciler::{CorrectedSegment, CorrectionStats, ElevationSource, GradeCorrection, GradeFilterConfig};
pub use error::{Error, Result};
pub use geo_utils::Coordinate;
pub use route_input::{dedup_alternatives, RoutedPath};
pub use segment_builder::{build_segments, RoadSegment, SegmentationConfig};
pub use transit::{TransitConfig, TransitItinerary, TransitModel, TransitResult};
pub use vehicle::{EngineType, VehicleSpec};
pub use vsp_emission::{EmissionEngine, EmissionTotals, WeatherImpact};
pub use weather::WeatherState;
