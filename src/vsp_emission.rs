/// VSP Emission Engine
///
/// Vehicle-Specific Power per micro-segment from speed, acceleration, grade,
/// weather and the vehicle's drag/mass, mapped to CO2:
/// - combustion and hybrid engines through a 16-bin VSP emission-rate table (g/s);
/// - electric vehicles through battery energy and the grid emission factor.
use log::debug;
use serde::Serialize;

use crate::elevation_reconciler::CorrectedSegment;
use crate::vehicle::{EngineType, VehicleSpec};
use crate::weather::{WeatherFactors, WeatherState};

/// CO2 rate in g/s per VSP bin (0 = braking, 1 = idle, 2..=14 ascending load)
pub const EMISSION_RATES_G_PER_S: [f64; 16] = [
    0.20, 0.75, 1.40, 2.10, 2.90, 3.80, 4.80, 5.90, 7.10, 8.40, 9.80, 11.50, 13.50, 16.00, 19.50, 25.00,
];
pub const UNMAPPED_BIN_RATE: f64 = 5.0;

/// Upper VSP bound (W/kg) of bins 2..=13; anything above falls in bin 14
const BIN_THRESHOLDS: [f64; 12] = [3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 21.0, 24.0, 27.0, 30.0, 33.0, 39.0];

pub const GRID_CO2_G_PER_KWH: f64 = 424.0;
const DRIVE_EFFICIENCY: f64 = 0.85;
const REGEN_EFFICIENCY: f64 = 0.60;

const STOP_AND_GO_CONGESTION: u8 = 3;
const STOP_AND_GO_ACCEL: f64 = 0.15;

const HYBRID_EV_MODE_FACTOR: f64 = 0.1;
const HYBRID_ASSIST_FACTOR: f64 = 0.7;

pub fn vehicle_specific_power(
    speed_kph: f64,
    accel_mps2: f64,
    grade_pct: f64,
    factors: &WeatherFactors,
    aux_load: f64,
    drag_term: f64,
) -> f64 {
    let v = speed_kph / 3.6;
    let grade = grade_pct / 100.0;
    let traction = v * (1.1 * accel_mps2 + 9.81 * grade + factors.rolling_coeff);
    let aero = drag_term * factors.k_air * v.powi(3);
    traction + aero + aux_load
}

/// VSP bin: 1 when idling, 0 when VSP is negative, then one bin per threshold.
pub fn vsp_bin(vsp: f64, speed_kph: f64) -> usize {
    if speed_kph < 1.0 {
        return 1;
    }
    if vsp < 0.0 {
        return 0;
    }
    BIN_THRESHOLDS
        .iter()
        .position(|&upper| vsp < upper)
        .map(|i| i + 2)
        .unwrap_or(14)
}

pub fn bin_rate(bin: usize) -> f64 {
    EMISSION_RATES_G_PER_S.get(bin).copied().unwrap_or(UNMAPPED_BIN_RATE)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub time_s: f64,
    pub accel_mps2: f64,
}

/// Travel time and mean acceleration of a segment, with the stop-and-go
/// penalty for congested traffic.
pub fn kinematics(seg: &CorrectedSegment) -> Kinematics {
    let s = &seg.segment;
    let time_s = if s.speed_kph > 0.1 {
        s.distance_m / (s.speed_kph / 3.6)
    } else {
        0.0
    };

    let mut accel_mps2 = if time_s > 0.0 {
        (s.delta_speed_kph / 3.6) / time_s
    } else {
        0.0
    };
    if s.congestion >= STOP_AND_GO_CONGESTION {
        accel_mps2 += STOP_AND_GO_ACCEL;
    }

    Kinematics { time_s, accel_mps2 }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EmissionTotals {
    pub co2_g: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeatherImpact {
    pub co2_g: f64,
    pub reference_co2_g: f64,
    pub delta_g: f64,
    pub delta_pct: f64,
}

#[derive(Debug, Clone)]
pub struct EmissionEngine {
    vehicle: VehicleSpec,
}

impl EmissionEngine {
    pub fn new(vehicle: VehicleSpec) -> Self {
        EmissionEngine { vehicle }
    }

    pub fn vehicle(&self) -> &VehicleSpec {
        &self.vehicle
    }

    /// CO2 grams for one segment under the given weather terms.
    pub fn segment_emission(&self, seg: &CorrectedSegment, factors: &WeatherFactors) -> f64 {
        let Kinematics { time_s, accel_mps2 } = kinematics(seg);
        let speed_kph = seg.segment.speed_kph;

        let vsp_aux = match self.vehicle.engine {
            EngineType::Electric => 0.0,
            _ => factors.aux_load,
        };
        let vsp = vehicle_specific_power(
            speed_kph,
            accel_mps2,
            seg.grade_pct,
            factors,
            vsp_aux,
            self.vehicle.drag_term,
        );

        match self.vehicle.engine {
            EngineType::InternalCombustion => {
                bin_rate(vsp_bin(vsp, speed_kph)) * time_s * self.vehicle.emission_factor
            }
            EngineType::Hybrid => {
                let base = bin_rate(vsp_bin(vsp, speed_kph)) * time_s;
                let split = if vsp < 5.0 && speed_kph < 40.0 {
                    HYBRID_EV_MODE_FACTOR
                } else {
                    HYBRID_ASSIST_FACTOR
                };
                base * split * self.vehicle.emission_factor
            }
            EngineType::Electric => {
                let power_kw = vsp * (self.vehicle.weight_kg / 1000.0);
                let raw_kwh = power_kw * time_s / 3600.0;
                let energy_kwh = if power_kw > 0.0 {
                    raw_kwh / DRIVE_EFFICIENCY
                } else {
                    raw_kwh * REGEN_EFFICIENCY
                };
                // auxiliary load reused as a dimensionless energy surcharge
                let energy_kwh = energy_kwh * (1.0 + factors.aux_load * 0.1);
                energy_kwh * GRID_CO2_G_PER_KWH
            }
        }
    }

    /// Totals without touching the segments.
    pub fn totals(&self, segments: &[CorrectedSegment], weather: &WeatherState) -> EmissionTotals {
        let factors = weather.factors();
        segments.iter().fold(EmissionTotals::default(), |acc, seg| EmissionTotals {
            co2_g: acc.co2_g + self.segment_emission(seg, &factors),
            distance_km: acc.distance_km + seg.segment.distance_m / 1000.0,
        })
    }

    /// Totals, annotating every segment with its own contribution.
    pub fn calculate(&self, segments: &mut [CorrectedSegment], weather: &WeatherState) -> EmissionTotals {
        let factors = weather.factors();
        let mut totals = EmissionTotals::default();
        for seg in segments.iter_mut() {
            seg.emission_g = self.segment_emission(seg, &factors);
            totals.co2_g += seg.emission_g;
            totals.distance_km += seg.segment.distance_m / 1000.0;
        }
        totals
    }

    /// Actual-weather emission against the reference-weather run on the same segments.
    pub fn weather_impact(&self, segments: &mut [CorrectedSegment], weather: &WeatherState) -> WeatherImpact {
        let actual = self.calculate(segments, weather);
        let reference = self.totals(segments, &WeatherState::reference());

        let delta_g = actual.co2_g - reference.co2_g;
        let delta_pct = if reference.co2_g > 0.0 {
            delta_g / reference.co2_g * 100.0
        } else {
            0.0
        };

        debug!(
            "Weather impact for {}: {:.1} g vs {:.1} g reference ({:+.1}%)",
            self.vehicle.name, actual.co2_g, reference.co2_g, delta_pct
        );

        WeatherImpact {
            co2_g: actual.co2_g,
            reference_co2_g: reference.co2_g,
            delta_g,
            delta_pct,
        }
    }
}
