/// Elevation Reconciler - merge looked-up altitudes onto segments and derive grades
///
/// Elevation samples along a road polyline are noisy and occasionally cut
/// through tunnels or across bridges, which turns into impossible slopes.
/// The profile is despiked and smoothed first, then every segment's grade is
/// checked against terrain-aware rules:
/// - highway-like roads are kept between ±5 %, sub-0.5 % noise is flattened and
///   a straight segment with a >7 % jump is treated as a tunnel artifact;
/// - ordinary roads accept up to ±15 %; beyond that the grade is replaced by the
///   mean of the previous final grade and a one-step look-ahead estimate.
///
/// The corrected altitudes are re-integrated from the grades, so the profile
/// stays continuous from one segment to the next.
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::elevation_filter::smooth_profile;
use crate::geo_utils::Coordinate;
use crate::segment_builder::{ElevationQuery, RoadSegment};

/// Elevation collaborator: one altitude (meters) per requested coordinate,
/// 0.0 for anything it could not resolve.
pub trait ElevationSource {
    fn elevations(&self, coords: &[Coordinate]) -> Vec<f64>;
}

impl<F> ElevationSource for F
where
    F: Fn(&[Coordinate]) -> Vec<f64>,
{
    fn elevations(&self, coords: &[Coordinate]) -> Vec<f64> {
        self(coords)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeFilterConfig {
    pub median_window: usize,
    pub average_window: usize,
    pub highway_speed_kph: f64,
    /// Road-name fragments for expressways, interchanges, junctions, ring roads, bridges, tunnels
    pub highway_keywords: Vec<String>,
    pub flat_noise_pct: f64,
    pub tunnel_jump_pct: f64,
    pub straight_sinuosity: f64,
    pub highway_limit_pct: f64,
    pub local_limit_pct: f64,
}

impl Default for GradeFilterConfig {
    fn default() -> Self {
        GradeFilterConfig {
            median_window: 5,
            average_window: 10,
            highway_speed_kph: 80.0,
            highway_keywords: ["고속", "IC", "JC", "순환", "대교", "터널"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            flat_noise_pct: 0.5,
            tunnel_jump_pct: 7.0,
            straight_sinuosity: 1.05,
            highway_limit_pct: 5.0,
            local_limit_pct: 15.0,
        }
    }
}

impl GradeFilterConfig {
    pub fn is_highway_like(&self, segment: &RoadSegment) -> bool {
        segment.speed_kph >= self.highway_speed_kph
            || self.highway_keywords.iter().any(|k| segment.name.contains(k.as_str()))
    }
}

/// How a segment's grade was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeCorrection {
    /// Raw grade accepted (possibly clamped to the highway limit)
    Accepted,
    /// Highway grade under the noise floor, flattened
    FlatNoise,
    /// Straight highway segment with an implausible jump, flattened
    TunnelArtifact,
    /// Steep but winding highway segment, clamped
    RealGrade,
    /// Ordinary road beyond the local limit, replaced by the neighbor average
    NeighborAveraged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionStats {
    pub tunnel: usize,
    pub real: usize,
    pub neighbor_avg: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedSegment {
    pub segment: RoadSegment,
    pub start_alt_m: f64,
    pub end_alt_m: f64,
    pub grade_pct: f64,
    pub correction: GradeCorrection,
    /// Filled in by the emission engine
    pub emission_g: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciledRoute {
    pub segments: Vec<CorrectedSegment>,
    pub stats: CorrectionStats,
}

/// Run the elevation collaborator once for the whole query and scatter its
/// answers back by coordinate. A short answer is zero-padded, a long one truncated.
pub fn lookup_elevations<E: ElevationSource + ?Sized>(source: &E, query: &ElevationQuery) -> Vec<f64> {
    if query.is_empty() {
        return vec![];
    }

    let mut answers = source.elevations(query.coords());
    if answers.len() != query.len() {
        warn!(
            "Elevation lookup returned {} values for {} coordinates, substituting 0 m",
            answers.len(),
            query.len()
        );
        answers.resize(query.len(), 0.0);
    }
    for alt in answers.iter_mut() {
        if !alt.is_finite() {
            *alt = 0.0;
        }
    }
    answers
}

fn altitude_at(query: &ElevationQuery, elevations: &[f64], coord: &Coordinate) -> f64 {
    query
        .position(coord)
        .and_then(|i| elevations.get(i).copied())
        .unwrap_or(0.0)
}

/// Altitude sequence of N+1 values: start of the first segment, then every segment end.
pub fn raw_profile(segments: &[RoadSegment], query: &ElevationQuery, elevations: &[f64]) -> Vec<f64> {
    let Some(first) = segments.first() else {
        return vec![];
    };

    let mut profile = Vec::with_capacity(segments.len() + 1);
    profile.push(altitude_at(query, elevations, &first.start));
    profile.extend(segments.iter().map(|s| altitude_at(query, elevations, &s.end)));
    profile
}

fn grade_pct(rise_m: f64, distance_m: f64) -> f64 {
    if distance_m > 0.0 {
        rise_m / distance_m * 100.0
    } else {
        0.0
    }
}

/// Grade carried from one segment to the next during correction.
#[derive(Debug, Default)]
struct GradeAccumulator {
    current_alt_m: f64,
    prev_final_grade_pct: f64,
}

pub fn reconcile(
    segments: Vec<RoadSegment>,
    query: &ElevationQuery,
    elevations: &[f64],
    config: &GradeFilterConfig,
) -> ReconciledRoute {
    let raw = raw_profile(&segments, query, elevations);
    let smoothed = smooth_profile(&raw, config.median_window, config.average_window);
    correct_grades(segments, &smoothed, config)
}

/// Derive corrected grades from an already smoothed N+1 altitude profile.
pub fn correct_grades(segments: Vec<RoadSegment>, smoothed: &[f64], config: &GradeFilterConfig) -> ReconciledRoute {
    if segments.is_empty() || smoothed.len() != segments.len() + 1 {
        return ReconciledRoute::default();
    }

    let mut stats = CorrectionStats::default();
    let mut acc = GradeAccumulator {
        current_alt_m: smoothed[0],
        prev_final_grade_pct: 0.0,
    };
    let mut corrected = Vec::with_capacity(segments.len());

    for i in 0..segments.len() {
        let seg = &segments[i];
        let raw_grade = grade_pct(smoothed[i + 1] - acc.current_alt_m, seg.distance_m);

        let (final_grade, correction) = if config.is_highway_like(seg) {
            highway_grade(raw_grade, seg.sinuosity, config)
        } else if raw_grade.abs() > config.local_limit_pct {
            // look-ahead uses the raw smoothed slope of the next segment
            let next_estimate = segments
                .get(i + 1)
                .filter(|next| next.distance_m > 0.0 && i + 2 < smoothed.len())
                .map(|next| grade_pct(smoothed[i + 2] - smoothed[i + 1], next.distance_m))
                .unwrap_or(0.0);

            let averaged = (acc.prev_final_grade_pct + next_estimate) / 2.0;
            let limit = config.local_limit_pct;
            (averaged.clamp(-limit, limit), GradeCorrection::NeighborAveraged)
        } else {
            (raw_grade, GradeCorrection::Accepted)
        };

        match correction {
            GradeCorrection::TunnelArtifact => stats.tunnel += 1,
            GradeCorrection::RealGrade => stats.real += 1,
            GradeCorrection::NeighborAveraged => stats.neighbor_avg += 1,
            _ => {}
        }

        let start_alt_m = acc.current_alt_m;
        let end_alt_m = start_alt_m + seg.distance_m * final_grade / 100.0;
        acc.current_alt_m = end_alt_m;
        acc.prev_final_grade_pct = final_grade;

        corrected.push(CorrectedSegment {
            segment: seg.clone(),
            start_alt_m,
            end_alt_m,
            grade_pct: final_grade,
            correction,
            emission_g: 0.0,
        });
    }

    info!(
        "Grade filter: tunnel {} / mountain {} / neighbor {} over {} segments",
        stats.tunnel,
        stats.real,
        stats.neighbor_avg,
        corrected.len()
    );

    ReconciledRoute {
        segments: corrected,
        stats,
    }
}

fn highway_grade(raw_grade: f64, sinuosity: f64, config: &GradeFilterConfig) -> (f64, GradeCorrection) {
    let limit = config.highway_limit_pct;
    let magnitude = raw_grade.abs();

    if magnitude < config.flat_noise_pct {
        (0.0, GradeCorrection::FlatNoise)
    } else if magnitude > config.tunnel_jump_pct {
        if sinuosity < config.straight_sinuosity {
            (0.0, GradeCorrection::TunnelArtifact)
        } else {
            (raw_grade.clamp(-limit, limit), GradeCorrection::RealGrade)
        }
    } else {
        (raw_grade.clamp(-limit, limit), GradeCorrection::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(name: &str, distance_m: f64, speed_kph: f64, sinuosity: f64) -> RoadSegment {
        let origin = Coordinate::new(37.0, 127.0).unwrap();
        RoadSegment {
            name: name.to_string(),
            distance_m,
            speed_kph,
            congestion: 0,
            delta_speed_kph: 0.0,
            start: origin,
            end: origin,
            sinuosity,
        }
    }

    #[test]
    fn test_highway_classification() {
        let config = GradeFilterConfig::default();
        assert!(config.is_highway_like(&seg("local", 100.0, 80.0, 1.0)));
        assert!(config.is_highway_like(&seg("남산1호터널", 100.0, 40.0, 1.0)));
        assert!(config.is_highway_like(&seg("신갈JC", 100.0, 40.0, 1.0)));
        assert!(!config.is_highway_like(&seg("덕영대로", 100.0, 60.0, 1.0)));
    }

    #[test]
    fn test_tunnel_artifact_is_flattened() {
        let config = GradeFilterConfig::default();
        // 12 m rise over 100 m on a straight expressway segment
        let result = correct_grades(vec![seg("경부고속도로", 100.0, 90.0, 1.01)], &[50.0, 62.0], &config);

        let s = &result.segments[0];
        assert_eq!(s.grade_pct, 0.0);
        assert_eq!(s.correction, GradeCorrection::TunnelArtifact);
        assert_eq!(result.stats.tunnel, 1);
        assert_eq!(s.start_alt_m, 50.0);
        assert_eq!(s.end_alt_m, 50.0);
    }

    #[test]
    fn test_winding_highway_grade_is_clamped() {
        let config = GradeFilterConfig::default();
        let result = correct_grades(vec![seg("highway", 100.0, 90.0, 1.3)], &[50.0, 41.0], &config);

        assert_eq!(result.segments[0].grade_pct, -5.0);
        assert_eq!(result.segments[0].correction, GradeCorrection::RealGrade);
        assert_eq!(result.stats.real, 1);
    }

    #[test]
    fn test_highway_noise_and_moderate_clamp() {
        let config = GradeFilterConfig::default();
        let result = correct_grades(
            vec![seg("highway", 100.0, 90.0, 1.0), seg("highway", 100.0, 90.0, 1.0)],
            &[50.0, 50.3, 56.5],
            &config,
        );

        assert_eq!(result.segments[0].grade_pct, 0.0);
        assert_eq!(result.segments[0].correction, GradeCorrection::FlatNoise);
        // current altitude stays at 50.0, so raw grade is 6.5 %, clamped to 5 %
        assert_eq!(result.segments[1].grade_pct, 5.0);
        assert_eq!(result.segments[1].correction, GradeCorrection::Accepted);
        assert_eq!(result.stats, CorrectionStats::default());
    }

    #[test]
    fn test_local_grade_within_limit_is_exact() {
        let config = GradeFilterConfig::default();
        let result = correct_grades(vec![seg("local", 200.0, 40.0, 1.0)], &[100.0, 124.0], &config);

        let raw = (124.0 - 100.0) / 200.0 * 100.0;
        assert_eq!(result.segments[0].grade_pct, raw);
        assert_eq!(result.segments[0].correction, GradeCorrection::Accepted);
    }

    #[test]
    fn test_local_spike_uses_neighbor_average() {
        let config = GradeFilterConfig::default();
        let segments = vec![
            seg("local", 100.0, 40.0, 1.0),
            seg("local", 100.0, 40.0, 1.0),
            seg("local", 100.0, 40.0, 1.0),
        ];
        // grades: +4 %, then +40 % spike, then +6 % look-ahead
        let smoothed = [0.0, 4.0, 44.0, 50.0];
        let result = correct_grades(segments, &smoothed, &config);

        assert_eq!(result.segments[0].grade_pct, 4.0);
        assert_eq!(result.segments[1].grade_pct, 5.0);
        assert_eq!(result.segments[1].correction, GradeCorrection::NeighborAveraged);

        // re-integrated altitude: 4 + 5 = 9 m, next raw grade (50 - 9) % is a spike again
        assert!((result.segments[1].end_alt_m - 9.0).abs() < 1e-12);
        assert_eq!(result.segments[2].correction, GradeCorrection::NeighborAveraged);
        // look-ahead past the end is 0, previous final is 5 %
        assert!((result.segments[2].grade_pct - 2.5).abs() < 1e-12);
        assert_eq!(result.stats.neighbor_avg, 2);
    }

    #[test]
    fn test_profile_is_continuous() {
        let config = GradeFilterConfig::default();
        let segments: Vec<RoadSegment> = (0..6).map(|i| seg("mixed", 100.0 + i as f64, 30.0 + 15.0 * i as f64, 1.0)).collect();
        let smoothed = [10.0, 14.0, 40.0, 41.0, 30.0, 30.2, 60.0];
        let result = correct_grades(segments, &smoothed, &config);

        for w in result.segments.windows(2) {
            assert_eq!(w[0].end_alt_m, w[1].start_alt_m);
        }
        for s in &result.segments {
            assert!(s.grade_pct.abs() <= 15.0);
        }
    }

    #[test]
    fn test_lookup_tolerates_short_answers() {
        let mut query = ElevationQuery::new();
        query.push(Coordinate::new(37.0, 127.0).unwrap());
        query.push(Coordinate::new(37.001, 127.0).unwrap());
        query.push(Coordinate::new(37.002, 127.0).unwrap());

        let source = |_: &[Coordinate]| vec![12.0, f64::NAN];
        let alts = lookup_elevations(&source, &query);
        assert_eq!(alts, vec![12.0, 0.0, 0.0]);
    }

    #[test]
    fn test_reconcile_maps_altitudes_by_coordinate() {
        let a = Coordinate::new(37.0, 127.0).unwrap();
        let b = Coordinate::new(37.001, 127.0).unwrap();
        let mut s = seg("local", 111.0, 40.0, 1.0);
        s.start = a;
        s.end = b;

        let mut query = ElevationQuery::new();
        query.push(a);
        query.push(b);

        let profile = raw_profile(std::slice::from_ref(&s), &query, &[20.0, 25.0]);
        assert_eq!(profile, vec![20.0, 25.0]);

        let result = reconcile(vec![s], &query, &[20.0, 25.0], &GradeFilterConfig::default());
        assert_eq!(result.segments.len(), 1);
        // two-point profile smooths to its mean at both ends
        assert_eq!(result.segments[0].grade_pct, 0.0);
    }
}
