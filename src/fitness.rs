//! Aerobic fitness estimation from run history and wearable recovery data.
//!
//! The VO2max estimate chains three pieces of sports science over each
//! qualifying run: a Riegel-style extrapolation from the run's pace to a
//! predicted 12-minute-effort distance, the Cooper-test regression from
//! that distance to VO2max, and a heart-rate-reserve correction that
//! scales submaximal efforts up to what a near-maximal effort would
//! deliver. Recent best efforts represent current fitness better than a
//! long-run average diluted by easy sessions, so only the top estimates
//! inside the lookback window are averaged.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Activity, RecoveryRecord, POWER_RIDE_TYPES, RUN_TYPES};

/// Cooper-test regression: VO2max = (12-minute distance − 504.9) / 44.73.
const COOPER_INTERCEPT_M: f64 = 504.9;
const COOPER_SLOPE: f64 = 44.73;

/// Seconds per hour, for training-volume aggregation.
const SECS_PER_HOUR: f64 = 3600.0;

/// Configuration for the fitness estimator.
///
/// Defaults are the production values; tests override fields directly.
#[derive(Debug, Clone)]
pub struct FitnessConfig {
    /// Assumed maximum heart rate in bpm. Default: 172.0
    pub max_hr: f64,
    /// Resting heart rate used when no wearable record is available, in
    /// bpm. Default: 52.0
    pub default_resting_hr: f64,
    /// Pace-to-12-minute-effort correction factor. Default: 0.92
    pub fatigue_factor: f64,
    /// Efforts at or above this fraction of heart-rate reserve are
    /// treated as maximal and left uncorrected. Default: 0.95
    pub hr_correction_ceiling: f64,
    /// How far back qualifying runs are considered, in days. Default: 90
    pub lookback_days: i64,
    /// Minimum run distance in meters. Default: 3000.0
    pub min_distance: f64,
    /// Minimum run moving time in seconds. Default: 600
    pub min_moving_time: u32,
    /// Estimates at or below this are discarded as implausible.
    /// Default: 30.0
    pub vo2max_floor: f64,
    /// Estimates are capped here before plausibility filtering.
    /// Default: 65.0
    pub vo2max_cap: f64,
    /// How many of the best per-run estimates are averaged. Default: 3
    pub top_estimates: usize,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            max_hr: 172.0,
            default_resting_hr: 52.0,
            fatigue_factor: 0.92,
            hr_correction_ceiling: 0.95,
            lookback_days: 90,
            min_distance: 3000.0,
            min_moving_time: 600,
            vo2max_floor: 30.0,
            vo2max_cap: 65.0,
            top_estimates: 3,
        }
    }
}

impl FitnessConfig {
    /// Reject values that would make the estimator degenerate. Advisory:
    /// the estimator itself never calls this.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.max_hr > 0.0) {
            return Err(crate::Error::Config("max_hr must be positive".into()));
        }
        if !(self.fatigue_factor > 0.0) {
            return Err(crate::Error::Config("fatigue_factor must be positive".into()));
        }
        if !(self.vo2max_cap > self.vo2max_floor) {
            return Err(crate::Error::Config(
                "vo2max_cap must exceed vo2max_floor".into(),
            ));
        }
        if self.top_estimates == 0 {
            return Err(crate::Error::Config("top_estimates must be at least 1".into()));
        }
        Ok(())
    }
}

/// Classification of a VO2max value for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FitnessLevel {
    Excellent,
    VeryGood,
    Good,
    Average,
    BelowAverage,
}

impl FitnessLevel {
    /// Classify an estimate.
    pub fn from_vo2max(vo2max: u32) -> Self {
        match vo2max {
            v if v >= 55 => FitnessLevel::Excellent,
            v if v >= 48 => FitnessLevel::VeryGood,
            v if v >= 42 => FitnessLevel::Good,
            v if v >= 36 => FitnessLevel::Average,
            _ => FitnessLevel::BelowAverage,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FitnessLevel::Excellent => "Excellent",
            FitnessLevel::VeryGood => "Very good",
            FitnessLevel::Good => "Good",
            FitnessLevel::Average => "Average",
            FitnessLevel::BelowAverage => "Below average",
        }
    }
}

/// The fitness card: the VO2max estimate plus the supporting numbers a
/// dashboard shows next to it. Serialized `camelCase`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessSummary {
    /// Estimated VO2max, absent when no qualifying run survives.
    pub vo2max: Option<u32>,
    /// Classification of the estimate.
    pub level: Option<FitnessLevel>,
    /// Rounded wearable resting heart rate, when a record is present.
    pub resting_hr: Option<u32>,
    /// Average weekly training hours over the lookback window, one
    /// decimal place.
    pub hours_per_week: f64,
    /// Mean watts over power-recorded road/virtual rides in the window.
    pub avg_watts: Option<u32>,
}

/// Estimate VO2max with default configuration.
///
/// See [`estimate_vo2max_with_config`]. `now` anchors the lookback
/// window so the estimate is a pure function of its inputs.
pub fn estimate_vo2max(
    activities: &[Activity],
    recovery: Option<&RecoveryRecord>,
    now: DateTime<Utc>,
) -> Option<u32> {
    estimate_vo2max_with_config(activities, recovery, now, &FitnessConfig::default())
}

/// Estimate VO2max from recent run history.
///
/// Qualifying runs (run-family type, recorded heart rate, at least the
/// configured distance and moving time, inside the lookback window) each
/// produce one estimate; implausible ones are discarded and the top few
/// are averaged. Returns `None` (never zero) when nothing qualifies.
pub fn estimate_vo2max_with_config(
    activities: &[Activity],
    recovery: Option<&RecoveryRecord>,
    now: DateTime<Utc>,
    config: &FitnessConfig,
) -> Option<u32> {
    let cutoff = now - Duration::days(config.lookback_days);
    let resting_hr = resting_heart_rate(recovery, config);
    let hr_reserve = config.max_hr - resting_hr;

    let mut estimates: Vec<f64> = activities
        .iter()
        .filter(|a| is_estimator_candidate(a, cutoff, config))
        .filter_map(|a| single_run_estimate(a, resting_hr, hr_reserve, config))
        .filter(|v| *v > config.vo2max_floor && *v <= config.vo2max_cap)
        .collect();

    if estimates.is_empty() {
        return None;
    }

    estimates.sort_by(|a, b| b.total_cmp(a));
    let top = &estimates[..estimates.len().min(config.top_estimates)];
    let mean = top.iter().sum::<f64>() / top.len() as f64;

    debug!(
        "vo2max {:.1} from top {} of {} plausible estimates",
        mean,
        top.len(),
        estimates.len()
    );

    Some(mean.round() as u32)
}

/// Build the full fitness card with default configuration.
pub fn fitness_summary(
    activities: &[Activity],
    recovery: Option<&RecoveryRecord>,
    now: DateTime<Utc>,
) -> FitnessSummary {
    fitness_summary_with_config(activities, recovery, now, &FitnessConfig::default())
}

/// Build the full fitness card: VO2max, resting heart rate, weekly
/// training volume and average ride power over the lookback window.
pub fn fitness_summary_with_config(
    activities: &[Activity],
    recovery: Option<&RecoveryRecord>,
    now: DateTime<Utc>,
    config: &FitnessConfig,
) -> FitnessSummary {
    let cutoff = now - Duration::days(config.lookback_days);
    let recent: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.start_date >= cutoff)
        .collect();

    let vo2max = estimate_vo2max_with_config(activities, recovery, now, config);

    let total_moving: u64 = recent.iter().map(|a| u64::from(a.moving_time)).sum();
    let weeks = config.lookback_days as f64 / 7.0;
    let hours_per_week = if weeks > 0.0 {
        (total_moving as f64 / SECS_PER_HOUR / weeks * 10.0).round() / 10.0
    } else {
        0.0
    };

    let watts: Vec<f64> = recent
        .iter()
        .filter(|a| POWER_RIDE_TYPES.contains(&a.sport_type.as_str()))
        .filter_map(|a| a.average_watts)
        .collect();
    let avg_watts = if watts.is_empty() {
        None
    } else {
        Some((watts.iter().sum::<f64>() / watts.len() as f64).round() as u32)
    };

    FitnessSummary {
        vo2max,
        level: vo2max.map(FitnessLevel::from_vo2max),
        resting_hr: recovery
            .and_then(|r| r.resting_hr)
            .map(|hr| hr.round() as u32),
        hours_per_week,
        avg_watts,
    }
}

fn is_estimator_candidate(
    activity: &Activity,
    cutoff: DateTime<Utc>,
    config: &FitnessConfig,
) -> bool {
    RUN_TYPES.contains(&activity.sport_type.as_str())
        && activity.average_heartrate.is_some()
        && activity.distance >= config.min_distance
        && activity.moving_time >= config.min_moving_time
        && activity.start_date >= cutoff
}

/// One run's VO2max estimate, capped but not yet plausibility-filtered.
fn single_run_estimate(
    run: &Activity,
    resting_hr: f64,
    hr_reserve: f64,
    config: &FitnessConfig,
) -> Option<f64> {
    let avg_hr = run.average_heartrate?;
    if run.distance <= 0.0 || run.moving_time == 0 {
        return None;
    }

    let pace_min_per_km = (f64::from(run.moving_time) / 60.0) / (run.distance / 1000.0);
    let predicted_12min_m = (12.0 / pace_min_per_km) * 1000.0 * config.fatigue_factor;
    let mut estimate = (predicted_12min_m - COOPER_INTERCEPT_M) / COOPER_SLOPE;

    // A zero or negative reserve makes the effort ratio meaningless;
    // the raw estimate stands uncorrected in that case, as it does for
    // maximal efforts.
    if hr_reserve > 0.0 {
        let hr_percentage = (avg_hr - resting_hr) / hr_reserve;
        if hr_percentage > 0.0 && hr_percentage < config.hr_correction_ceiling {
            estimate /= hr_percentage;
        }
    }

    Some(estimate.min(config.vo2max_cap))
}

fn resting_heart_rate(recovery: Option<&RecoveryRecord>, config: &FitnessConfig) -> f64 {
    recovery
        .and_then(|r| r.resting_hr)
        .map_or(config.default_resting_hr, f64::round)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 30, 12, 0, 0).unwrap()
    }

    fn run(
        id: &str,
        distance: f64,
        moving_time: u32,
        avg_hr: Option<f64>,
        days_ago: i64,
    ) -> Activity {
        Activity {
            id: id.to_string(),
            name: format!("Run {}", id),
            sport_type: "Run".to_string(),
            distance,
            moving_time,
            elapsed_time: moving_time + 40,
            average_heartrate: avg_hr,
            average_watts: None,
            start_date: now() - Duration::days(days_ago),
            start_latlng: None,
            summary_polyline: None,
        }
    }

    fn recovery(resting_hr: f64) -> RecoveryRecord {
        RecoveryRecord {
            resting_hr: Some(resting_hr),
        }
    }

    #[test]
    fn worked_example_five_k_at_threshold() {
        // 5km in 25:00 at HR 150 with resting HR 50:
        // pace 5.0 → predicted 12-min distance 2208m → base ≈ 38.1,
        // effort ratio 100/122 ≈ 0.82 → corrected ≈ 46.5.
        let runs = vec![run("a", 5000.0, 1500, Some(150.0), 5)];
        let estimate = estimate_vo2max(&runs, Some(&recovery(50.0)), now());
        assert_eq!(estimate, Some(46));
    }

    #[test]
    fn no_qualifying_runs_is_absent_not_zero() {
        assert_eq!(estimate_vo2max(&[], None, now()), None);

        // All too short.
        let short = vec![run("a", 2500.0, 900, Some(150.0), 5)];
        assert_eq!(estimate_vo2max(&short, None, now()), None);

        // No heart rate recorded.
        let no_hr = vec![run("a", 5000.0, 1500, None, 5)];
        assert_eq!(estimate_vo2max(&no_hr, None, now()), None);

        // Outside the 90-day window.
        let stale = vec![run("a", 5000.0, 1500, Some(150.0), 120)];
        assert_eq!(estimate_vo2max(&stale, None, now()), None);

        // Wrong sport.
        let mut ride = run("a", 40000.0, 4800, Some(140.0), 5);
        ride.sport_type = "Ride".to_string();
        assert_eq!(estimate_vo2max(&[ride], None, now()), None);
    }

    #[test]
    fn implausibly_low_estimates_are_discarded() {
        // A 40-minute 5km jog lands well under the plausibility floor
        // even after correction.
        let slow = vec![run("a", 5000.0, 2400, Some(150.0), 5)];
        assert_eq!(estimate_vo2max(&slow, None, now()), None);
    }

    #[test]
    fn near_maximal_efforts_are_not_corrected() {
        // 3km in 10:00 at HR 170: effort ratio 118/120 ≥ 0.95, so the
        // raw Cooper estimate (~62.8) stands.
        let runs = vec![run("a", 3000.0, 600, Some(170.0), 5)];
        assert_eq!(estimate_vo2max(&runs, None, now()), Some(63));
    }

    #[test]
    fn corrected_estimates_cap_at_the_ceiling() {
        // Same fast run at a submaximal HR extrapolates far above the
        // cap and comes back as exactly the cap.
        let runs = vec![run("a", 3000.0, 600, Some(150.0), 5)];
        assert_eq!(estimate_vo2max(&runs, None, now()), Some(65));
    }

    #[test]
    fn zero_heart_rate_reserve_skips_correction() {
        let mut config = FitnessConfig::default();
        config.max_hr = 52.0; // equal to the resting default

        let runs = vec![run("a", 5000.0, 1500, Some(150.0), 5)];
        let estimate = estimate_vo2max_with_config(&runs, None, now(), &config);
        // Raw Cooper estimate ≈ 38.1, uncorrected.
        assert_eq!(estimate, Some(38));
    }

    #[test]
    fn below_resting_heart_rate_skips_correction() {
        let runs = vec![run("a", 5000.0, 1500, Some(50.0), 5)];
        assert_eq!(estimate_vo2max(&runs, None, now()), Some(38));
    }

    #[test]
    fn only_the_top_estimates_are_averaged() {
        // Four near-maximal 3km runs at different paces produce
        // estimates ≈ 62.8, 56.0, 50.4 and 45.7; the slowest must not
        // drag the average down.
        let runs = vec![
            run("a", 3000.0, 600, Some(170.0), 3),
            run("b", 3000.0, 660, Some(170.0), 6),
            run("c", 3000.0, 720, Some(170.0), 9),
            run("d", 3000.0, 780, Some(170.0), 12),
        ];
        assert_eq!(estimate_vo2max(&runs, None, now()), Some(56));
    }

    #[test]
    fn estimates_stay_inside_the_plausible_range() {
        let paces: Vec<u32> = vec![600, 700, 800, 900, 1000, 1100, 1200];
        for (i, time) in paces.into_iter().enumerate() {
            let runs = vec![run(&format!("r{}", i), 3000.0, time, Some(160.0), 5)];
            if let Some(v) = estimate_vo2max(&runs, None, now()) {
                assert!(v > 30 && v <= 65, "estimate {} out of range", v);
            }
        }
    }

    #[test]
    fn wearable_resting_hr_is_rounded_and_used() {
        // Resting 49.6 rounds to 50 and reproduces the worked example.
        let runs = vec![run("a", 5000.0, 1500, Some(150.0), 5)];
        let estimate = estimate_vo2max(&runs, Some(&recovery(49.6)), now());
        assert_eq!(estimate, Some(46));
    }

    #[test]
    fn fitness_level_classification() {
        assert_eq!(FitnessLevel::from_vo2max(58), FitnessLevel::Excellent);
        assert_eq!(FitnessLevel::from_vo2max(55), FitnessLevel::Excellent);
        assert_eq!(FitnessLevel::from_vo2max(50), FitnessLevel::VeryGood);
        assert_eq!(FitnessLevel::from_vo2max(46), FitnessLevel::Good);
        assert_eq!(FitnessLevel::from_vo2max(38), FitnessLevel::Average);
        assert_eq!(FitnessLevel::from_vo2max(32), FitnessLevel::BelowAverage);
        assert_eq!(FitnessLevel::Good.label(), "Good");
    }

    #[test]
    fn fitness_summary_aggregates_the_window() {
        let mut activities = vec![
            run("a", 5000.0, 1500, Some(150.0), 5),
            run("b", 5000.0, 1500, Some(150.0), 15),
        ];

        let mut ride = run("ride", 30000.0, 3600, None, 10);
        ride.sport_type = "Ride".to_string();
        ride.average_watts = Some(210.0);
        activities.push(ride);

        // Off-road watts stay out of the power average.
        let mut gravel = run("gravel", 28000.0, 3600, None, 20);
        gravel.sport_type = "GravelRide".to_string();
        gravel.average_watts = Some(300.0);
        activities.push(gravel);

        // Outside the window: contributes to nothing.
        activities.push(run("old", 5000.0, 1500, Some(150.0), 120));

        let summary = fitness_summary(&activities, Some(&recovery(51.6)), now());

        // Resting 51.6 rounds to 52 → effort ratio 98/120 → ≈ 46.6.
        assert_eq!(summary.vo2max, Some(47));
        assert_eq!(summary.level, Some(FitnessLevel::Good));
        assert_eq!(summary.resting_hr, Some(52));
        assert_eq!(summary.avg_watts, Some(210));
        // 10200s of in-window movement over ~12.9 weeks ≈ 0.2 h/week.
        assert!((summary.hours_per_week - 0.2).abs() < 1e-9);
    }

    #[test]
    fn config_validation_rejects_degenerate_values() {
        assert!(FitnessConfig::default().validate().is_ok());

        let mut config = FitnessConfig::default();
        config.vo2max_cap = config.vo2max_floor;
        assert!(config.validate().is_err());

        let mut config = FitnessConfig::default();
        config.top_estimates = 0;
        assert!(config.validate().is_err());
    }
}
