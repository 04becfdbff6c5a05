//! # Trainsight
//!
//! Recurring-route detection and aerobic fitness estimation over a
//! personal activity history.
//!
//! This library is the computational core behind a training dashboard:
//! - Encoded-polyline decoding for GPS paths
//! - Greedy clustering of activities into recurring routes, with
//!   best-vs-latest performance comparison per route
//! - VO2max estimation from recent runs plus wearable recovery data
//!
//! Every operation is a pure, synchronous function over records already
//! fetched from storage. There is no I/O and no shared state; concurrent
//! calls for different users or sport groups need no coordination.
//!
//! ## Quick Start
//! ```
//! use trainsight::{find_top_routes, Activity, RUN_TYPES};
//!
//! let activities: Vec<Activity> = Vec::new(); // from the activity store
//! let routes = find_top_routes(&activities, RUN_TYPES, 3);
//! assert!(routes.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Ingestion and configuration errors
pub mod error;
pub use error::{Error, Result};

// Encoded-polyline codec
pub mod polyline;
pub use polyline::{decode_polyline, encode_polyline};

// Geographic utilities (haversine distance)
pub mod geo_utils;
pub use geo_utils::haversine_distance;

// Recurring-route clustering
pub mod grouping;
pub use grouping::{
    find_top_routes, find_top_routes_with_config, group_activities, is_route_candidate,
    matches_cluster, RouteCluster,
};

// Per-route performance summaries
pub mod summary;
pub use summary::summarize;

// VO2max estimation and the fitness card
pub mod fitness;
pub use fitness::{
    estimate_vo2max, estimate_vo2max_with_config, fitness_summary, fitness_summary_with_config,
    FitnessConfig, FitnessLevel, FitnessSummary,
};

// Display formatting helpers
pub mod format;
pub use format::{format_distance, format_duration};

// ============================================================================
// Sport Type Groups
// ============================================================================

/// Run-family activity types, as tagged by the activity platform.
pub const RUN_TYPES: &[&str] = &["Run", "TrailRun", "VirtualRun"];

/// Ride-family activity types.
pub const RIDE_TYPES: &[&str] = &["Ride", "VirtualRide", "GravelRide", "MountainBikeRide"];

/// Ride types considered when averaging power; off-road rides rarely
/// record meaningful watts.
pub const POWER_RIDE_TYPES: &[&str] = &["Ride", "VirtualRide"];

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate in decimal degrees.
///
/// # Example
/// ```
/// use trainsight::GpsPoint;
/// let point = GpsPoint::new(52.5200, 13.4050); // Berlin
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One completed exercise session from the activity store.
///
/// Records are read-only inputs; the store owns their lifecycle. Fields
/// the platform may omit are `Option`; a missing value is distinct from
/// zero throughout the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Stable unique id. The store sends either a number or a string.
    #[serde(deserialize_with = "de_activity_id")]
    pub id: String,
    /// Free-text activity name.
    #[serde(default)]
    pub name: String,
    /// Type tag, e.g. "Run", "Ride", "TrailRun".
    #[serde(rename = "type")]
    pub sport_type: String,
    /// Distance in meters.
    pub distance: f64,
    /// Moving time in seconds.
    pub moving_time: u32,
    /// Elapsed time in seconds.
    pub elapsed_time: u32,
    /// Average heart rate in bpm, when recorded.
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    /// Average power in watts (cycling), when recorded.
    #[serde(default)]
    pub average_watts: Option<f64>,
    /// Start timestamp (ISO 8601 with offset on the wire).
    pub start_date: DateTime<Utc>,
    /// Start coordinate. The store sends `[lat, lng]`, a JSON string
    /// containing such a pair, or null.
    #[serde(
        default,
        deserialize_with = "de_start_latlng",
        serialize_with = "ser_start_latlng"
    )]
    pub start_latlng: Option<GpsPoint>,
    /// Encoded polyline of the full path, when GPS was recorded.
    #[serde(default)]
    pub summary_polyline: Option<String>,
}

impl Activity {
    /// Parse a JSON array of activity-store records.
    pub fn from_json_array(payload: &str) -> Result<Vec<Activity>> {
        Ok(serde_json::from_str(payload)?)
    }

    /// The resolved start coordinate: the stored pair when present and
    /// valid, otherwise the first point of the encoded path.
    pub fn start_coords(&self) -> Option<GpsPoint> {
        if let Some(point) = self.start_latlng {
            if point.is_valid() {
                return Some(point);
            }
        }

        self.summary_polyline
            .as_deref()
            .and_then(|encoded| polyline::decode_polyline(encoded).into_iter().next())
    }
}

/// Most recent recovery record from the wearable platform.
///
/// Absence of the record, or of the resting heart rate inside it, is a
/// valid state; the estimator falls back to its configured default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRecord {
    /// Resting heart rate in bpm.
    #[serde(default)]
    pub resting_hr: Option<f64>,
}

impl RecoveryRecord {
    /// Parse a single recovery record from its JSON form.
    pub fn from_json(payload: &str) -> Result<RecoveryRecord> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// A fully self-contained summary of one recurring route.
///
/// Serialized `camelCase` for the dashboard; no further lookups are
/// needed to render a route card from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    /// Most frequent activity name among the members.
    pub name: String,
    /// Number of times the route was covered.
    pub count: u32,
    /// Mean distance over all members, in meters.
    pub distance: f64,
    /// Sport type of the cluster anchor.
    pub sport_type: String,
    /// Fastest moving time among the members, in seconds.
    pub best_time: u32,
    /// Start date of the fastest member.
    pub best_date: DateTime<Utc>,
    /// Moving time of the most recent member, in seconds.
    pub last_time: u32,
    /// Start date of the most recent member.
    pub last_date: DateTime<Utc>,
    /// `last_time - best_time`; positive means the latest run was slower
    /// than the route best.
    pub time_diff: i64,
    /// Encoded path of the most recent member, for display and replay.
    pub polyline: String,
    /// Encoded path of the fastest member, kept for comparison views.
    pub best_polyline: String,
    /// All members, most recent first.
    pub activities: Vec<Activity>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for recurring-route detection.
///
/// The defaults are the dashboard's production values; tests override
/// individual fields instead of patching globals.
#[derive(Debug, Clone)]
pub struct RouteMatchConfig {
    /// Maximum start-coordinate gap to the cluster anchor, in meters.
    /// Default: 200.0
    pub start_tolerance: f64,
    /// Maximum relative difference to the anchor's distance.
    /// Default: 0.10
    pub distance_tolerance: f64,
    /// Activities at or below this distance never enter clustering, in
    /// meters. Default: 500.0
    pub min_distance: f64,
    /// Activities at or below this moving time never enter clustering,
    /// in seconds. Default: 120
    pub min_moving_time: u32,
    /// Minimum members for a cluster to count as a recurring route.
    /// Default: 2
    pub min_occurrences: usize,
}

impl Default for RouteMatchConfig {
    fn default() -> Self {
        Self {
            start_tolerance: 200.0,
            distance_tolerance: 0.10,
            min_distance: 500.0,
            min_moving_time: 120,
            min_occurrences: 2,
        }
    }
}

impl RouteMatchConfig {
    /// Reject values that would make clustering degenerate. Advisory:
    /// the pipeline functions do not call this themselves.
    pub fn validate(&self) -> Result<()> {
        if !(self.start_tolerance > 0.0) {
            return Err(Error::Config("start_tolerance must be positive".into()));
        }
        if !(self.distance_tolerance > 0.0 && self.distance_tolerance < 1.0) {
            return Err(Error::Config(
                "distance_tolerance must be in (0, 1)".into(),
            ));
        }
        if !(self.min_distance >= 0.0) {
            return Err(Error::Config("min_distance must not be negative".into()));
        }
        if self.min_occurrences == 0 {
            return Err(Error::Config("min_occurrences must be at least 1".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Wire-format helpers
// ============================================================================

fn de_activity_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

fn de_start_latlng<'de, D>(deserializer: D) -> std::result::Result<Option<GpsPoint>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(parse_latlng_value))
}

/// Anything that is not a `[lat, lng]` pair (directly or inside a JSON
/// string) resolves to `None` rather than an error; the store has been
/// seen stringifying the column.
fn parse_latlng_value(value: serde_json::Value) -> Option<GpsPoint> {
    let pair: [f64; 2] = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value).ok()?,
        serde_json::Value::String(text) => serde_json::from_str(&text).ok()?,
        _ => return None,
    };
    Some(GpsPoint::new(pair[0], pair[1]))
}

fn ser_start_latlng<S>(
    value: &Option<GpsPoint>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(point) => [point.latitude, point.longitude].serialize(serializer),
        None => serializer.serialize_none(),
    }
}

// ============================================================================
// Tests
// ============================================================================
