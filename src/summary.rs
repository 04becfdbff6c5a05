//! Per-route performance summaries.
//!
//! Reduces a cluster of same-route activities to what a dashboard card
//! needs: a canonical name, the average distance, the best and latest
//! times and the signed gap between them.

use std::cmp::Reverse;

use crate::{Activity, RouteCluster, RouteSummary};

/// Display name for activities saved without one.
const UNNAMED: &str = "Untitled";

/// Summarize one route cluster.
///
/// Returns `None` for an empty cluster; clusters produced by grouping
/// always have at least one member. Ties resolve to the earliest
/// encountered member: the best time is the first minimum, the latest
/// member the first maximum, and the canonical name the most frequent
/// name seen first.
pub fn summarize(cluster: &RouteCluster<'_>) -> Option<RouteSummary> {
    let members = &cluster.activities;
    let anchor = cluster.anchor()?;

    let best = members.iter().copied().min_by_key(|a| a.moving_time)?;
    let latest = members.iter().copied().min_by_key(|a| Reverse(a.start_date))?;

    let avg_distance =
        members.iter().map(|a| a.distance).sum::<f64>() / members.len() as f64;

    let mut activities: Vec<Activity> = members.iter().map(|a| (*a).clone()).collect();
    activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));

    Some(RouteSummary {
        name: canonical_name(members),
        count: members.len() as u32,
        distance: avg_distance,
        sport_type: anchor.sport_type.clone(),
        best_time: best.moving_time,
        best_date: best.start_date,
        last_time: latest.moving_time,
        last_date: latest.start_date,
        time_diff: i64::from(latest.moving_time) - i64::from(best.moving_time),
        polyline: latest.summary_polyline.clone().unwrap_or_default(),
        best_polyline: best.summary_polyline.clone().unwrap_or_default(),
        activities,
    })
}

/// The most frequently used name among the members; the first name to
/// reach the winning count wins ties.
fn canonical_name(members: &[&Activity]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for member in members {
        let name = if member.name.is_empty() {
            UNNAMED
        } else {
            member.name.as_str()
        };
        match counts.iter_mut().find(|(seen, _)| *seen == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }

    let mut winner = UNNAMED;
    let mut winning_count = 0;
    for (name, count) in &counts {
        if *count > winning_count {
            winning_count = *count;
            winner = name;
        }
    }

    winner.to_string()
}
