//! Geographic utilities.

use crate::GpsPoint;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters, via the haversine
/// formula.
///
/// # Example
/// ```
/// use trainsight::{haversine_distance, GpsPoint};
///
/// let alexanderplatz = GpsPoint::new(52.5219, 13.4132);
/// let brandenburg_gate = GpsPoint::new(52.5163, 13.3777);
/// let d = haversine_distance(&alexanderplatz, &brandenburg_gate);
/// assert!(d > 2000.0 && d < 3000.0);
/// ```
pub fn haversine_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}
