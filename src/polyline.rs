//! Encoded-polyline codec.
//!
//! The activity platform ships each activity's path as a Google encoded
//! polyline: 5-bit chunks offset into printable ASCII at 63, zig-zag
//! signed deltas, coordinates in fixed-point degrees at 1e-5 resolution,
//! latitude and longitude delta-encoded separately per point.
//!
//! Decoding is deterministic and bounded by the input length. A string
//! truncated mid-chunk yields the prefix that decoded cleanly; it never
//! loops or errors. Beyond truncation, malformed input is garbage-in
//! garbage-out; the upstream platform is the only producer in practice.

use crate::GpsPoint;

/// Chunk values at or above this carry a continuation bit.
const CONTINUATION: i32 = 0x20;
/// Payload bits per chunk.
const CHUNK_MASK: i32 = 0x1f;
/// Offset shifting chunk values into printable ASCII.
const ASCII_OFFSET: i32 = 63;
/// Fixed-point scale: five decimal places of a degree.
const PRECISION: f64 = 1e5;

/// Decode an encoded polyline into an ordered list of coordinates.
///
/// Empty input decodes to an empty list.
///
/// # Example
/// ```
/// use trainsight::decode_polyline;
///
/// let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@");
/// assert_eq!(points.len(), 3);
/// assert!((points[0].latitude - 38.5).abs() < 1e-9);
/// assert!((points[0].longitude - -120.2).abs() < 1e-9);
/// ```
pub fn decode_polyline(encoded: &str) -> Vec<GpsPoint> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        let (d_lat, next) = match decode_chunk(bytes, index) {
            Some(value) => value,
            None => break,
        };
        let (d_lng, after) = match decode_chunk(bytes, next) {
            Some(value) => value,
            None => break,
        };

        lat += d_lat;
        lng += d_lng;
        index = after;

        points.push(GpsPoint::new(
            lat as f64 / PRECISION,
            lng as f64 / PRECISION,
        ));
    }

    points
}

/// Encode coordinates into an encoded polyline.
///
/// Coordinates are rounded to five decimal places, so
/// `decode_polyline(&encode_polyline(points))` reproduces any input
/// already at that resolution exactly.
pub fn encode_polyline(points: &[GpsPoint]) -> String {
    let mut encoded = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = (point.latitude * PRECISION).round() as i64;
        let lng = (point.longitude * PRECISION).round() as i64;

        encode_chunk(lat - prev_lat, &mut encoded);
        encode_chunk(lng - prev_lng, &mut encoded);

        prev_lat = lat;
        prev_lng = lng;
    }

    encoded
}

/// Decode one zig-zag varint starting at `index`.
///
/// Returns the signed value and the index just past it, or `None` when the
/// input ends before a terminating chunk (truncated encoding).
fn decode_chunk(bytes: &[u8], mut index: usize) -> Option<(i64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    loop {
        let byte = i32::from(*bytes.get(index)?) - ASCII_OFFSET;
        index += 1;

        if shift < 64 {
            result |= u64::from((byte & CHUNK_MASK) as u32) << shift;
        }
        shift += 5;

        if byte < CONTINUATION {
            break;
        }
    }

    let magnitude = (result >> 1) as i64;
    let value = if result & 1 != 0 { !magnitude } else { magnitude };

    Some((value, index))
}

/// Append one value as a zig-zag varint.
fn encode_chunk(value: i64, out: &mut String) {
    // Zig-zag moves the sign into the low bit so small magnitudes of
    // either sign stay short.
    let mut v = ((value << 1) ^ (value >> 63)) as u64;

    while v >= CONTINUATION as u64 {
        let chunk = (v as i32 & CHUNK_MASK) | CONTINUATION;
        out.push(char::from((chunk + ASCII_OFFSET) as u8));
        v >>= 5;
    }
    out.push(char::from((v as i32 + ASCII_OFFSET) as u8));
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference vector from the encoding's published documentation.
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn reference_points() -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(38.5, -120.2),
            GpsPoint::new(40.7, -120.95),
            GpsPoint::new(43.252, -126.453),
        ]
    }

    #[test]
    fn decodes_reference_vector() {
        let points = decode_polyline(REFERENCE);
        assert_eq!(points, reference_points());
    }

    #[test]
    fn encodes_reference_vector() {
        assert_eq!(encode_polyline(&reference_points()), REFERENCE);
    }

    #[test]
    fn empty_input_decodes_to_empty_list() {
        assert!(decode_polyline("").is_empty());
    }

    #[test]
    fn round_trip_preserves_five_decimal_coordinates() {
        let original = vec![
            GpsPoint::new(52.52001, 13.40500),
            GpsPoint::new(52.52049, 13.40601),
            GpsPoint::new(52.51998, 13.40755),
            GpsPoint::new(-33.86882, 151.20930),
            GpsPoint::new(0.0, 0.0),
        ];
        let decoded = decode_polyline(&encode_polyline(&original));
        assert_eq!(decoded, original);
    }

    #[test]
    fn decoding_is_deterministic() {
        assert_eq!(decode_polyline(REFERENCE), decode_polyline(REFERENCE));
    }

    #[test]
    fn truncated_input_yields_decoded_prefix() {
        // Dropping the terminal byte leaves the last longitude chunk
        // dangling; the first two points still decode cleanly.
        let truncated = &REFERENCE[..REFERENCE.len() - 1];
        let points = decode_polyline(truncated);
        assert_eq!(points, reference_points()[..2].to_vec());
    }

    #[test]
    fn overlong_chunk_terminates() {
        // A run of continuation bytes with no terminator must not loop or
        // overflow; whatever it produces, it must produce it finitely.
        let hostile: String = std::iter::repeat('~').take(64).collect();
        let _ = decode_polyline(&hostile);
    }

    #[test]
    fn single_point_round_trip() {
        let point = vec![GpsPoint::new(47.37690, 8.54170)];
        assert_eq!(decode_polyline(&encode_polyline(&point)), point);
    }
}
