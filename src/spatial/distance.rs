//! Exact distance tests used after the R-tree envelope query
//!
//! Coordinates are `[latitude, longitude]` in degrees, compared on the plane.

/// Point-to-point distance
pub fn point_distance(p: [f64; 2], q: [f64; 2]) -> f64 {
    ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)).sqrt()
}

/// Point-to-segment minimum distance and the closest point on the segment
pub fn point_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> (f64, [f64; 2]) {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let ab_len2 = ab[0] * ab[0] + ab[1] * ab[1];

    if ab_len2 < 1e-24 {
        // Degenerate segment
        return (point_distance(p, a), a);
    }

    let t = ((ap[0] * ab[0] + ap[1] * ab[1]) / ab_len2).clamp(0.0, 1.0);
    let closest = [a[0] + t * ab[0], a[1] + t * ab[1]];
    (point_distance(p, closest), closest)
}
