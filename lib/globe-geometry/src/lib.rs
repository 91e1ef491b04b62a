use std::f64::consts::PI;

/// A `[longitude, latitude]` pair in degrees, as it appears in GeoJSON.
pub type Position = [f64; 2];

/// Absolute tolerance (degrees) for treating the first and last ring vertex as the same point.
pub const CLOSING_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn to_f32(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

/// Shifts every longitude by multiples of 360° so that consecutive vertices are never
/// more than 180° apart. The input is left untouched.
///
/// Rings drawn edge to edge across the whole map (from -180 to 180, e.g. polar caps) are
/// returned as they are, since their ±180 edges are real boundaries.
pub fn unwrap_longitudes(ring: &[Position]) -> Vec<Position> {
    if spans_full_turn(ring) {
        return ring.to_vec();
    }

    let mut out: Vec<Position> = Vec::with_capacity(ring.len());
    let mut previous: Option<f64> = None;

    for &[lon, lat] in ring {
        let mut lon = lon;
        if let Some(prev) = previous {
            let delta = lon - prev;
            if lon.is_finite() && prev.is_finite() && delta.abs() > 180.0 {
                lon -= 360.0 * (delta / 360.0).round();
            }
        }
        out.push([lon, lat]);
        previous = Some(lon);
    }

    out
}

/// Every longitude within [-180, 180] and both ends of that range reached.
fn spans_full_turn(ring: &[Position]) -> bool {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &[lon, _] in ring {
        if !(-180.0..=180.0).contains(&lon) {
            return false;
        }
        min = min.min(lon);
        max = max.max(lon);
    }
    max - min >= 360.0
}

/// Removes the last vertex if it repeats the first one (GeoJSON rings are explicitly closed).
pub fn drop_closing_duplicate(ring: &[Position]) -> Vec<Position> {
    let mut out = ring.to_vec();
    if out.len() >= 2 {
        let first = out[0];
        let last = out[out.len() - 1];
        if (first[0] - last[0]).abs() < CLOSING_TOLERANCE
            && (first[1] - last[1]).abs() < CLOSING_TOLERANCE
        {
            out.pop();
        }
    }
    out
}

/// Unwrap followed by closing-duplicate removal, the cleanup every rendered ring goes through.
pub fn clean_ring(ring: &[Position]) -> Vec<Position> {
    drop_closing_duplicate(&unwrap_longitudes(ring))
}

/// Maps a geographic coordinate onto a sphere of the given radius.
///
/// `phi` is measured from the north pole and `theta` is offset by 180°, which is the
/// convention of an equirectangular texture wrapped on a y-up UV sphere. Changing a sign
/// here rotates every overlay against the globe texture.
pub fn lat_lon_to_sphere_point(lat: f64, lon: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat) * PI / 180.0;
    let theta = (lon + 180.0) * PI / 180.0;

    Vec3::new(
        -radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Planar ray-casting parity test in (lon, lat) space. Winding direction is irrelevant.
pub fn point_in_ring(lat: f64, lon: f64, ring: &[Position]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];

        if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Like [`point_in_ring`], but also tries the point one turn east and west, so rings whose
/// longitudes were unwrapped past ±180° still contain points given in [-180, 180).
pub fn point_in_wrapped_ring(lat: f64, lon: f64, ring: &[Position]) -> bool {
    [lon, lon + 360.0, lon - 360.0]
        .into_iter()
        .any(|candidate| point_in_ring(lat, candidate, ring))
}

/// Inside the outer ring and outside every hole.
pub fn point_in_polygon(lat: f64, lon: f64, rings: &[Vec<Position>]) -> bool {
    let Some((outer, holes)) = rings.split_first() else {
        return false;
    };

    point_in_wrapped_ring(lat, lon, outer)
        && !holes.iter().any(|hole| point_in_wrapped_ring(lat, lon, hole))
}

/// Brings a longitude into [-180, 180).
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Ties round up (-0.125 becomes 0), like the calendar database's own rounding.
pub fn round_to_quarter_hour(hours: f64) -> f64 {
    (hours * 4.0 + 0.5).floor() / 4.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn square() -> Vec<Position> {
        vec![[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0], [0.0, 0.0]]
    }

    fn max_step(ring: &[Position]) -> f64 {
        ring.windows(2)
            .map(|w| (w[1][0] - w[0][0]).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn unwrap_leaves_continuous_rings_alone() {
        let ring = square();
        assert_eq!(unwrap_longitudes(&ring), ring);
    }

    #[test]
    fn unwrap_crosses_antimeridian_eastwards() {
        let ring = vec![[170.0, 0.0], [170.0, 10.0], [-170.0, 10.0], [-170.0, 0.0], [170.0, 0.0]];
        let unwrapped = unwrap_longitudes(&ring);

        assert_eq!(
            unwrapped,
            vec![[170.0, 0.0], [170.0, 10.0], [190.0, 10.0], [190.0, 0.0], [170.0, 0.0]]
        );
        assert!(max_step(&unwrapped) <= 180.0);
    }

    #[test]
    fn unwrap_handles_multiple_turns() {
        let ring = vec![[0.0, 0.0], [719.0, 1.0], [-721.0, 2.0]];
        let unwrapped = unwrap_longitudes(&ring);
        assert!(max_step(&unwrapped) <= 180.0);
        assert_close(unwrapped[1][0], -1.0, 1e-9);
        assert_close(unwrapped[2][0], -1.0, 1e-9);
    }

    #[test]
    fn unwrap_keeps_exact_half_turn() {
        let ring = vec![[-90.0, 0.0], [90.0, 0.0]];
        assert_eq!(unwrap_longitudes(&ring), ring);
    }

    #[test]
    fn unwrap_keeps_full_width_rings() {
        let cap = vec![[-180.0, -90.0], [180.0, -90.0], [180.0, -60.0], [-180.0, -60.0], [-180.0, -90.0]];
        assert_eq!(unwrap_longitudes(&cap), cap);
        assert_eq!(clean_ring(&cap).len(), 4);
        assert!(point_in_polygon(-75.0, 0.0, &[unwrap_longitudes(&cap)]));
        assert!(!point_in_polygon(-50.0, 0.0, &[unwrap_longitudes(&cap)]));
    }

    #[test]
    fn unwrap_does_not_loop_on_non_finite_input() {
        let ring = vec![[0.0, 0.0], [f64::INFINITY, 0.0], [f64::NAN, 1.0]];
        assert_eq!(unwrap_longitudes(&ring).len(), 3);
    }

    #[test]
    fn closing_duplicate_is_dropped() {
        let cleaned = drop_closing_duplicate(&square());
        assert_eq!(cleaned.len(), 4);
        assert_eq!(cleaned[3], [10.0, 0.0]);

        // already open ring stays as-is
        assert_eq!(drop_closing_duplicate(&cleaned), cleaned);
    }

    #[test]
    fn closing_duplicate_within_tolerance() {
        let ring = vec![[1.0, 1.0], [2.0, 2.0], [3.0, 1.0], [1.0 + 1e-12, 1.0 - 1e-12]];
        assert_eq!(drop_closing_duplicate(&ring).len(), 3);
    }

    #[test]
    fn short_rings_pass_through() {
        let single = vec![[5.0, 5.0]];
        assert_eq!(drop_closing_duplicate(&single), single);
        assert!(drop_closing_duplicate(&[]).is_empty());
    }

    #[test]
    fn clean_ring_never_adds_vertices_or_large_steps() {
        let rings = [
            square(),
            vec![[179.0, -5.0], [-179.0, -5.0], [-179.0, 5.0], [179.0, 5.0], [179.0, -5.0]],
            vec![[-10.0, 60.0], [350.0, 61.0], [-370.0, 62.0]],
        ];
        for ring in rings {
            let cleaned = clean_ring(&ring);
            assert!(cleaned.len() <= ring.len());
            assert!(max_step(&cleaned) <= 180.0);
        }
    }

    #[test]
    fn sphere_point_axes() {
        let r = 2.0;

        let north = lat_lon_to_sphere_point(90.0, 0.0, r);
        assert_close(north.x, 0.0, 1e-12);
        assert_close(north.y, r, 1e-12);
        assert_close(north.z, 0.0, 1e-12);

        // lon 0 sits on +x, lon 90 on -z
        let greenwich = lat_lon_to_sphere_point(0.0, 0.0, r);
        assert_close(greenwich.x, r, 1e-12);
        assert_close(greenwich.y, 0.0, 1e-12);
        assert_close(greenwich.z, 0.0, 1e-12);

        let east = lat_lon_to_sphere_point(0.0, 90.0, r);
        assert_close(east.x, 0.0, 1e-12);
        assert_close(east.z, -r, 1e-12);
    }

    #[test]
    fn sphere_point_is_on_the_sphere_and_periodic() {
        let p = lat_lon_to_sphere_point(37.5, -122.25, 1.0005);
        assert_close(p.length(), 1.0005, 1e-12);

        let wrapped = lat_lon_to_sphere_point(37.5, -122.25 + 360.0, 1.0005);
        assert_close(p.x, wrapped.x, 1e-12);
        assert_close(p.y, wrapped.y, 1e-12);
        assert_close(p.z, wrapped.z, 1e-12);
    }

    #[test]
    fn square_with_and_without_hole() {
        let outer = square();
        assert!(point_in_polygon(5.0, 5.0, &[outer.clone()]));
        assert!(!point_in_polygon(15.0, 15.0, &[outer.clone()]));

        let hole = vec![[2.0, 2.0], [2.0, 8.0], [8.0, 8.0], [8.0, 2.0]];
        let rings = vec![outer, hole];
        assert!(!point_in_polygon(5.0, 5.0, &rings));
        assert!(point_in_polygon(1.0, 1.0, &rings));
    }

    #[test]
    fn winding_direction_does_not_matter() {
        let mut reversed = square();
        reversed.reverse();
        assert!(point_in_ring(5.0, 5.0, &reversed));
        assert!(point_in_ring(5.0, 5.0, &square()));
    }

    #[test]
    fn degenerate_rings_contain_nothing() {
        assert!(!point_in_ring(0.0, 0.0, &[]));
        assert!(!point_in_ring(0.5, 0.5, &[[0.0, 0.0], [1.0, 1.0]]));
        assert!(!point_in_polygon(0.0, 0.0, &[]));
    }

    #[test]
    fn antimeridian_ring_after_unwrapping() {
        let ring = vec![[170.0, 0.0], [170.0, 10.0], [-170.0, 10.0], [-170.0, 0.0], [170.0, 0.0]];

        // the raw ring is read as the band between -170 and 170
        assert!(!point_in_ring(5.0, 179.0, &ring));

        let rings = vec![unwrap_longitudes(&ring)];
        assert!(point_in_polygon(5.0, 179.0, &rings));
        assert!(point_in_polygon(5.0, -179.0, &rings));
        assert!(!point_in_polygon(5.0, 0.0, &rings));
        assert!(!point_in_polygon(15.0, 179.0, &rings));
    }

    #[test]
    fn longitude_normalization() {
        assert_close(normalize_longitude(180.0), -180.0, 1e-12);
        assert_close(normalize_longitude(-180.0), -180.0, 1e-12);
        assert_close(normalize_longitude(190.0), -170.0, 1e-12);
        assert_close(normalize_longitude(-190.0), 170.0, 1e-12);
        assert_close(normalize_longitude(725.5), 5.5, 1e-9);
        assert_close(normalize_longitude(12.0), 12.0, 1e-12);
    }

    #[test]
    fn quarter_hour_rounding() {
        assert_eq!(round_to_quarter_hour(5.75), 5.75);
        assert_eq!(round_to_quarter_hour(5.8), 5.75);
        assert_eq!(round_to_quarter_hour(-3.4), -3.5);
        assert_eq!(round_to_quarter_hour(8.9), 9.0);
    }

    #[test]
    fn quarter_hour_ties_round_up() {
        assert_eq!(round_to_quarter_hour(0.125), 0.25);
        assert_eq!(round_to_quarter_hour(-0.125), 0.0);
        assert_eq!(round_to_quarter_hour(-5.875), -5.75);
    }

    #[test]
    fn quarter_hour_rounding_is_idempotent() {
        let samples = [
            0.0, -0.0, 0.124, 0.125, 0.126, 5.7499, -9.87, 12.3456, 1e9 + 0.1, -1e15, f64::MAX, f64::MIN,
        ];
        for x in samples {
            let once = round_to_quarter_hour(x);
            assert_eq!(round_to_quarter_hour(once), once, "not idempotent for {x}");
        }
    }
}
