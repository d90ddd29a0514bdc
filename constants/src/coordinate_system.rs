/// Survey to splat frame conversion.
///
/// Splat scenes are right-handed and Y-up: the orbit camera keeps `+Y` as
/// its up axis and looks down `-Z` in view space. LAS/LAZ surveys store
/// easting, northing and elevation, which is right-handed Z-up. Mapping
/// one onto the other is a -90° turn about X: elevation becomes `+Y` and
/// northing runs along `-Z`.
///
/// Row `i` holds the source weights for splat axis `i`.
pub const SURVEY_TO_SPLAT: [[f64; 3]; 3] = [
    [1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, -1.0, 0.0],
];

/// Map a survey point (easting, northing, elevation) into the splat frame.
pub fn transform_coordinates(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let source = [x, y, z];
    let [sx, sy, sz] = SURVEY_TO_SPLAT.map(|row| {
        row.iter()
            .zip(source)
            .map(|(weight, value)| weight * value)
            .sum::<f64>()
    });
    (sx, sy, sz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_becomes_up_and_north_runs_away_from_the_camera() {
        assert_eq!(transform_coordinates(1.0, 2.0, 3.0), (1.0, 3.0, -2.0));
        assert_eq!(transform_coordinates(0.0, 0.0, 10.0), (0.0, 10.0, 0.0));
        assert_eq!(transform_coordinates(0.0, 5.0, 0.0), (0.0, 0.0, -5.0));
    }

    #[test]
    fn conversion_preserves_handedness() {
        let m = SURVEY_TO_SPLAT;
        let determinant = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        assert_eq!(determinant, 1.0);
    }
}
