use derive_more::Display;

/// Mean earth radius in meters (spherical model).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Rejected coordinate/radius input: non-finite, |lat| > 90, |lon| > 180,
/// or a non-positive radius.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(fmt = "Invalid coordinates or radius")]
pub struct InvalidCoordinate;

fn check_point(lat: f64, lon: f64) -> Result<(), InvalidCoordinate> {
    if lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0 {
        Ok(())
    } else {
        Err(InvalidCoordinate)
    }
}

/// Validate a circle's center and radius without running a containment test.
pub fn validate_circle(lat: f64, lon: f64, radius_m: f64) -> Result<(), InvalidCoordinate> {
    check_point(lat, lon)?;
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(InvalidCoordinate);
    }
    Ok(())
}

/// Great-circle distance in meters between two (lat, lon) points, haversine
/// form. Symmetric in its arguments; the half-angle sine terms absorb
/// longitude wrap at the antimeridian and the vanishing cosine at the poles.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let half_dphi = ((lat2 - lat1).to_radians() / 2.0).sin();
    let half_dlambda = ((lon2 - lon1).to_radians() / 2.0).sin();

    let a = half_dphi * half_dphi + phi1.cos() * phi2.cos() * half_dlambda * half_dlambda;
    // rounding can push `a` a hair past 1.0; clamp before asin
    let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();
    EARTH_RADIUS_M * c
}

/// True iff the point lies within `radius_m` meters of the circle's center
/// (boundary inclusive).
pub fn is_within_circle(
    center_lat: f64,
    center_lon: f64,
    radius_m: f64,
    point_lat: f64,
    point_lon: f64,
) -> Result<bool, InvalidCoordinate> {
    validate_circle(center_lat, center_lon, radius_m)?;
    check_point(point_lat, point_lon)?;
    Ok(haversine_distance_m(center_lat, center_lon, point_lat, point_lon) <= radius_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let d1 = haversine_distance_m(6.5244, 3.3792, 52.52, 13.405);
        let d2 = haversine_distance_m(52.52, 13.405, 6.5244, 3.3792);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn zero_distance_at_same_point() {
        assert_eq!(haversine_distance_m(6.5244, 3.3792, 6.5244, 3.3792), 0.0);
    }

    #[test]
    fn known_distance_near_lagos() {
        // 0.0045 deg of latitude is almost exactly 500 m on the sphere
        let d = haversine_distance_m(6.5244, 3.3792, 6.5289, 3.3792);
        assert!(d > 495.0 && d < 505.0, "got {d}");
    }

    #[test]
    fn point_at_center_is_within() {
        assert_eq!(
            is_within_circle(6.5244, 3.3792, 100.0, 6.5244, 3.3792),
            Ok(true)
        );
    }

    #[test]
    fn point_500m_away_is_outside_100m_radius() {
        assert_eq!(
            is_within_circle(6.5244, 3.3792, 100.0, 6.5289, 3.3792),
            Ok(false)
        );
    }

    #[test]
    fn boundary_distance_counts_as_inside() {
        let d = haversine_distance_m(6.5244, 3.3792, 6.5289, 3.3792);
        assert_eq!(is_within_circle(6.5244, 3.3792, d, 6.5289, 3.3792), Ok(true));
    }

    #[test]
    fn antimeridian_wrap_is_a_short_hop() {
        let d = haversine_distance_m(0.0, 179.9995, 0.0, -179.9995);
        assert!(d > 100.0 && d < 125.0, "got {d}");
        assert_eq!(
            is_within_circle(0.0, 179.9995, 150.0, 0.0, -179.9995),
            Ok(true)
        );
    }

    #[test]
    fn near_pole_distances_stay_finite_and_small() {
        let d = haversine_distance_m(89.9999, 0.0, 89.9999, 180.0);
        assert!(d > 20.0 && d < 25.0, "got {d}");
    }

    #[test]
    fn pole_and_meridian_edges_are_valid_inputs() {
        assert!(is_within_circle(90.0, 180.0, 1000.0, 90.0, -180.0).unwrap());
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        assert_eq!(
            is_within_circle(91.0, 0.0, 100.0, 0.0, 0.0),
            Err(InvalidCoordinate)
        );
        assert_eq!(
            is_within_circle(0.0, 0.0, 100.0, -90.5, 0.0),
            Err(InvalidCoordinate)
        );
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        assert_eq!(
            is_within_circle(0.0, 180.5, 100.0, 0.0, 0.0),
            Err(InvalidCoordinate)
        );
    }

    #[test]
    fn rejects_non_finite_inputs() {
        assert_eq!(
            is_within_circle(f64::NAN, 0.0, 100.0, 0.0, 0.0),
            Err(InvalidCoordinate)
        );
        assert_eq!(
            is_within_circle(0.0, 0.0, f64::INFINITY, 0.0, 0.0),
            Err(InvalidCoordinate)
        );
    }

    #[test]
    fn rejects_non_positive_radius() {
        assert_eq!(
            is_within_circle(0.0, 0.0, 0.0, 0.0, 0.0),
            Err(InvalidCoordinate)
        );
        assert_eq!(
            is_within_circle(0.0, 0.0, -5.0, 0.0, 0.0),
            Err(InvalidCoordinate)
        );
    }
}
