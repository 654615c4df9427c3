//! Conversions between geodetic (latitude, longitude, altitude) and Earth-centred cartesian
//! coordinates on the WGS84 ellipsoid.
//!
//! Two historical conventions are kept so positions agree with older payload analyses:
//! * x and y are swapped: `p[1]` is along the prime meridian and `p[0]` points to 90°E.
//! * Everything is assumed to be in the southern hemisphere. The sign of the input latitude is
//!   ignored and the output latitude is always negative.
use super::constants::{FLATTENING_FACTOR, LATITUDE_TOLERANCE_RAD, R_EARTH};

// Latitude iteration converges in a handful of steps away from the poles
const MAX_LATITUDE_ITERATIONS: usize = 100;

/// Convert a geodetic position to Earth-centred cartesian coordinates.
///
/// # Arguments
/// * `lat` - Latitude in **degrees**. Only the magnitude is used.
/// * `lon` - Longitude in **degrees**.
/// * `alt` - Altitude above the ellipsoid in **metres**.
///
/// # Returns
/// `[x, y, z]` in metres, with x and y swapped as described in the module docs.
pub fn cartesian_from_lat_lon_alt(lat: f64, lon: f64, alt: f64) -> [f64; 3] {
    let lat = lat.abs().to_radians();
    let lon = lon.to_radians();

    let axis_sq = (1.0 - FLATTENING_FACTOR) * (1.0 - FLATTENING_FACTOR);
    let c = (lat.cos() * lat.cos() + axis_sq * lat.sin() * lat.sin()).powf(-0.5);
    let q = axis_sq * c;

    [
        (R_EARTH * c + alt) * lat.cos() * lon.sin(),
        (R_EARTH * c + alt) * lat.cos() * lon.cos(),
        (R_EARTH * q + alt) * lat.sin(),
    ]
}

/// Convert Earth-centred cartesian coordinates back to a geodetic position.
///
/// Latitude is found by fixed point iteration, stopping once successive estimates differ by
/// less than 1e-4 radians.
///
/// # Returns
/// `(lat, lon, alt)` with angles in **degrees** and altitude in **metres**. The latitude is
/// always reported south of the equator.
pub fn lat_lon_alt_from_cartesian(p: [f64; 3]) -> (f64, f64, f64) {
    let xt = p[1];
    let yt = p[0];
    let zt = p[2];

    let cos_ae_sq = (1.0 - FLATTENING_FACTOR) * (1.0 - FLATTENING_FACTOR);
    let lon = yt.atan2(xt);
    let xy = xt.hypot(yt);
    let geom_bottom = R_EARTH * R_EARTH * xy;

    let prime_vertical = |lat: f64| {
        R_EARTH / (lat.cos() * lat.cos() + cos_ae_sq * lat.sin() * lat.sin()).sqrt()
    };

    let mut next_lat = ((zt / xy) / cos_ae_sq).atan();
    for _ in 0..MAX_LATITUDE_ITERATIONS {
        let guess = next_lat;
        let n = prime_vertical(guess);
        let top = R_EARTH * R_EARTH * zt + (1.0 - cos_ae_sq) * cos_ae_sq * (n * guess.sin()).powi(3);
        let bottom = geom_bottom - (1.0 - cos_ae_sq) * (n * guess.cos()).powi(3);
        next_lat = (top / bottom).atan();
        if (next_lat - guess).abs() <= LATITUDE_TOLERANCE_RAD {
            break;
        }
    }

    let alt = xy / next_lat.cos() - prime_vertical(next_lat);
    let lat = -next_lat.to_degrees().abs();
    (lat, lon.to_degrees(), alt)
}

/// Distance from the centre of the Earth to the ellipsoid surface at a latitude (degrees), metres
pub fn distance_to_centre_of_earth(lat: f64) -> f64 {
    let p = cartesian_from_lat_lon_alt(lat, 0.0, 0.0);
    (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::Location;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_round_trip() {
        for (lat, lon, alt) in [
            (-79.468116, -112.059258, 1779.80),
            (-45.0, 10.0, 0.0),
            (-10.0, 170.0, 38_000.0),
            (-85.0, 0.5, 120.0),
        ] {
            let p = cartesian_from_lat_lon_alt(lat, lon, alt);
            let (lat2, lon2, alt2) = lat_lon_alt_from_cartesian(p);
            assert_abs_diff_eq!(lat2, lat, epsilon = 1e-6);
            assert_abs_diff_eq!(lon2, lon, epsilon = 1e-9);
            assert_abs_diff_eq!(alt2, alt, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_southern_convention() {
        let north = cartesian_from_lat_lon_alt(60.0, 20.0, 0.0);
        let south = cartesian_from_lat_lon_alt(-60.0, 20.0, 0.0);
        assert_eq!(north, south);
        let (lat, _, _) = lat_lon_alt_from_cartesian(north);
        assert!(lat < 0.0);
    }

    #[test]
    fn test_swapped_axes() {
        let p = cartesian_from_lat_lon_alt(0.0, 0.0, 0.0);
        assert_relative_eq!(p[1], R_EARTH);
        assert_abs_diff_eq!(p[0], 0.0);
        let p = cartesian_from_lat_lon_alt(0.0, 90.0, 0.0);
        assert_relative_eq!(p[0], R_EARTH);
    }

    #[test]
    fn test_distance_to_centre() {
        assert_relative_eq!(distance_to_centre_of_earth(0.0), R_EARTH);
        let polar = R_EARTH * (1.0 - FLATTENING_FACTOR);
        assert_relative_eq!(distance_to_centre_of_earth(-90.0), polar, epsilon = 1e-6);
        let wais = distance_to_centre_of_earth(Location::Wais.latitude());
        assert!(wais < R_EARTH && wais > polar);
    }
}
