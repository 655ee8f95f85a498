const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinate pairs in kilometres
/// (haversine formula).
pub fn haversine_distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_for_identical_points() {
        assert_eq!(haversine_distance_km(11.0168, 76.9558, 11.0168, 76.9558), 0.0);
    }

    #[test]
    fn known_distance_between_cities() {
        // Coimbatore to Chennai, roughly 431 km as the crow flies.
        let d = haversine_distance_km(11.0168, 76.9558, 13.0827, 80.2707);
        assert!((d - 431.0).abs() < 5.0, "unexpected distance: {}", d);
    }

    #[test]
    fn symmetric() {
        let a = haversine_distance_km(11.03, 77.01, 11.07, 77.08);
        let b = haversine_distance_km(11.07, 77.08, 11.03, 77.01);
        assert!((a - b).abs() < 1e-9);
    }
}
