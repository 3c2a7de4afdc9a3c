/// Great-circle helpers for "how far is the bus" displays

/// Mean Earth radius in kilometres
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two `(latitude, longitude)` points, in km
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// `850 m` below one kilometre, `2.35 km` above
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as i64)
    } else {
        format!("{:.2} km", km)
    }
}

/// Parse `"lat,lng"` (as given on the command line)
pub fn parse_point(raw: &str) -> Option<(f64, f64)> {
    let (lat, lng) = raw.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)).then_some((lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Bangalore -> Chennai, roughly 290 km
        let km = haversine_km((12.9716, 77.5946), (13.0827, 80.2707));
        assert!((km - 290.2).abs() < 1.0, "got {}", km);
        assert_eq!(haversine_km((1.0, 1.0), (1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.8504), "850 m");
        assert_eq!(format_distance(2.3456), "2.35 km");
        assert_eq!(format_distance(0.0), "0 m");
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("12.5, 77.25"), Some((12.5, 77.25)));
        assert_eq!(parse_point("95,0"), None);
        assert_eq!(parse_point("12.5"), None);
    }
}
