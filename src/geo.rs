use crate::responses::StudioInfo;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two points given in degrees
/// (spherical law of cosines).
pub fn distance_km(lat1: f64, long1: f64, lat2: f64, long2: f64) -> f64 {
    let (lat1, long1) = (lat1.to_radians(), long1.to_radians());
    let (lat2, long2) = (lat2.to_radians(), long2.to_radians());

    // Rounding can push the cosine slightly past 1 for identical points.
    let cos_angle =
        lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (long2 - long1).cos();
    cos_angle.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_KM
}

/// Order studios by distance from a point, studios without an address last.
pub fn sort_by_distance(studios: &mut [StudioInfo], latitude: f64, longitude: f64) {
    let distance = |studio: &StudioInfo| {
        studio
            .address
            .map(|addr| distance_km(latitude, longitude, addr.latitude, addr.longitude))
            .unwrap_or(f64::INFINITY)
    };
    studios.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}
