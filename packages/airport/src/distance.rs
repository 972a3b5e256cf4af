//! Great-circle distance on a spherical Earth.

use anycast_hunter_models::GeoPoint;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Cosines this close to 1 are treated as zero arc.
const ZERO_ARC_TOLERANCE: f64 = 1e-15;

/// Distance in kilometres between two points, using the spherical law of
/// cosines on colatitudes.
///
/// Identical points are exactly 0 km apart.
#[must_use]
pub fn great_circle_distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi_a = (90.0 - a.latitude).to_radians();
    let phi_b = (90.0 - b.latitude).to_radians();
    let theta_a = a.longitude.to_radians();
    let theta_b = b.longitude.to_radians();

    let cos = phi_a.sin() * phi_b.sin() * (theta_a - theta_b).cos() + phi_a.cos() * phi_b.cos();

    let arc = if (cos - 1.0).abs() < ZERO_ARC_TOLERANCE {
        0.0
    } else {
        cos.clamp(-1.0, 1.0).acos()
    };

    arc * EARTH_RADIUS_KM
}
