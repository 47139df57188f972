// =============================================================================
// geo.rs — THE EARTH IS (CLOSE ENOUGH TO) A SPHERE
// =============================================================================
//
// Great-circle distance via the haversine formula on the IUGG mean Earth
// radius. For deciding which imaginary truck is closest to Chicago, the
// half-percent error against a full ellipsoidal geodesic is not the thing
// that sinks this business model.
//
// Every ranking, fuel bill, and profit figure in the engine flows through
// distance_km, so it stays a pure function with zero dependencies and a
// pile of pinned reference values in the tests.
// =============================================================================

use crate::models::GeoPoint;

/// IUGG mean Earth radius, km.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// The dataset is metric; the trucks' fuel economy is not.
pub const KM_PER_MILE: f64 = 1.60934;

/// Haversine great-circle distance between two points, in kilometers.
/// Symmetric, zero for identical points, and deterministic to the bit —
/// the reproducibility tests depend on that last part.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi_a = a.lat.to_radians();
    let phi_b = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Kilometers → miles, for feeding distances into miles-per-gallon math.
pub fn km_to_miles(km: f64) -> f64 {
    km / KM_PER_MILE
}
