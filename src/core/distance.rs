use crate::models::GeoPoint;

/// Earth's radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate length of one degree of latitude in kilometers
const KM_PER_DEGREE: f64 = 111.0;

/// Great-circle distance between two points in kilometers
///
/// `d = 6371 · acos(cos φ1 · cos φ2 · cos(λ2 − λ1) + sin φ1 · sin φ2)`
///
/// The cosine argument is clamped to `[-1, 1]` so identical points return
/// `0.0` rather than `NaN` from rounding.
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let cos_angle = lat1_rad.cos() * lat2_rad.cos() * delta_lon.cos()
        + lat1_rad.sin() * lat2_rad.sin();

    EARTH_RADIUS_KM * cos_angle.clamp(-1.0, 1.0).acos()
}

#[inline]
pub fn distance_between(from: GeoPoint, to: GeoPoint) -> f64 {
    haversine_distance(from.lat, from.lng, to.lat, to.lng)
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Whether the longitude span wraps past the antimeridian or over a pole
    fn wraps(&self) -> bool {
        self.min_lon < -180.0
            || self.max_lon > 180.0
            || self.min_lat <= -90.0
            || self.max_lat >= 90.0
    }
}

/// Calculate a bounding box around a center point
///
/// Much cheaper than the great-circle formula, used as a pre-check before
/// exact radius filtering. The box always contains the true circle.
/// 1° latitude ≈ 111km, 1° longitude ≈ 111km * cos(latitude)
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / KM_PER_DEGREE;
    let lon_delta = radius_km / (KM_PER_DEGREE * lat.to_radians().cos().abs());

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box
///
/// Boxes that cross the antimeridian (or reach a pole) only constrain latitude.
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    if lat < bbox.min_lat || lat > bbox.max_lat {
        return false;
    }
    bbox.wraps() || (lon >= bbox.min_lon && lon <= bbox.max_lon)
}
