use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::db::model::ServiceCategory;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Great-circle distance between two points, in kilometers (haversine).
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Radius check used during fan-out. Returns false whenever either side has
/// no coordinates; callers decide separately whether to fall back to
/// category-only matching. The boundary is inclusive.
pub fn within_radius(a: Option<GeoPoint>, b: Option<GeoPoint>, radius_km: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => distance_km(a, b) <= radius_km,
        _ => false,
    }
}

pub fn category_matches(offered: &BTreeSet<ServiceCategory>, wanted: ServiceCategory) -> bool {
    offered.contains(&wanted)
}
