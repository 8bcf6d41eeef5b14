use bigdecimal::BigDecimal;
use chrono::Utc;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::db::model::{
    ActorId, CategoryPricing, JobQuote, NewBid, NewUrgentRequest, ProviderSnapshot,
    ServiceCategory, UrgencyLevel, UrgentRequest,
};
use crate::geo::{GeoPoint, EARTH_RADIUS_KM};

pub const WARSAW: GeoPoint = GeoPoint {
    latitude: 52.2297,
    longitude: 21.0122,
};

/// Point `km` north of `origin`; along a meridian the haversine distance
/// is exact, which keeps radius assertions deterministic.
pub fn north_of(origin: GeoPoint, km: f64) -> GeoPoint {
    GeoPoint {
        latitude: origin.latitude + km * 180.0 / (std::f64::consts::PI * EARTH_RADIUS_KM),
        longitude: origin.longitude,
    }
}

pub fn actor(id: &str) -> ActorId {
    ActorId::from_str(id).unwrap()
}

pub fn sample_new_request() -> NewUrgentRequest {
    NewUrgentRequest {
        category: ServiceCategory::Plumbing,
        title: "Burst pipe under kitchen sink".to_string(),
        description: "Water spreading fast, main valve already closed.".to_string(),
        urgency: UrgencyLevel::Critical,
        location: "Mokotow, Warsaw".to_string(),
        coordinates: Some(WARSAW),
        budget_min: BigDecimal::from(500u32),
        budget_max: BigDecimal::from(1000u32),
    }
}

pub fn sample_bid(price: u32) -> NewBid {
    NewBid {
        price: BigDecimal::from(price),
        message: Some("Available right away.".to_string()),
    }
}

pub fn sample_provider(id: &str, categories: &[ServiceCategory]) -> ProviderSnapshot {
    provider_at(id, categories, Some(WARSAW))
}

pub fn provider_at(
    id: &str,
    categories: &[ServiceCategory],
    coordinates: Option<GeoPoint>,
) -> ProviderSnapshot {
    let mut pricing = BTreeMap::new();
    for category in categories {
        pricing.insert(
            *category,
            vec![JobQuote {
                job: "call-out".to_string(),
                price_min: BigDecimal::from(100u32),
                price_max: BigDecimal::from(800u32),
            }],
        );
    }
    ProviderSnapshot {
        id: actor(id),
        categories: categories.iter().copied().collect(),
        coordinates,
        active: true,
        verified: true,
        pricing: CategoryPricing(pricing),
    }
}

/// Request with an arbitrary (possibly very short) lifetime, bypassing the
/// urgency-based TTL configuration.
pub fn request_expiring_in(requestor_id: &ActorId, ttl: chrono::Duration) -> UrgentRequest {
    UrgentRequest::from_new(
        &sample_new_request(),
        requestor_id,
        Utc::now().naive_utc(),
        ttl,
    )
    .unwrap()
}

/// Request whose deadline already passed, for exercising expiry paths
/// without waiting. Insert it directly through `RequestDao`.
pub fn overdue_request(requestor_id: &ActorId) -> UrgentRequest {
    let created = Utc::now().naive_utc() - chrono::Duration::hours(3);
    UrgentRequest::from_new(
        &sample_new_request(),
        requestor_id,
        created,
        chrono::Duration::hours(2),
    )
    .unwrap()
}
