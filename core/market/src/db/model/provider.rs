use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::db::model::{ActorId, CategoryPricing, PricingError, ServiceCategory};
use crate::db::schema::market_provider;
use crate::geo::GeoPoint;

#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error("Can't deserialize provider profile. Error: {0}.")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Provider profile as persisted. Category and pricing columns hold JSON;
/// use [`Provider::into_snapshot`] for the typed view.
#[derive(Clone, Debug, Identifiable, Insertable, Queryable)]
#[table_name = "market_provider"]
pub struct Provider {
    pub id: ActorId,
    pub categories: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub active: bool,
    pub verified: bool,
    pub pricing: String,
}

/// Typed provider profile used by matching and by the registration API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub id: ActorId,
    pub categories: BTreeSet<ServiceCategory>,
    pub coordinates: Option<GeoPoint>,
    pub active: bool,
    /// Unverified providers are skipped during fan-out but may still browse.
    pub verified: bool,
    pub pricing: CategoryPricing,
}

impl Provider {
    pub fn from_snapshot(snapshot: &ProviderSnapshot) -> Result<Provider, ConversionError> {
        snapshot.pricing.validate()?;
        Ok(Provider {
            id: snapshot.id.clone(),
            categories: serde_json::to_string(&snapshot.categories)?,
            latitude: snapshot.coordinates.map(|c| c.latitude),
            longitude: snapshot.coordinates.map(|c| c.longitude),
            active: snapshot.active,
            verified: snapshot.verified,
            pricing: serde_json::to_string(&snapshot.pricing)?,
        })
    }

    pub fn into_snapshot(self) -> Result<ProviderSnapshot, ConversionError> {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Ok(ProviderSnapshot {
            id: self.id,
            categories: serde_json::from_str(&self.categories)?,
            coordinates,
            active: self.active,
            verified: self.verified,
            pricing: serde_json::from_str(&self.pricing)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    fn snapshot() -> ProviderSnapshot {
        ProviderSnapshot {
            id: ActorId::from_str("prov-1").unwrap(),
            categories: [ServiceCategory::Plumbing, ServiceCategory::Electrical]
                .iter()
                .copied()
                .collect(),
            coordinates: Some(GeoPoint {
                latitude: 52.2297,
                longitude: 21.0122,
            }),
            active: true,
            verified: true,
            pricing: CategoryPricing::default(),
        }
    }

    #[test]
    fn snapshot_survives_row_conversion() {
        let original = snapshot();
        let restored = Provider::from_snapshot(&original)
            .unwrap()
            .into_snapshot()
            .unwrap();
        assert_eq!(restored.id, original.id);
        assert_eq!(restored.categories, original.categories);
        assert_eq!(restored.coordinates, original.coordinates);
    }

    #[test]
    fn malformed_categories_column_is_reported() {
        let mut row = Provider::from_snapshot(&snapshot()).unwrap();
        row.categories = "not json".to_string();
        assert!(matches!(
            row.into_snapshot(),
            Err(ConversionError::Serde(_))
        ));
    }
}
