use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::model::ServiceCategory;

/// Indicative price range a provider publishes for one named job, e.g.
/// "leak repair" in the plumbing category. Used by clients to pre-fill
/// bid forms; never enforced by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobQuote {
    pub job: String,
    pub price_min: BigDecimal,
    pub price_max: BigDecimal,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Job name can't be empty (category {0}).")]
    EmptyJobName(ServiceCategory),
    #[error("Duplicate job [{1}] in category {0}.")]
    DuplicateJob(ServiceCategory, String),
    #[error("Job [{1}] in category {0} has invalid price range {2}..{3}.")]
    InvalidRange(ServiceCategory, String, BigDecimal, BigDecimal),
}

/// Per-category price lists from a provider profile. Stored serialized in a
/// single column, so validation happens here rather than in the schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryPricing(pub BTreeMap<ServiceCategory, Vec<JobQuote>>);

impl CategoryPricing {
    pub fn validate(&self) -> Result<(), PricingError> {
        use bigdecimal::Zero;

        for (category, quotes) in &self.0 {
            let mut seen = std::collections::BTreeSet::new();
            for quote in quotes {
                let job = quote.job.trim();
                if job.is_empty() {
                    return Err(PricingError::EmptyJobName(*category));
                }
                if !seen.insert(job.to_lowercase()) {
                    return Err(PricingError::DuplicateJob(*category, quote.job.clone()));
                }
                if quote.price_min <= BigDecimal::zero() || quote.price_max < quote.price_min {
                    return Err(PricingError::InvalidRange(
                        *category,
                        quote.job.clone(),
                        quote.price_min.clone(),
                        quote.price_max.clone(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn quotes_for(&self, category: ServiceCategory) -> &[JobQuote] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn quote(job: &str, min: u32, max: u32) -> JobQuote {
        JobQuote {
            job: job.to_string(),
            price_min: BigDecimal::from(min),
            price_max: BigDecimal::from(max),
        }
    }

    #[test]
    fn accepts_well_formed_pricing() {
        let mut map = BTreeMap::new();
        map.insert(
            ServiceCategory::Plumbing,
            vec![quote("leak repair", 100, 400), quote("drain cleaning", 80, 250)],
        );
        assert_eq!(CategoryPricing(map).validate(), Ok(()));
    }

    #[test]
    fn rejects_duplicate_jobs_case_insensitively() {
        let mut map = BTreeMap::new();
        map.insert(
            ServiceCategory::Cleaning,
            vec![quote("Deep clean", 200, 500), quote("deep clean", 150, 300)],
        );
        assert!(matches!(
            CategoryPricing(map).validate(),
            Err(PricingError::DuplicateJob(ServiceCategory::Cleaning, _))
        ));
    }

    #[test]
    fn rejects_inverted_price_range() {
        let mut map = BTreeMap::new();
        map.insert(ServiceCategory::Electrical, vec![quote("rewiring", 900, 300)]);
        assert!(matches!(
            CategoryPricing(map).validate(),
            Err(PricingError::InvalidRange(..))
        ));
    }
}
