use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::serialize::{Output, ToSql};
use diesel::sql_types::Integer;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use urgent_persistence::types::BigDecimalField;

use crate::db::model::{ActorId, BidId, RequestId, ServiceCategory, UrgencyLevel};
use crate::db::schema::market_request;
use crate::geo::GeoPoint;

#[derive(
    FromPrimitive,
    AsExpression,
    FromSqlRow,
    PartialEq,
    Eq,
    Debug,
    Clone,
    Copy,
    derive_more::Display,
    Serialize,
    Deserialize,
)]
#[sql_type = "Integer"]
pub enum RequestState {
    /// Newly created, no bids yet.
    Open = 0,
    /// At least one bid received.
    Bidding = 1,
    /// Requestor accepted a bid (terminal).
    Accepted = 2,
    /// Passed `expires_at` without acceptance (terminal).
    Expired = 3,
    /// Withdrawn by the requestor (terminal).
    Cancelled = 4,
}

impl RequestState {
    /// `Open` and `Bidding` are equivalent for matching purposes; the split
    /// only lets callers tell "no interest yet" from "under negotiation".
    pub fn accepts_bids(&self) -> bool {
        matches!(self, RequestState::Open | RequestState::Bidding)
    }

    pub fn is_terminal(&self) -> bool {
        !self.accepts_bids()
    }
}

/// States a conditional update may transition away from. Every competing
/// writer (accept, cancel, expire) guards on this same set, so exactly one
/// of them wins.
pub(crate) const BIDDABLE_STATES: [RequestState; 2] = [RequestState::Open, RequestState::Bidding];

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RequestValidationError {
    #[error("Budget bounds must be positive, got {0}..{1}.")]
    NonPositiveBudget(BigDecimal, BigDecimal),
    #[error("Budget minimum {0} exceeds maximum {1}.")]
    InvertedBudget(BigDecimal, BigDecimal),
    #[error("Request title can't be empty.")]
    EmptyTitle,
}

/// Client-facing input for request creation; everything else on the row
/// is derived by the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewUrgentRequest {
    pub category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub urgency: UrgencyLevel,
    pub location: String,
    /// None when upstream geocoding failed; such requests are matched by
    /// category only.
    pub coordinates: Option<GeoPoint>,
    pub budget_min: BigDecimal,
    pub budget_max: BigDecimal,
}

#[derive(Clone, Debug, Identifiable, Insertable, Queryable, Serialize, Deserialize)]
#[table_name = "market_request"]
pub struct UrgentRequest {
    pub id: RequestId,
    pub requestor_id: ActorId,
    pub category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub urgency: UrgencyLevel,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub budget_min: BigDecimalField,
    pub budget_max: BigDecimalField,
    pub state: RequestState,
    /// Set in the same conditional update that moves `state` to `Accepted`;
    /// null in every other state.
    pub accepted_bid_id: Option<BidId>,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub accepted_at: Option<NaiveDateTime>,
}

impl UrgentRequest {
    pub fn from_new(
        new: &NewUrgentRequest,
        requestor_id: &ActorId,
        created_at: NaiveDateTime,
        ttl: chrono::Duration,
    ) -> Result<UrgentRequest, RequestValidationError> {
        use bigdecimal::Zero;

        if new.budget_min <= BigDecimal::zero() || new.budget_max <= BigDecimal::zero() {
            return Err(RequestValidationError::NonPositiveBudget(
                new.budget_min.clone(),
                new.budget_max.clone(),
            ));
        }
        if new.budget_min > new.budget_max {
            return Err(RequestValidationError::InvertedBudget(
                new.budget_min.clone(),
                new.budget_max.clone(),
            ));
        }
        if new.title.trim().is_empty() {
            return Err(RequestValidationError::EmptyTitle);
        }

        Ok(UrgentRequest {
            id: RequestId::generate(),
            requestor_id: requestor_id.clone(),
            category: new.category,
            title: new.title.clone(),
            description: new.description.clone(),
            urgency: new.urgency,
            location: new.location.clone(),
            latitude: new.coordinates.map(|c| c.latitude),
            longitude: new.coordinates.map(|c| c.longitude),
            budget_min: new.budget_min.clone().into(),
            budget_max: new.budget_max.clone().into(),
            state: RequestState::Open,
            accepted_bid_id: None,
            created_at,
            expires_at: created_at + ttl,
            accepted_at: None,
        })
    }

    pub fn coordinates(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

impl<DB: Backend> ToSql<Integer, DB> for RequestState
where
    i32: ToSql<Integer, DB>,
{
    fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, DB>) -> diesel::serialize::Result {
        (*self as i32).to_sql(out)
    }
}

impl<DB> FromSql<Integer, DB> for RequestState
where
    i32: FromSql<Integer, DB>,
    DB: Backend,
{
    fn from_sql(bytes: Option<&DB::RawValue>) -> deserialize::Result<Self> {
        let enum_value = i32::from_sql(bytes)?;
        Ok(FromPrimitive::from_i32(enum_value).ok_or(anyhow::anyhow!(
            "Invalid conversion from {} (i32) to RequestState.",
            enum_value
        ))?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    fn sample_new() -> NewUrgentRequest {
        NewUrgentRequest {
            category: ServiceCategory::Plumbing,
            title: "Burst pipe in kitchen".to_string(),
            description: "Water everywhere, need help now".to_string(),
            urgency: UrgencyLevel::Critical,
            location: "Mokotow, Warsaw".to_string(),
            coordinates: None,
            budget_min: BigDecimal::from(500u32),
            budget_max: BigDecimal::from(1000u32),
        }
    }

    #[test]
    fn from_new_sets_open_state_and_expiry() {
        let requestor = ActorId::from_str("req-1").unwrap();
        let created = chrono::Utc::now().naive_utc();
        let request =
            UrgentRequest::from_new(&sample_new(), &requestor, created, chrono::Duration::hours(2))
                .unwrap();

        assert_eq!(request.state, RequestState::Open);
        assert_eq!(request.expires_at, created + chrono::Duration::hours(2));
        assert_eq!(request.accepted_bid_id, None);
        assert_eq!(request.coordinates(), None);
    }

    #[test]
    fn from_new_rejects_bad_budgets() {
        let requestor = ActorId::from_str("req-1").unwrap();
        let created = chrono::Utc::now().naive_utc();

        let mut inverted = sample_new();
        inverted.budget_min = BigDecimal::from(2000u32);
        assert!(matches!(
            UrgentRequest::from_new(&inverted, &requestor, created, chrono::Duration::hours(1)),
            Err(RequestValidationError::InvertedBudget(..))
        ));

        let mut negative = sample_new();
        negative.budget_min = BigDecimal::from(-5i32);
        assert!(matches!(
            UrgentRequest::from_new(&negative, &requestor, created, chrono::Duration::hours(1)),
            Err(RequestValidationError::NonPositiveBudget(..))
        ));
    }

    #[test]
    fn terminal_states_do_not_accept_bids() {
        assert!(RequestState::Open.accepts_bids());
        assert!(RequestState::Bidding.accepts_bids());
        for state in [
            RequestState::Accepted,
            RequestState::Expired,
            RequestState::Cancelled,
        ] {
            assert!(state.is_terminal());
        }
    }
}
