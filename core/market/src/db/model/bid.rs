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

use crate::db::model::{ActorId, BidId, RequestId};
use crate::db::schema::market_bid;

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
pub enum BidState {
    /// Awaiting requestor decision.
    Pending = 0,
    /// Chosen by the requestor (terminal).
    Accepted = 1,
    /// Declined by the requestor, or lost to an accepted sibling (terminal).
    Rejected = 2,
    /// Retracted by the provider (terminal).
    Withdrawn = 3,
}

impl BidState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BidState::Pending)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BidValidationError {
    #[error("Bid price must be positive, got {0}.")]
    NonPositivePrice(BigDecimal),
}

/// Provider's input for bid submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewBid {
    pub price: BigDecimal,
    pub message: Option<String>,
}

#[derive(Clone, Debug, Identifiable, Insertable, Queryable, Serialize, Deserialize)]
#[table_name = "market_bid"]
pub struct Bid {
    pub id: BidId,
    pub request_id: RequestId,
    pub provider_id: ActorId,
    pub price: BigDecimalField,
    pub message: Option<String>,
    pub state: BidState,
    pub submitted_at: NaiveDateTime,
}

impl Bid {
    pub fn from_new(
        new: &NewBid,
        request_id: &RequestId,
        provider_id: &ActorId,
        submitted_at: NaiveDateTime,
    ) -> Result<Bid, BidValidationError> {
        use bigdecimal::Zero;

        if new.price <= BigDecimal::zero() {
            return Err(BidValidationError::NonPositivePrice(new.price.clone()));
        }

        Ok(Bid {
            id: BidId::generate(),
            request_id: request_id.clone(),
            provider_id: provider_id.clone(),
            price: new.price.clone().into(),
            message: new.message.clone(),
            state: BidState::Pending,
            submitted_at,
        })
    }
}

impl<DB: Backend> ToSql<Integer, DB> for BidState
where
    i32: ToSql<Integer, DB>,
{
    fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, DB>) -> diesel::serialize::Result {
        (*self as i32).to_sql(out)
    }
}

impl<DB> FromSql<Integer, DB> for BidState
where
    i32: FromSql<Integer, DB>,
    DB: Backend,
{
    fn from_sql(bytes: Option<&DB::RawValue>) -> deserialize::Result<Self> {
        let enum_value = i32::from_sql(bytes)?;
        Ok(FromPrimitive::from_i32(enum_value).ok_or(anyhow::anyhow!(
            "Invalid conversion from {} (i32) to BidState.",
            enum_value
        ))?)
    }
}
