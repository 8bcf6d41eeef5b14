use crate::db::dao::{BidStateError, RequestStateError, SaveBidError};
use crate::db::model::{
    BidValidationError, ConversionError, ParseIdError, PricingError, RequestValidationError,
};
use crate::db::DbError;

/// Errors surfaced on the service boundary. Variants map one-to-one onto
/// caller reactions: fix the input, re-read state, re-authenticate, or
/// retry later.
#[derive(thiserror::Error, Debug)]
pub enum MarketError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Operation not allowed in the current state: {0}")]
    InvalidState(String),
    #[error("Permission denied: {0}")]
    Permission(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate: {0}")]
    Duplicate(String),
    #[error("Temporary failure, retry later: {0}")]
    Transient(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DbError> for MarketError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Pool(e) => MarketError::Transient(e.to_string()),
            DbError::RuntimeError(e) => MarketError::Transient(e.to_string()),
            DbError::Diesel(e) => MarketError::Internal(e.to_string()),
        }
    }
}

impl From<RequestStateError> for MarketError {
    fn from(err: RequestStateError) -> Self {
        match err {
            RequestStateError::NotFound(..) | RequestStateError::BidNotFound(..) => {
                MarketError::NotFound(err.to_string())
            }
            RequestStateError::InvalidTransition { .. }
            | RequestStateError::BidNotPending { .. } => MarketError::InvalidState(err.to_string()),
            RequestStateError::Ownership { .. } => MarketError::Permission(err.to_string()),
            RequestStateError::Db(e) => e.into(),
        }
    }
}

impl From<SaveBidError> for MarketError {
    fn from(err: SaveBidError) -> Self {
        match err {
            SaveBidError::RequestNotFound(..) => MarketError::NotFound(err.to_string()),
            SaveBidError::RequestClosed { .. } => MarketError::InvalidState(err.to_string()),
            SaveBidError::AlreadyBid { .. } => MarketError::Duplicate(err.to_string()),
            SaveBidError::Internal(e) => e.into(),
        }
    }
}

impl From<BidStateError> for MarketError {
    fn from(err: BidStateError) -> Self {
        match err {
            BidStateError::NotFound(..) => MarketError::NotFound(err.to_string()),
            BidStateError::InvalidTransition { .. } => MarketError::InvalidState(err.to_string()),
            BidStateError::Ownership { .. } => MarketError::Permission(err.to_string()),
            BidStateError::Db(e) => e.into(),
        }
    }
}

impl From<RequestValidationError> for MarketError {
    fn from(err: RequestValidationError) -> Self {
        MarketError::Validation(err.to_string())
    }
}

impl From<BidValidationError> for MarketError {
    fn from(err: BidValidationError) -> Self {
        MarketError::Validation(err.to_string())
    }
}

impl From<PricingError> for MarketError {
    fn from(err: PricingError) -> Self {
        MarketError::Validation(err.to_string())
    }
}

impl From<ConversionError> for MarketError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Pricing(e) => e.into(),
            ConversionError::Serde(e) => MarketError::Internal(e.to_string()),
        }
    }
}

impl From<ParseIdError> for MarketError {
    fn from(err: ParseIdError) -> Self {
        MarketError::Validation(err.to_string())
    }
}
