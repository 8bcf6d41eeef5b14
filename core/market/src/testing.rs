//! Utilities for tests of the engine and of code embedding it. Not part of
//! the stable API.

pub mod fixtures;
pub mod mock_market;

pub use fixtures::*;
pub use mock_market::MockMarket;

pub use crate::db::dao::{
    BidDao, BidStateError, NotificationDao, ProviderDao, RequestDao, RequestStateError,
    SaveBidError,
};
