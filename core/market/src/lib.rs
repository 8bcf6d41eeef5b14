#[macro_use]
extern crate diesel;

mod config;
mod db;
mod dispatcher;
mod error;
mod geo;
mod market;
mod sweeper;

pub mod testing;

pub use config::{Config, MatchingConfig, RequestConfig, SweeperConfig};
pub use db::model::{
    ActorId, Bid, BidId, BidState, BidValidationError, CategoryPricing, ConversionError, JobQuote,
    NewBid, NewNotification, NewUrgentRequest, Notification, ParseIdError, PricingError, Provider,
    ProviderSnapshot, RequestId, RequestState, RequestValidationError, ServiceCategory,
    UrgencyLevel, UrgentRequest,
};
pub use dispatcher::{Dispatcher, EventsListeners, ProviderNotification};
pub use error::MarketError;
pub use geo::{category_matches, distance_km, within_radius, GeoPoint};
pub use market::{MarketInitError, MarketService, RequestDetails};
pub use sweeper::sweep;

pub use urgent_persistence::executor::DbExecutor;
