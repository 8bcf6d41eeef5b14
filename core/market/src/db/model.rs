mod bid;
mod category;
mod ids;
mod notification;
mod pricing;
mod provider;
mod request;

pub use bid::{Bid, BidState, BidValidationError, NewBid};
pub use category::{ServiceCategory, UrgencyLevel};
pub use ids::{ActorId, BidId, ParseIdError, RequestId};
pub use notification::{NewNotification, Notification};
pub use pricing::{CategoryPricing, JobQuote, PricingError};
pub use provider::{ConversionError, Provider, ProviderSnapshot};
pub use request::{NewUrgentRequest, RequestState, RequestValidationError, UrgentRequest};

pub(crate) use request::BIDDABLE_STATES;
