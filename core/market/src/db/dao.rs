mod bid;
mod notification;
mod provider;
mod request;

pub use bid::{BidDao, BidStateError, SaveBidError};
pub use notification::NotificationDao;
pub use provider::ProviderDao;
pub use request::{RequestDao, RequestStateError};
