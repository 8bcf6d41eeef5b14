use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::dao::{BidDao, NotificationDao, ProviderDao, RequestDao};
use crate::db::model::{
    ActorId, Bid, BidId, NewBid, NewUrgentRequest, Notification, Provider, ProviderSnapshot,
    RequestId, UrgentRequest,
};
use crate::db::DbExecutor;
use crate::dispatcher::{Dispatcher, EventsListeners};
use crate::error::MarketError;
use crate::sweeper;

#[derive(thiserror::Error, Debug)]
pub enum MarketInitError {
    #[error("Failed to migrate market database. Error: {0}.")]
    Migration(#[from] anyhow::Error),
    #[error("Invalid market configuration. Error: {0}.")]
    Config(#[from] clap::Error),
}

/// Requestor view of one request together with its visible bids.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestDetails {
    pub request: UrgentRequest,
    pub bids: Vec<Bid>,
}

/// Entry point of the matching engine. Owns the background dispatcher and
/// sweeper; all state lives in the database, so the service is cheap to
/// clone and share.
#[derive(Clone)]
pub struct MarketService {
    db: DbExecutor,
    dispatcher: Dispatcher,
    config: Arc<Config>,
}

impl MarketService {
    pub fn new(
        db: &DbExecutor,
        config: Arc<Config>,
    ) -> Result<(MarketService, EventsListeners), MarketInitError> {
        counter!("market.requests.created", 0);
        counter!("market.requests.cancelled", 0);
        counter!("market.requests.expired", 0);
        counter!("market.bids.submitted", 0);
        counter!("market.bids.accepted", 0);
        counter!("market.bids.rejected", 0);
        counter!("market.bids.withdrawn", 0);
        counter!("market.dispatcher.notifications", 0);

        db.apply_migration(crate::db::migrations::run_with_output)?;

        let (dispatcher, listeners) = Dispatcher::new(db.clone(), config.clone());
        tokio::spawn(sweeper::sweep_forever(db.clone(), config.sweeper.clone()));

        let market = MarketService {
            db: db.clone(),
            dispatcher,
            config,
        };
        Ok((market, listeners))
    }

    pub async fn create_request(
        &self,
        caller: &ActorId,
        new: NewUrgentRequest,
    ) -> Result<UrgentRequest, MarketError> {
        let now = Utc::now().naive_utc();
        let ttl = self.config.requests.ttl_for(new.urgency);
        let request = UrgentRequest::from_new(&new, caller, now, ttl)?;

        self.db
            .as_dao::<RequestDao>()
            .create(request.clone())
            .await?;
        counter!("market.requests.created", 1);
        log::info!(
            "Request [{}] created by [{}] in {} (urgency {}, expires {}).",
            request.id,
            caller,
            request.category,
            request.urgency,
            request.expires_at
        );

        self.dispatcher.dispatch(&request);
        Ok(request)
    }

    pub async fn cancel_request(
        &self,
        caller: &ActorId,
        request_id: &RequestId,
    ) -> Result<UrgentRequest, MarketError> {
        let request = self
            .db
            .as_dao::<RequestDao>()
            .cancel(request_id, caller)
            .await?;
        counter!("market.requests.cancelled", 1);
        log::info!("Request [{}] cancelled by [{}].", request.id, caller);
        Ok(request)
    }

    pub async fn get_request_details(
        &self,
        request_id: &RequestId,
    ) -> Result<RequestDetails, MarketError> {
        let now = Utc::now().naive_utc();
        let request = self
            .db
            .as_dao::<RequestDao>()
            .select(request_id, now)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Request [{}]", request_id)))?;
        let bids = self
            .db
            .as_dao::<BidDao>()
            .list_for_request(request_id)
            .await?;
        Ok(RequestDetails { request, bids })
    }

    pub async fn list_active_requests(&self) -> Result<Vec<UrgentRequest>, MarketError> {
        let now = Utc::now().naive_utc();
        Ok(self.db.as_dao::<RequestDao>().list_active(now).await?)
    }

    pub async fn list_my_requests(
        &self,
        caller: &ActorId,
    ) -> Result<Vec<UrgentRequest>, MarketError> {
        Ok(self
            .db
            .as_dao::<RequestDao>()
            .list_by_requestor(caller.clone())
            .await?)
    }

    pub async fn submit_bid(
        &self,
        caller: &ActorId,
        request_id: &RequestId,
        new: NewBid,
    ) -> Result<Bid, MarketError> {
        let now = Utc::now().naive_utc();
        let bid = Bid::from_new(&new, request_id, caller, now)?;
        let bid = self.db.as_dao::<BidDao>().submit(bid, now).await?;
        counter!("market.bids.submitted", 1);
        log::info!(
            "Bid [{}] submitted by [{}] on request [{}] for {}.",
            bid.id,
            caller,
            bid.request_id,
            bid.price
        );
        Ok(bid)
    }

    /// At most one bid wins: the conditional update inside the DAO rejects
    /// every concurrent accept but the first.
    pub async fn accept_bid(
        &self,
        caller: &ActorId,
        request_id: &RequestId,
        bid_id: &BidId,
    ) -> Result<UrgentRequest, MarketError> {
        let now = Utc::now().naive_utc();
        let request = self
            .db
            .as_dao::<RequestDao>()
            .accept_bid(request_id, bid_id, caller, now)
            .await?;
        counter!("market.bids.accepted", 1);
        log::info!(
            "Bid [{}] accepted on request [{}] by [{}].",
            bid_id,
            request_id,
            caller
        );
        Ok(request)
    }

    pub async fn reject_bid(&self, caller: &ActorId, bid_id: &BidId) -> Result<Bid, MarketError> {
        let bid = self.db.as_dao::<BidDao>().reject(bid_id, caller).await?;
        counter!("market.bids.rejected", 1);
        log::info!("Bid [{}] rejected by [{}].", bid_id, caller);
        Ok(bid)
    }

    pub async fn withdraw_bid(&self, caller: &ActorId, bid_id: &BidId) -> Result<Bid, MarketError> {
        let bid = self.db.as_dao::<BidDao>().withdraw(bid_id, caller).await?;
        counter!("market.bids.withdrawn", 1);
        log::info!("Bid [{}] withdrawn by [{}].", bid_id, caller);
        Ok(bid)
    }

    pub async fn list_my_bids(&self, caller: &ActorId) -> Result<Vec<Bid>, MarketError> {
        Ok(self
            .db
            .as_dao::<BidDao>()
            .list_by_provider(caller.clone())
            .await?)
    }

    pub async fn register_provider(&self, snapshot: ProviderSnapshot) -> Result<(), MarketError> {
        let provider = Provider::from_snapshot(&snapshot)?;
        self.db.as_dao::<ProviderDao>().upsert(provider).await?;
        log::info!("Provider [{}] profile registered.", snapshot.id);
        Ok(())
    }

    pub async fn get_provider(
        &self,
        id: &ActorId,
    ) -> Result<Option<ProviderSnapshot>, MarketError> {
        match self.db.as_dao::<ProviderDao>().select(id).await? {
            Some(provider) => Ok(Some(provider.into_snapshot()?)),
            None => Ok(None),
        }
    }

    pub async fn list_notifications(
        &self,
        caller: &ActorId,
    ) -> Result<Vec<Notification>, MarketError> {
        Ok(self
            .db
            .as_dao::<NotificationDao>()
            .list_unread(caller.clone())
            .await?)
    }

    pub async fn mark_notification_read(
        &self,
        caller: &ActorId,
        notification_id: i32,
    ) -> Result<(), MarketError> {
        let updated = self
            .db
            .as_dao::<NotificationDao>()
            .mark_read(notification_id, caller.clone())
            .await?;
        if !updated {
            return Err(MarketError::NotFound(format!(
                "Notification [{}] for provider [{}]",
                notification_id, caller
            )));
        }
        Ok(())
    }
}
