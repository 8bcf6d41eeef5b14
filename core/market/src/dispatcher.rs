use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::db::dao::{NotificationDao, ProviderDao};
use crate::db::model::{ActorId, NewNotification, RequestId, ServiceCategory, UrgencyLevel, UrgentRequest};
use crate::db::DbExecutor;
use crate::error::MarketError;
use crate::geo::{category_matches, within_radius};

use urgent_persistence::types::BigDecimalField;

/// Event pushed to the delivery layer (push gateway, websocket, ...) for
/// every provider notified about a new request. The same content is also
/// persisted, so delivery is at-least-once from the provider's view.
#[derive(Clone, Debug)]
pub struct ProviderNotification {
    pub provider_id: ActorId,
    pub request_id: RequestId,
    pub category: ServiceCategory,
    pub urgency: UrgencyLevel,
    pub budget_min: BigDecimalField,
    pub budget_max: BigDecimalField,
}

/// Receiving side of the dispatcher output, handed to whoever owns delivery.
pub struct EventsListeners {
    pub notification_receiver: UnboundedReceiver<ProviderNotification>,
}

/// Fans newly created requests out to matching providers. Requests are
/// queued on an unbounded channel and processed by a spawned loop, so
/// request creation never waits for matching.
#[derive(Clone)]
pub struct Dispatcher {
    db: DbExecutor,
    config: Arc<Config>,
    request_tx: UnboundedSender<UrgentRequest>,
    notification_tx: UnboundedSender<ProviderNotification>,
}

impl Dispatcher {
    pub fn new(db: DbExecutor, config: Arc<Config>) -> (Dispatcher, EventsListeners) {
        let (request_tx, request_rx) = unbounded_channel::<UrgentRequest>();
        let (notification_tx, notification_rx) = unbounded_channel::<ProviderNotification>();

        let dispatcher = Dispatcher {
            db,
            config,
            request_tx,
            notification_tx,
        };

        tokio::spawn(dispatcher.clone().process_incoming_requests(request_rx));

        let listeners = EventsListeners {
            notification_receiver: notification_rx,
        };
        (dispatcher, listeners)
    }

    /// Fire-and-forget handoff from request creation.
    pub fn dispatch(&self, request: &UrgentRequest) {
        if let Err(e) = self.request_tx.send(request.clone()) {
            log::error!("Dispatcher loop is gone, request not fanned out. Error: {}.", e);
        }
    }

    async fn process_incoming_requests(self, mut request_rx: UnboundedReceiver<UrgentRequest>) {
        while let Some(request) = request_rx.recv().await {
            let request_id = request.id.clone();
            if let Err(e) = self.dispatch_single(request).await {
                log::warn!("Failed to fan out request [{}]. Error: {}.", request_id, e);
            }
        }
    }

    async fn dispatch_single(&self, request: UrgentRequest) -> Result<(), MarketError> {
        let providers = self.db.as_dao::<ProviderDao>().list_active().await?;
        let now = Utc::now().naive_utc();
        let radius_km = self.config.matching.default_radius_km;

        let mut batch = Vec::new();
        let mut events = Vec::new();
        for provider in providers {
            let snapshot = match provider.into_snapshot() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    log::warn!("Skipping malformed provider profile. Error: {}.", e);
                    continue;
                }
            };
            if !category_matches(&snapshot.categories, request.category) {
                continue;
            }
            // Requests without coordinates match on category alone; providers
            // without coordinates are only reached by such requests.
            let reachable = match request.coordinates() {
                None => true,
                Some(origin) => within_radius(Some(origin), snapshot.coordinates, radius_km),
            };
            if !reachable {
                continue;
            }

            batch.push(NewNotification::from_request(&request, &snapshot.id, now));
            events.push(ProviderNotification {
                provider_id: snapshot.id,
                request_id: request.id.clone(),
                category: request.category,
                urgency: request.urgency,
                budget_min: request.budget_min.clone(),
                budget_max: request.budget_max.clone(),
            });
        }

        let count = self.db.as_dao::<NotificationDao>().add_batch(batch).await?;
        counter!("market.dispatcher.notifications", count as u64);
        log::info!(
            "Request [{}] ({}, {}) fanned out to {} provider(s).",
            request.id,
            request.category,
            request.urgency,
            count
        );

        for event in events {
            if self.notification_tx.send(event).is_err() {
                // Listener dropped; rows are persisted anyway.
                log::debug!("Notification listener closed.");
                break;
            }
        }
        Ok(())
    }
}
