use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use urgent_persistence::types::BigDecimalField;

use crate::db::model::{ActorId, RequestId, ServiceCategory, UrgencyLevel, UrgentRequest};
use crate::db::schema::market_notification;

/// Row to insert; the id is assigned by the database.
#[derive(Clone, Debug, Insertable)]
#[table_name = "market_notification"]
pub struct NewNotification {
    pub provider_id: ActorId,
    pub request_id: RequestId,
    pub category: ServiceCategory,
    pub urgency: UrgencyLevel,
    pub budget_min: BigDecimalField,
    pub budget_max: BigDecimalField,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Identifiable, Queryable, Serialize, Deserialize)]
#[table_name = "market_notification"]
pub struct Notification {
    pub id: i32,
    pub provider_id: ActorId,
    pub request_id: RequestId,
    pub category: ServiceCategory,
    pub urgency: UrgencyLevel,
    pub budget_min: BigDecimalField,
    pub budget_max: BigDecimalField,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

impl NewNotification {
    pub fn from_request(
        request: &UrgentRequest,
        provider_id: &ActorId,
        created_at: NaiveDateTime,
    ) -> NewNotification {
        NewNotification {
            provider_id: provider_id.clone(),
            request_id: request.id.clone(),
            category: request.category,
            urgency: request.urgency,
            budget_min: request.budget_min.clone(),
            budget_max: request.budget_max.clone(),
            message: format!(
                "New {} {} request near you: {} (budget {}-{})",
                request.urgency, request.category, request.title, request.budget_min, request.budget_max
            ),
            is_read: false,
            created_at,
        }
    }
}
