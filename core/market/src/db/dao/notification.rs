use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::db::model::{ActorId, NewNotification, Notification};
use crate::db::schema::market_notification::dsl;
use crate::db::DbResult;
use urgent_persistence::executor::{do_with_transaction, readonly_transaction, AsDao, PoolType};

pub struct NotificationDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for NotificationDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> NotificationDao<'c> {
    /// Single insert for a whole fan-out round.
    pub async fn add_batch(&self, notifications: Vec<NewNotification>) -> DbResult<usize> {
        if notifications.is_empty() {
            return Ok(0);
        }
        do_with_transaction(self.pool, move |conn| {
            Ok(diesel::insert_into(dsl::market_notification)
                .values(&notifications)
                .execute(&**conn)?)
        })
        .await
    }

    pub async fn list_unread(&self, provider_id: ActorId) -> DbResult<Vec<Notification>> {
        readonly_transaction(self.pool, move |conn| {
            Ok(dsl::market_notification
                .filter(dsl::provider_id.eq(provider_id))
                .filter(dsl::is_read.eq(false))
                .order(dsl::created_at.desc())
                .load(conn)?)
        })
        .await
    }

    /// Marks one notification read, but only for its addressee. Returns
    /// false when the id doesn't exist or belongs to someone else.
    pub async fn mark_read(&self, id: i32, provider_id: ActorId) -> DbResult<bool> {
        do_with_transaction(self.pool, move |conn| {
            let updated = diesel::update(
                dsl::market_notification
                    .filter(dsl::id.eq(id))
                    .filter(dsl::provider_id.eq(provider_id)),
            )
            .set(dsl::is_read.eq(true))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    /// Retention pass run by the sweeper. Only read notifications are
    /// dropped; unread ones stay regardless of age.
    pub async fn clean(&self, cutoff: NaiveDateTime) -> DbResult<usize> {
        do_with_transaction(self.pool, move |conn| {
            Ok(diesel::delete(
                dsl::market_notification
                    .filter(dsl::is_read.eq(true))
                    .filter(dsl::created_at.lt(cutoff)),
            )
            .execute(conn)?)
        })
        .await
    }
}
