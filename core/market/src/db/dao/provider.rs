use diesel::prelude::*;

use crate::db::model::{ActorId, Provider};
use crate::db::schema::market_provider::dsl;
use crate::db::DbResult;
use urgent_persistence::executor::{do_with_transaction, readonly_transaction, AsDao, PoolType};

pub struct ProviderDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for ProviderDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> ProviderDao<'c> {
    /// Registers or fully replaces a provider profile.
    pub async fn upsert(&self, provider: Provider) -> DbResult<()> {
        do_with_transaction(self.pool, move |conn| {
            diesel::replace_into(dsl::market_provider)
                .values(&provider)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    pub async fn select(&self, id: &ActorId) -> DbResult<Option<Provider>> {
        let id = id.clone();
        readonly_transaction(self.pool, move |conn| {
            Ok(dsl::market_provider
                .filter(dsl::id.eq(id))
                .first(conn)
                .optional()?)
        })
        .await
    }

    /// Fan-out candidates. Category and radius filtering happen in the
    /// dispatcher, where the JSON columns are already decoded.
    pub async fn list_active(&self) -> DbResult<Vec<Provider>> {
        readonly_transaction(self.pool, move |conn| {
            Ok(dsl::market_provider
                .filter(dsl::active.eq(true))
                .filter(dsl::verified.eq(true))
                .load(conn)?)
        })
        .await
    }

    pub async fn set_active(&self, id: &ActorId, active: bool) -> DbResult<bool> {
        let id = id.clone();
        do_with_transaction(self.pool, move |conn| {
            let updated = diesel::update(dsl::market_provider.filter(dsl::id.eq(id)))
                .set(dsl::active.eq(active))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }
}
