use chrono::Utc;
use metrics::counter;

use crate::config::SweeperConfig;
use crate::db::dao::{NotificationDao, RequestDao};
use crate::db::DbExecutor;

/// Periodic maintenance: expires overdue requests and prunes old read
/// notifications. Expiry is also enforced lazily on reads and bid
/// submission, so this loop only bounds how long stale rows linger.
pub async fn sweep_forever(db: DbExecutor, config: SweeperConfig) {
    let mut interval = tokio::time::interval(config.sweep_interval);
    loop {
        interval.tick().await;
        sweep(&db, &config).await;
    }
}

pub async fn sweep(db: &DbExecutor, config: &SweeperConfig) {
    let now = Utc::now().naive_utc();

    match db.as_dao::<RequestDao>().expire_overdue(now).await {
        Ok(0) => {}
        Ok(expired) => {
            counter!("market.requests.expired", expired as u64);
            log::info!("Expired {} overdue request(s).", expired);
        }
        Err(e) => log::error!("Expiry sweep failed. Error: {}.", e),
    }

    let cutoff = now - chrono::Duration::days(config.notification_store_days as i64);
    match db.as_dao::<NotificationDao>().clean(cutoff).await {
        Ok(0) => {}
        Ok(removed) => log::info!("Notification cleaner removed {} row(s).", removed),
        Err(e) => log::error!("Notification cleaner failed. Error: {}.", e),
    }
}
