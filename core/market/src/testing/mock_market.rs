use std::sync::Arc;

use crate::config::Config;
use crate::db::model::{ProviderSnapshot, UrgentRequest};
use crate::db::DbExecutor;
use crate::dispatcher::EventsListeners;
use crate::market::MarketService;
use crate::testing::RequestDao;

/// Fully wired market backed by a throwaway on-disk database. The tempdir
/// lives as long as the mock, then the database disappears with it.
pub struct MockMarket {
    pub market: MarketService,
    pub listeners: EventsListeners,
    pub db: DbExecutor,
    _tempdir: tempfile::TempDir,
}

impl MockMarket {
    /// Must be called from within a tokio runtime, since service startup
    /// spawns the dispatcher and sweeper loops.
    pub fn new(name: &str) -> MockMarket {
        Self::with_config(name, Config::from_env().unwrap())
    }

    pub fn with_config(name: &str, config: Config) -> MockMarket {
        let _ = env_logger::builder().is_test(true).try_init();
        let tempdir = tempfile::tempdir().unwrap();
        let db_path = tempdir.path().join(format!("{}.db", name));
        let db = DbExecutor::from_path(&db_path).unwrap();
        let (market, listeners) = MarketService::new(&db, Arc::new(config)).unwrap();
        MockMarket {
            market,
            listeners,
            db,
            _tempdir: tempdir,
        }
    }

    pub async fn add_provider(&self, snapshot: ProviderSnapshot) {
        self.market.register_provider(snapshot).await.unwrap();
    }

    /// Inserts a request row as-is, bypassing validation and TTL logic.
    pub async fn insert_request(&self, request: &UrgentRequest) {
        self.db
            .as_dao::<RequestDao>()
            .create(request.clone())
            .await
            .unwrap();
    }
}
