use diesel::connection::SimpleConnection;
use diesel::Connection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::SqliteConnection;
use std::fmt::Display;
use std::path::Path;

pub type InnerConnType = SqliteConnection;
pub type ConnType = PooledConnection<ConnectionManager<InnerConnType>>;
pub type PoolType = Pool<ConnectionManager<InnerConnType>>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Db connection error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Db query error: {0}")]
    Diesel(#[from] diesel::result::Error),
    #[error("task: {0}")]
    RuntimeError(#[from] tokio::task::JoinError),
}

/// Binds a DAO to a connection pool, so `db.as_dao::<SomeDao>()` is the
/// only thing call sites need to spell.
pub trait AsDao<'a> {
    fn as_dao(pool: &'a PoolType) -> Self;
}

#[derive(Clone)]
pub struct DbExecutor {
    pub pool: PoolType,
}

impl DbExecutor {
    pub fn new<S: Into<String>>(database_url: S) -> Result<Self, Error> {
        let manager = ConnectionManager::new(database_url);
        let pool = Pool::builder().build(manager)?;
        Ok(DbExecutor { pool })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::new(path.as_ref().to_string_lossy())
    }

    pub fn as_dao<'a, T: AsDao<'a>>(&'a self) -> T {
        AsDao::as_dao(&self.pool)
    }

    pub fn conn(&self) -> Result<ConnType, Error> {
        connection(&self.pool)
    }

    pub fn apply_migration<T: Display>(
        &self,
        migration: fn(&ConnType, &mut dyn std::io::Write) -> Result<(), T>,
    ) -> anyhow::Result<()> {
        let c = self.conn()?;
        // Some migrations require disabling foreign key checks for advanced table manipulation.
        // Unfortunately, diesel doesn't support this and we must do it manually.
        c.batch_execute("PRAGMA foreign_keys = OFF;")?;
        migration(&c, &mut std::io::stderr())
            .map_err(|e| anyhow::anyhow!("Failed to apply database migration: {}", e))?;
        c.batch_execute("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }
}

fn connection(pool: &PoolType) -> Result<ConnType, Error> {
    let conn = pool.get()?;
    conn.batch_execute(
        "PRAGMA synchronous = NORMAL; PRAGMA journal_mode = WAL; \
         PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 15000;",
    )
    .map_err(Error::Diesel)?;
    Ok(conn)
}

async fn do_with_connection<R, Error, F>(pool: &PoolType, f: F) -> Result<R, Error>
where
    R: Send + 'static,
    Error: Send + 'static + From<crate::executor::Error>,
    F: FnOnce(&ConnType) -> Result<R, Error> + Send + 'static,
{
    let pool = pool.clone();
    match tokio::task::spawn_blocking(move || {
        let conn = connection(&pool)?;
        f(&conn)
    })
    .await
    {
        Ok(result) => result,
        Err(join_err) => Err(crate::executor::Error::from(join_err).into()),
    }
}

/// Runs the closure inside an IMMEDIATE transaction. The write lock taken at
/// transaction start is the serialization point every conditional state
/// update in the market relies on.
pub async fn do_with_transaction<R, Error, F>(pool: &PoolType, f: F) -> Result<R, Error>
where
    R: Send + 'static,
    Error: Send + 'static + From<crate::executor::Error> + From<diesel::result::Error>,
    F: FnOnce(&ConnType) -> Result<R, Error> + Send + 'static,
{
    do_with_connection(pool, move |conn| conn.immediate_transaction(|| f(conn))).await
}

pub async fn readonly_transaction<R, Error, F>(pool: &PoolType, f: F) -> Result<R, Error>
where
    R: Send + 'static,
    Error: Send + 'static + From<crate::executor::Error> + From<diesel::result::Error>,
    F: FnOnce(&ConnType) -> Result<R, Error> + Send + 'static,
{
    do_with_connection(pool, move |conn| conn.transaction(|| f(conn))).await
}

#[cfg(test)]
mod test {
    use super::*;
    use diesel::prelude::*;

    #[tokio::test]
    async fn queries_run_off_the_async_thread() {
        let dir = tempfile::tempdir().unwrap();
        let db = DbExecutor::from_path(dir.path().join("executor.db")).unwrap();

        let sum = readonly_transaction(&db.pool, |conn| -> Result<i64, Error> {
            Ok(
                diesel::select(diesel::dsl::sql::<diesel::sql_types::BigInt>("1 + 1"))
                    .get_result(conn)?,
            )
        })
        .await
        .unwrap();
        assert_eq!(sum, 2);
    }
}
