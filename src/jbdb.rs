mod postgres;
mod schema;
mod sqlite;

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

use anyhow::{Context, Result};
use async_trait::async_trait;

use std::sync::Arc;

use crate::config::DbConfig;
use crate::models;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts the credentials, or overwrites the username and password
    /// already linked to `cred.user_id`.
    async fn upsert_credentials(&self, cred: &models::UserCredential) -> Result<()>;

    async fn credentials(&self, user_id: models::UserId) -> Result<Option<models::UserCredential>>;
}

#[async_trait]
pub trait SolveLedger: Send + Sync {
    /// Records a solve, doing nothing if it's already there.
    /// Returns `true` if it was newly added, false otherwise.
    async fn record_solve(&self, solve: &models::Solve) -> Result<bool>;

    /// Solve counts per user, most solves first, ties by user id.
    async fn leaderboard(&self) -> Result<Vec<models::LeaderboardEntry>>;
}

pub trait Store: CredentialStore + SolveLedger {}

impl<T: CredentialStore + SolveLedger> Store for T {}

/// Opens the backend named by `config`.
pub async fn connect(config: &DbConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config {
        DbConfig::Sqlite(path) => {
            log::info!("Using SQLite database at {}", path.display());
            Arc::new(SqliteStore::open(path).await?)
        }
        DbConfig::Postgres(url) => {
            log::info!("Using PostgreSQL database");
            Arc::new(PgStore::new(url).context("cannot configure postgres pool")?)
        }
    };

    Ok(store)
}

// Discord ids fit in 63 bits; the casts are bit-preserving either way.
fn user_id_to_sql(user_id: models::UserId) -> i64 {
    user_id as i64
}

fn user_id_from_sql(user_id: i64) -> models::UserId {
    user_id as models::UserId
}
