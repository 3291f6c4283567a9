use anyhow::{Context, Result};
use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tokio::sync::OnceCell;

use crate::jbdb::{CredentialStore, SolveLedger, schema, user_id_from_sql, user_id_to_sql};
use crate::models;

type ConnectionManager = bb8_postgres::PostgresConnectionManager<tokio_postgres::NoTls>;

impl From<tokio_postgres::Row> for models::UserCredential {
    fn from(row: tokio_postgres::Row) -> Self {
        Self {
            user_id: user_id_from_sql(row.get("user_id")),
            username: row.get("username"),
            password: row.get("password"),
        }
    }
}

impl From<tokio_postgres::Row> for models::LeaderboardEntry {
    fn from(row: tokio_postgres::Row) -> Self {
        Self {
            user_id: user_id_from_sql(row.get("user_id")),
            solves: row.get::<_, i64>("solves") as u64,
        }
    }
}

/// PostgreSQL store behind a connection pool. Nothing connects until the
/// first query, which also creates the tables.
#[derive(Debug)]
pub struct PgStore {
    pool: Pool<ConnectionManager>,
    schema_ready: OnceCell<()>,
}

impl PgStore {
    pub fn new(conn_url: &str) -> Result<PgStore> {
        let conn_manager =
            ConnectionManager::new_from_stringlike(conn_url, tokio_postgres::NoTls)?;
        let pool = Pool::builder().build_unchecked(conn_manager);

        Ok(PgStore { pool, schema_ready: OnceCell::new() })
    }

    async fn conn(&self) -> Result<PooledConnection<'_, ConnectionManager>> {
        let conn = self
            .pool
            .get()
            .await
            .context("cannot obtain postgres connection")?;

        self.schema_ready
            .get_or_try_init(|| async {
                log::debug!("[conn] Creating tables...");
                conn.batch_execute(schema::POSTGRES_USERS_SCHEMA).await?;
                conn.batch_execute(schema::POSTGRES_SOLVES_SCHEMA).await?;
                Ok::<_, tokio_postgres::Error>(())
            })
            .await
            .context("cannot create postgres schema")?;

        Ok(conn)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn upsert_credentials(&self, cred: &models::UserCredential) -> Result<()> {
        log::trace!("[upsert_credentials] Linking credentials for {}", cred.user_id);
        self.conn()
            .await?
            .execute(
                "INSERT INTO users (user_id, username, password) VALUES ($1, $2, $3)
                 ON CONFLICT (user_id) DO UPDATE SET
                    username = EXCLUDED.username,
                    password = EXCLUDED.password",
                &[&user_id_to_sql(cred.user_id), &cred.username, &cred.password],
            )
            .await
            .inspect_err(|err| log::error!("[upsert_credentials] Could not link credentials: {err}"))?;
        Ok(())
    }

    async fn credentials(&self, user_id: models::UserId) -> Result<Option<models::UserCredential>> {
        let row = self
            .conn()
            .await?
            .query_opt(
                "SELECT user_id, username, password FROM users WHERE user_id = $1",
                &[&user_id_to_sql(user_id)],
            )
            .await?;

        Ok(row.map(models::UserCredential::from))
    }
}

#[async_trait]
impl SolveLedger for PgStore {
    async fn record_solve(&self, solve: &models::Solve) -> Result<bool> {
        log::trace!(
            "[record_solve] Recording {}-{} for {}",
            solve.judge, solve.problem_id, solve.user_id
        );
        let inserted = self
            .conn()
            .await?
            .execute(
                "INSERT INTO solves (user_id, judge, problem_id) VALUES ($1, $2, $3)
                 ON CONFLICT DO NOTHING",
                &[&user_id_to_sql(solve.user_id), &solve.judge, &solve.problem_id],
            )
            .await?;

        Ok(inserted > 0)
    }

    async fn leaderboard(&self) -> Result<Vec<models::LeaderboardEntry>> {
        log::trace!("[leaderboard] Counting solves per user.");
        let rows = self
            .conn()
            .await?
            .query(schema::LEADERBOARD_QUERY, &[])
            .await?;

        Ok(rows.into_iter().map(models::LeaderboardEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jbdb::{SqliteStore, testing};

    /// Needs a throwaway database: `TEST_DATABASE_URL=postgres://...`.
    /// Skipped when the variable is unset.
    fn test_database_url() -> Option<String> {
        std::env::var("TEST_DATABASE_URL").ok()
    }

    #[test]
    fn bad_url_is_rejected_up_front() {
        assert!(PgStore::new("postgres://bot@localhost:notaport/bot").is_err());
    }

    #[tokio::test]
    async fn matches_sqlite_backend() {
        let Some(url) = test_database_url() else {
            log::warn!("TEST_DATABASE_URL not set, skipping");
            return;
        };

        let pg = PgStore::new(&url).unwrap();
        {
            let conn = pg.conn().await.unwrap();
            conn.batch_execute("TRUNCATE users, solves").await.unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let sqlite = SqliteStore::open(dir.path().join("judgebot.db")).await.unwrap();

        let from_pg = testing::exercise(&pg).await.unwrap();
        let from_sqlite = testing::exercise(&sqlite).await.unwrap();

        assert_eq!(from_pg, from_sqlite);
        testing::assert_exercised(from_pg);
    }
}
