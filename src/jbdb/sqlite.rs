use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;

use std::path::{Path, PathBuf};

use crate::jbdb::{CredentialStore, SolveLedger, schema, user_id_from_sql, user_id_to_sql};
use crate::models;

type DBResult<T> = rusqlite::Result<T>;

impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::UserCredential {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            user_id: user_id_from_sql(row.get("user_id")?),
            username: row.get("username")?,
            password: row.get("password")?,
        })
    }
}

impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::LeaderboardEntry {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            user_id: user_id_from_sql(row.get("user_id")?),
            solves: row.get::<_, i64>("solves")? as u64,
        })
    }
}

/// Single-file store. Every operation opens its own connection on the
/// blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self { path: path.as_ref().to_path_buf() };
        store
            .with_connection(|_| Ok(()))
            .await
            .with_context(|| format!("cannot open sqlite database {}", store.path.display()))?;
        Ok(store)
    }

    /// Runs `f` against a fresh connection, off the async runtime.
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DBResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        let result = tokio::task::spawn_blocking(move || -> DBResult<T> {
            let connection = connect(&path)?;
            f(&connection)
        })
        .await
        .context("sqlite worker panicked")?;

        Ok(result?)
    }
}

/// Opens the database, creating the tables if they don't exist yet.
fn connect(path: &Path) -> DBResult<Connection> {
    let connection = Connection::open(path)?;

    log::trace!("[connect] Ensuring schema in {}", path.display());
    connection.execute(schema::SQLITE_USERS_SCHEMA, [])?;
    connection.execute(schema::SQLITE_SOLVES_SCHEMA, [])?;

    Ok(connection)
}

/// Turns a uniqueness violation into `Ok(false)`.
fn swallow_constraint_violation(err: rusqlite::Error) -> DBResult<bool> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation => Ok(false),
        err => Err(err),
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn upsert_credentials(&self, cred: &models::UserCredential) -> Result<()> {
        let cred = cred.clone();
        log::trace!("[upsert_credentials] Linking credentials for {}", cred.user_id);

        self.with_connection(move |connection| {
            connection
                .prepare(
                    "INSERT INTO users (user_id, username, password)
                     VALUES (:user_id, :username, :password)
                     ON CONFLICT (user_id) DO UPDATE SET
                        username = excluded.username,
                        password = excluded.password",
                )?
                .execute(rusqlite::named_params! {
                    ":user_id":  user_id_to_sql(cred.user_id),
                    ":username": cred.username,
                    ":password": cred.password,
                })
                .inspect_err(|err| log::error!("[upsert_credentials] Could not link credentials: {err}"))?;

            Ok(())
        })
        .await
    }

    async fn credentials(&self, user_id: models::UserId) -> Result<Option<models::UserCredential>> {
        self.with_connection(move |connection| {
            connection
                .prepare("SELECT * FROM users WHERE user_id = :user_id")?
                .query(rusqlite::named_params! { ":user_id": user_id_to_sql(user_id) })?
                .next()?
                .map(|row| row.try_into())
                .transpose()
        })
        .await
    }
}

#[async_trait]
impl SolveLedger for SqliteStore {
    async fn record_solve(&self, solve: &models::Solve) -> Result<bool> {
        let solve = solve.clone();
        log::trace!(
            "[record_solve] Recording {}-{} for {}",
            solve.judge, solve.problem_id, solve.user_id
        );

        self.with_connection(move |connection| {
            connection
                .prepare(
                    "INSERT INTO solves ( user_id,  judge,  problem_id)
                     VALUES             (:user_id, :judge, :problem_id)",
                )?
                .execute(rusqlite::named_params! {
                    ":user_id":    user_id_to_sql(solve.user_id),
                    ":judge":      solve.judge,
                    ":problem_id": solve.problem_id,
                })
                .map_or_else(swallow_constraint_violation, |_| Ok(true))
        })
        .await
    }

    async fn leaderboard(&self) -> Result<Vec<models::LeaderboardEntry>> {
        log::trace!("[leaderboard] Counting solves per user.");

        self.with_connection(|connection| {
            let mut stmt = connection.prepare(schema::LEADERBOARD_QUERY)?;
            let entries = stmt
                .query_map([], |row| models::LeaderboardEntry::try_from(row))?
                .collect::<DBResult<Vec<models::LeaderboardEntry>>>()?;

            Ok(entries)
        })
        .await
    }
}
