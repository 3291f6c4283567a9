pub const SQLITE_USERS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS users (
        user_id        INTEGER     PRIMARY KEY,
        username       TEXT        NOT NULL,
        password       TEXT        NOT NULL
    )";

pub const SQLITE_SOLVES_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS solves (
        id             INTEGER     PRIMARY KEY AUTOINCREMENT,
        user_id        INTEGER     NOT NULL,
        judge          TEXT        NOT NULL,
        problem_id     TEXT        NOT NULL,

        UNIQUE (user_id, judge, problem_id)
    )";

pub const POSTGRES_USERS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS users (
        user_id        BIGINT      PRIMARY KEY,
        username       TEXT        NOT NULL,
        password       TEXT        NOT NULL
    )";

pub const POSTGRES_SOLVES_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS solves (
        id             BIGSERIAL   PRIMARY KEY,
        user_id        BIGINT      NOT NULL,
        judge          TEXT        NOT NULL,
        problem_id     TEXT        NOT NULL,

        UNIQUE (user_id, judge, problem_id)
    )";

/// Shared by both backends so ties come back in the same order.
pub const LEADERBOARD_QUERY: &str =
    "SELECT user_id, COUNT(*) AS solves
     FROM solves
     GROUP BY user_id
     ORDER BY solves DESC, user_id ASC";
