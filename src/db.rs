use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, instrument};

use crate::shared::AppError;

const CREATE_USERS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        login TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        is_admin INTEGER NOT NULL DEFAULT 0,
        is_banned INTEGER NOT NULL DEFAULT 0
    )";

const CREATE_PHOTOS: &str = "
    CREATE TABLE IF NOT EXISTS photos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT NOT NULL,
        is_public INTEGER NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        UNIQUE (user_id, file_name)
    )";

/// Opens (creating if needed) the database file and ensures the schema exists
#[instrument]
pub async fn connect(file: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::new()
        .filename(file)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    info!(file = %file, "Database ready");
    Ok(pool)
}

/// Private in-memory database. Limited to one connection since every
/// connection to `:memory:` would otherwise see its own empty database.
pub async fn connect_in_memory() -> Result<SqlitePool, AppError> {
    let options = "sqlite::memory:"
        .parse::<SqliteConnectOptions>()?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(CREATE_USERS).execute(pool).await?;
    sqlx::query(CREATE_PHOTOS).execute(pool).await?;
    Ok(())
}
