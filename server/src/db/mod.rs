//! Postgres pool setup and migrations.
//!
//! SYSTEM CONTEXT
//! ==============
//! The broker keeps every document in Postgres; rooms only relay. The
//! pool is created once at startup and migrations run before the
//! listener binds, so a reachable broker always serves the full schema.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Pool size when `DB_MAX_CONNECTIONS` is unset. Saves are short
/// transactions, so a small pool goes a long way.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Resolve the pool size from the raw `DB_MAX_CONNECTIONS` value.
fn pool_size(raw: Option<String>) -> u32 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_MAX_CONNECTIONS)
}

/// Connect to Postgres and bring the schema up to date. Pool size comes
/// from `DB_MAX_CONNECTIONS`, alongside the other environment knobs read
/// in `main`.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(pool_size(std::env::var("DB_MAX_CONNECTIONS").ok()))
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_size_parses_the_override() {
        assert_eq!(pool_size(Some("12".into())), 12);
    }

    #[test]
    fn pool_size_falls_back_when_unset_or_garbage() {
        assert_eq!(pool_size(None), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(pool_size(Some("many".into())), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(pool_size(Some("".into())), DEFAULT_MAX_CONNECTIONS);
    }
}
