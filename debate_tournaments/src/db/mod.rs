//! Tournament storage: the repository port, its PostgreSQL and in-memory
//! adapters, and the pool that backs the PostgreSQL one.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod repository;

pub use config::{ConfigError, DatabaseConfig};
pub use memory::InMemoryTournamentRepository;
pub use repository::{PgTournamentRepository, TournamentRepository};

/// Schema for tournaments, registrations and their sync records
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Tables the tournament repository reads and writes
const TOURNAMENT_TABLES: [&str; 3] = [
    "tournaments",
    "tournament_registrations",
    "registration_syncs",
];

/// Storage setup errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] MigrateError),

    /// Connected, but the tournament schema has not been applied
    #[error("Missing table {0}. Run the migrations first.")]
    SchemaMissing(String),
}

/// Connection pool for the tournament store
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Validate `config` and open a pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use debate_tournaments::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let db = Database::new(&DatabaseConfig::from_env()?).await?;
    ///     db.run_migrations().await?;
    ///     let tournaments = db.tournaments();
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        config.validate()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::debug!(
            "Tournament store pool open (max {} connections)",
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Repository over this pool
    pub fn tournaments(&self) -> PgTournamentRepository {
        PgTournamentRepository::new(self.pool.clone())
    }

    /// Apply pending tournament schema migrations
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        MIGRATOR.run(&self.pool).await?;
        log::info!(
            "Tournament schema up to date ({} migrations)",
            MIGRATOR.iter().count()
        );
        Ok(())
    }

    /// Check the connection and that every tournament table exists
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        for table in TOURNAMENT_TABLES {
            let present: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM information_schema.tables
                    WHERE table_schema = current_schema() AND table_name::text = $1
                )
                "#,
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
            if !present {
                return Err(DatabaseError::SchemaMissing(table.to_string()));
            }
        }
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_config_fails_before_connecting() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..DatabaseConfig::development()
        };
        let err = Database::new(&config).await.err().unwrap();
        assert!(matches!(err, DatabaseError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_bundled_migrations_are_embedded() {
        assert!(MIGRATOR.iter().count() >= 1);
    }

    #[test]
    fn test_schema_missing_message_names_table() {
        let err = DatabaseError::SchemaMissing("tournaments".to_string());
        assert_eq!(
            err.to_string(),
            "Missing table tournaments. Run the migrations first."
        );
    }
}
