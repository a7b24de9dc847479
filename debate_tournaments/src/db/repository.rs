//! Tournament persistence port and its PostgreSQL implementation.
//!
//! The aggregate is always loaded and saved as a whole: the tournament row,
//! its registrations and their sync records travel together inside one
//! transaction.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::tournament::errors::{TournamentError, TournamentResult, messages};
use crate::tournament::{Registration, RegistrationSync, Tournament};

/// Persistence port for the tournament aggregate
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Load a tournament with all of its registrations
    async fn find_by_id(&self, id: &str) -> TournamentResult<Option<Tournament>>;

    /// Load the tournament owning the given registration
    async fn find_by_registration_id(
        &self,
        registration_id: &str,
    ) -> TournamentResult<Option<Tournament>>;

    /// Persist the aggregate.
    ///
    /// # Errors
    ///
    /// * `TournamentError::OptimisticLock` - Stored version is not `version - 1`
    /// * `TournamentError::Conflict` - A registration violates a uniqueness constraint
    async fn save(&self, tournament: &Tournament) -> TournamentResult<()>;
}

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_registrations(&self, tournament_id: &str) -> TournamentResult<Vec<Registration>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.tournament_id, r.competitor_id, r.partner_id, r.status,
                   r.registration_type, r.rejection_reason, r.version, r.created_at, r.updated_at,
                   s.id AS sync_id, s.status AS sync_status, s.attempts AS sync_attempts,
                   s.last_attempt_at AS sync_last_attempt_at,
                   s.next_attempt_at AS sync_next_attempt_at,
                   s.created_at AS sync_created_at, s.updated_at AS sync_updated_at
            FROM tournament_registrations r
            JOIN registration_syncs s ON s.registration_id = r.id
            WHERE r.tournament_id = $1
            ORDER BY r.position
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(registration_from_row).collect()
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn find_by_id(&self, id: &str) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, tournament_type, registration_start_date,
                   registration_end_date, start_date, deleted_at, version, created_at, updated_at
            FROM tournaments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let registrations = self.load_registrations(id).await?;
        tournament_from_row(&row, registrations).map(Some)
    }

    async fn find_by_registration_id(
        &self,
        registration_id: &str,
    ) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query("SELECT tournament_id FROM tournament_registrations WHERE id = $1")
            .bind(registration_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let tournament_id: String = row.try_get("tournament_id")?;
                self.find_by_id(&tournament_id).await
            }
            None => Ok(None),
        }
    }

    async fn save(&self, tournament: &Tournament) -> TournamentResult<()> {
        let mut tx = self.pool.begin().await?;
        let expected_version = tournament.version - 1;

        // Conditional write keyed on the version the caller loaded
        let updated = sqlx::query(
            r#"
            UPDATE tournaments
            SET name = $2, description = $3, tournament_type = $4,
                registration_start_date = $5, registration_end_date = $6, start_date = $7,
                deleted_at = $8, version = $9, updated_at = $10
            WHERE id = $1 AND version = $11
            "#,
        )
        .bind(&tournament.id)
        .bind(&tournament.name)
        .bind(&tournament.description)
        .bind(tournament.tournament_type.as_str())
        .bind(tournament.registration_start_date)
        .bind(tournament.registration_end_date)
        .bind(tournament.start_date)
        .bind(tournament.deleted_at)
        .bind(tournament.version)
        .bind(tournament.updated_at)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let current = sqlx::query("SELECT version FROM tournaments WHERE id = $1")
                .bind(&tournament.id)
                .fetch_optional(&mut *tx)
                .await?;

            match current {
                Some(row) => {
                    return Err(TournamentError::OptimisticLock {
                        tournament_id: tournament.id.clone(),
                        expected_version,
                        actual_version: row.try_get("version")?,
                    });
                }
                None if tournament.version == 1 => insert_tournament(&mut tx, tournament).await?,
                None => {
                    return Err(TournamentError::OptimisticLock {
                        tournament_id: tournament.id.clone(),
                        expected_version,
                        actual_version: 0,
                    });
                }
            }
        }

        for (position, registration) in tournament.registrations.iter().enumerate() {
            upsert_registration(&mut tx, registration, position).await?;
            upsert_sync(&mut tx, &registration.sync).await?;
        }

        tx.commit().await?;

        log::debug!(
            "Saved tournament {} at version {}",
            tournament.id,
            tournament.version
        );
        Ok(())
    }
}

async fn insert_tournament(
    tx: &mut Transaction<'_, Postgres>,
    tournament: &Tournament,
) -> TournamentResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tournaments (id, name, description, tournament_type, registration_start_date,
                                 registration_end_date, start_date, deleted_at, version,
                                 created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(&tournament.id)
    .bind(&tournament.name)
    .bind(&tournament.description)
    .bind(tournament.tournament_type.as_str())
    .bind(tournament.registration_start_date)
    .bind(tournament.registration_end_date)
    .bind(tournament.start_date)
    .bind(tournament.deleted_at)
    .bind(tournament.version)
    .bind(tournament.created_at)
    .bind(tournament.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn upsert_registration(
    tx: &mut Transaction<'_, Postgres>,
    registration: &Registration,
    position: usize,
) -> TournamentResult<()> {
    let position = i32::try_from(position)
        .map_err(|_| TournamentError::InvalidRecord(format!("position {position} out of range")))?;

    sqlx::query(
        r#"
        INSERT INTO tournament_registrations (id, tournament_id, competitor_id, partner_id, status,
                                              registration_type, rejection_reason, version,
                                              position, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status,
            rejection_reason = EXCLUDED.rejection_reason,
            version = EXCLUDED.version,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&registration.id)
    .bind(&registration.tournament_id)
    .bind(&registration.competitor_id)
    .bind(&registration.partner_id)
    .bind(registration.status.as_str())
    .bind(registration.registration_type.as_str())
    .bind(&registration.rejection_reason)
    .bind(registration.version)
    .bind(position)
    .bind(registration.created_at)
    .bind(registration.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(write_error)?;

    Ok(())
}

/// The aggregate version check already serializes writers, so the stored row is
/// always older than the one being written.
async fn upsert_sync(
    tx: &mut Transaction<'_, Postgres>,
    sync: &RegistrationSync,
) -> TournamentResult<()> {
    sqlx::query(
        r#"
        INSERT INTO registration_syncs (id, registration_id, status, attempts, last_attempt_at,
                                        next_attempt_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status,
            attempts = EXCLUDED.attempts,
            last_attempt_at = EXCLUDED.last_attempt_at,
            next_attempt_at = EXCLUDED.next_attempt_at,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&sync.id)
    .bind(&sync.registration_id)
    .bind(sync.status.as_str())
    .bind(i32::try_from(sync.attempts).unwrap_or(i32::MAX))
    .bind(sync.last_attempt_at)
    .bind(sync.next_attempt_at)
    .bind(sync.created_at)
    .bind(sync.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Unique violations on registrations are duplicate-registration races
fn write_error(err: sqlx::Error) -> TournamentError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            log::warn!(
                "Duplicate registration rejected by storage: {}",
                db_err.message()
            );
            return TournamentError::conflict(messages::DUPLICATE_REGISTRATION);
        }
    }
    TournamentError::Database(err)
}

fn tournament_from_row(row: &PgRow, registrations: Vec<Registration>) -> TournamentResult<Tournament> {
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        tournament_type: row.try_get::<String, _>("tournament_type")?.parse()?,
        registration_start_date: row.try_get("registration_start_date")?,
        registration_end_date: row.try_get("registration_end_date")?,
        start_date: row.try_get("start_date")?,
        deleted_at: row.try_get("deleted_at")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        registrations,
    })
}

fn registration_from_row(row: &PgRow) -> TournamentResult<Registration> {
    let attempts: i32 = row.try_get("sync_attempts")?;
    let sync = RegistrationSync {
        id: row.try_get("sync_id")?,
        registration_id: row.try_get("id")?,
        status: row.try_get::<String, _>("sync_status")?.parse()?,
        attempts: u32::try_from(attempts)
            .map_err(|_| TournamentError::InvalidRecord(format!("negative attempts {attempts}")))?,
        last_attempt_at: row.try_get("sync_last_attempt_at")?,
        next_attempt_at: row.try_get("sync_next_attempt_at")?,
        created_at: row.try_get("sync_created_at")?,
        updated_at: row.try_get("sync_updated_at")?,
    };

    Ok(Registration {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        competitor_id: row.try_get("competitor_id")?,
        partner_id: row.try_get("partner_id")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        registration_type: row.try_get::<String, _>("registration_type")?.parse()?,
        rejection_reason: row.try_get("rejection_reason")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        sync,
    })
}
