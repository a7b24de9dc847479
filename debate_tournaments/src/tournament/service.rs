//! Use-case service: load the aggregate, run one operation, save it back.
//!
//! Events raised while the aggregate mutates are buffered and only handed to
//! the real emitter once the save succeeded, so a lost optimistic-lock race
//! never publishes anything. A conflicting save is retried exactly once
//! against freshly loaded state.

use std::sync::Arc;

use chrono::Utc;

use super::aggregate::Tournament;
use super::errors::{TournamentError, TournamentResult};
use super::models::{Dependant, TournamentProps, TournamentUpdate};
use super::ports::{EventEmitter, IdGenerator, RecordingEventEmitter};
use super::registration::Registration;
use super::sync::{RegistrationSync, SyncOutcome};
use crate::db::TournamentRepository;

/// How the aggregate for an operation is located
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Tournament(&'a str),
    Registration(&'a str),
}

/// Tournament use-case service
#[derive(Clone)]
pub struct TournamentService {
    repository: Arc<dyn TournamentRepository>,
    emitter: Arc<dyn EventEmitter>,
    id_generator: Arc<dyn IdGenerator>,
}

impl TournamentService {
    /// Create a new tournament service
    ///
    /// # Arguments
    ///
    /// * `repository` - Persistence port for the aggregate
    /// * `emitter` - Receives events after a successful save
    /// * `id_generator` - Identifier source for new entities
    pub fn new(
        repository: Arc<dyn TournamentRepository>,
        emitter: Arc<dyn EventEmitter>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            repository,
            emitter,
            id_generator,
        }
    }

    /// Create and persist a new tournament
    pub async fn create_tournament(&self, props: TournamentProps) -> TournamentResult<Tournament> {
        let tournament = Tournament::create(props, self.id_generator.as_ref())?;
        self.repository.save(&tournament).await?;

        log::info!(
            "Created {} tournament {} '{}'",
            tournament.tournament_type(),
            tournament.id(),
            tournament.name()
        );
        Ok(tournament)
    }

    /// Get a tournament with all of its registrations
    pub async fn get_tournament(&self, tournament_id: &str) -> TournamentResult<Tournament> {
        self.load(Target::Tournament(tournament_id)).await
    }

    /// Apply a partial update to a tournament
    pub async fn update_tournament(
        &self,
        tournament_id: &str,
        changes: TournamentUpdate,
    ) -> TournamentResult<Tournament> {
        let (tournament, ()) = self
            .execute(Target::Tournament(tournament_id), |t, _| {
                t.update(changes.clone())
            })
            .await?;
        Ok(tournament)
    }

    /// Soft-delete a tournament
    pub async fn delete_tournament(&self, tournament_id: &str) -> TournamentResult<Tournament> {
        let (tournament, ()) = self
            .execute(Target::Tournament(tournament_id), |t, _| t.soft_delete())
            .await?;

        log::info!("Deleted tournament {}", tournament_id);
        Ok(tournament)
    }

    /// Register a single competitor
    pub async fn request_individual_registration(
        &self,
        tournament_id: &str,
        competitor: &Dependant,
    ) -> TournamentResult<Registration> {
        let id_generator = self.id_generator.as_ref();
        let (_, registration) = self
            .execute(Target::Tournament(tournament_id), |t, emitter| {
                t.request_individual_registration(competitor, id_generator, emitter)
                    .cloned()
            })
            .await?;
        Ok(registration)
    }

    /// Request a duo registration for a competitor and partner
    pub async fn request_duo_registration(
        &self,
        tournament_id: &str,
        competitor: &Dependant,
        partner: &Dependant,
    ) -> TournamentResult<Registration> {
        let id_generator = self.id_generator.as_ref();
        let (_, registration) = self
            .execute(Target::Tournament(tournament_id), |t, emitter| {
                t.request_duo_registration(competitor, partner, id_generator, emitter)
                    .cloned()
            })
            .await?;
        Ok(registration)
    }

    /// Approve a pending duo registration
    pub async fn approve_duo_registration(
        &self,
        registration_id: &str,
    ) -> TournamentResult<Registration> {
        let (_, registration) = self
            .execute(Target::Registration(registration_id), |t, emitter| {
                t.approve_duo_registration(registration_id, emitter).cloned()
            })
            .await?;
        Ok(registration)
    }

    /// Reject a pending duo registration
    pub async fn reject_duo_registration(
        &self,
        registration_id: &str,
        reason: Option<&str>,
    ) -> TournamentResult<Registration> {
        let (_, registration) = self
            .execute(Target::Registration(registration_id), |t, emitter| {
                t.reject_duo_registration(registration_id, reason, emitter)
                    .cloned()
            })
            .await?;
        Ok(registration)
    }

    /// Cancel a registration
    pub async fn cancel_registration(&self, registration_id: &str) -> TournamentResult<Registration> {
        let (_, registration) = self
            .execute(Target::Registration(registration_id), |t, _| {
                t.cancel_registration(registration_id).cloned()
            })
            .await?;
        Ok(registration)
    }

    /// Record a downstream delivery attempt for a registration's event
    pub async fn record_sync_attempt(
        &self,
        registration_id: &str,
        outcome: SyncOutcome,
    ) -> TournamentResult<RegistrationSync> {
        let (_, sync) = self
            .execute(Target::Registration(registration_id), |t, _| {
                t.record_sync_attempt(registration_id, outcome, Utc::now())
                    .cloned()
            })
            .await?;
        Ok(sync)
    }

    async fn load(&self, target: Target<'_>) -> TournamentResult<Tournament> {
        match target {
            Target::Tournament(id) => self
                .repository
                .find_by_id(id)
                .await?
                .ok_or_else(|| TournamentError::tournament_not_found(id)),
            Target::Registration(id) => self
                .repository
                .find_by_registration_id(id)
                .await?
                .ok_or_else(|| TournamentError::registration_not_in_tournament(id)),
        }
    }

    async fn execute<T, F>(
        &self,
        target: Target<'_>,
        mut operation: F,
    ) -> TournamentResult<(Tournament, T)>
    where
        F: FnMut(&mut Tournament, &dyn EventEmitter) -> TournamentResult<T>,
    {
        let mut retried = false;
        loop {
            let mut tournament = self.load(target).await?;
            let buffer = RecordingEventEmitter::new();
            let output = operation(&mut tournament, &buffer)?;

            match self.repository.save(&tournament).await {
                Ok(()) => {
                    for event in buffer.take() {
                        self.emitter.emit(event);
                    }
                    return Ok((tournament, output));
                }
                Err(e) if e.is_retryable() && !retried => {
                    log::warn!(
                        "Save of tournament {} conflicted ({}), retrying with fresh state",
                        tournament.id(),
                        e
                    );
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
