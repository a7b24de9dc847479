//! In-memory `TournamentRepository` with the same version and uniqueness
//! checks the PostgreSQL adapter enforces.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::repository::TournamentRepository;
use crate::tournament::errors::{TournamentError, TournamentResult, messages};
use crate::tournament::{Tournament, TournamentId};

#[derive(Clone, Default)]
pub struct InMemoryTournamentRepository {
    tournaments: Arc<Mutex<HashMap<TournamentId, Tournament>>>,
}

impl InMemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TournamentId, Tournament>> {
        self.tournaments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mirrors the (tournament, competitor) and (tournament, partner) unique keys
fn ensure_unique_participants(tournament: &Tournament) -> TournamentResult<()> {
    let mut competitors = HashSet::new();
    let mut partners = HashSet::new();
    for registration in &tournament.registrations {
        let duplicate_partner = registration
            .partner_id
            .as_deref()
            .is_some_and(|p| !partners.insert(p));
        if !competitors.insert(registration.competitor_id.as_str()) || duplicate_partner {
            return Err(TournamentError::conflict(messages::DUPLICATE_REGISTRATION));
        }
    }
    Ok(())
}

#[async_trait]
impl TournamentRepository for InMemoryTournamentRepository {
    async fn find_by_id(&self, id: &str) -> TournamentResult<Option<Tournament>> {
        Ok(self.lock().get(id).cloned())
    }

    async fn find_by_registration_id(
        &self,
        registration_id: &str,
    ) -> TournamentResult<Option<Tournament>> {
        Ok(self
            .lock()
            .values()
            .find(|t| t.find_registration(registration_id).is_some())
            .cloned())
    }

    async fn save(&self, tournament: &Tournament) -> TournamentResult<()> {
        let mut tournaments = self.lock();
        let expected_version = tournament.version - 1;
        let actual_version = tournaments.get(&tournament.id).map_or(0, |t| t.version);

        if actual_version != expected_version {
            return Err(TournamentError::OptimisticLock {
                tournament_id: tournament.id.clone(),
                expected_version,
                actual_version,
            });
        }
        ensure_unique_participants(tournament)?;

        tournaments.insert(tournament.id.clone(), tournament.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{
        Dependant, RecordingEventEmitter, SequentialIdGenerator, TournamentProps, TournamentType,
        TournamentUpdate,
    };
    use chrono::{Duration, Utc};

    fn new_tournament(ids: &SequentialIdGenerator) -> Tournament {
        let now = Utc::now();
        Tournament::create(
            TournamentProps {
                name: "Novice Open".to_string(),
                description: "First tournament of the novice season".to_string(),
                tournament_type: TournamentType::Individual,
                registration_start_date: now - Duration::hours(1),
                registration_end_date: now + Duration::hours(1),
                start_date: now + Duration::days(1),
            },
            ids,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryTournamentRepository::new();
        let ids = SequentialIdGenerator::new("id");
        let mut t = new_tournament(&ids);
        repo.save(&t).await.unwrap();
        assert_eq!(repo.len(), 1);

        let emitter = RecordingEventEmitter::new();
        let reg_id = t
            .request_individual_registration(&Dependant::new("alice"), &ids, &emitter)
            .unwrap()
            .id()
            .to_string();
        repo.save(&t).await.unwrap();

        let by_id = repo.find_by_id(t.id()).await.unwrap().unwrap();
        let by_reg = repo.find_by_registration_id(&reg_id).await.unwrap().unwrap();
        assert_eq!(by_id, t);
        assert_eq!(by_reg, t);
        assert!(repo.find_by_registration_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let repo = InMemoryTournamentRepository::new();
        let ids = SequentialIdGenerator::new("id");
        let t = new_tournament(&ids);
        repo.save(&t).await.unwrap();

        let mut first = repo.find_by_id(t.id()).await.unwrap().unwrap();
        let mut second = first.clone();

        first
            .update(TournamentUpdate {
                name: Some("First Writer".to_string()),
                ..Default::default()
            })
            .unwrap();
        second
            .update(TournamentUpdate {
                name: Some("Second Writer".to_string()),
                ..Default::default()
            })
            .unwrap();

        repo.save(&first).await.unwrap();
        let err = repo.save(&second).await.unwrap_err();
        match err {
            TournamentError::OptimisticLock {
                expected_version,
                actual_version,
                ..
            } => {
                assert_eq!(expected_version, 1);
                assert_eq!(actual_version, 2);
            }
            other => panic!("expected optimistic lock, got {other:?}"),
        }

        let stored = repo.find_by_id(t.id()).await.unwrap().unwrap();
        assert_eq!(stored.name(), "First Writer");
    }

    #[tokio::test]
    async fn test_unsaved_mutated_aggregate_is_rejected() {
        let repo = InMemoryTournamentRepository::new();
        let mut t = new_tournament(&SequentialIdGenerator::new("id"));
        t.soft_delete().unwrap();

        let err = repo.save(&t).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_competitor_rows_are_a_conflict() {
        let repo = InMemoryTournamentRepository::new();
        let ids = SequentialIdGenerator::new("id");
        let mut t = new_tournament(&ids);
        repo.save(&t).await.unwrap();

        let emitter = RecordingEventEmitter::new();
        t.request_individual_registration(&Dependant::new("alice"), &ids, &emitter)
            .unwrap();

        // Forge a second row for the same competitor, as a racing writer would
        let mut forged = t.registrations[0].clone();
        forged.id = "forged".to_string();
        t.registrations.push(forged);

        let err = repo.save(&t).await.unwrap_err();
        assert!(matches!(err, TournamentError::Conflict(_)));
    }
}
