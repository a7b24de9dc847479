//! The tournament aggregate root.
//!
//! A [`Tournament`] owns its registrations (and their sync records) and is the
//! only place where registration status changes. Every successful mutation
//! bumps `version` by exactly one; a failed call leaves the aggregate untouched
//! and emits nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{TournamentError, TournamentResult, messages};
use super::events::{DuoRegistrationPayload, TournamentEvent};
use super::models::{
    DUO_APPROVAL_CAPACITY, Dependant, RegistrationStatus, TournamentId, TournamentProps,
    TournamentType, TournamentUpdate, Version,
};
use super::ports::{EventEmitter, IdGenerator};
use super::registration::Registration;
use super::sync::{RegistrationSync, SyncOutcome};

const MIN_NAME_LEN: usize = 3;
const MIN_DESCRIPTION_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub(crate) id: TournamentId,
    pub(crate) name: String,
    pub(crate) description: String,
    #[serde(rename = "type")]
    pub(crate) tournament_type: TournamentType,
    pub(crate) registration_start_date: DateTime<Utc>,
    pub(crate) registration_end_date: DateTime<Utc>,
    pub(crate) start_date: DateTime<Utc>,
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    pub(crate) version: Version,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) registrations: Vec<Registration>,
}

impl Tournament {
    /// Create a new tournament after validating name, description and dates
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - Name or description too short, or dates out of order
    pub fn create(props: TournamentProps, id_generator: &dyn IdGenerator) -> TournamentResult<Self> {
        let name = validated_text(&props.name, MIN_NAME_LEN, messages::NAME_REQUIRED)?;
        let description = validated_text(
            &props.description,
            MIN_DESCRIPTION_LEN,
            messages::DESCRIPTION_REQUIRED,
        )?;
        validate_dates(
            props.registration_start_date,
            props.registration_end_date,
            props.start_date,
        )?;

        let now = Utc::now();
        Ok(Self {
            id: id_generator.generate(),
            name,
            description,
            tournament_type: props.tournament_type,
            registration_start_date: props.registration_start_date,
            registration_end_date: props.registration_end_date,
            start_date: props.start_date,
            deleted_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
            registrations: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tournament_type(&self) -> TournamentType {
        self.tournament_type
    }

    pub fn registration_start_date(&self) -> DateTime<Utc> {
        self.registration_start_date
    }

    pub fn registration_end_date(&self) -> DateTime<Utc> {
        self.registration_end_date
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_registrations(&self) -> bool {
        !self.registrations.is_empty()
    }

    pub fn find_registration(&self, registration_id: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.id == registration_id)
    }

    pub fn confirmed_count(&self) -> usize {
        self.registrations.iter().filter(|r| r.is_confirmed()).count()
    }

    /// Slots left before duo approvals start falling back to cancellation
    pub fn remaining_capacity(&self) -> usize {
        DUO_APPROVAL_CAPACITY.saturating_sub(self.confirmed_count())
    }

    /// Registration window check, both ends inclusive
    pub fn is_registration_open(&self, at: DateTime<Utc>) -> bool {
        self.registration_start_date <= at && at <= self.registration_end_date
    }

    /// Apply a partial update
    ///
    /// Dates are checked against the merged result, so changing one date still
    /// has to agree with the two that were left alone.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidOperation` - Tournament has registrations or is deleted
    /// * `TournamentError::Validation` - Supplied fields are invalid
    pub fn update(&mut self, changes: TournamentUpdate) -> TournamentResult<()> {
        if self.has_registrations() {
            return Err(TournamentError::invalid_operation(
                messages::UPDATE_WITH_REGISTRATIONS,
            ));
        }
        if self.is_deleted() {
            return Err(TournamentError::invalid_operation(messages::UPDATE_DELETED));
        }

        let name = changes
            .name
            .as_deref()
            .map(|n| validated_text(n, MIN_NAME_LEN, messages::NAME_TOO_SHORT))
            .transpose()?;
        let description = changes
            .description
            .as_deref()
            .map(|d| validated_text(d, MIN_DESCRIPTION_LEN, messages::DESCRIPTION_TOO_SHORT))
            .transpose()?;

        let registration_start_date = changes
            .registration_start_date
            .unwrap_or(self.registration_start_date);
        let registration_end_date = changes
            .registration_end_date
            .unwrap_or(self.registration_end_date);
        let start_date = changes.start_date.unwrap_or(self.start_date);
        validate_dates(registration_start_date, registration_end_date, start_date)?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(tournament_type) = changes.tournament_type {
            self.tournament_type = tournament_type;
        }
        self.registration_start_date = registration_start_date;
        self.registration_end_date = registration_end_date;
        self.start_date = start_date;
        self.touch(Utc::now());

        log::debug!("Tournament {} updated to version {}", self.id, self.version);
        Ok(())
    }

    /// Mark the tournament deleted. Terminal for every further mutation.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidOperation` - Tournament has registrations or is already deleted
    pub fn soft_delete(&mut self) -> TournamentResult<()> {
        if self.has_registrations() {
            return Err(TournamentError::invalid_operation(
                messages::DELETE_WITH_REGISTRATIONS,
            ));
        }
        if self.is_deleted() {
            return Err(TournamentError::invalid_operation(messages::ALREADY_DELETED));
        }

        let now = Utc::now();
        self.deleted_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Register a single competitor. The entry is confirmed immediately.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidOperation` - Deleted, wrong type or window closed
    /// * `TournamentError::Conflict` - Competitor already registered
    pub fn request_individual_registration(
        &mut self,
        competitor: &Dependant,
        id_generator: &dyn IdGenerator,
        emitter: &dyn EventEmitter,
    ) -> TournamentResult<&Registration> {
        let now = Utc::now();
        self.ensure_registrable(TournamentType::Individual, now)?;
        if self.is_participant(&competitor.id) {
            return Err(TournamentError::conflict(
                messages::COMPETITOR_ALREADY_REGISTERED,
            ));
        }

        let registration = Registration::individual(
            id_generator.generate(),
            self.id.clone(),
            competitor.id.clone(),
            id_generator.generate(),
            now,
        );
        let event = TournamentEvent::registration_confirmed(&registration);
        self.append(registration, now);
        emitter.emit(event);

        log::info!(
            "Competitor {} registered for tournament {}",
            competitor.id,
            self.id
        );
        Ok(self.last_registration())
    }

    /// Request a duo entry. It waits in `PENDING_APPROVAL` until approved or rejected.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidOperation` - Deleted, wrong type, window closed or same person
    /// * `TournamentError::Conflict` - Competitor or partner already registered
    pub fn request_duo_registration(
        &mut self,
        competitor: &Dependant,
        partner: &Dependant,
        id_generator: &dyn IdGenerator,
        emitter: &dyn EventEmitter,
    ) -> TournamentResult<&Registration> {
        let now = Utc::now();
        self.ensure_registrable(TournamentType::Duo, now)?;
        if competitor.id == partner.id {
            return Err(TournamentError::invalid_operation(messages::SAME_PERSON));
        }
        if self.is_participant(&competitor.id) || self.is_participant(&partner.id) {
            return Err(TournamentError::conflict(messages::DUO_ALREADY_REGISTERED));
        }

        let registration = Registration::duo(
            id_generator.generate(),
            self.id.clone(),
            competitor.id.clone(),
            partner.id.clone(),
            id_generator.generate(),
            now,
        );
        let event = TournamentEvent::DuoRegistrationRequested(
            DuoRegistrationPayload::from_registration(&registration),
        );
        self.append(registration, now);
        emitter.emit(event);

        log::info!(
            "Duo registration requested for {} and {} in tournament {}",
            competitor.id,
            partner.id,
            self.id
        );
        Ok(self.last_registration())
    }

    /// Approve a pending duo entry.
    ///
    /// Capacity is evaluated here rather than at request time. When the
    /// tournament already holds [`DUO_APPROVAL_CAPACITY`] confirmed entries the
    /// registration is cancelled instead and no acceptance event is emitted.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidOperation` - Deleted or registration not pending
    /// * `TournamentError::NotFound` - Registration not in this tournament
    pub fn approve_duo_registration(
        &mut self,
        registration_id: &str,
        emitter: &dyn EventEmitter,
    ) -> TournamentResult<&Registration> {
        let index = self.pending_registration_index(registration_id)?;
        let at_capacity = self.confirmed_count() >= DUO_APPROVAL_CAPACITY;

        let now = Utc::now();
        let registration = &mut self.registrations[index];
        let event = if at_capacity {
            registration.cancel(now)?;
            log::warn!(
                "Tournament {} is full, registration {} cancelled on approval",
                self.id,
                registration_id
            );
            None
        } else {
            registration.approve(now)?;
            Some(TournamentEvent::DuoRegistrationAccepted(
                DuoRegistrationPayload::from_registration(registration),
            ))
        };
        self.touch(now);
        if let Some(event) = event {
            emitter.emit(event);
        }

        Ok(&self.registrations[index])
    }

    /// Reject a pending duo entry
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidOperation` - Deleted or registration not pending
    /// * `TournamentError::NotFound` - Registration not in this tournament
    pub fn reject_duo_registration(
        &mut self,
        registration_id: &str,
        reason: Option<&str>,
        emitter: &dyn EventEmitter,
    ) -> TournamentResult<&Registration> {
        let index = self.pending_registration_index(registration_id)?;

        let now = Utc::now();
        let registration = &mut self.registrations[index];
        registration.reject(reason, now)?;
        let event = TournamentEvent::DuoRegistrationRejected(
            DuoRegistrationPayload::from_registration(registration),
        );
        self.touch(now);
        emitter.emit(event);

        Ok(&self.registrations[index])
    }

    /// Cancel a registration of either type
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidOperation` - Deleted or registration already closed
    /// * `TournamentError::NotFound` - Registration not in this tournament
    pub fn cancel_registration(&mut self, registration_id: &str) -> TournamentResult<&Registration> {
        self.ensure_not_deleted()?;
        let index = self.registration_index(registration_id)?;

        let now = Utc::now();
        self.registrations[index].cancel(now)?;
        self.touch(now);

        log::info!(
            "Registration {} cancelled in tournament {}",
            registration_id,
            self.id
        );
        Ok(&self.registrations[index])
    }

    /// Sync records waiting for a delivery attempt at `at`
    pub fn due_syncs(&self, at: DateTime<Utc>) -> Vec<&RegistrationSync> {
        self.registrations
            .iter()
            .map(|r| &r.sync)
            .filter(|s| s.is_due(at))
            .collect()
    }

    /// Record the outcome of delivering a registration's event downstream
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Registration not in this tournament
    /// * `TournamentError::InvalidOperation` - Sync already completed
    pub fn record_sync_attempt(
        &mut self,
        registration_id: &str,
        outcome: SyncOutcome,
        now: DateTime<Utc>,
    ) -> TournamentResult<&RegistrationSync> {
        let index = self.registration_index(registration_id)?;
        self.registrations[index].sync.record(outcome, now)?;
        self.touch(now);

        log::debug!(
            "Sync for registration {} recorded as {:?} (attempt {})",
            registration_id,
            outcome,
            self.registrations[index].sync.attempts
        );
        Ok(&self.registrations[index].sync)
    }

    fn ensure_not_deleted(&self) -> TournamentResult<()> {
        if self.is_deleted() {
            return Err(TournamentError::invalid_operation(
                messages::OPERATION_ON_DELETED,
            ));
        }
        Ok(())
    }

    fn ensure_registrable(&self, expected: TournamentType, now: DateTime<Utc>) -> TournamentResult<()> {
        self.ensure_not_deleted()?;
        if self.tournament_type != expected {
            return Err(TournamentError::invalid_operation(match expected {
                TournamentType::Individual => messages::INDIVIDUAL_TYPE_REQUIRED,
                TournamentType::Duo => messages::DUO_TYPE_REQUIRED,
            }));
        }
        if !self.is_registration_open(now) {
            return Err(TournamentError::invalid_operation(
                messages::REGISTRATION_CLOSED,
            ));
        }
        Ok(())
    }

    fn is_participant(&self, competitor_id: &str) -> bool {
        self.registrations.iter().any(|r| r.involves(competitor_id))
    }

    fn registration_index(&self, registration_id: &str) -> TournamentResult<usize> {
        self.registrations
            .iter()
            .position(|r| r.id == registration_id)
            .ok_or_else(|| TournamentError::registration_not_in_tournament(registration_id))
    }

    fn pending_registration_index(&self, registration_id: &str) -> TournamentResult<usize> {
        self.ensure_not_deleted()?;
        let index = self.registration_index(registration_id)?;
        if self.registrations[index].status != RegistrationStatus::PendingApproval {
            return Err(TournamentError::invalid_operation(
                messages::NOT_PENDING_APPROVAL,
            ));
        }
        Ok(index)
    }

    fn append(&mut self, registration: Registration, now: DateTime<Utc>) {
        self.registrations.push(registration);
        self.touch(now);
    }

    fn last_registration(&self) -> &Registration {
        &self.registrations[self.registrations.len() - 1]
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        // Clock skew must never move updated_at backwards
        self.updated_at = now.max(self.updated_at);
        self.version += 1;
    }
}

fn validated_text(value: &str, min_len: usize, message: &str) -> TournamentResult<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() < min_len {
        return Err(TournamentError::validation(message));
    }
    Ok(trimmed.to_string())
}

fn validate_dates(
    registration_start: DateTime<Utc>,
    registration_end: DateTime<Utc>,
    start: DateTime<Utc>,
) -> TournamentResult<()> {
    if registration_end <= registration_start {
        return Err(TournamentError::validation(
            messages::REGISTRATION_END_NOT_AFTER_START,
        ));
    }
    if start < registration_end {
        return Err(TournamentError::validation(
            messages::START_BEFORE_REGISTRATION_END,
        ));
    }
    Ok(())
}
