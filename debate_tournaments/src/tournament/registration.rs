//! A competitor's entry in a tournament.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{TournamentError, TournamentResult, messages};
use super::models::{
    CompetitorId, RegistrationId, RegistrationStatus, TournamentId, TournamentType, Version,
};
use super::sync::RegistrationSync;

/// Registration entry owned by a [`Tournament`](super::Tournament).
///
/// Status transitions are crate-private: only the owning tournament drives them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub(crate) id: RegistrationId,
    pub(crate) tournament_id: TournamentId,
    pub(crate) competitor_id: CompetitorId,
    pub(crate) partner_id: Option<CompetitorId>,
    pub(crate) status: RegistrationStatus,
    #[serde(rename = "type")]
    pub(crate) registration_type: TournamentType,
    pub(crate) rejection_reason: Option<String>,
    pub(crate) version: Version,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) sync: RegistrationSync,
}

impl Registration {
    /// Individual entries skip approval and are confirmed on creation
    pub(crate) fn individual(
        id: RegistrationId,
        tournament_id: TournamentId,
        competitor_id: CompetitorId,
        sync_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            id,
            tournament_id,
            competitor_id,
            None,
            RegistrationStatus::Confirmed,
            TournamentType::Individual,
            sync_id,
            now,
        )
    }

    pub(crate) fn duo(
        id: RegistrationId,
        tournament_id: TournamentId,
        competitor_id: CompetitorId,
        partner_id: CompetitorId,
        sync_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            id,
            tournament_id,
            competitor_id,
            Some(partner_id),
            RegistrationStatus::PendingApproval,
            TournamentType::Duo,
            sync_id,
            now,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        id: RegistrationId,
        tournament_id: TournamentId,
        competitor_id: CompetitorId,
        partner_id: Option<CompetitorId>,
        status: RegistrationStatus,
        registration_type: TournamentType,
        sync_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        let sync = RegistrationSync::new(sync_id, id.clone(), now);
        Self {
            id,
            tournament_id,
            competitor_id,
            partner_id,
            status,
            registration_type,
            rejection_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
            sync,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tournament_id(&self) -> &str {
        &self.tournament_id
    }

    pub fn competitor_id(&self) -> &str {
        &self.competitor_id
    }

    pub fn partner_id(&self) -> Option<&str> {
        self.partner_id.as_deref()
    }

    pub fn status(&self) -> RegistrationStatus {
        self.status
    }

    pub fn registration_type(&self) -> TournamentType {
        self.registration_type
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
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

    pub fn sync(&self) -> &RegistrationSync {
        &self.sync
    }

    /// True when `competitor_id` appears as the competitor or the partner
    pub fn involves(&self, competitor_id: &str) -> bool {
        self.competitor_id == competitor_id || self.partner_id.as_deref() == Some(competitor_id)
    }

    pub fn is_pending_approval(&self) -> bool {
        self.status == RegistrationStatus::PendingApproval
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == RegistrationStatus::Confirmed
    }

    pub(crate) fn approve(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        self.ensure_pending()?;
        self.transition(RegistrationStatus::Confirmed, now);
        Ok(())
    }

    pub(crate) fn reject(&mut self, reason: Option<&str>, now: DateTime<Utc>) -> TournamentResult<()> {
        self.ensure_pending()?;
        self.rejection_reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        self.transition(RegistrationStatus::Rejected, now);
        Ok(())
    }

    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        match self.status {
            RegistrationStatus::PendingApproval | RegistrationStatus::Confirmed => {
                self.transition(RegistrationStatus::Cancelled, now);
                Ok(())
            }
            status => Err(TournamentError::InvalidOperation(format!(
                "Cannot cancel a registration with status {status}."
            ))),
        }
    }

    fn ensure_pending(&self) -> TournamentResult<()> {
        if !self.is_pending_approval() {
            return Err(TournamentError::invalid_operation(
                messages::NOT_PENDING_APPROVAL,
            ));
        }
        Ok(())
    }

    fn transition(&mut self, status: RegistrationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.version += 1;
        self.updated_at = now;
    }
}
