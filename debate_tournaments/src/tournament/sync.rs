//! Delivery bookkeeping for a registration's outbound confirmation event.
//!
//! The record is created together with its registration and travels with the
//! tournament aggregate. The delivery process finds due records with
//! [`Tournament::due_syncs`](super::Tournament::due_syncs) and reports each
//! attempt through
//! [`Tournament::record_sync_attempt`](super::Tournament::record_sync_attempt).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{TournamentError, TournamentResult};
use super::models::{RegistrationId, SyncStatus};

/// Delay before the first retry after a failed delivery
pub const SYNC_BASE_BACKOFF_SECS: i64 = 30;

/// Upper bound for the retry delay
pub const SYNC_MAX_BACKOFF_SECS: i64 = 3600;

/// Result of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSync {
    pub(crate) id: String,
    pub(crate) registration_id: RegistrationId,
    pub(crate) status: SyncStatus,
    pub(crate) attempts: u32,
    pub(crate) last_attempt_at: Option<DateTime<Utc>>,
    pub(crate) next_attempt_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl RegistrationSync {
    pub(crate) fn new(id: String, registration_id: RegistrationId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            registration_id,
            status: SyncStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            next_attempt_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_at
    }

    pub fn next_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.next_attempt_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether a delivery attempt should be made at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SyncStatus::Synced => false,
            SyncStatus::Pending => self.next_attempt_at.is_none_or(|at| at <= now),
            SyncStatus::Failed => self.next_attempt_at.is_some_and(|at| at <= now),
        }
    }

    /// Downstream acknowledged the event
    pub(crate) fn record_success(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        self.ensure_not_synced()?;
        self.attempts += 1;
        self.status = SyncStatus::Synced;
        self.last_attempt_at = Some(now);
        self.next_attempt_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Delivery failed; schedule the next attempt with exponential backoff
    pub(crate) fn record_failure(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        self.ensure_not_synced()?;
        self.attempts += 1;
        self.status = SyncStatus::Failed;
        self.last_attempt_at = Some(now);
        self.next_attempt_at = Some(now + backoff_for(self.attempts));
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn record(&mut self, outcome: SyncOutcome, now: DateTime<Utc>) -> TournamentResult<()> {
        match outcome {
            SyncOutcome::Delivered => self.record_success(now),
            SyncOutcome::Failed => self.record_failure(now),
        }
    }

    fn ensure_not_synced(&self) -> TournamentResult<()> {
        if self.status == SyncStatus::Synced {
            return Err(TournamentError::invalid_operation(
                "Registration sync is already completed.",
            ));
        }
        Ok(())
    }
}

fn backoff_for(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    let secs = SYNC_BASE_BACKOFF_SECS.saturating_mul(1_i64 << exponent);
    Duration::seconds(secs.min(SYNC_MAX_BACKOFF_SECS))
}
