//! Tournament data models shared by the aggregate, its events and the adapters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::TournamentError;

/// Tournament ID type
pub type TournamentId = String;

/// Registration ID type
pub type RegistrationId = String;

/// Competitor (dependant) ID type
pub type CompetitorId = String;

/// Optimistic concurrency version
pub type Version = i64;

/// Confirmed registrations a duo tournament accepts before approvals fall back to cancellation
pub const DUO_APPROVAL_CAPACITY: usize = 10;

/// Tournament type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentType {
    /// One competitor per registration
    Individual,
    /// Competitor plus partner, approved by an organizer
    Duo,
}

impl TournamentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentType::Individual => "INDIVIDUAL",
            TournamentType::Duo => "DUO",
        }
    }
}

impl fmt::Display for TournamentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentType {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INDIVIDUAL" => Ok(TournamentType::Individual),
            "DUO" => Ok(TournamentType::Duo),
            other => Err(TournamentError::InvalidRecord(format!(
                "unknown tournament type '{other}'"
            ))),
        }
    }
}

/// Registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    PendingApproval,
    Confirmed,
    Rejected,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::PendingApproval => "PENDING_APPROVAL",
            RegistrationStatus::Confirmed => "CONFIRMED",
            RegistrationStatus::Rejected => "REJECTED",
            RegistrationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_APPROVAL" => Ok(RegistrationStatus::PendingApproval),
            "CONFIRMED" => Ok(RegistrationStatus::Confirmed),
            "REJECTED" => Ok(RegistrationStatus::Rejected),
            "CANCELLED" => Ok(RegistrationStatus::Cancelled),
            other => Err(TournamentError::InvalidRecord(format!(
                "unknown registration status '{other}'"
            ))),
        }
    }
}

/// Delivery state of a registration's outbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SyncStatus::Pending),
            "SYNCED" => Ok(SyncStatus::Synced),
            "FAILED" => Ok(SyncStatus::Failed),
            other => Err(TournamentError::InvalidRecord(format!(
                "unknown sync status '{other}'"
            ))),
        }
    }
}

/// A competitor or partner as seen by the tournament. Only the ID is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependant {
    pub id: CompetitorId,
}

impl Dependant {
    pub fn new(id: impl Into<CompetitorId>) -> Self {
        Self { id: id.into() }
    }
}

/// Input for creating a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentProps {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub tournament_type: TournamentType,
    pub registration_start_date: DateTime<Utc>,
    pub registration_end_date: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub tournament_type: Option<TournamentType>,
    pub registration_start_date: Option<DateTime<Utc>>,
    pub registration_end_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
}
