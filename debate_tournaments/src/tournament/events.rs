//! Domain events published by the tournament aggregate.
//!
//! Serialized as `{"eventType": "...", "payload": {...}}`.

use serde::{Deserialize, Serialize};

use super::models::{CompetitorId, RegistrationId, TournamentId};
use super::registration::Registration;

pub const REGISTRATION_CONFIRMED: &str = "Registration.Confirmed";
pub const DUO_REGISTRATION_REQUESTED: &str = "DuoRegistration.Requested";
pub const DUO_REGISTRATION_ACCEPTED: &str = "DuoRegistration.Accepted";
pub const DUO_REGISTRATION_REJECTED: &str = "DuoRegistration.Rejected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "payload")]
pub enum TournamentEvent {
    #[serde(rename = "Registration.Confirmed")]
    RegistrationConfirmed(RegistrationConfirmed),
    #[serde(rename = "DuoRegistration.Requested")]
    DuoRegistrationRequested(DuoRegistrationPayload),
    #[serde(rename = "DuoRegistration.Accepted")]
    DuoRegistrationAccepted(DuoRegistrationPayload),
    #[serde(rename = "DuoRegistration.Rejected")]
    DuoRegistrationRejected(DuoRegistrationPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationConfirmed {
    pub registration_id: RegistrationId,
    pub tournament_id: TournamentId,
    pub competitor_id: CompetitorId,
    pub is_duo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuoRegistrationPayload {
    pub registration_id: RegistrationId,
    pub tournament_id: TournamentId,
    pub competitor_id: CompetitorId,
    pub partner_id: CompetitorId,
}

impl DuoRegistrationPayload {
    pub(crate) fn from_registration(registration: &Registration) -> Self {
        Self {
            registration_id: registration.id.clone(),
            tournament_id: registration.tournament_id.clone(),
            competitor_id: registration.competitor_id.clone(),
            partner_id: registration.partner_id.clone().unwrap_or_default(),
        }
    }
}

impl TournamentEvent {
    pub(crate) fn registration_confirmed(registration: &Registration) -> Self {
        TournamentEvent::RegistrationConfirmed(RegistrationConfirmed {
            registration_id: registration.id.clone(),
            tournament_id: registration.tournament_id.clone(),
            competitor_id: registration.competitor_id.clone(),
            is_duo: false,
        })
    }

    /// Wire name of the event
    pub fn event_type(&self) -> &'static str {
        match self {
            TournamentEvent::RegistrationConfirmed(_) => REGISTRATION_CONFIRMED,
            TournamentEvent::DuoRegistrationRequested(_) => DUO_REGISTRATION_REQUESTED,
            TournamentEvent::DuoRegistrationAccepted(_) => DUO_REGISTRATION_ACCEPTED,
            TournamentEvent::DuoRegistrationRejected(_) => DUO_REGISTRATION_REJECTED,
        }
    }

    pub fn registration_id(&self) -> &str {
        match self {
            TournamentEvent::RegistrationConfirmed(p) => &p.registration_id,
            TournamentEvent::DuoRegistrationRequested(p)
            | TournamentEvent::DuoRegistrationAccepted(p)
            | TournamentEvent::DuoRegistrationRejected(p) => &p.registration_id,
        }
    }

    pub fn tournament_id(&self) -> &str {
        match self {
            TournamentEvent::RegistrationConfirmed(p) => &p.tournament_id,
            TournamentEvent::DuoRegistrationRequested(p)
            | TournamentEvent::DuoRegistrationAccepted(p)
            | TournamentEvent::DuoRegistrationRejected(p) => &p.tournament_id,
        }
    }
}
