//! Tournament aggregate and registration workflow.
//!
//! This module provides:
//! - Tournament creation, partial update and soft delete
//! - Individual registrations (confirmed immediately)
//! - Duo registrations with an approve/reject workflow and a capacity ceiling
//! - Domain events published through an injected [`EventEmitter`]
//! - Optimistic concurrency through the aggregate `version`
//!
//! ## Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use debate_tournaments::tournament::{
//!     Dependant, RecordingEventEmitter, RegistrationStatus, Tournament, TournamentProps,
//!     TournamentType, UuidIdGenerator,
//! };
//!
//! let now = Utc::now();
//! let mut tournament = Tournament::create(
//!     TournamentProps {
//!         name: "City Championship".to_string(),
//!         description: "Open championship for all club members".to_string(),
//!         tournament_type: TournamentType::Individual,
//!         registration_start_date: now - Duration::days(1),
//!         registration_end_date: now + Duration::days(1),
//!         start_date: now + Duration::days(7),
//!     },
//!     &UuidIdGenerator,
//! )?;
//!
//! let emitter = RecordingEventEmitter::new();
//! let registration = tournament.request_individual_registration(
//!     &Dependant::new("competitor-1"),
//!     &UuidIdGenerator,
//!     &emitter,
//! )?;
//! assert_eq!(registration.status(), RegistrationStatus::Confirmed);
//! assert_eq!(tournament.version(), 2);
//! # Ok::<(), debate_tournaments::tournament::TournamentError>(())
//! ```

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod models;
pub mod ports;
pub mod registration;
pub mod service;
pub mod sync;

pub use aggregate::Tournament;
pub use errors::{ErrorKind, TournamentError, TournamentResult, messages};
pub use events::{DuoRegistrationPayload, RegistrationConfirmed, TournamentEvent};
pub use models::{
    CompetitorId, DUO_APPROVAL_CAPACITY, Dependant, RegistrationId, RegistrationStatus,
    SyncStatus, TournamentId, TournamentProps, TournamentType, TournamentUpdate, Version,
};
pub use ports::{
    EventEmitter, IdGenerator, LogEventEmitter, RecordingEventEmitter, SequentialIdGenerator,
    UuidIdGenerator,
};
pub use registration::Registration;
pub use service::TournamentService;
pub use sync::{RegistrationSync, SyncOutcome};
