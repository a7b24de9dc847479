//! # Debate Tournaments
//!
//! Tournament and registration management for a competitive-debate
//! membership organization.
//!
//! The heart of the crate is the [`Tournament`] aggregate. It owns every
//! [`Registration`] made for it, validates dates and names, enforces the
//! registration window, the no-duplicate rule and the duo approval capacity,
//! and publishes domain events through an injected [`EventEmitter`].
//!
//! ## Core Modules
//!
//! - [`tournament`]: Aggregate, registrations, events, ports and the use-case service
//! - [`db`]: PostgreSQL pool, the repository port and its adapters
//!
//! ## Concurrency
//!
//! The aggregate is plain synchronous data. Lost updates are detected at the
//! storage boundary: every successful mutation increments `version` by one and
//! [`TournamentRepository::save`] only writes when the stored version equals
//! `version - 1`.

/// PostgreSQL connectivity and tournament persistence.
pub mod db;

/// Tournament aggregate and registration workflow.
pub mod tournament;

pub use db::{
    Database, DatabaseConfig, DatabaseError, InMemoryTournamentRepository, PgTournamentRepository,
    TournamentRepository,
};
pub use tournament::{
    Dependant, EventEmitter, IdGenerator, Registration, RegistrationStatus, Tournament,
    TournamentError, TournamentEvent, TournamentResult, TournamentService, TournamentType,
};
