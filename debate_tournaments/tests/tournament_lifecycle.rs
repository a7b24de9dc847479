//! End-to-end registration workflows through the public aggregate API.

use chrono::{Duration, Utc};
use debate_tournaments::tournament::{
    DUO_APPROVAL_CAPACITY, Dependant, ErrorKind, RecordingEventEmitter, RegistrationStatus,
    SequentialIdGenerator, Tournament, TournamentEvent, TournamentProps, TournamentType,
    TournamentUpdate,
};

fn open_tournament(tournament_type: TournamentType, ids: &SequentialIdGenerator) -> Tournament {
    let now = Utc::now();
    Tournament::create(
        TournamentProps {
            name: "Regional Debate Open".to_string(),
            description: "Open regional qualifier for all divisions".to_string(),
            tournament_type,
            registration_start_date: now - Duration::days(1),
            registration_end_date: now + Duration::days(1),
            start_date: now + Duration::days(7),
        },
        ids,
    )
    .expect("valid tournament")
}

#[test]
fn test_duo_request_then_approve() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let mut tournament = open_tournament(TournamentType::Duo, &ids);
    let created_version = tournament.version();

    let registration_id = {
        let reg = tournament
            .request_duo_registration(
                &Dependant::new("competitor-a"),
                &Dependant::new("competitor-b"),
                &ids,
                &emitter,
            )
            .unwrap();
        assert_eq!(reg.status(), RegistrationStatus::PendingApproval);
        reg.id().to_string()
    };

    let requested = emitter.take();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].event_type(), "DuoRegistration.Requested");

    let reg = tournament
        .approve_duo_registration(&registration_id, &emitter)
        .unwrap();
    assert_eq!(reg.status(), RegistrationStatus::Confirmed);
    assert_eq!(tournament.version(), created_version + 2);

    let accepted = emitter.take();
    assert_eq!(accepted.len(), 1);
    match &accepted[0] {
        TournamentEvent::DuoRegistrationAccepted(payload) => {
            assert_eq!(payload.registration_id, registration_id);
            assert_eq!(payload.tournament_id, tournament.id());
            assert_eq!(payload.competitor_id, "competitor-a");
            assert_eq!(payload.partner_id, "competitor-b");
        }
        other => panic!("expected acceptance, got {other:?}"),
    }
}

#[test]
fn test_individual_registration_after_window_closed() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let now = Utc::now();
    let mut tournament = Tournament::create(
        TournamentProps {
            name: "Autumn Classic".to_string(),
            description: "Individual speaking championship".to_string(),
            tournament_type: TournamentType::Individual,
            registration_start_date: now - Duration::days(10),
            registration_end_date: now - Duration::days(1),
            start_date: now + Duration::days(2),
        },
        &ids,
    )
    .unwrap();

    let err = tournament
        .request_individual_registration(&Dependant::new("competitor-a"), &ids, &emitter)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Registration period is not open for this tournament."
    );
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert!(tournament.registrations().is_empty());
    assert_eq!(tournament.version(), 1);
    assert!(emitter.is_empty());
}

#[test]
fn test_duo_with_same_person_is_rejected() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let mut tournament = open_tournament(TournamentType::Duo, &ids);

    let err = tournament
        .request_duo_registration(
            &Dependant::new("competitor-a"),
            &Dependant::new("competitor-a"),
            &ids,
            &emitter,
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Competitor and partner cannot be the same person."
    );
    assert!(tournament.registrations().is_empty());
    assert!(emitter.is_empty());
}

#[test]
fn test_individual_registration_confirms_and_blocks_repeat() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let mut tournament = open_tournament(TournamentType::Individual, &ids);

    tournament
        .request_individual_registration(&Dependant::new("competitor-a"), &ids, &emitter)
        .unwrap();
    let err = tournament
        .request_individual_registration(&Dependant::new("competitor-a"), &ids, &emitter)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        err.to_string(),
        "Competitor is already registered for this tournament."
    );
    assert_eq!(tournament.registrations().len(), 1);
    assert_eq!(tournament.confirmed_count(), 1);

    let events = emitter.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        TournamentEvent::RegistrationConfirmed(payload) => {
            assert_eq!(payload.competitor_id, "competitor-a");
            assert!(!payload.is_duo);
        }
        other => panic!("expected confirmation, got {other:?}"),
    }
}

#[test]
fn test_partner_cannot_join_a_second_duo() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let mut tournament = open_tournament(TournamentType::Duo, &ids);

    tournament
        .request_duo_registration(
            &Dependant::new("competitor-a"),
            &Dependant::new("competitor-b"),
            &ids,
            &emitter,
        )
        .unwrap();
    let err = tournament
        .request_duo_registration(
            &Dependant::new("competitor-c"),
            &Dependant::new("competitor-b"),
            &ids,
            &emitter,
        )
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Competitor or partner is already registered for this tournament."
    );
    assert_eq!(tournament.registrations().len(), 1);
}

#[test]
fn test_approval_past_capacity_cancels() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let mut tournament = open_tournament(TournamentType::Duo, &ids);

    let mut pending = Vec::new();
    for i in 0..=DUO_APPROVAL_CAPACITY {
        let reg = tournament
            .request_duo_registration(
                &Dependant::new(format!("competitor-{i}")),
                &Dependant::new(format!("partner-{i}")),
                &ids,
                &emitter,
            )
            .unwrap();
        pending.push(reg.id().to_string());
    }

    let (last, first) = pending.split_last().unwrap();
    for id in first {
        tournament.approve_duo_registration(id, &emitter).unwrap();
    }
    assert_eq!(tournament.confirmed_count(), DUO_APPROVAL_CAPACITY);
    assert_eq!(tournament.remaining_capacity(), 0);

    emitter.take();
    let version_before = tournament.version();
    let reg = tournament.approve_duo_registration(last, &emitter).unwrap();

    assert_eq!(reg.status(), RegistrationStatus::Cancelled);
    assert_eq!(tournament.version(), version_before + 1);
    assert!(emitter.is_empty());
}

#[test]
fn test_reject_then_approve_fails() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let mut tournament = open_tournament(TournamentType::Duo, &ids);

    let id = tournament
        .request_duo_registration(
            &Dependant::new("competitor-a"),
            &Dependant::new("competitor-b"),
            &ids,
            &emitter,
        )
        .unwrap()
        .id()
        .to_string();

    let reg = tournament
        .reject_duo_registration(&id, Some("Partner is not eligible"), &emitter)
        .unwrap();
    assert_eq!(reg.status(), RegistrationStatus::Rejected);
    assert_eq!(reg.rejection_reason(), Some("Partner is not eligible"));

    let version = tournament.version();
    let err = tournament
        .approve_duo_registration(&id, &emitter)
        .unwrap_err();
    assert_eq!(err.to_string(), "Registration is not pending approval.");
    assert_eq!(tournament.version(), version);

    let types: Vec<_> = emitter.events().iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec!["DuoRegistration.Requested", "DuoRegistration.Rejected"]
    );
}

#[test]
fn test_registered_tournament_is_frozen() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let mut tournament = open_tournament(TournamentType::Individual, &ids);
    tournament
        .request_individual_registration(&Dependant::new("competitor-a"), &ids, &emitter)
        .unwrap();

    let err = tournament
        .update(TournamentUpdate {
            name: Some("Renamed Open".to_string()),
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot update a tournament that already has registrations."
    );

    let err = tournament.soft_delete().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot delete a tournament that already has registrations."
    );
    assert_eq!(tournament.name(), "Regional Debate Open");
    assert!(!tournament.is_deleted());
}

#[test]
fn test_deleted_tournament_refuses_registration() {
    let ids = SequentialIdGenerator::new("id");
    let emitter = RecordingEventEmitter::new();
    let mut tournament = open_tournament(TournamentType::Individual, &ids);
    tournament.soft_delete().unwrap();
    assert!(tournament.deleted_at().is_some());

    let err = tournament
        .request_individual_registration(&Dependant::new("competitor-a"), &ids, &emitter)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot perform operations on a deleted tournament."
    );

    let err = tournament.soft_delete().unwrap_err();
    assert_eq!(err.to_string(), "Tournament is already deleted.");
}
