
use alt_core::constants::ATTEMPTS_EXHAUSTED;
use alt_core::repo::{ArtifactStore, ClaimMode, ClaimOutcome, ClaimRequest, CompletedOutput, InsertOutcome, Resolution};
use alt_domain::{ArtifactStatus, Usage};
use chrono::{Duration, Utc};
use std::sync::{Barrier, Mutex};
use test_support::{store, unique_artifact};

fn fresh() -> ClaimRequest {
    ClaimRequest { mode: ClaimMode::Fresh, now: Utc::now(), max_attempts: 3 }
}

#[test]
fn insert_is_deduplicated_by_fingerprint() {
    let Some(store) = store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let new = unique_artifact();
    let InsertOutcome::Created(a) = store.insert(new.clone(), Utc::now()).unwrap() else { panic!("created") };
    let InsertOutcome::Existing(b) = store.insert(new.clone(), Utc::now()).unwrap() else { panic!("existing") };
    assert_eq!(a.id, b.id);
    assert_eq!(store.find_by_fingerprint(&new.content_fingerprint).unwrap().unwrap().id, a.id);
    assert_eq!(store.get_result(a.id).unwrap().unwrap().attempt_count, 0);
}

#[test]
fn concurrent_claims_have_one_winner() {
    let Some(store) = store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let InsertOutcome::Created(a) = store.insert(unique_artifact(), Utc::now()).unwrap() else { panic!("created") };
    const WORKERS: usize = 8;
    let barrier = Barrier::new(WORKERS);
    let outcomes = Mutex::new(Vec::new());
    std::thread::scope(|s| {
        for _ in 0..WORKERS {
            s.spawn(|| {
                barrier.wait();
                let out = store.try_claim(a.id, &fresh()).unwrap();
                outcomes.lock().unwrap().push(out);
            });
        }
    });
    let outcomes = outcomes.into_inner().unwrap();
    assert_eq!(outcomes.iter().filter(|o| matches!(o, ClaimOutcome::Claimed(_))).count(), 1);
    assert_eq!(store.get_result(a.id).unwrap().unwrap().attempt_count, 1);
}

#[test]
fn stale_reclaim_supersedes_old_token() {
    let Some(store) = store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let InsertOutcome::Created(a) = store.insert(unique_artifact(), Utc::now()).unwrap() else { panic!("created") };
    let old = ClaimRequest { mode: ClaimMode::Fresh, now: Utc::now() - Duration::minutes(30), max_attempts: 3 };
    let ClaimOutcome::Claimed(first) = store.try_claim(a.id, &old).unwrap() else { panic!("claim") };

    assert_eq!(store.try_claim(a.id, &fresh()).unwrap(), ClaimOutcome::Busy);
    let stale = ClaimRequest { mode: ClaimMode::Stale { stale_before: Utc::now() - Duration::minutes(5) },
                               now: Utc::now(),
                               max_attempts: 3 };
    let ClaimOutcome::Claimed(second) = store.try_claim(a.id, &stale).unwrap() else { panic!("reclaim") };
    assert_eq!(second.revision, first.revision + 1);
    assert_eq!(second.attempt, 2);

    assert!(!store.resolve(&first, Resolution::Released { note: None }, Utc::now()).unwrap());
    let done = CompletedOutput { output: "alt text".into(),
                                 model_used: "m1".into(),
                                 raw_response: Some(serde_json::json!({"id": "gen-1"})),
                                 prompt: Some("describe".into()),
                                 usage: Some(Usage { prompt_tokens: Some(10), completion_tokens: Some(4), total_tokens: Some(14) }),
                                 provider_response_id: Some("gen-1".into()),
                                 finish_reason: Some("stop".into()) };
    assert!(store.resolve(&second, Resolution::Completed(done), Utc::now()).unwrap());

    let artifact = store.get(a.id).unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Completed);
    artifact.check_invariants().unwrap();
    let result = store.get_result(a.id).unwrap().unwrap();
    assert_eq!(result.output.as_deref(), Some("alt text"));
    assert_eq!(result.usage.unwrap().total_tokens, Some(14));
    assert!(result.completed_at.is_some());
}

#[test]
fn claim_at_cap_marks_failed() {
    let Some(store) = store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let InsertOutcome::Created(a) = store.insert(unique_artifact(), Utc::now()).unwrap() else { panic!("created") };
    let req = ClaimRequest { mode: ClaimMode::Fresh, now: Utc::now(), max_attempts: 1 };
    let ClaimOutcome::Claimed(tok) = store.try_claim(a.id, &req).unwrap() else { panic!("claim") };
    assert!(store.resolve(&tok, Resolution::Released { note: Some("budget".into()) }, Utc::now()).unwrap());
    assert_eq!(store.get_result(a.id).unwrap().unwrap().last_error.as_deref(), Some("budget"));

    assert_eq!(store.try_claim(a.id, &req).unwrap(), ClaimOutcome::AttemptsExhausted);
    let artifact = store.get(a.id).unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Failed);
    assert_eq!(artifact.error.as_deref(), Some(ATTEMPTS_EXHAUSTED));
    assert!(artifact.claimed_at.is_none());
}

#[test]
fn sweep_candidates_include_pending_and_stale_only() {
    let Some(store) = store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let InsertOutcome::Created(pending) = store.insert(unique_artifact(), Utc::now() - Duration::days(3650)).unwrap() else {
        panic!("created")
    };
    let InsertOutcome::Created(busy) = store.insert(unique_artifact(), Utc::now() - Duration::days(3650)).unwrap() else {
        panic!("created")
    };
    store.try_claim(busy.id, &fresh()).unwrap();

    let ids: Vec<_> = store.sweep_candidates(Utc::now() - Duration::minutes(5), 10_000)
                           .unwrap()
                           .into_iter()
                           .map(|a| a.id)
                           .collect();
    assert!(ids.contains(&pending.id));
    assert!(!ids.contains(&busy.id));
}

#[test]
fn unknown_id_claim_is_not_found() {
    let Some(store) = store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    assert_eq!(store.try_claim(uuid::Uuid::new_v4(), &fresh()).unwrap(), ClaimOutcome::NotFound);
}
