mod support;

use alt_core::provider::{ScriptStep, ScriptedProvider};
use alt_core::repo::{ArtifactStore, ClaimMode, ClaimOutcome, ClaimRequest};
use alt_core::{AttemptReport, AttemptTrigger, IngestGate, IngestOutcome, ProviderErrorKind, Submission};
use alt_domain::ArtifactStatus;
use chrono::Utc;
use std::time::Duration;
use support::*;
use uuid::Uuid;

/// Crea el artifact sin intento síncrono (como si el proceso hubiera caído).
fn ingest_only(h: &Harness, bytes: Vec<u8>) -> Uuid {
    let gate = IngestGate::new(h.store.clone(), h.content.clone(), 1 << 20);
    match gate.ingest(&Submission::new(bytes)).unwrap() {
        IngestOutcome::Created(a) => a.id,
        other => panic!("inesperado: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn stuck_claim_is_recovered_by_sweep() {
    let h = harness(ScriptedProvider::new().script("m1", [ScriptStep::succeed("recuperado")]), config(&["m1"], 10, 5));
    let id = ingest_only(&h, png(10));
    let crashed_at = Utc::now() - chrono::Duration::minutes(10);
    let req = ClaimRequest { mode: ClaimMode::Fresh, now: crashed_at, max_attempts: 3 };
    assert!(matches!(h.store.try_claim(id, &req).unwrap(), ClaimOutcome::Claimed(_)));

    let report = h.pipeline.sweep().await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.completed, 1);
    let status = h.pipeline.get_status(id).unwrap();
    assert_eq!(status.status, ArtifactStatus::Completed);
    assert_eq!(status.attempt_count, 2);
    assert_eq!(status.output.as_deref(), Some("recuperado"));
}

#[tokio::test(start_paused = true)]
async fn fresh_claim_is_left_alone() {
    let h = harness(ScriptedProvider::new().script("m1", [ScriptStep::succeed("x")]), config(&["m1"], 10, 5));
    let id = ingest_only(&h, png(11));
    let req = ClaimRequest { mode: ClaimMode::Fresh, now: Utc::now(), max_attempts: 3 };
    h.store.try_claim(id, &req).unwrap();

    let report = h.pipeline.sweep().await.unwrap();
    assert_eq!(report.examined, 0);
    assert_eq!(h.provider.call_count(), 0);
    assert_eq!(h.pipeline.get_status(id).unwrap().status, ArtifactStatus::Claimed);
}

#[tokio::test(start_paused = true)]
async fn stale_reclaim_at_cap_fails_without_calling() {
    let h = harness(ScriptedProvider::new().script("m1", [ScriptStep::succeed("x")]),
                    config(&["m1"], 10, 5).with_max_attempts(1));
    let id = ingest_only(&h, png(12));
    let req = ClaimRequest { mode: ClaimMode::Fresh, now: Utc::now() - chrono::Duration::hours(1), max_attempts: 1 };
    h.store.try_claim(id, &req).unwrap();

    let report = h.pipeline.sweep().await.unwrap();
    assert_eq!(report.failed, 1);
    let status = h.pipeline.get_status(id).unwrap();
    assert_eq!(status.status, ArtifactStatus::Failed);
    assert_eq!(status.error.as_deref(), Some("attempts exhausted"));
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_resolution_after_reclaim_is_discarded() {
    let h = harness(ScriptedProvider::new().script("m1", [ScriptStep::succeed_after(Duration::from_secs(3), "tarde")]),
                    config(&["m1"], 10, 5));
    let id = ingest_only(&h, png(13));

    let executor = h.pipeline.executor().clone();
    let slow = tokio::spawn(async move {
        executor.run_attempt(id, ClaimMode::Fresh, Duration::from_secs(60), AttemptTrigger::Sweep).await
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.pipeline.get_status(id).unwrap().status, ArtifactStatus::Claimed);

    // Otro worker considera el claim abandonado y lo toma.
    let reclaim = ClaimRequest { mode: ClaimMode::Stale { stale_before: Utc::now() + chrono::Duration::hours(1) },
                                 now: Utc::now(),
                                 max_attempts: 3 };
    let ClaimOutcome::Claimed(token) = h.store.try_claim(id, &reclaim).unwrap() else { panic!("reclaim") };
    assert_eq!(token.attempt, 2);

    let report = slow.await.unwrap().unwrap();
    assert_eq!(report, AttemptReport::Discarded { attempt: 1 });
    let artifact = h.store.get(id).unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Claimed);
    assert_eq!(artifact.claim_revision, token.revision);
    assert!(h.store.get_result(id).unwrap().unwrap().output.is_none());
}

#[tokio::test(start_paused = true)]
async fn sweep_takes_oldest_first_within_batch() {
    let h = harness(ScriptedProvider::new().script("m1", [ScriptStep::succeed("x")]),
                    config(&["m1"], 10, 5).with_sweep_batch(2, 2));
    let first = ingest_only(&h, png(20));
    std::thread::sleep(Duration::from_millis(2));
    let second = ingest_only(&h, png(21));
    std::thread::sleep(Duration::from_millis(2));
    let third = ingest_only(&h, png(22));

    let planned: Vec<Uuid> = h.pipeline.recovery_sweep().candidates().unwrap().into_iter().map(|a| a.id).collect();
    assert_eq!(planned, vec![first, second]);
    assert_eq!(h.provider.call_count(), 0, "dry-run no llama al proveedor");

    let report = h.pipeline.sweep().await.unwrap();
    assert_eq!(report.completed, 2);
    assert_eq!(h.pipeline.get_status(third).unwrap().status, ArtifactStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn sweep_budget_allows_more_models_than_sync() {
    // Escenario: MAX=3, sync 5s, per-call 5s; m1 cuelga y luego falla, m2 responde.
    let provider = ScriptedProvider::new().script("m1", [ScriptStep::Hang, ScriptStep::fail(ProviderErrorKind::Transient, "502")])
                                          .script("m2", [ScriptStep::succeed("descripción")]);
    let h = harness(provider, config(&["m1", "m2"], 5, 5));

    let receipt = h.pipeline.submit(Submission::new(png(30))).await.unwrap();
    assert_eq!(receipt.status.status, ArtifactStatus::Pending);
    assert_eq!(receipt.status.attempt_count, 1);
    assert_eq!(h.provider.calls(), models(&["m1"]));

    let report = h.pipeline.sweep().await.unwrap();
    assert_eq!(report.completed, 1);
    let status = h.pipeline.get_status(receipt.artifact_id()).unwrap();
    assert_eq!(status.status, ArtifactStatus::Completed);
    assert_eq!(status.model_used.as_deref(), Some("m2"));
    assert_eq!(status.attempt_count, 2);
    assert_eq!(h.provider.calls(), models(&["m1", "m1", "m2"]));
}

#[tokio::test(start_paused = true)]
async fn periodic_sweep_stops_on_shutdown() {
    let h = harness(ScriptedProvider::new(), config(&["m1"], 10, 5));
    let (tx, rx) = tokio::sync::watch::channel(false);
    let pipeline = h.pipeline.clone();
    let looping = tokio::spawn(async move { pipeline.recovery_sweep().run_every(Duration::from_secs(10), rx).await });

    tokio::time::sleep(Duration::from_secs(25)).await;
    tx.send(true).unwrap();
    let passes = looping.await.unwrap();
    assert_eq!(passes, 3);
}
