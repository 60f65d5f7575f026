//! `ArtifactStore` sobre Postgres.
//!
//! El claim es un único `UPDATE ... WHERE <predicado> RETURNING`: Postgres
//! serializa los escritores concurrentes sobre la fila y re-evalúa el
//! predicado tras el lock, así que de N claims simultáneos sólo uno afecta
//! una fila. `resolve` condiciona además por `claim_revision`.
use alt_core::constants::ATTEMPTS_EXHAUSTED;
use alt_core::repo::{ArtifactStore, ClaimMode, ClaimOutcome, ClaimRequest, ClaimToken, InsertOutcome, Resolution, StoreError};
use alt_domain::{Artifact, ArtifactStatus, Fingerprint, NewArtifact, ResultAttempt};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Bool, Integer, Text, Timestamptz, Uuid as SqlUuid};
use log::debug;
use uuid::Uuid;

use super::rows::{to_i32, ArtifactRow, AttemptRow, ClaimedRow, NewArtifactRow, ResultRow};
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{artifact_results, artifacts};

const CLAIM_SQL: &str = "\
UPDATE artifacts AS a
   SET status = 'claimed', claimed_at = $2, claim_revision = a.claim_revision + 1
  FROM artifact_results AS r
 WHERE a.id = $1 AND r.artifact_id = a.id AND r.attempt_count < $3
   AND CASE WHEN $4 THEN a.status = 'claimed' AND a.claimed_at < $5 ELSE a.status = 'pending' END
RETURNING a.claim_revision";

const BEGIN_ATTEMPT_SQL: &str = "\
UPDATE artifact_results
   SET attempt_count = attempt_count + 1, requested_at = $2
 WHERE artifact_id = $1
RETURNING attempt_count";

const EXHAUST_SQL: &str = "\
UPDATE artifacts AS a
   SET status = 'failed', claimed_at = NULL, claim_revision = a.claim_revision + 1, error = $2
  FROM artifact_results AS r
 WHERE a.id = $1 AND r.artifact_id = a.id AND r.attempt_count >= $3
   AND CASE WHEN $4 THEN a.status = 'claimed' AND a.claimed_at < $5 ELSE a.status = 'pending' END
RETURNING a.claim_revision";

pub struct PgArtifactStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgArtifactStore<P> {
    pub fn new(provider: P) -> Self { Self { provider } }

    fn load_artifact(conn: &mut PgConnection, id: Uuid) -> Result<Option<Artifact>, PersistenceError> {
        let row = artifacts::table.find(id)
                                  .select(ArtifactRow::as_select())
                                  .first(conn)
                                  .optional()?;
        row.map(Artifact::try_from).transpose()
    }

    fn load_by_fingerprint(conn: &mut PgConnection, fp: &Fingerprint) -> Result<Option<Artifact>, PersistenceError> {
        let row = artifacts::table.filter(artifacts::content_fingerprint.eq(fp.as_str()))
                                  .select(ArtifactRow::as_select())
                                  .first(conn)
                                  .optional()?;
        row.map(Artifact::try_from).transpose()
    }

    fn claim_in_tx(conn: &mut PgConnection, id: Uuid, request: &ClaimRequest) -> Result<ClaimOutcome, PersistenceError> {
        let max_attempts = i32::try_from(request.max_attempts).unwrap_or(i32::MAX);
        let (is_stale, stale_before) = match request.mode {
            ClaimMode::Fresh => (false, request.now),
            ClaimMode::Stale { stale_before } => (true, stale_before),
        };

        let claimed: Option<ClaimedRow> = diesel::sql_query(CLAIM_SQL).bind::<SqlUuid, _>(id)
                                                                      .bind::<Timestamptz, _>(request.now)
                                                                      .bind::<Integer, _>(max_attempts)
                                                                      .bind::<Bool, _>(is_stale)
                                                                      .bind::<Timestamptz, _>(stale_before)
                                                                      .get_result(conn)
                                                                      .optional()?;
        if let Some(claimed) = claimed {
            let attempt: AttemptRow = diesel::sql_query(BEGIN_ATTEMPT_SQL).bind::<SqlUuid, _>(id)
                                                                          .bind::<Timestamptz, _>(request.now)
                                                                          .get_result(conn)?;
            return Ok(ClaimOutcome::Claimed(ClaimToken { artifact_id: id,
                                                         revision: u64::try_from(claimed.claim_revision).unwrap_or(0),
                                                         attempt: u32::try_from(attempt.attempt_count).unwrap_or(0) }));
        }

        let exhausted: Option<ClaimedRow> = diesel::sql_query(EXHAUST_SQL).bind::<SqlUuid, _>(id)
                                                                          .bind::<Text, _>(ATTEMPTS_EXHAUSTED)
                                                                          .bind::<Integer, _>(max_attempts)
                                                                          .bind::<Bool, _>(is_stale)
                                                                          .bind::<Timestamptz, _>(stale_before)
                                                                          .get_result(conn)
                                                                          .optional()?;
        if exhausted.is_some() {
            diesel::update(artifact_results::table.find(id)).set(artifact_results::last_error.eq(ATTEMPTS_EXHAUSTED))
                                                            .execute(conn)?;
            return Ok(ClaimOutcome::AttemptsExhausted);
        }

        let exists: i64 = artifacts::table.filter(artifacts::id.eq(id)).count().get_result(conn)?;
        Ok(if exists == 0 { ClaimOutcome::NotFound } else { ClaimOutcome::Busy })
    }

    fn resolve_in_tx(conn: &mut PgConnection,
                     token: &ClaimToken,
                     resolution: &Resolution,
                     now: DateTime<Utc>)
                     -> Result<bool, PersistenceError> {
        let revision = i64::try_from(token.revision).unwrap_or(i64::MAX);
        let target = artifacts::table.filter(artifacts::id.eq(token.artifact_id))
                                     .filter(artifacts::status.eq(ArtifactStatus::Claimed.as_str()))
                                     .filter(artifacts::claim_revision.eq(revision));
        let none_ts: Option<DateTime<Utc>> = None;

        let affected = match resolution {
            Resolution::Completed(_) => diesel::update(target).set((artifacts::status.eq(ArtifactStatus::Completed.as_str()),
                                                                    artifacts::claimed_at.eq(none_ts),
                                                                    artifacts::error.eq(None::<String>)))
                                                              .execute(conn)?,
            Resolution::Released { .. } => diesel::update(target).set((artifacts::status.eq(ArtifactStatus::Pending.as_str()),
                                                                       artifacts::claimed_at.eq(none_ts)))
                                                                 .execute(conn)?,
            Resolution::Failed { error } => diesel::update(target).set((artifacts::status.eq(ArtifactStatus::Failed.as_str()),
                                                                        artifacts::claimed_at.eq(none_ts),
                                                                        artifacts::error.eq(Some(error.as_str()))))
                                                                  .execute(conn)?,
        };
        if affected == 0 {
            return Ok(false);
        }

        let result = artifact_results::table.find(token.artifact_id);
        match resolution {
            Resolution::Completed(done) => {
                let usage = done.usage.clone().unwrap_or_default();
                diesel::update(result).set((artifact_results::output.eq(Some(done.output.as_str())),
                                            artifact_results::model_used.eq(Some(done.model_used.as_str())),
                                            artifact_results::raw_response.eq(done.raw_response.clone()),
                                            artifact_results::prompt.eq(done.prompt.as_deref()),
                                            artifact_results::prompt_tokens.eq(to_i32(usage.prompt_tokens)),
                                            artifact_results::completion_tokens.eq(to_i32(usage.completion_tokens)),
                                            artifact_results::total_tokens.eq(to_i32(usage.total_tokens)),
                                            artifact_results::provider_response_id.eq(done.provider_response_id.as_deref()),
                                            artifact_results::finish_reason.eq(done.finish_reason.as_deref()),
                                            artifact_results::completed_at.eq(Some(now)),
                                            artifact_results::last_error.eq(None::<String>)))
                                      .execute(conn)?;
            }
            Resolution::Released { note } => {
                diesel::update(result).set(artifact_results::last_error.eq(note.as_deref()))
                                      .execute(conn)?;
            }
            Resolution::Failed { error } => {
                diesel::update(result).set((artifact_results::completed_at.eq(Some(now)),
                                            artifact_results::last_error.eq(Some(error.as_str()))))
                                      .execute(conn)?;
            }
        }
        Ok(true)
    }
}

impl<P: ConnectionProvider> ArtifactStore for PgArtifactStore<P> {
    fn insert(&self, new: NewArtifact, now: DateTime<Utc>) -> Result<InsertOutcome, StoreError> {
        let out = with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction().read_write().run(|tx| {
                let id = Uuid::new_v4();
                let row = NewArtifactRow { id,
                                           content_fingerprint: new.content_fingerprint.as_str(),
                                           size_bytes: i64::try_from(new.size).unwrap_or(i64::MAX),
                                           detected_kind: new.detected_kind.as_str(),
                                           original_filename: new.original_filename.as_deref(),
                                           status: ArtifactStatus::Pending.as_str(),
                                           claim_revision: 0,
                                           created_at: now };
                let inserted = diesel::insert_into(artifacts::table).values(&row)
                                                                    .on_conflict(artifacts::content_fingerprint)
                                                                    .do_nothing()
                                                                    .returning(ArtifactRow::as_returning())
                                                                    .get_result(tx)
                                                                    .optional()?;
                match inserted {
                    Some(row) => {
                        diesel::insert_into(artifact_results::table).values(artifact_results::artifact_id.eq(id))
                                                                    .execute(tx)?;
                        debug!("insert:created artifact_id={id}");
                        Ok(InsertOutcome::Created(Artifact::try_from(row)?))
                    }
                    None => {
                        let winner = Self::load_by_fingerprint(tx, &new.content_fingerprint)?.ok_or(PersistenceError::NotFound)?;
                        Ok(InsertOutcome::Existing(winner))
                    }
                }
            })
        })?;
        Ok(out)
    }

    fn get(&self, id: Uuid) -> Result<Option<Artifact>, StoreError> {
        Ok(with_retry(|| {
            let mut conn = self.provider.connection()?;
            Self::load_artifact(&mut conn, id)
        })?)
    }

    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<Artifact>, StoreError> {
        Ok(with_retry(|| {
            let mut conn = self.provider.connection()?;
            Self::load_by_fingerprint(&mut conn, fingerprint)
        })?)
    }

    fn get_result(&self, id: Uuid) -> Result<Option<ResultAttempt>, StoreError> {
        Ok(with_retry(|| {
            let mut conn = self.provider.connection()?;
            let row = artifact_results::table.find(id)
                                             .select(ResultRow::as_select())
                                             .first(&mut conn)
                                             .optional()?;
            Ok(row.map(ResultAttempt::from))
        })?)
    }

    fn try_claim(&self, id: Uuid, request: &ClaimRequest) -> Result<ClaimOutcome, StoreError> {
        Ok(with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction().read_write().run(|tx| Self::claim_in_tx(tx, id, request))
        })?)
    }

    fn resolve(&self, token: &ClaimToken, resolution: Resolution, now: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction().read_write().run(|tx| Self::resolve_in_tx(tx, token, &resolution, now))
        })?)
    }

    fn sweep_candidates(&self, stale_before: DateTime<Utc>, limit: usize) -> Result<Vec<Artifact>, StoreError> {
        Ok(with_retry(|| {
            let mut conn = self.provider.connection()?;
            let rows = artifacts::table.filter(artifacts::status.eq(ArtifactStatus::Pending.as_str()).or(artifacts::status
                                                   .eq(ArtifactStatus::Claimed.as_str())
                                                   .and(artifacts::claimed_at.lt(stale_before))))
                                       .order((artifacts::created_at.asc(), artifacts::id.asc()))
                                       .limit(i64::try_from(limit).unwrap_or(i64::MAX))
                                       .select(ArtifactRow::as_select())
                                       .load(&mut conn)?;
            rows.into_iter().map(Artifact::try_from).collect()
        })?)
    }
}
