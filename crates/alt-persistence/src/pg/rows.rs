//! Filas Diesel y su mapeo a tipos de dominio.
use alt_domain::{Artifact, ArtifactStatus, DetectedKind, Fingerprint, ResultAttempt, Usage};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::schema::{artifact_results, artifacts};

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = artifacts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArtifactRow {
    pub id: Uuid,
    pub content_fingerprint: String,
    pub size_bytes: i64,
    pub detected_kind: String,
    pub original_filename: Option<String>,
    pub status: String,
    pub claimed_at: Option<DateTime<Utc>>,
    pub claim_revision: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ArtifactRow> for Artifact {
    type Error = PersistenceError;

    fn try_from(row: ArtifactRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| PersistenceError::CorruptRow(format!("artifact {}: {what}", row.id));
        let content_fingerprint = Fingerprint::parse(&row.content_fingerprint).map_err(|e| corrupt(&e.to_string()))?;
        let detected_kind = DetectedKind::parse(&row.detected_kind).ok_or_else(|| corrupt("detected_kind"))?;
        let status = ArtifactStatus::parse(&row.status).ok_or_else(|| corrupt("status"))?;
        let size = u64::try_from(row.size_bytes).map_err(|_| corrupt("size_bytes"))?;
        let claim_revision = u64::try_from(row.claim_revision).map_err(|_| corrupt("claim_revision"))?;
        Ok(Artifact { id: row.id,
                      content_fingerprint,
                      size,
                      detected_kind,
                      original_filename: row.original_filename,
                      status,
                      claimed_at: row.claimed_at,
                      claim_revision,
                      error: row.error,
                      created_at: row.created_at })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = artifacts)]
pub struct NewArtifactRow<'a> {
    pub id: Uuid,
    pub content_fingerprint: &'a str,
    pub size_bytes: i64,
    pub detected_kind: &'a str,
    pub original_filename: Option<&'a str>,
    pub status: &'a str,
    pub claim_revision: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = artifact_results)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ResultRow {
    pub artifact_id: Uuid,
    pub attempt_count: i32,
    pub model_used: Option<String>,
    pub output: Option<String>,
    pub raw_response: Option<Value>,
    pub prompt: Option<String>,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
    pub provider_response_id: Option<String>,
    pub finish_reason: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

fn to_u32(v: Option<i32>) -> Option<u32> { v.and_then(|n| u32::try_from(n).ok()) }

pub fn to_i32(v: Option<u32>) -> Option<i32> { v.and_then(|n| i32::try_from(n).ok()) }

impl From<ResultRow> for ResultAttempt {
    fn from(row: ResultRow) -> Self {
        let usage = if row.prompt_tokens.is_some() || row.completion_tokens.is_some() || row.total_tokens.is_some() {
            Some(Usage { prompt_tokens: to_u32(row.prompt_tokens),
                         completion_tokens: to_u32(row.completion_tokens),
                         total_tokens: to_u32(row.total_tokens) })
        } else {
            None
        };
        ResultAttempt { artifact_id: row.artifact_id,
                        attempt_count: u32::try_from(row.attempt_count).unwrap_or(0),
                        model_used: row.model_used,
                        output: row.output,
                        raw_response: row.raw_response,
                        prompt: row.prompt,
                        usage,
                        provider_response_id: row.provider_response_id,
                        finish_reason: row.finish_reason,
                        requested_at: row.requested_at,
                        completed_at: row.completed_at,
                        last_error: row.last_error }
    }
}

/// Fila devuelta por el `UPDATE ... RETURNING` del claim.
#[derive(QueryableByName, Debug)]
pub struct ClaimedRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub claim_revision: i64,
}

#[derive(QueryableByName, Debug)]
pub struct AttemptRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub attempt_count: i32,
}
