//! Esquema Diesel de `artifacts` y `artifact_results`.

diesel::table! {
    artifacts (id) {
        id -> Uuid,
        content_fingerprint -> Text,
        size_bytes -> BigInt,
        detected_kind -> Text,
        original_filename -> Nullable<Text>,
        status -> Text,
        claimed_at -> Nullable<Timestamptz>,
        claim_revision -> BigInt,
        error -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    artifact_results (artifact_id) {
        artifact_id -> Uuid,
        attempt_count -> Integer,
        model_used -> Nullable<Text>,
        output -> Nullable<Text>,
        raw_response -> Nullable<Jsonb>,
        prompt -> Nullable<Text>,
        prompt_tokens -> Nullable<Integer>,
        completion_tokens -> Nullable<Integer>,
        total_tokens -> Nullable<Integer>,
        provider_response_id -> Nullable<Text>,
        finish_reason -> Nullable<Text>,
        requested_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
        last_error -> Nullable<Text>,
    }
}

diesel::joinable!(artifact_results -> artifacts (artifact_id));

diesel::allow_tables_to_appear_in_same_query!(artifacts, artifact_results);
