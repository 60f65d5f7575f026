//! Parseo de la respuesta chat-completions.
//!
//! Tolerante: campos ausentes quedan en `None`. El texto sale de la primera
//! choice; si `content` es una lista de partes se concatenan las de tipo
//! `text` con salto de línea. `provider` y `created` no se extraen: quedan
//! en la respuesta cruda que se persiste.
use alt_core::ProviderResponse;
use alt_domain::Usage;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCompletion {
    pub text: String,
    pub response_id: Option<String>,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl ParsedCompletion {
    pub fn into_response(self, raw: Value) -> ProviderResponse {
        ProviderResponse { text: self.text,
                           reported_model: self.model,
                           usage: self.usage,
                           response_id: self.response_id,
                           finish_reason: self.finish_reason,
                           raw: Some(raw) }
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

fn u32_field(value: &Value, key: &str) -> Option<u32> {
    value.get(key).and_then(Value::as_u64).and_then(|n| u32::try_from(n).ok())
}

fn message_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.trim().to_string(),
        Value::Array(parts) => parts.iter()
                                    .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                                    .filter(|t| !t.is_empty())
                                    .collect::<Vec<_>>()
                                    .join("\n")
                                    .trim()
                                    .to_string(),
        Value::Null => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

pub fn parse_openrouter_response(json: &Value) -> ParsedCompletion {
    let choice = json.get("choices").and_then(Value::as_array).and_then(|c| c.first());
    let text = choice.and_then(|c| c.get("message"))
                     .and_then(|m| m.get("content"))
                     .map(message_text)
                     .unwrap_or_default();
    let finish_reason = choice.and_then(|c| str_field(c, "finish_reason"));

    let usage = json.get("usage").filter(|u| u.is_object()).map(|u| Usage { prompt_tokens: u32_field(u, "prompt_tokens"),
                                                                            completion_tokens: u32_field(u, "completion_tokens"),
                                                                            total_tokens: u32_field(u, "total_tokens") });
    ParsedCompletion { text,
                       response_id: str_field(json, "id"),
                       model: str_field(json, "model"),
                       finish_reason,
                       usage }
}
