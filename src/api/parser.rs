// src/api/parser.rs
//! Parsing of the list and item endpoint bodies.
//!
//! The list endpoint has answered both `{ "data": [...] }` and a bare array
//! over time. Anything else means the API changed under us, which is fatal
//! for the export.

use super::client::ApiResponse;
use crate::error::{AppError, AttemptError};
use crate::model::ConversationSummary;
use serde_json::Value;

/// Characters of an unexpected body kept in error messages.
const BODY_PREVIEW_CHARS: usize = 200;

/// Parses the list endpoint body into conversation summaries.
pub fn parse_conversation_list(
    result: &ApiResponse<String>,
) -> Result<Vec<ConversationSummary>, AppError> {
    let document: Value = serde_json::from_str(&result.data).map_err(|e| {
        log::error!("Failed to parse conversation list from {}: {}", result.url, e);
        AppError::MalformedResponse(format!(
            "conversation list is not valid JSON ({}): {}",
            e,
            preview(&result.data)
        ))
    })?;

    summaries_from_document(document)
}

/// Extracts summaries from an already decoded list document.
pub fn summaries_from_document(document: Value) -> Result<Vec<ConversationSummary>, AppError> {
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(AppError::MalformedResponse(
                    "expected a 'data' array in the conversation list".to_string(),
                ))
            }
        },
        other => {
            return Err(AppError::MalformedResponse(format!(
                "expected an array of conversations, got {}",
                json_type(&other)
            )))
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value::<ConversationSummary>(entry).map_err(|e| {
                AppError::MalformedResponse(format!("conversation summary #{}: {}", index, e))
            })
        })
        .collect()
}

/// Parses an item endpoint body. The document is kept as raw JSON.
pub fn parse_item_document(result: &ApiResponse<String>) -> Result<Value, AttemptError> {
    let document: Value = serde_json::from_str(&result.data).map_err(|e| {
        AttemptError::Decode(format!("{} ({})", e, preview(&result.data)))
    })?;

    if !document.is_object() {
        return Err(AttemptError::Decode(format!(
            "expected a conversation object, got {}",
            json_type(&document)
        )));
    }

    Ok(document)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_CHARS {
        let head: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn response(body: &str) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status: StatusCode::OK,
            url: "https://claude.ai/api/test".to_string(),
        }
    }

    #[test]
    fn accepts_data_wrapper_and_bare_array() {
        let entry = json!({ "uuid": "7d1b6a2e-0c4f-4b8a-9e3d-5f6a7b8c9d0e", "name": "First" });

        let wrapped = summaries_from_document(json!({ "data": [entry.clone()] })).unwrap();
        let bare = summaries_from_document(json!([entry])).unwrap();

        assert_eq!(wrapped, bare);
        assert_eq!(wrapped[0].name, "First");
    }

    #[test]
    fn rejects_other_shapes() {
        for document in [
            json!({ "conversations": [] }),
            json!({ "data": "nope" }),
            json!("text"),
            json!(null),
        ] {
            let err = summaries_from_document(document).unwrap_err();
            assert!(matches!(err, AppError::MalformedResponse(_)));
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_conversation_list(&response("<html>login</html>")).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[test]
    fn summary_without_uuid_is_malformed() {
        let err = summaries_from_document(json!([{ "name": "x" }])).unwrap_err();
        assert!(err.to_string().contains("#0"));
    }

    #[test]
    fn item_must_be_an_object() {
        assert!(parse_item_document(&response("{\"name\":\"x\"}")).is_ok());
        assert!(matches!(
            parse_item_document(&response("[]")),
            Err(AttemptError::Decode(_))
        ));
    }
}
