//! Tolerant decoding of the model's extraction reply.

use crate::error::PipelineError;
use crate::record::ExtractedRecord;

/// Decode the model's reply into records.
///
/// The model is asked for JSON but is not contractually guaranteed to wrap
/// a single receipt in an array, so both shapes are accepted: a lone object
/// yields a one-element vector. Anything else is an error carrying the raw
/// text for the logs.
pub fn parse_records(raw: &str) -> Result<Vec<ExtractedRecord>, PipelineError> {
    let payload = extract_json_payload(raw);

    if let Ok(record) = serde_json::from_str::<ExtractedRecord>(payload) {
        return Ok(vec![record]);
    }
    if let Ok(records) = serde_json::from_str::<Vec<ExtractedRecord>>(payload) {
        return Ok(records);
    }

    Err(PipelineError::UnparsableResponse {
        raw: raw.to_string(),
    })
}

/// Strip a markdown code fence if the model added one despite the JSON
/// response type.
fn extract_json_payload(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        let rest = rest.find('\n').map(|i| &rest[i + 1..]).unwrap_or(rest);
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_object_yields_one_record() {
        let records = parse_records(
            r#"{"date":"2024-01-05","vendor":"ACME","category":"Grocery","total_amount":1200}"#,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vendor, "ACME");
        assert_eq!(records[0].amount, 1200);
    }

    #[test]
    fn test_array_yields_all_records() {
        let records = parse_records(
            r#"[{"date":"2024-01-05","vendor":"A","category":"Grocery","total_amount":100},
                {"date":"2024-01-06","vendor":"B","category":"Medical","total_amount":200}]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].vendor, "B");
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = parse_records("not json").unwrap_err();
        assert!(matches!(err, PipelineError::UnparsableResponse { .. }));
    }

    #[test]
    fn test_fenced_json_parses_like_bare_json() {
        let raw = "```json\n{\"vendor\":\"ACME\",\"total_amount\":5}\n```";
        let records = parse_records(raw).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 5);
    }

    #[test]
    fn test_plain_fence_parses() {
        let raw = "```\n[{\"vendor\":\"A\"},{\"vendor\":\"B\"}]\n```";
        let records = parse_records(raw).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_empty_array_is_zero_records() {
        let records = parse_records("[]").unwrap();
        assert!(records.is_empty());
    }
}
