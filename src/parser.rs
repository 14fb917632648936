//! Converts untyped backend rows into [`StatsRecord`]s.
//!
//! The backend view returns loosely typed JSON: numbers may arrive as
//! numbers or strings, and embedded structures (`rating_distribution`,
//! `question_stats`, `text_responses`) may arrive parsed or JSON-encoded.
//! Nothing here returns an error; bad input degrades to defaults.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::stats::{MetricsSet, QuestionStat, RatingDistribution, StatsRecord, SubsetCounts};

static NULL: Value = Value::Null;

/// Parses every row, preserving order.
pub fn parse_rows(rows: &[Value]) -> Vec<StatsRecord> {
    rows.iter().map(parse_record).collect()
}

/// Parses a single backend row. Non-object rows produce a default record.
pub fn parse_record(row: &Value) -> StatsRecord {
    if !row.is_object() {
        debug!("Row is not a JSON object, using defaults");
        return StatsRecord::default();
    }

    StatsRecord {
        instructor_id: text(field(row, &["instructor_id", "instructorId"])),
        instructor_name: text(field(row, &["instructor_name", "instructorName"])),
        education_year: int(field(row, &["education_year", "educationYear"])),
        education_round: int(field(row, &["education_round", "educationRound"])),
        course_name: text(field(row, &["course_name", "course_title", "courseName"]))
            .unwrap_or_default(),
        real_counts: parse_counts(row, ""),
        test_counts: parse_counts(row, "test_"),
        last_response_at: timestamp(field(row, &["last_response_at", "lastResponseAt"])),
        real: parse_metrics(row, ""),
        test: parse_metrics(row, "test_"),
    }
}

fn parse_counts(row: &Value, prefix: &str) -> SubsetCounts {
    let get = |name: &str| count(&row[format!("{prefix}{name}")]);
    SubsetCounts {
        survey_count: get("survey_count"),
        active_survey_count: get("active_survey_count"),
        response_count: get("response_count"),
        text_response_count: get("text_response_count"),
    }
}

fn parse_metrics(row: &Value, prefix: &str) -> MetricsSet {
    let get = |name: &str| &row[format!("{prefix}{name}")];
    MetricsSet {
        avg_overall: average(get("avg_overall_satisfaction")),
        avg_course: average(get("avg_course_satisfaction")),
        avg_instructor: average(get("avg_instructor_satisfaction")),
        avg_operation: average(get("avg_operation_satisfaction")),
        rating_distribution: parse_distribution(get("rating_distribution")),
        question_stats: parse_question_stats(get("question_stats")),
        text_responses: parse_text_list(get("text_responses")),
    }
}

/// Builds a full 1..=10 histogram. Keys outside the range are dropped and
/// non-numeric counts become 0.
pub fn parse_distribution(value: &Value) -> RatingDistribution {
    let mut dist = RatingDistribution::new();
    let Some(value) = embedded_json(value) else {
        return dist;
    };

    if let Some(map) = value.as_object() {
        for (key, raw) in map {
            if let Ok(score) = key.trim().parse::<u8>() {
                dist.set(score, count(raw));
            }
        }
    }

    dist
}

pub fn parse_question_stats(value: &Value) -> Vec<QuestionStat> {
    let Some(value) = embedded_json(value) else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| {
            let question_id = text(field(item, &["question_id", "questionId"]))?;
            Some(QuestionStat {
                question_id,
                question_text: text(field(item, &["question_text", "questionText"]))
                    .unwrap_or_default(),
                question_type: text(field(item, &["question_type", "questionType"]))
                    .unwrap_or_default(),
                satisfaction_type: text(field(item, &["satisfaction_type", "satisfactionType"])),
                order_index: finite_number(field(item, &["order_index", "orderIndex"]))
                    .map(|n| n.trunc() as i64)
                    .unwrap_or(0),
                total_answers: count(field(item, &["total_answers", "totalAnswers"])),
                average: average(field(item, &["average", "avg"])),
                rating_distribution: parse_distribution(field(
                    item,
                    &["rating_distribution", "ratingDistribution"],
                )),
                text_answers: parse_text_list(field(item, &["text_answers", "textAnswers"])),
            })
        })
        .collect()
}

/// Keeps non-blank string entries of a (possibly JSON-encoded) array.
pub fn parse_text_list(value: &Value) -> Vec<String> {
    let Some(value) = embedded_json(value) else {
        return Vec::new();
    };

    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// First non-null value among `keys`.
fn field<'a>(row: &'a Value, keys: &[&str]) -> &'a Value {
    keys.iter()
        .map(|k| &row[*k])
        .find(|v| !v.is_null())
        .unwrap_or(&NULL)
}

/// Accepts an already-parsed structure or a JSON-encoded string.
fn embedded_json(value: &Value) -> Option<Cow<'_, Value>> {
    match value {
        Value::Null => None,
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed) => Some(Cow::Owned(parsed)),
            Err(e) => {
                debug!(error = %e, "Malformed embedded JSON, using empty default");
                None
            }
        },
        other => Some(Cow::Borrowed(other)),
    }
}

fn finite_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn count(value: &Value) -> u64 {
    finite_number(value)
        .map(|n| if n <= 0.0 { 0 } else { n.trunc() as u64 })
        .unwrap_or(0)
}

fn int(value: &Value) -> i32 {
    finite_number(value).map(|n| n.trunc() as i32).unwrap_or(0)
}

fn average(value: &Value) -> Option<f64> {
    finite_number(value)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_numbers_default_to_zero_and_none() {
        let record = parse_record(&json!({ "course_name": "Rust 101" }));

        assert_eq!(record.course_name, "Rust 101");
        assert_eq!(record.real_counts, SubsetCounts::default());
        assert_eq!(record.test_counts, SubsetCounts::default());
        assert_eq!(record.real.avg_overall, None);
        assert_eq!(record.test.avg_operation, None);
        assert_eq!(record.education_year, 0);
    }

    #[test]
    fn test_non_finite_values_are_coerced() {
        let record = parse_record(&json!({
            "response_count": "NaN",
            "survey_count": "abc",
            "active_survey_count": -3,
            "avg_overall_satisfaction": "inf",
            "avg_course_satisfaction": "8.5",
            "text_response_count": 4.9,
        }));

        assert_eq!(record.real_counts.response_count, 0);
        assert_eq!(record.real_counts.survey_count, 0);
        assert_eq!(record.real_counts.active_survey_count, 0);
        assert_eq!(record.real_counts.text_response_count, 4);
        assert_eq!(record.real.avg_overall, None);
        assert_eq!(record.real.avg_course, Some(8.5));
    }

    #[test]
    fn test_test_prefixed_fields_fill_test_subset() {
        let record = parse_record(&json!({
            "response_count": 10,
            "avg_overall_satisfaction": 8.0,
            "test_response_count": 5,
            "test_avg_overall_satisfaction": 4.0,
        }));

        assert_eq!(record.real_counts.response_count, 10);
        assert_eq!(record.test_counts.response_count, 5);
        assert_eq!(record.real.avg_overall, Some(8.0));
        assert_eq!(record.test.avg_overall, Some(4.0));
    }

    #[test]
    fn test_distribution_accepts_object_or_string() {
        let parsed = parse_distribution(&json!({ "1": 2, "10": "3", "11": 9, "x": 1 }));
        assert_eq!(parsed.get(1), 2);
        assert_eq!(parsed.get(10), 3);
        assert_eq!(parsed.total(), 5);

        let encoded = parse_distribution(&json!("{\"5\": 7}"));
        assert_eq!(encoded.get(5), 7);
        assert_eq!(encoded.total(), 7);
    }

    #[test]
    fn test_malformed_json_degrades_to_empty() {
        assert_eq!(parse_distribution(&json!("{not json")).total(), 0);
        assert!(parse_question_stats(&json!("[oops")).is_empty());
        assert!(parse_text_list(&json!("nope")).is_empty());
        assert_eq!(parse_distribution(&json!({ "3": "many" })).get(3), 0);
    }

    #[test]
    fn test_question_stats_accept_both_key_styles() {
        let stats = parse_question_stats(&json!([
            {
                "question_id": "q1",
                "question_text": "How was it?",
                "question_type": "rating",
                "satisfaction_type": "course",
                "order_index": 2,
                "total_answers": 4,
                "average": 7.5,
                "rating_distribution": { "7": 2, "8": 2 },
                "text_answers": []
            },
            {
                "questionId": 42,
                "questionText": "Comments",
                "questionType": "text",
                "textAnswers": "[\"great\", \"  \", \"more labs\"]"
            },
            "not an object",
            { "question_text": "no id" }
        ]));

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].question_id, "q1");
        assert_eq!(stats[0].satisfaction_type.as_deref(), Some("course"));
        assert_eq!(stats[0].rating_distribution.total(), 4);
        assert_eq!(stats[1].question_id, "42");
        assert_eq!(stats[1].average, None);
        assert_eq!(stats[1].text_answers, vec!["great", "more labs"]);
    }

    #[test]
    fn test_non_object_row_yields_default_record() {
        assert_eq!(parse_record(&json!([1, 2, 3])), StatsRecord::default());
        assert_eq!(parse_record(&json!(null)), StatsRecord::default());
    }

    #[test]
    fn test_timestamp_formats() {
        let a = parse_record(&json!({ "last_response_at": "2024-05-01T10:00:00Z" }));
        let b = parse_record(&json!({ "last_response_at": "2024-05-01 10:00:00+00" }));
        assert!(a.last_response_at.is_some());
        assert_eq!(a.last_response_at, b.last_response_at);
        let c = parse_record(&json!({ "last_response_at": "yesterday" }));
        assert_eq!(c.last_response_at, None);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let record = parse_record(&json!({
            "education_year": 2024,
            "education_round": "3",
            "extra": { "nested": true }
        }));
        assert_eq!(record.education_year, 2024);
        assert_eq!(record.education_round, 3);
    }
}
