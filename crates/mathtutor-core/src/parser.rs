//! Response parser for loosely structured generation output.
//!
//! Generation services are asked to answer with a bare JSON object but
//! routinely wrap it in prose or markdown fences. The parser takes the span
//! from the first `{` to the last `}`, drops line breaks, decodes it, and
//! checks it against the expected shape. Every failure is returned as a
//! [`ParseFailure`]; nothing here panics on bad input.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::model::{FeedbackPayload, GeneratedProblem};

/// Why generated text could not be turned into a structured value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// No `{ ... }` span in the text.
    #[error("no JSON object found in response")]
    NoJsonObject,

    /// A span was found but it is not valid JSON.
    #[error("malformed JSON: {0}")]
    Malformed(String),

    /// Valid JSON with missing fields or fields of the wrong type.
    #[error("unexpected JSON shape: {0}")]
    Schema(String),
}

/// Locate the candidate JSON object: first `{` through last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Extract, clean, and decode a JSON object from generated text into `T`.
pub fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T, ParseFailure> {
    let span = extract_json_object(text).ok_or(ParseFailure::NoJsonObject)?;
    let cleaned: String = span.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();

    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| ParseFailure::Malformed(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| ParseFailure::Schema(e.to_string()))
}

/// Turn literal `\"` sequences left by double-escaping back into quotes.
pub fn unescape_quotes(text: &str) -> String {
    text.replace("\\\"", "\"")
}

#[derive(Deserialize)]
struct RawProblem {
    problem_text: String,
    #[serde(default)]
    final_answer: Option<Number>,
    #[serde(default)]
    correct_answer: Option<Number>,
}

/// Parse a generated math problem.
///
/// The answer may be named `final_answer` or `correct_answer`; `final_answer`
/// wins when both are present. Only JSON numbers are accepted as answers.
pub fn parse_problem(text: &str) -> Result<GeneratedProblem, ParseFailure> {
    let raw: RawProblem = parse_response(text)?;

    let problem_text = unescape_quotes(raw.problem_text.trim());
    if problem_text.is_empty() {
        return Err(ParseFailure::Schema("problem_text is empty".into()));
    }

    let answer = raw
        .final_answer
        .or(raw.correct_answer)
        .ok_or_else(|| ParseFailure::Schema("missing final_answer or correct_answer".into()))?;
    let correct_answer = answer
        .as_f64()
        .filter(|a| a.is_finite())
        .ok_or_else(|| ParseFailure::Schema(format!("answer {answer} is not a finite number")))?;

    Ok(GeneratedProblem {
        problem_text,
        correct_answer,
    })
}

/// Parse generated feedback.
pub fn parse_feedback(text: &str) -> Result<FeedbackPayload, ParseFailure> {
    let payload: FeedbackPayload = parse_response(text)?;
    Ok(FeedbackPayload {
        feedback_text: unescape_quotes(&payload.feedback_text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_object_between_prose() {
        let text = r#"Sure! Here you go: {"a": 1} Hope that helps."#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn extract_spans_first_open_to_last_close() {
        let text = r#"{"a": {"b": 2}} trailing } brace"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": 2}} trailing }"#));
    }

    #[test]
    fn extract_none_without_braces() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("only { open"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn scenario_final_answer() {
        let text = r#"Here is a problem: {"problem_text":"2+2?","final_answer":4}"#;
        let problem = parse_problem(text).unwrap();
        assert_eq!(problem.problem_text, "2+2?");
        assert_eq!(problem.correct_answer, 4.0);
    }

    #[test]
    fn markdown_fenced_problem() {
        let text = "```json\n{\n  \"problem_text\": \"Ali has 12 apples and gives away 5. How many are left?\",\n  \"final_answer\": 7\n}\n```";
        let problem = parse_problem(text).unwrap();
        assert_eq!(problem.correct_answer, 7.0);
        assert!(problem.problem_text.starts_with("Ali has 12 apples"));
    }

    #[test]
    fn correct_answer_alias_accepted() {
        let problem = parse_problem(r#"{"problem_text":"3*3?","correct_answer":9}"#).unwrap();
        assert_eq!(problem.correct_answer, 9.0);
    }

    #[test]
    fn final_answer_preferred_over_alias() {
        let problem =
            parse_problem(r#"{"problem_text":"x","final_answer":5,"correct_answer":6}"#).unwrap();
        assert_eq!(problem.correct_answer, 5.0);
    }

    #[test]
    fn null_final_answer_falls_back_to_alias() {
        let problem =
            parse_problem(r#"{"problem_text":"x","final_answer":null,"correct_answer":6}"#)
                .unwrap();
        assert_eq!(problem.correct_answer, 6.0);
    }

    #[test]
    fn string_answer_rejected() {
        let err = parse_problem(r#"{"problem_text":"x","final_answer":"4"}"#).unwrap_err();
        assert!(matches!(err, ParseFailure::Schema(_)));
    }

    #[test]
    fn missing_answer_rejected() {
        let err = parse_problem(r#"{"problem_text":"x"}"#).unwrap_err();
        assert_eq!(
            err,
            ParseFailure::Schema("missing final_answer or correct_answer".into())
        );
    }

    #[test]
    fn blank_problem_text_rejected() {
        let err = parse_problem(r#"{"problem_text":"  ","final_answer":1}"#).unwrap_err();
        assert!(matches!(err, ParseFailure::Schema(_)));
    }

    #[test]
    fn no_object_is_not_parsable() {
        assert_eq!(
            parse_problem("I cannot do that.").unwrap_err(),
            ParseFailure::NoJsonObject
        );
        assert_eq!(
            parse_feedback("").unwrap_err(),
            ParseFailure::NoJsonObject
        );
    }

    #[test]
    fn malformed_object_is_not_parsable() {
        let err = parse_feedback("{feedback_text: oops}").unwrap_err();
        assert!(matches!(err, ParseFailure::Malformed(_)));
    }

    #[test]
    fn line_breaks_inside_span_are_stripped() {
        let text = "{\"feedback_text\":\r\n \"Well done!\"\n}";
        assert_eq!(parse_feedback(text).unwrap().feedback_text, "Well done!");
    }

    #[test]
    fn feedback_survives_surrounding_prose() {
        let original = FeedbackPayload {
            feedback_text: "Great job, keep it up!".into(),
        };
        let json = serde_json::to_string(&original).unwrap();
        for (before, after) in [
            ("", ""),
            ("Here is your feedback:\n", "\nLet me know if you need more."),
            ("```json\n", "\n```"),
            ("   ", "..."),
        ] {
            let text = format!("{before}{json}{after}");
            assert_eq!(parse_feedback(&text).unwrap(), original, "input: {text}");
        }
    }

    #[test]
    fn escaped_quotes_are_unescaped() {
        let text = r#"{"feedback_text": "You said \\\"7\\\" but it was 8."}"#;
        assert_eq!(
            parse_feedback(text).unwrap().feedback_text,
            r#"You said "7" but it was 8."#
        );
    }

    #[test]
    fn wrong_feedback_type_rejected() {
        let err = parse_feedback(r#"{"feedback_text": 42}"#).unwrap_err();
        assert!(matches!(err, ParseFailure::Schema(_)));
    }
}
