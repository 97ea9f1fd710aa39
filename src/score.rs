//! Jsonmend - Fine-tuned model scoring harness
//!
//! Replays held-out invalid JSON against the fine-tuned endpoint and counts
//! exact matches between the prettified response and the prettified ground
//! truth.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::client::{ChatClient, ChatMessage, RequestOptions};
use crate::pretty;
use crate::records::Example;
use crate::sanitize::Sanitizer;

/// Outcome of a scoring run.
pub struct ScoreReport {
    pub matches: usize,
    pub total: usize,
}

impl ScoreReport {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.matches as f64 / self.total as f64
    }
}

/// Sanitize and prettify a model response. `None` means the response did not
/// contain parseable JSON and counts as a miss.
fn prettified_response(sanitizer: &Sanitizer, response: &str) -> Option<String> {
    let cleaned = sanitizer.clean(response);
    pretty::prettify(&cleaned).ok()
}

fn user_prompt(example: &Example, no_think: bool) -> String {
    if no_think {
        format!(
            "/no_think only output JSON. fix this JSON: {}",
            example.invalid_json
        )
    } else {
        format!("fix this JSON: {}", example.invalid_json)
    }
}

/// Score the model on `examples`. Ground truth that does not parse is a data
/// error and aborts the run; unparseable model responses only count as
/// misses.
pub async fn run(client: &ChatClient, examples: &[Example], no_think: bool) -> Result<ScoreReport> {
    let sanitizer = Sanitizer::new();
    let mut matches = 0usize;

    for (i, example) in examples.iter().enumerate() {
        let truth = pretty::prettify(&example.fixed_json)
            .with_context(|| format!("record {}: ground-truth fixed_json does not parse", i + 1))?;

        let messages = [ChatMessage::user(user_prompt(example, no_think))];
        let options = RequestOptions {
            temperature: Some(0.01),
            ..Default::default()
        };
        let response = client.complete(&messages, &options).await?;

        match prettified_response(&sanitizer, &response) {
            Some(answer) if answer == truth => matches += 1,
            Some(answer) => {
                warn!(
                    "Record {}: {} did not match ground truth: {}",
                    i + 1,
                    answer,
                    truth
                );
            }
            None => {
                warn!("Record {}: unparseable response: {}", i + 1, response);
            }
        }
    }

    let report = ScoreReport {
        matches,
        total: examples.len(),
    };
    info!(
        "Final score for test set: {:.4} ({}/{})",
        report.accuracy(),
        report.matches,
        report.total
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prettified_response_strips_wrappers() {
        let sanitizer = Sanitizer::new();
        let answer =
            prettified_response(&sanitizer, "<think>ok</think>```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(answer, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_prettified_response_rejects_prose() {
        let sanitizer = Sanitizer::new();
        assert!(prettified_response(&sanitizer, "I fixed it for you!").is_none());
    }

    #[test]
    fn test_match_against_ground_truth() {
        let sanitizer = Sanitizer::new();
        let truth = pretty::prettify(r#"{"a": 1, "b": [true, null]}"#).unwrap();
        let answer =
            prettified_response(&sanitizer, "```json\n{\"a\":1,\"b\":[true,null]}\n```").unwrap();
        assert_eq!(answer, truth);
    }

    #[test]
    fn test_no_think_prompt_prefix() {
        let example = Example {
            invalid_json: "{a: 1}".to_string(),
            fixed_json: r#"{"a": 1}"#.to_string(),
            fixed_reason: String::new(),
        };
        assert!(user_prompt(&example, true).starts_with("/no_think only output JSON."));
        assert!(user_prompt(&example, false).starts_with("fix this JSON:"));
    }

    #[test]
    fn test_accuracy() {
        let report = ScoreReport {
            matches: 3,
            total: 4,
        };
        assert_eq!(report.accuracy(), 0.75);

        let empty = ScoreReport {
            matches: 0,
            total: 0,
        };
        assert_eq!(empty.accuracy(), 0.0);
    }
}
