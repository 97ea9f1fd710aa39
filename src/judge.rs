//! Jsonmend - LLM-as-judge dataset filtering
//!
//! Compares each invalid/fixed pair and keeps only examples where the fix
//! changed nothing but what validity required. Runs after deduplication.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::client::{ChatClient, ChatMessage, RequestOptions};
use crate::dedup;
use crate::records::Example;
use crate::sanitize::Sanitizer;

/// Attempts per example before falling back to a low verdict.
const EVAL_ATTEMPTS: usize = 3;

/// Fidelity rubric sent as the system prompt for every judged pair.
const JUDGE_PROMPT: &str = r#"ROLE:
You are a dataset evaluator.

We are fine-tuning a small language model to be able to take invalid JSON and produce a valid version of the JSON.

This includes the following:
- fixing all keys and values to adhere to JSON spec. this includes adding quotes and fixing values in various ways such as adding proper escape characters.
- prettifying the incoming JSON payload

TASK:
We have synthetically generated the dataset. What you need to do now is to compare the invalid JSON with the fixed JSON and see whether the fixed JSON maintains the accuracy and fidelity of key-value pairs. This means that keys must not be changed in their names and values must not be changed unless it is to add proper escape sequences or the value is a semantic substitute for null/undefined values.

Notes:
- If invalid JSON contains Infinity and fixed contains "Infinity" (wrapped with quotes) then that is intentional.
- NaN must be wrapped in quotes: "NaN"
- Be mindful about keys in the invalid JSON payload with leading or trailing spaces, that may be intentional, and should be left alone.
- Consecutive commas in arrays for invalid JSON should be removed in the fixed. Not replaced with null or undefined.

We want to only keep the data for training if you deem them to be high quality.

OUTPUT:
Output a JSON which contains the evaluation result of the data example. If the quality is low, then please provide reasoning. If the quality is high, then just state the quality meets standards for the reasoning.

DO NOT include anything else other than the JSON representation of your evaluation!

{
  "result": "<high|low>",
  "reason": "<1-2 sentences describing why the quality is low>"
}


EXAMPLE 1:
Invalid JSON:
{"hello": "world", b: "hahahaa
blah blah
"}

Fixed JSON:
{
  "hello": "world",
  "b": "hahahaa\nblah blah\n"
}

Output:
{
  "result": "high",
  "reason": "The data example meets quality standards."
}

EXAMPLE 2:
Invalid JSON:
{
  "message": "He said, "Hello!"",
  "path": "C:\Users\John"
}

Fixed JSON:
{
  "message": "He said, \"Hello!\"",
  "path": "C:\\Users\\Jon"
}

Output:
{
  "result": "low",
  "reason": "The original value for path had the sub-string \"John\", while the fixed result contains \"Jon\". This will result in the trained model emitting incorrect results."
}
"#;

/// Judge's rating for one example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Low,
}

/// Parsed judge response.
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    pub result: Quality,
    #[serde(default)]
    pub reason: String,
}

/// Partitioned output of a judging run.
pub struct JudgeOutcome {
    pub accepted: Vec<Example>,
    pub rejected: Vec<Example>,
}

fn parse_verdict(sanitizer: &Sanitizer, response: &str) -> Result<Verdict> {
    let cleaned = sanitizer.clean(response);
    serde_json::from_str(&cleaned).with_context(|| "Judge response was not a verdict JSON")
}

async fn try_eval(
    client: &ChatClient,
    sanitizer: &Sanitizer,
    example: &Example,
) -> Result<Verdict> {
    let user_prompt = format!(
        "Invalid JSON:\n{}\n\nFixed JSON:\n{}\n",
        example.invalid_json, example.fixed_json
    );
    let messages = [
        ChatMessage::system(JUDGE_PROMPT),
        ChatMessage::user(user_prompt),
    ];
    let options = RequestOptions {
        reasoning_effort: Some("medium".to_string()),
        ..Default::default()
    };

    let response = client.complete(&messages, &options).await?;
    parse_verdict(sanitizer, &response)
}

/// Evaluate one example, retrying up to [`EVAL_ATTEMPTS`] times. Exhausted
/// attempts yield a low verdict so an unjudgeable example is never kept.
async fn eval_example(client: &ChatClient, sanitizer: &Sanitizer, example: &Example) -> Verdict {
    for attempt in 1..=EVAL_ATTEMPTS {
        match try_eval(client, sanitizer, example).await {
            Ok(verdict) => return verdict,
            Err(e) => warn!("Judge attempt {}/{} failed: {}", attempt, EVAL_ATTEMPTS, e),
        }
    }

    warn!("Couldn't evaluate example: {}", example.invalid_json);
    Verdict {
        result: Quality::Low,
        reason: "Could not evaluate example.".to_string(),
    }
}

/// Deduplicate, then judge every surviving example.
pub async fn run(client: &ChatClient, examples: Vec<Example>) -> JudgeOutcome {
    let before = examples.len();
    let (unique, report) = dedup::dedup(examples);
    info!("Dedup: {}", report.summary());
    if unique.len() < before {
        info!("Dataset examples after deduplication: {}", unique.len());
    }

    let sanitizer = Sanitizer::new();
    let total = unique.len();
    let mut accepted = Vec::with_capacity(total);
    let mut rejected = Vec::new();

    for example in unique {
        let verdict = eval_example(client, &sanitizer, &example).await;
        match verdict.result {
            Quality::High => accepted.push(example),
            Quality::Low => {
                warn!(
                    "Low-quality example rejected: {} ({})",
                    example.invalid_json, verdict.reason
                );
                rejected.push(example);
            }
        }
    }

    info!("Kept {} of {} examples after judging", accepted.len(), total);
    JudgeOutcome { accepted, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_high_verdict() {
        let sanitizer = Sanitizer::new();
        let verdict = parse_verdict(
            &sanitizer,
            r#"{"result": "high", "reason": "The data example meets quality standards."}"#,
        )
        .unwrap();
        assert_eq!(verdict.result, Quality::High);
    }

    #[test]
    fn test_parse_low_verdict_with_fence() {
        let sanitizer = Sanitizer::new();
        let verdict = parse_verdict(
            &sanitizer,
            "```json\n{\"result\": \"low\", \"reason\": \"Value was altered.\"}\n```",
        )
        .unwrap();
        assert_eq!(verdict.result, Quality::Low);
        assert_eq!(verdict.reason, "Value was altered.");
    }

    #[test]
    fn test_parse_verdict_rejects_prose() {
        let sanitizer = Sanitizer::new();
        assert!(parse_verdict(&sanitizer, "looks good to me").is_err());
    }

    #[test]
    fn test_parse_verdict_rejects_unknown_rating() {
        let sanitizer = Sanitizer::new();
        assert!(parse_verdict(&sanitizer, r#"{"result": "medium", "reason": ""}"#).is_err());
    }

    #[test]
    fn test_judge_prompt_demands_bare_json() {
        assert!(JUDGE_PROMPT.contains("DO NOT include anything else"));
        assert!(JUDGE_PROMPT.contains("\"result\": \"<high|low>\""));
    }
}
