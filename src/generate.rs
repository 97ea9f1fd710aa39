//! Jsonmend - Synthetic dataset generator
//!
//! Prompts a teacher model for batches of paired invalid/fixed JSON
//! examples, validates every pair, and checkpoints the growing dataset
//! after each round.

use std::path::Path;

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Deserialize;
use tracing::{info, warn};

use crate::client::{ChatClient, ChatMessage, RequestOptions};
use crate::pretty;
use crate::records::{self, Example};
use crate::sanitize::Sanitizer;

/// Attempts per batch before it counts as empty.
const BATCH_ATTEMPTS: usize = 3;
/// Consecutive all-empty rounds that abort the run.
const MAX_CONSECUTIVE_FAILURES: usize = 5;

/// Instruction prompt sent for every generation batch.
const GENERATOR_PROMPT: &str = r#"You are a data generator. Produce N examples of “invalid JSON” paired with the corrected “valid JSON”.

Output format (STRICT):
- Output must be ONLY a JSON array of objects. No prose.
- Each item must have:
  - "id" (string, unique like "ex001")
  - "invalid_json" (string; multi-line allowed)
  - "fixed_json" (string; multi-line; must be valid JSON)
  - "error_types" (array of strings)
  - "fixed_reason" (string; 1-2 sentences describing what was invalid and exactly what you changed)

Global rules:
- "fixed_json" must be formatted with 2-space indentation (pretty-printed).
- "invalid_json" MUST vary in formatting quality:
  - Sometimes nicely formatted
  - Often messy: single-line blobs, inconsistent indentation, random extra spaces, tabs, or awkward line breaks from rushed copy/paste
  - invalid_json indentation may be 0/1/3/4 spaces, tabs, or no indentation at all
- Each example must have 1-5 top-level keys.
- Keep booleans true/false, numbers, and null unquoted in the fixed JSON.
- Make fixes minimal: do not rename keys, reorder fields, or change meaning beyond validity (other than pretty-printing fixed_json).

Root-type preservation (IMPORTANT):
- The fixed_json MUST preserve the top-level JSON type of invalid_json.
  - If invalid_json begins with "[" (array), fixed_json MUST be an array (not wrapped in an object).
  - If invalid_json begins with "{" (object), fixed_json MUST be an object.
- Do not introduce wrapper keys like "items" unless the input already has them.

Apostrophe / punctuation realism mix (IMPORTANT):
- Prose-like strings must vary punctuation style across items:
  - Some examples use ASCII apostrophe ' (U+0027)
  - Some examples use curly apostrophe ’ (U+2019)
- Do not normalize punctuation in fixed_json; preserve exactly what appears in invalid_json (except required JSON escaping).
- Across each run of N=5:
  - At least 2 items must contain an ASCII apostrophe ' somewhere in invalid_json.
  - At least 1 item must contain a curly apostrophe ’ somewhere in invalid_json.
- In code/config/log-ish strings (paths, identifiers, env names, JSON-like fragments), prefer ASCII ' if any apostrophe appears.

Domains / content variety (IMPORTANT):
- The dataset must be diverse. Do NOT assume telemetry/logging only.
- Mix examples across domains, including:
  - speech/audio/video transcriptions (prose-like paragraphs, dialogue, filler words, timestamps)
  - meeting notes / summaries
  - metadata for media (title, speakers, chapters)
  - simple configs
  - occasional “system-ish” payloads (but not the majority)
- Many string values should be prose-like and long (sentences, punctuation, quotes, newlines).

Error types:
- Use one or more of:
  - "newline"
  - "quotes"
  - "backslash"
  - "unquoted_key"
  - "unquoted_value"
  - "comma"            (consecutive commas, trailing commas, or missing values in arrays)
  - "extra_brace"      (extra/mismatched braces/brackets)
  - "comment"          (// or /* */ comments)
  - "nonfinite_number" (NaN, Infinity, -Infinity)
- Each item's "error_types" must accurately reflect what is present in invalid_json.

IMPORTANT for "newline":
- When using the "newline" error type, the invalid_json MUST contain a literal line break inside a quoted string value (not an escaped "\n").
- The fixed_json MUST replace those literal line breaks with the two-character escape sequence "\n" inside the string.
- Do not remove content or join lines with spaces; preserve the exact text with "\n" inserted.

Guidance for "comment" cases (IMPORTANT):
- invalid_json may contain single-line (// ...) or block (/* ... */) comments.
- fixed_json MUST remove comments entirely (do not convert comments into new keys/fields).
- Do not add fields to preserve comment text; removing the comment is the minimal fix.

Guidance for "nonfinite_number" cases (IMPORTANT):
- JSON does not allow NaN, Infinity, or -Infinity as numbers.
- If invalid_json uses NaN/Infinity/-Infinity as unquoted values, fixed_json MUST preserve intent by converting them to strings:
  - NaN → "NaN"
  - Infinity → "Infinity"
  - -Infinity → "-Infinity"
- Do not replace them with null unless the invalid_json already implies null explicitly.

Comma / missing-value handling (IMPORTANT):
- JSON does not allow “empty elements” in arrays.
- Treat any missing value between separators as a "comma" error, even if whitespace/newlines appear between commas.
- A comma that appears where a value is expected (e.g., a comma-only “element line”) MUST be removed, and the surrounding commas adjusted so the array remains valid.
- Do not convert the comma into a value, and do not keep a standalone comma as an “item”.

Concrete examples of the kinds of fixes you must generate:

A) Newline inside a string (invalid) → escape with "\n" (fixed)
Invalid:
{"a":"this is one line
another line"}
Fixed:
{
  "a": "this is one line\nanother line"
}

B) Quotes inside a string (invalid) → escape as \" (fixed)
Invalid:
{"a":"this is invalid "because" of the quotes"}
Fixed:
{
  "a": "this is invalid \"because\" of the quotes"
}

C) Windows path backslashes (invalid) → double backslashes (fixed)
Invalid:
{ "path":"C:\Users\roger\Downloads\file.txt" }
Fixed:
{
  "path": "C:\\Users\\roger\\Downloads\\file.txt"
}

D) Unquoted keys (invalid) → quote keys (fixed)
Invalid:
{ a: "hello" }
Fixed:
{
  "a": "hello"
}

E) Unquoted string values (invalid) → quote those values (fixed)
Invalid:
{"env":prod,"owner":roger,"ok":true,"retries":3}
Fixed:
{
  "env": "prod",
  "owner": "roger",
  "ok": true,
  "retries": 3
}

F) Consecutive or trailing commas example
Invalid (consecutive + trailing):
{
"items": [1, "cat",, "dog",]
}
Fixed (pretty-printed, excess commas removed):
{
  "items": [
    1,
    "cat",
    "dog"
  ]
}

G) Non-finite numbers example (NaN/Infinity)
Invalid:
{"expiresInSec": Infinity, "latencyMs": NaN}
Fixed:
{
  "expiresInSec": "Infinity",
  "latencyMs": "NaN"
}

H) Comments example
Invalid:
{
  "ip": "203.0.113.42", // forwarded from edge
  "ok": true
}
Fixed:
{
  "ip": "203.0.113.42",
  "ok": true
}

Guidance for unquoted_value cases (IMPORTANT):
- Barewords are ambiguous (could be intended string, boolean, null, or number).
- Use these rules:
  - If the token is exactly true/false/null → keep it unquoted.
  - If it is a valid JSON number literal → keep it unquoted.
  - If it is exactly NaN/Infinity/-Infinity → treat as nonfinite_number and quote it as a string.
  - Otherwise, treat it as a string and quote it.

Large-payload requirement:
- Generate N=5 items each run.
- EXACTLY 2 of the 5 items must be “large payloads”.
- A “large payload” means:
  - still only 1-5 top-level keys
  - but within those keys, include deep nesting and/or arrays totaling at least ~120 lines when pretty-printed in fixed_json (2-space indentation).
  - Large payloads should often be transcription-like (e.g., chapters array, speaker segments, long text blocks).
  - The invalid_json for large items should contain only 1-3 issues (surgical fix), not dozens, to discourage over-editing.
  - The invalid_json for large items should often be messy (partially pretty-printed, uneven indentation, or long lines).

Mix requirements for each run (N=5):
- Exactly 2 large payloads.
- The remaining 3 are small/medium payloads, with variety across domains.
- Across the 5 items, include at least 4 different error types overall.
- At least 3 of the 5 items should contain 2+ error types in the same example.
- At least 2 of the 5 items should include nested objects AND arrays (both).

Minimal-change guidance:
- Only apply the minimum edits needed to make valid JSON.
- Do not normalize content or “clean up” prose.
- Do not reorder keys, rename keys, or add/remove fields unless required to correct JSON validity.
- Preserve punctuation, capitalization, and wording exactly (except for required escaping/quoting/backslashes or removing comments).
- fixed_json should be pretty-printed, but invalid_json may be messy.

fixed_reason guidance:
- Be specific about what changed, e.g.:
  - “Escaped literal newlines inside the transcript text using \n and escaped inner quotes with \".”
  - “Quoted previously unquoted object keys and added quotes around bareword string values while leaving booleans/numbers unchanged.”
  - “Escaped a Windows path by doubling backslashes and pretty-printed the corrected JSON.”
  - “Removed JSON comments and converted non-finite numbers (NaN/Infinity) into strings.”

Now generate N=5.
Return ONLY the JSON array of objects.
"#;

/// One item of the teacher model's output array. Fields we do not keep
/// (`id`, `error_types`) are ignored by serde.
#[derive(Debug, Deserialize)]
struct GeneratedItem {
    invalid_json: String,
    fixed_json: String,
    #[serde(default)]
    fixed_reason: String,
}

/// Run parameters for a generation session.
pub struct GeneratorSettings {
    /// Stop once this many validated examples exist.
    pub target: usize,
    /// Concurrent batch requests per round.
    pub workers: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            target: 1000,
            workers: 2,
        }
    }
}

/// Parse a raw teacher response into validated examples. Items whose
/// `fixed_json` does not survive the validity check are dropped.
fn parse_batch(sanitizer: &Sanitizer, response: &str) -> Result<Vec<Example>> {
    let cleaned = sanitizer.clean(response);
    let items: Vec<GeneratedItem> = serde_json::from_str(&cleaned)
        .with_context(|| "Teacher response was not a JSON array of examples")?;

    let mut batch = Vec::with_capacity(items.len());
    for item in items {
        if !pretty::is_valid(&item.fixed_json) {
            warn!("Dropping generated item: fixed_json is not valid JSON");
            continue;
        }
        batch.push(Example {
            invalid_json: item.invalid_json,
            fixed_json: item.fixed_json,
            fixed_reason: item.fixed_reason,
        });
    }

    Ok(batch)
}

async fn try_generate(client: &ChatClient, sanitizer: &Sanitizer) -> Result<Vec<Example>> {
    let messages = [ChatMessage::user(GENERATOR_PROMPT)];
    let options = RequestOptions {
        temperature: Some(1.0),
        max_completion_tokens: Some(8192),
        reasoning_effort: Some("low".to_string()),
    };

    let response = client.complete(&messages, &options).await?;
    parse_batch(sanitizer, &response)
}

/// Request one batch, retrying up to [`BATCH_ATTEMPTS`] times. Exhausted
/// attempts yield an empty batch; the caller decides when repeated empties
/// mean the run should stop.
async fn generate_batch(client: &ChatClient, sanitizer: &Sanitizer) -> Vec<Example> {
    for attempt in 1..=BATCH_ATTEMPTS {
        match try_generate(client, sanitizer).await {
            Ok(batch) => return batch,
            Err(e) => warn!("Generation attempt {}/{} failed: {}", attempt, BATCH_ATTEMPTS, e),
        }
    }
    Vec::new()
}

/// Run generation rounds until the target count is reached or the endpoint
/// keeps returning nothing. The accumulated set is rewritten to `output`
/// after every round.
pub async fn run(
    client: &ChatClient,
    output: &Path,
    settings: &GeneratorSettings,
) -> Result<Vec<Example>> {
    let sanitizer = Sanitizer::new();
    let mut results: Vec<Example> = Vec::new();
    let mut consecutive_failures = 0usize;

    while results.len() < settings.target {
        info!("Number of examples: {}", results.len());

        let batches =
            join_all((0..settings.workers).map(|_| generate_batch(client, &sanitizer))).await;

        let mut round_found = false;
        for batch in batches {
            if !batch.is_empty() {
                round_found = true;
                results.extend(batch);
            }
        }

        if round_found {
            consecutive_failures = 0;
        } else {
            consecutive_failures += 1;
            warn!(
                "Empty generation round ({}/{})",
                consecutive_failures, MAX_CONSECUTIVE_FAILURES
            );
            if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                warn!("Stopping: repeated generation failures");
                break;
            }
        }

        records::write_jsonl(output, &results)?;
    }

    records::write_jsonl(output, &results)?;
    info!(
        "Generated {} examples, written to {}",
        results.len(),
        output.display()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_with_fence_and_think_block() {
        let sanitizer = Sanitizer::new();
        let response = concat!(
            "<think>drafting examples</think>\n",
            "```json\n",
            r#"[{"id": "ex001", "invalid_json": "{a: 1}", "fixed_json": "{\"a\": 1}", "error_types": ["unquoted_key"], "fixed_reason": "Quoted the key."}]"#,
            "\n```"
        );

        let batch = parse_batch(&sanitizer, response).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].invalid_json, "{a: 1}");
        assert_eq!(batch[0].fixed_json, "{\"a\": 1}");
        assert_eq!(batch[0].fixed_reason, "Quoted the key.");
    }

    #[test]
    fn test_parse_batch_drops_invalid_fixed_json() {
        let sanitizer = Sanitizer::new();
        let response = r#"[
            {"id": "ex001", "invalid_json": "{a: 1}", "fixed_json": "{\"a\": 1}", "error_types": [], "fixed_reason": "ok"},
            {"id": "ex002", "invalid_json": "{b: 2}", "fixed_json": "{b: 2}", "error_types": [], "fixed_reason": "still broken"}
        ]"#;

        let batch = parse_batch(&sanitizer, response).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].invalid_json, "{a: 1}");
    }

    #[test]
    fn test_parse_batch_rejects_prose() {
        let sanitizer = Sanitizer::new();
        assert!(parse_batch(&sanitizer, "Sorry, I cannot generate that.").is_err());
    }

    #[test]
    fn test_prompt_requests_strict_array_output() {
        assert!(GENERATOR_PROMPT.contains("ONLY a JSON array"));
        assert!(GENERATOR_PROMPT.contains("\"fixed_json\""));
        assert!(GENERATOR_PROMPT.contains("nonfinite_number"));
    }
}
