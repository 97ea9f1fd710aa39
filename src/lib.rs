//! Jsonmend — synthetic-data pipeline for teaching small causal LMs to
//! repair malformed JSON.
//!
//! Three phases share a handful of text utilities:
//!
//! - **Generate** (`generate`) — prompt a teacher model for paired
//!   invalid/fixed JSON examples and validate every pair.
//! - **Judge** (`judge`) — deduplicate, then keep only pairs whose fix
//!   changed nothing but what validity required.
//! - **Train prep & scoring** (`split`, `convert`, `score`) — partition the
//!   accepted set, emit chat transcripts for the external SFT trainer, and
//!   measure exact-match accuracy of the fine-tuned model.
//!
//! The shared core is `pretty`: a recursive pretty-printer that expands
//! JSON accidentally encoded as string values, plus the `sanitize` cleaner
//! for raw model output.

pub mod client;
pub mod config;
pub mod convert;
pub mod dedup;
pub mod generate;
pub mod judge;
pub mod pretty;
pub mod records;
pub mod sanitize;
pub mod score;
pub mod split;
