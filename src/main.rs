//! Jsonmend - CLI for the JSON-repair fine-tuning pipeline
//!
//! One subcommand per pipeline phase: generate a synthetic dataset from a
//! teacher model, judge its fidelity, split it, convert it to chat
//! transcripts, and score the fine-tuned model on the held-out set.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jsonmend::client::ChatClient;
use jsonmend::config::{Endpoint, TrainingConfig};
use jsonmend::convert;
use jsonmend::generate::{self, GeneratorSettings};
use jsonmend::judge;
use jsonmend::pretty;
use jsonmend::records::{self, Corpus, Example};
use jsonmend::score;
use jsonmend::split;

/// Jsonmend - dataset pipeline for fine-tuning small LLMs to repair malformed JSON
#[derive(FromArgs)]
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Pretty(PrettyArgs),
    Generate(GenerateArgs),
    Judge(JudgeArgs),
    Split(SplitArgs),
    Convert(ConvertArgs),
    Score(ScoreArgs),
}

/// pretty-print a JSON document, expanding embedded JSON strings
#[derive(FromArgs)]
#[argh(subcommand, name = "pretty")]
struct PrettyArgs {
    /// input file, or "-" for stdin
    #[argh(positional)]
    input: String,
}

/// generate synthetic invalid/fixed JSON pairs from a teacher model
#[derive(FromArgs)]
#[argh(subcommand, name = "generate")]
struct GenerateArgs {
    /// output JSONL file
    #[argh(option, short = 'o', default = "String::from(\"data.jsonl\")")]
    output: String,

    /// stop once this many examples exist
    #[argh(option, default = "1000")]
    target: usize,

    /// concurrent batch requests per round
    #[argh(option, default = "2")]
    workers: usize,

    /// teacher model name
    #[argh(option, default = "String::from(\"gpt-oss-20b\")")]
    model: String,

    /// endpoint base URL (overrides env)
    #[argh(option)]
    base_url: Option<String>,

    /// endpoint API key (overrides env)
    #[argh(option)]
    api_key: Option<String>,
}

/// judge dataset fidelity and keep high-quality examples
#[derive(FromArgs)]
#[argh(subcommand, name = "judge")]
struct JudgeArgs {
    /// input dataset JSONL file
    #[argh(positional)]
    input: String,

    /// output file for accepted examples
    #[argh(option, short = 'o', default = "String::from(\"dataset_filtered.jsonl\")")]
    output: String,

    /// also write rejected examples to this file
    #[argh(option)]
    rejected: Option<String>,

    /// judge model name
    #[argh(option, default = "String::from(\"gpt-5.2\")")]
    model: String,

    /// endpoint base URL (overrides env)
    #[argh(option)]
    base_url: Option<String>,

    /// endpoint API key (overrides env)
    #[argh(option)]
    api_key: Option<String>,
}

/// shuffle and partition a dataset into train/eval/test files
#[derive(FromArgs)]
#[argh(subcommand, name = "split")]
struct SplitArgs {
    /// input dataset JSONL file
    #[argh(positional)]
    input: String,

    /// directory for the three output files
    #[argh(option, short = 'o', default = "String::from(\"dataset\")")]
    out_dir: String,

    /// shuffle seed for reproducible splits
    #[argh(option)]
    seed: Option<u64>,
}

/// convert dataset examples into two-turn chat transcripts
#[derive(FromArgs)]
#[argh(subcommand, name = "convert")]
struct ConvertArgs {
    /// input dataset JSONL file
    #[argh(positional)]
    input: String,

    /// output conversations JSONL file
    #[argh(option, short = 'o', default = "String::from(\"conversations.jsonl\")")]
    output: String,

    /// also write the training hyperparameter block to this path
    #[argh(option)]
    emit_config: Option<String>,
}

/// score a fine-tuned model on held-out examples
#[derive(FromArgs)]
#[argh(subcommand, name = "score")]
struct ScoreArgs {
    /// held-out test dataset JSONL file
    #[argh(positional)]
    input: String,

    /// fine-tuned model name
    #[argh(option, default = "String::from(\"Qwen3-0.6B-finetuned\")")]
    model: String,

    /// prepend the /no_think instruction (for non-fine-tuned base models)
    #[argh(switch)]
    no_think: bool,

    /// endpoint base URL (overrides env)
    #[argh(option)]
    base_url: Option<String>,

    /// endpoint API key (overrides env)
    #[argh(option)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Args = argh::from_env();

    match args.command {
        Command::Pretty(cmd) => run_pretty(cmd),
        Command::Generate(cmd) => run_generate(cmd).await,
        Command::Judge(cmd) => run_judge(cmd).await,
        Command::Split(cmd) => run_split(cmd),
        Command::Convert(cmd) => run_convert(cmd),
        Command::Score(cmd) => run_score(cmd).await,
    }
}

fn run_pretty(cmd: PrettyArgs) -> Result<()> {
    let text = if cmd.input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut buffer)
            .with_context(|| "Failed to read from stdin")?;
        buffer
    } else {
        fs::read_to_string(&cmd.input)
            .with_context(|| format!("Failed to read input file: {}", cmd.input))?
    };

    let pretty = pretty::prettify(&text)?;
    println!("{}", pretty);
    Ok(())
}

async fn run_generate(cmd: GenerateArgs) -> Result<()> {
    let endpoint = Endpoint::resolve(cmd.base_url, cmd.api_key, cmd.model);
    let client = ChatClient::new(endpoint)?;
    let settings = GeneratorSettings {
        target: cmd.target,
        workers: cmd.workers,
    };

    generate::run(&client, Path::new(&cmd.output), &settings).await?;
    Ok(())
}

async fn run_judge(cmd: JudgeArgs) -> Result<()> {
    let examples = load_examples(&cmd.input)?;
    info!("Got {} training examples", examples.len());

    let endpoint = Endpoint::resolve(cmd.base_url, cmd.api_key, cmd.model);
    let client = ChatClient::new(endpoint)?;

    let outcome = judge::run(&client, examples).await;
    records::write_jsonl(&cmd.output, &outcome.accepted)?;
    info!(
        "Wrote {} accepted examples to {}",
        outcome.accepted.len(),
        cmd.output
    );

    if let Some(rejected_path) = cmd.rejected {
        records::write_jsonl(&rejected_path, &outcome.rejected)?;
        info!(
            "Wrote {} rejected examples to {}",
            outcome.rejected.len(),
            rejected_path
        );
    }

    Ok(())
}

fn run_split(cmd: SplitArgs) -> Result<()> {
    let examples = load_examples(&cmd.input)?;
    let total = examples.len();
    let split = split::split_examples(examples, cmd.seed);

    let out_dir = PathBuf::from(&cmd.out_dir);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    records::write_jsonl(out_dir.join("train_data.jsonl"), &split.train)?;
    records::write_jsonl(out_dir.join("eval_data.jsonl"), &split.eval)?;
    records::write_jsonl(out_dir.join("test_data.jsonl"), &split.test)?;

    info!(
        "Split {} examples: {} train / {} eval / {} test",
        total,
        split.train.len(),
        split.eval.len(),
        split.test.len()
    );
    Ok(())
}

fn run_convert(cmd: ConvertArgs) -> Result<()> {
    let examples = load_examples(&cmd.input)?;
    let conversations = convert::convert_all(&examples)?;
    records::write_jsonl(&cmd.output, &conversations)?;
    info!(
        "Wrote {} conversations to {}",
        conversations.len(),
        cmd.output
    );

    if let Some(config_path) = cmd.emit_config {
        let config = TrainingConfig::default();
        let json = serde_json::to_string_pretty(&config)?;
        fs::write(&config_path, json)
            .with_context(|| format!("Failed to write training config: {}", config_path))?;
        info!("Wrote training config to {}", config_path);
    }

    Ok(())
}

async fn run_score(cmd: ScoreArgs) -> Result<()> {
    let examples = load_examples(&cmd.input)?;
    let endpoint = Endpoint::resolve(cmd.base_url, cmd.api_key, cmd.model);
    let client = ChatClient::new(endpoint)?;

    let report = score::run(&client, &examples, cmd.no_think).await?;
    println!(
        "Final score for test set: {:.4} ({}/{})",
        report.accuracy(),
        report.matches,
        report.total
    );
    Ok(())
}

fn load_examples(path: &str) -> Result<Vec<Example>> {
    let corpus = Corpus::open(path)?;
    info!(
        "Loaded {} lines ({}) from {}",
        corpus.line_count(),
        corpus.size_human(),
        corpus.path
    );
    corpus.examples()
}
