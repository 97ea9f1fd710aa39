//! Jsonmend - Train/eval/test partitioning

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::records::Example;

/// Fraction of the dataset held out for evaluation. The test split always
/// matches the eval split's size.
const EVAL_FRACTION: f64 = 0.05;

/// A partitioned dataset.
pub struct Split {
    pub train: Vec<Example>,
    pub eval: Vec<Example>,
    pub test: Vec<Example>,
}

/// Shuffle and partition. Eval takes 5% (floor), test takes the same count,
/// train takes the rest. Every record lands in exactly one split.
pub fn split_examples(mut examples: Vec<Example>, seed: Option<u64>) -> Split {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    examples.shuffle(&mut rng);

    let eval_len = (EVAL_FRACTION * examples.len() as f64) as usize;
    let mut rest = examples.split_off(eval_len);
    let eval = examples;

    let train = rest.split_off(eval.len().min(rest.len()));
    let test = rest;

    Split { train, eval, test }
}
