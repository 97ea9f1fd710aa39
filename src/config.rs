//! Jsonmend - Endpoint and training configuration
//!
//! Endpoint settings resolve environment variables first and let CLI options
//! win. The training block is the hyperparameter contract handed to the
//! external SFT trainer; nothing in this crate executes it.

use std::env;

use serde::{Deserialize, Serialize};

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Endpoint {
    /// Resolve endpoint settings: explicit CLI values win, then
    /// `JSONMEND_BASE_URL`/`JSONMEND_API_KEY`, then the conventional
    /// `OPENAI_*` names, then local-server defaults.
    pub fn resolve(base_url: Option<String>, api_key: Option<String>, model: String) -> Self {
        let base_url = base_url
            .or_else(|| env_fallback("JSONMEND_BASE_URL", "OPENAI_BASE_URL"))
            .unwrap_or_else(|| "http://127.0.0.1:8000/v1".to_string());
        let api_key = api_key
            .or_else(|| env_fallback("JSONMEND_API_KEY", "OPENAI_API_KEY"))
            .unwrap_or_else(|| "none".to_string());

        Self {
            base_url,
            api_key,
            model,
        }
    }
}

fn env_fallback(primary: &str, secondary: &str) -> Option<String> {
    env::var(primary).ok().or_else(|| env::var(secondary).ok())
}

/// LoRA adapter hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoraConfig {
    pub rank: u32,
    pub alpha: u32,
    pub dropout: f64,
    pub target_modules: Vec<String>,
}

/// Supervised fine-tuning loop hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainParams {
    pub eval_accumulation_steps: u32,
    pub eval_steps: u32,
    pub gradient_accumulation_steps: u32,
    pub learning_rate: f64,
    pub learning_rate_scheduler_type: String,
    pub logging_steps: u32,
    pub max_length: u32,
    pub num_train_epochs: u32,
    pub output_dir: String,
    pub per_device_eval_batch_size: u32,
    pub per_device_train_batch_size: u32,
    pub save_steps: u32,
    pub warmup_ratio: f64,
}

/// The full hyperparameter block consumed by the external trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub lora: LoraConfig,
    pub train: TrainParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            lora: LoraConfig {
                rank: 32,
                alpha: 32,
                dropout: 0.0,
                target_modules: [
                    "q_proj", "k_proj", "v_proj", "o_proj", "gate_proj", "up_proj", "down_proj",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            },
            train: TrainParams {
                eval_accumulation_steps: 1,
                eval_steps: 100,
                gradient_accumulation_steps: 4,
                learning_rate: 2.5e-5,
                learning_rate_scheduler_type: "cosine".to_string(),
                logging_steps: 4,
                max_length: 2048,
                num_train_epochs: 6,
                output_dir: "checkpoints".to_string(),
                per_device_eval_batch_size: 1,
                per_device_train_batch_size: 1,
                save_steps: 100,
                warmup_ratio: 0.05,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_values_win() {
        let endpoint = Endpoint::resolve(
            Some("http://10.0.0.5:8000/v1".to_string()),
            Some("secret".to_string()),
            "gpt-oss-20b".to_string(),
        );
        assert_eq!(endpoint.base_url, "http://10.0.0.5:8000/v1");
        assert_eq!(endpoint.api_key, "secret");
        assert_eq!(endpoint.model, "gpt-oss-20b");
    }

    #[test]
    fn test_training_config_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.lora.rank, 32);
        assert_eq!(config.lora.target_modules.len(), 7);
        assert_eq!(config.train.num_train_epochs, 6);
        assert_eq!(config.train.learning_rate_scheduler_type, "cosine");

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"q_proj\""));
        assert!(json.contains("\"warmup_ratio\": 0.05"));
    }
}
