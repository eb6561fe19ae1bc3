use candle_core::{DType, Device};
use candle_transformers::generation::Sampling;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorytellerError};

/// Top-level configuration. Missing sections fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorytellerConfig {
    pub model: ModelConfig,
    /// Profile for story openings.
    pub story: GenerationConfig,
    /// Override profile for short ideas.
    pub idea: GenerationConfig,
    pub logging: LoggingConfig,
}

/// Which pretrained model to load and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Hugging Face hub identifier of the model repository
    pub model_id: String,

    /// Repository revision (branch, tag or commit)
    pub revision: String,

    /// Weight dtype ("f32", "f16" or "bf16"); derived from the device when unset
    pub dtype: Option<String>,

    /// Whether to use flash attention
    pub use_flash_attn: bool,

    /// Skip accelerator detection and run on the CPU
    pub force_cpu: bool,
}

/// Sampling parameters for one kind of generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Total length bound, prompt included
    pub max_length: usize,

    /// Tokens added on top of the prompt length for each call
    pub max_new_tokens: usize,

    pub do_sample: bool,

    /// Temperature for sampling
    pub temperature: f64,

    /// Top-p sampling threshold
    pub top_p: Option<f64>,

    /// Top-k sampling
    pub top_k: Option<usize>,

    /// Repetition penalty, 1.0 disables it
    pub repetition_penalty: f32,

    /// Number of trailing tokens the repetition penalty looks at; the
    /// default covers the whole sequence, prompt included
    pub repeat_last_n: usize,

    pub num_return_sequences: usize,

    pub pad_token_id: Option<u32>,
    pub bos_token_id: Option<u32>,
    pub eos_token_id: Option<u32>,

    /// Fixed sampling seed; a random one is drawn per call when unset
    pub seed: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Append logs to this file instead of stderr
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for StorytellerConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            story: GenerationConfig::story(),
            idea: GenerationConfig::idea(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
            revision: "main".to_string(),
            dtype: None,
            use_flash_attn: false,
            force_cpu: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            file_path: None,
        }
    }
}

impl ModelConfig {
    /// Resolve the weight dtype for the selected device.
    pub fn dtype_for(&self, device: &Device) -> Result<DType> {
        match self.dtype.as_deref() {
            Some("f32") => Ok(DType::F32),
            Some("f16") => Ok(DType::F16),
            Some("bf16") => Ok(DType::BF16),
            Some(other) => Err(StorytellerError::ConfigurationError {
                message: format!("unsupported dtype '{}'", other),
                parameter: "dtype".to_string(),
            }),
            None if device.is_cpu() => Ok(DType::F32),
            None => Ok(DType::F16),
        }
    }
}

impl GenerationConfig {
    /// Profile used for story openings.
    pub fn story() -> Self {
        Self {
            max_length: 300,
            max_new_tokens: 250,
            do_sample: true,
            temperature: 1.0,
            top_p: Some(0.95),
            top_k: Some(50),
            repetition_penalty: 1.2,
            repeat_last_n: usize::MAX,
            num_return_sequences: 3,
            pad_token_id: None,
            bos_token_id: None,
            eos_token_id: None,
            seed: None,
        }
    }

    /// Moderate-temperature profile used for short ideas.
    pub fn idea() -> Self {
        Self {
            max_length: 60,
            max_new_tokens: 60,
            temperature: 0.8,
            repetition_penalty: 1.0,
            num_return_sequences: 1,
            ..Self::story()
        }
    }

    /// Copy of this profile sized for a prompt of `prompt_tokens` tokens.
    pub fn for_prompt(&self, prompt_tokens: usize) -> Self {
        Self {
            max_length: prompt_tokens + self.max_new_tokens,
            ..self.clone()
        }
    }

    /// Copy of this profile with the tokenizer's special tokens filled in.
    /// Padding always uses the end-of-sequence token.
    pub fn with_special_tokens(&self, bos: Option<u32>, eos: Option<u32>) -> Self {
        Self {
            pad_token_id: eos,
            bos_token_id: bos,
            eos_token_id: eos,
            ..self.clone()
        }
    }

    /// Index of the first token the repetition penalty applies to, for a
    /// sequence of `len` tokens.
    pub fn repeat_penalty_start(&self, len: usize) -> usize {
        len.saturating_sub(self.repeat_last_n)
    }

    /// Sampling mode for candle's `LogitsProcessor`.
    pub fn sampling(&self) -> Sampling {
        let temperature = self.temperature;
        if !self.do_sample || temperature <= 0.0 {
            return Sampling::ArgMax;
        }
        match (self.top_k, self.top_p) {
            (None, None) => Sampling::All { temperature },
            (Some(k), None) => Sampling::TopK { k, temperature },
            (None, Some(p)) => Sampling::TopP { p, temperature },
            (Some(k), Some(p)) => Sampling::TopKThenTopP { k, p, temperature },
        }
    }

    fn validate(&self, profile: &str) -> Result<()> {
        let invalid = |message: &str, field: &str| StorytellerError::ConfigurationError {
            message: message.to_string(),
            parameter: format!("{}.{}", profile, field),
        };

        if self.temperature < 0.0 {
            return Err(invalid("Temperature cannot be negative", "temperature"));
        }
        if let Some(p) = self.top_p {
            if !(p > 0.0 && p <= 1.0) {
                return Err(invalid("Top-p must be in (0, 1]", "top_p"));
            }
        }
        if self.top_k == Some(0) {
            return Err(invalid("Top-k must be at least 1", "top_k"));
        }
        if self.repetition_penalty <= 0.0 {
            return Err(invalid(
                "Repetition penalty must be positive",
                "repetition_penalty",
            ));
        }
        if self.num_return_sequences == 0 {
            return Err(invalid(
                "At least one sequence must be returned",
                "num_return_sequences",
            ));
        }
        if self.max_new_tokens == 0 {
            return Err(invalid("Token budget cannot be zero", "max_new_tokens"));
        }
        Ok(())
    }
}

impl StorytellerConfig {
    /// Check every section; the first invalid value is reported.
    pub fn validate(&self) -> Result<()> {
        if self.model.model_id.trim().is_empty() {
            return Err(StorytellerError::ConfigurationError {
                message: "Model identifier cannot be empty".to_string(),
                parameter: "model_id".to_string(),
            });
        }
        // Rejects unknown names; the device only matters when none is given.
        self.model.dtype_for(&Device::Cpu)?;

        self.story.validate("story")?;
        self.idea.validate("idea")?;
        Ok(())
    }
}
