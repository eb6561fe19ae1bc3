use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use candle_core::Device;
use candle_nn::VarBuilder;
use candle_transformers::models::llama::{Llama, LlamaConfig};
use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use tracing::{info, warn};

use super::{ModelRuntime, StoryTokenizer, TextGenerator};
use crate::config::ModelConfig;
use crate::error::StorytellerError;

/// Which load attempt is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAttempt {
    Primary,
    /// Second and last chance after the primary attempt failed.
    Backup,
}

impl fmt::Display for LoadAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadAttempt::Primary => write!(f, "primary"),
            LoadAttempt::Backup => write!(f, "backup"),
        }
    }
}

/// Source of tokenizer + weights.
pub trait LoadModel {
    type Model: TextGenerator;

    fn load(
        &self,
        config: &ModelConfig,
        device: &Device,
        attempt: LoadAttempt,
    ) -> Result<Self::Model>;
}

/// Applies the load policy: one primary attempt, then exactly one backup.
pub struct ModelLoader {
    config: ModelConfig,
}

impl ModelLoader {
    /// Loader for the model described by `config`
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Load through `loader`, retrying once with a backup attempt.
    ///
    /// Returns a fatal `InitializationError` when both attempts fail.
    pub fn load<L: LoadModel>(
        &self,
        loader: &L,
        device: &Device,
    ) -> crate::error::Result<L::Model> {
        let model_id = &self.config.model_id;

        match loader.load(&self.config, device, LoadAttempt::Primary) {
            Ok(model) => {
                info!(model_id = %model_id, "Model loaded");
                Ok(model)
            }
            Err(primary) => {
                warn!(
                    model_id = %model_id,
                    error = %format!("{:#}", primary),
                    "Primary model load failed, trying backup"
                );
                match loader.load(&self.config, device, LoadAttempt::Backup) {
                    Ok(model) => {
                        info!(model_id = %model_id, "Backup load succeeded");
                        Ok(model)
                    }
                    Err(e) => Err(StorytellerError::InitializationError {
                        message: format!(
                            "backup model load failed: {:#}\n\
                             Make sure you are connected to the internet \
                             and that the model '{}' is available.",
                            e, model_id
                        ),
                        source: Some(e.into()),
                    }),
                }
            }
        }
    }
}

/// Loads Llama-family models from the Hugging Face hub.
///
/// The primary attempt reuses the local hub cache; the backup attempt
/// downloads every file again.
#[derive(Debug, Default, Clone)]
pub struct HubLoader;

impl HubLoader {
    fn fetch(repo: &ApiRepo, filename: &str, attempt: LoadAttempt) -> Result<PathBuf> {
        let path = match attempt {
            LoadAttempt::Primary => repo.get(filename),
            LoadAttempt::Backup => repo.download(filename),
        };
        path.with_context(|| format!("unable to fetch {} ({} attempt)", filename, attempt))
    }
}

impl LoadModel for HubLoader {
    type Model = ModelRuntime;

    fn load(
        &self,
        config: &ModelConfig,
        device: &Device,
        attempt: LoadAttempt,
    ) -> Result<ModelRuntime> {
        info!(model_id = %config.model_id, revision = %config.revision, %attempt, "Loading model");

        let api = ApiBuilder::new()
            .with_progress(true)
            .build()
            .context("unable to create huggingface api")?;
        let repo = api.repo(Repo::with_revision(
            config.model_id.clone(),
            RepoType::Model,
            config.revision.clone(),
        ));

        let tokenizer_path = Self::fetch(&repo, "tokenizer.json", attempt)?;
        let config_path = Self::fetch(&repo, "config.json", attempt)?;
        let weights_path = Self::fetch(&repo, "model.safetensors", attempt)?;

        let tokenizer = StoryTokenizer::from_file(&tokenizer_path)?;

        let llama_config: LlamaConfig = serde_json::from_slice(
            &std::fs::read(&config_path).context("unable to read config.json")?,
        )
        .context("invalid config.json")?;
        let llama_config = llama_config.into_config(config.use_flash_attn);

        let dtype = config.dtype_for(device)?;
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], dtype, device)? };
        let model = Llama::load(vb, &llama_config).context("unable to build model")?;

        Ok(ModelRuntime::new(
            model,
            llama_config,
            tokenizer,
            device.clone(),
            dtype,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::model::ModelError;
    use std::cell::RefCell;

    struct NullModel;

    impl TextGenerator for NullModel {
        fn count_tokens(&self, _text: &str) -> Result<usize, ModelError> {
            Ok(0)
        }

        fn generate(
            &mut self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<Vec<String>, ModelError> {
            Ok(Vec::new())
        }
    }

    /// Fails the first `failures` attempts.
    struct FlakyLoader {
        failures: usize,
        attempts: RefCell<Vec<LoadAttempt>>,
    }

    impl FlakyLoader {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                attempts: RefCell::new(Vec::new()),
            }
        }
    }

    impl LoadModel for FlakyLoader {
        type Model = NullModel;

        fn load(
            &self,
            _config: &ModelConfig,
            _device: &Device,
            attempt: LoadAttempt,
        ) -> Result<NullModel> {
            let mut attempts = self.attempts.borrow_mut();
            attempts.push(attempt);
            if attempts.len() <= self.failures {
                anyhow::bail!("connection refused");
            }
            Ok(NullModel)
        }
    }

    #[test]
    fn test_primary_success_loads_once() {
        let loader = FlakyLoader::new(0);
        let result = ModelLoader::new(ModelConfig::default()).load(&loader, &Device::Cpu);
        assert!(result.is_ok());
        assert_eq!(*loader.attempts.borrow(), vec![LoadAttempt::Primary]);
    }

    #[test]
    fn test_backup_after_primary_failure() {
        let loader = FlakyLoader::new(1);
        let result = ModelLoader::new(ModelConfig::default()).load(&loader, &Device::Cpu);
        assert!(result.is_ok());
        assert_eq!(
            *loader.attempts.borrow(),
            vec![LoadAttempt::Primary, LoadAttempt::Backup]
        );
    }

    #[test]
    fn test_double_failure_is_fatal() {
        let loader = FlakyLoader::new(usize::MAX);
        let error = match ModelLoader::new(ModelConfig::default()).load(&loader, &Device::Cpu) {
            Err(e) => e,
            Ok(_) => panic!("load should fail"),
        };

        assert!(error.is_fatal());
        assert_eq!(loader.attempts.borrow().len(), 2);
        let message = error.to_string();
        assert!(message.contains("connection refused"));
        assert!(message.contains("TinyLlama/TinyLlama-1.1B-Chat-v1.0"));
    }
}
