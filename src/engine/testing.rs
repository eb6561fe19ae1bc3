//! In-memory models and loaders for tests.

use std::cell::RefCell;

use candle_core::Device;

use crate::config::{GenerationConfig, ModelConfig};
use crate::model::{LoadAttempt, LoadModel, ModelError, TextGenerator};

/// Replies to every prompt with the prompt followed by the scripted
/// continuations, one per requested sequence (cycling when short).
pub(crate) struct ScriptedModel {
    continuations: Vec<String>,
    calls: Vec<(String, GenerationConfig)>,
}

impl ScriptedModel {
    pub(crate) fn new(continuations: &[&str]) -> Self {
        Self {
            continuations: continuations.iter().map(|c| c.to_string()).collect(),
            calls: Vec::new(),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.calls.iter().map(|(prompt, _)| prompt.clone()).collect()
    }

    pub(crate) fn configs(&self) -> Vec<GenerationConfig> {
        self.calls.iter().map(|(_, config)| config.clone()).collect()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.len()
    }
}

impl TextGenerator for ScriptedModel {
    fn count_tokens(&self, text: &str) -> Result<usize, ModelError> {
        Ok(text.split_whitespace().count())
    }

    fn generate(
        &mut self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Vec<String>, ModelError> {
        self.calls.push((prompt.to_string(), config.clone()));
        Ok(self
            .continuations
            .iter()
            .cycle()
            .take(config.num_return_sequences)
            .map(|continuation| format!("{}{}", prompt, continuation))
            .collect())
    }

    fn special_tokens(&self) -> (Option<u32>, Option<u32>) {
        (Some(0), Some(1))
    }
}

pub(crate) struct FailingModel;

impl TextGenerator for FailingModel {
    fn count_tokens(&self, text: &str) -> Result<usize, ModelError> {
        Ok(text.len())
    }

    fn generate(
        &mut self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<Vec<String>, ModelError> {
        Err(ModelError::Decoding("out of memory".to_string()))
    }
}

/// Hands out a `ScriptedModel` after failing the first `failures` attempts.
pub(crate) struct ScriptedLoader {
    failures: usize,
    continuations: Vec<String>,
    attempts: RefCell<Vec<LoadAttempt>>,
}

impl ScriptedLoader {
    pub(crate) fn new(failures: usize, continuations: &[&str]) -> Self {
        Self {
            failures,
            continuations: continuations.iter().map(|c| c.to_string()).collect(),
            attempts: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn attempts(&self) -> Vec<LoadAttempt> {
        self.attempts.borrow().clone()
    }
}

impl LoadModel for ScriptedLoader {
    type Model = ScriptedModel;

    fn load(
        &self,
        config: &ModelConfig,
        _device: &Device,
        attempt: LoadAttempt,
    ) -> anyhow::Result<ScriptedModel> {
        let mut attempts = self.attempts.borrow_mut();
        attempts.push(attempt);
        if attempts.len() <= self.failures {
            anyhow::bail!("repository {} not found", config.model_id);
        }
        let continuations: Vec<&str> = self.continuations.iter().map(String::as_str).collect();
        Ok(ScriptedModel::new(&continuations))
    }
}
