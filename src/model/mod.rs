//! Model module: loading the pretrained model and running sampling-based decode

mod loader;
mod runtime;
mod tokenizer;

pub use loader::{HubLoader, LoadAttempt, LoadModel, ModelLoader};
pub use runtime::ModelRuntime;
pub use tokenizer::StoryTokenizer;

use crate::config::GenerationConfig;

/// Error type for model-related operations
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to load model: {0}")]
    LoadError(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Decoding failed: {0}")]
    Decoding(String),

    #[error("Tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// A loaded tokenizer + language model pair that can continue a prompt.
pub trait TextGenerator {
    /// Number of tokens the model sees for `text`.
    fn count_tokens(&self, text: &str) -> Result<usize, ModelError>;

    /// Sample `config.num_return_sequences` continuations of `prompt`.
    ///
    /// Each returned string is the decoded full sequence: the prompt followed
    /// by the generated continuation, special tokens skipped.
    fn generate(
        &mut self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Vec<String>, ModelError>;

    /// Beginning- and end-of-sequence token ids, when the tokenizer has them.
    fn special_tokens(&self) -> (Option<u32>, Option<u32>) {
        (None, None)
    }
}
