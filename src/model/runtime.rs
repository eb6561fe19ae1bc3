use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaEosToks};
use tracing::{debug, info};

use super::{ModelError, StoryTokenizer, TextGenerator};
use crate::config::GenerationConfig;

/// A loaded Llama-family model ready for sampling.
pub struct ModelRuntime {
    model: Llama,
    config: Config,
    tokenizer: StoryTokenizer,
    device: Device,
    dtype: DType,
}

impl ModelRuntime {
    /// Wrap a loaded model; `dtype` must match the one the weights were loaded with.
    pub fn new(
        model: Llama,
        config: Config,
        tokenizer: StoryTokenizer,
        device: Device,
        dtype: DType,
    ) -> Self {
        Self {
            model,
            config,
            tokenizer,
            device,
            dtype,
        }
    }

    /// Sample one sequence; returns prompt and generated ids together.
    fn sample_sequence(
        &self,
        prompt_ids: &[u32],
        generation: &GenerationConfig,
        seed: u64,
    ) -> Result<Vec<u32>, ModelError> {
        let mut cache = Cache::new(true, self.dtype, &self.config, &self.device)?;
        let mut logits_processor = LogitsProcessor::from_sampling(seed, generation.sampling());
        let max_length = generation
            .max_length
            .min(self.config.max_position_embeddings);

        let mut tokens = prompt_ids.to_vec();
        let mut index_pos = 0;

        while tokens.len() < max_length {
            let context_size = if index_pos > 0 { 1 } else { tokens.len() };
            let ctxt = &tokens[tokens.len() - context_size..];
            let input = Tensor::new(ctxt, &self.device)?.unsqueeze(0)?;

            let logits = self.model.forward(&input, index_pos, &mut cache)?;
            let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;

            let logits = if generation.repetition_penalty == 1.0 {
                logits
            } else {
                let start_at = generation.repeat_penalty_start(tokens.len());
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    generation.repetition_penalty,
                    &tokens[start_at..],
                )?
            };
            index_pos += ctxt.len();

            let next_token = logits_processor.sample(&logits)?;
            tokens.push(next_token);

            if self.is_eos(next_token, generation) {
                break;
            }
        }

        Ok(tokens)
    }

    fn is_eos(&self, token: u32, generation: &GenerationConfig) -> bool {
        if generation.eos_token_id == Some(token) {
            return true;
        }
        match &self.config.eos_token_id {
            Some(LlamaEosToks::Single(id)) => *id == token,
            Some(LlamaEosToks::Multiple(ids)) => ids.contains(&token),
            None => false,
        }
    }

    /// Prompt text followed by the decoded continuation.
    fn render(
        &self,
        prompt: &str,
        prompt_ids: &[u32],
        tokens: &[u32],
    ) -> Result<String, ModelError> {
        let decoded_prompt = self.tokenizer.decode(prompt_ids)?;
        let full = self.tokenizer.decode(tokens)?;

        // Decoding the whole sequence keeps word boundaries intact; fall back to
        // the generated ids alone when the prompt does not round-trip.
        let continuation = match full.strip_prefix(decoded_prompt.as_str()) {
            Some(rest) => rest.to_string(),
            None => self.tokenizer.decode(&tokens[prompt_ids.len()..])?,
        };
        Ok(format!("{}{}", prompt, continuation))
    }
}

impl TextGenerator for ModelRuntime {
    fn count_tokens(&self, text: &str) -> Result<usize, ModelError> {
        Ok(self.tokenizer.encode(text)?.len())
    }

    fn generate(
        &mut self,
        prompt: &str,
        generation: &GenerationConfig,
    ) -> Result<Vec<String>, ModelError> {
        let prompt_ids = self.tokenizer.encode(prompt)?;
        if prompt_ids.is_empty() {
            return Err(ModelError::Tokenization(
                "prompt produced no tokens".to_string(),
            ));
        }

        let seed = generation.seed.unwrap_or_else(rand::random);
        debug!(
            prompt_tokens = prompt_ids.len(),
            max_length = generation.max_length,
            temperature = generation.temperature,
            top_p = ?generation.top_p,
            top_k = ?generation.top_k,
            repetition_penalty = generation.repetition_penalty,
            sequences = generation.num_return_sequences,
            seed,
            "Sampling"
        );

        let start_time = std::time::Instant::now();
        let mut outputs = Vec::with_capacity(generation.num_return_sequences);
        let mut generated_tokens = 0;

        for i in 0..generation.num_return_sequences {
            let seed = seed.wrapping_add(i as u64);
            let tokens = self.sample_sequence(&prompt_ids, generation, seed)?;
            generated_tokens += tokens.len() - prompt_ids.len();
            outputs.push(self.render(prompt, &prompt_ids, &tokens)?);
        }

        info!(
            sequences = outputs.len(),
            generated_tokens,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Generation finished"
        );
        Ok(outputs)
    }

    fn special_tokens(&self) -> (Option<u32>, Option<u32>) {
        (self.tokenizer.bos_token_id(), self.tokenizer.eos_token_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tokenizer::tests::test_tokenizer;
    use candle_nn::VarBuilder;
    use candle_transformers::models::llama::LlamaConfig;

    const TINY_LLAMA: &str = r#"{
        "hidden_size": 8,
        "intermediate_size": 16,
        "vocab_size": 16,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "num_key_value_heads": 2,
        "rms_norm_eps": 1e-5,
        "rope_theta": 10000.0,
        "max_position_embeddings": 32,
        "bos_token_id": 0,
        "eos_token_id": 1,
        "tie_word_embeddings": false
    }"#;

    /// A one-layer model with all-zero weights: every token is equally likely.
    fn create_test_runtime() -> ModelRuntime {
        let device = Device::Cpu;
        let config: LlamaConfig = serde_json::from_str(TINY_LLAMA).unwrap();
        let config = config.into_config(false);
        let vb = VarBuilder::zeros(DType::F32, &device);
        let model = Llama::load(vb, &config).unwrap();
        ModelRuntime::new(model, config, test_tokenizer(), device, DType::F32)
    }

    fn test_profile() -> GenerationConfig {
        GenerationConfig {
            max_new_tokens: 6,
            num_return_sequences: 2,
            seed: Some(42),
            ..GenerationConfig::story()
        }
    }

    #[test]
    fn test_count_tokens() {
        let runtime = create_test_runtime();
        assert_eq!(runtime.count_tokens("once upon a time").unwrap(), 4);
    }

    #[test]
    fn test_generate_returns_each_sequence() {
        let mut runtime = create_test_runtime();
        let prompt = "once upon a time";
        let generation = test_profile().for_prompt(runtime.count_tokens(prompt).unwrap());

        let outputs = runtime.generate(prompt, &generation).unwrap();
        assert_eq!(outputs.len(), 2);
        for output in &outputs {
            assert!(output.starts_with(prompt));
        }
    }

    #[test]
    fn test_length_is_clamped_to_model_positions() {
        let runtime = create_test_runtime();
        let prompt_ids = runtime.tokenizer.encode("the moon rose").unwrap();
        let generation = GenerationConfig {
            max_length: 10_000,
            eos_token_id: None,
            ..test_profile()
        };

        let tokens = runtime.sample_sequence(&prompt_ids, &generation, 7).unwrap();
        assert!(tokens.len() <= 32);
        assert_eq!(&tokens[..3], prompt_ids.as_slice());
    }

    #[test]
    fn test_eos_detection() {
        let runtime = create_test_runtime();
        let generation = GenerationConfig {
            eos_token_id: Some(9),
            ..test_profile()
        };
        assert!(runtime.is_eos(9, &generation));
        // Model config declares token 1 as end of sequence.
        assert!(runtime.is_eos(1, &generation));
        assert!(!runtime.is_eos(5, &generation));
    }

    #[test]
    fn test_render_keeps_original_prompt_text() {
        let runtime = create_test_runtime();
        // "griffin" is outside the vocabulary and decodes as "[UNK]".
        let prompt = "a griffin";
        let prompt_ids = runtime.tokenizer.encode(prompt).unwrap();
        assert_eq!(prompt_ids, vec![5, 2]);

        let rendered = runtime.render(prompt, &prompt_ids, &[5, 2, 7, 8]).unwrap();
        assert_eq!(rendered, "a griffin dragon slept");
    }

    #[test]
    fn test_render_decodes_generated_ids_when_prefix_differs() {
        let runtime = create_test_runtime();
        // The full decode ("the moon dragon slept") does not start with the
        // decoded prompt, so only the ids after the prompt are decoded.
        let rendered = runtime.render("once upon", &[3, 4], &[10, 11, 7, 8]).unwrap();
        assert_eq!(rendered, "once upondragon slept");
    }

    #[test]
    fn test_special_tokens_come_from_tokenizer() {
        let runtime = create_test_runtime();
        assert_eq!(runtime.special_tokens(), (Some(0), Some(1)));
    }
}
