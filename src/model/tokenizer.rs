use std::path::Path;

use tokenizers::{PaddingParams, Tokenizer as HfTokenizer};

use super::ModelError;

const EOS_CANDIDATES: &[&str] = &["</s>", "<|endoftext|>", "<|end_of_text|>", "<|eot_id|>"];
const BOS_CANDIDATES: &[&str] = &["<s>", "<|begin_of_text|>", "<|endoftext|>"];

/// HuggingFace tokenizer with the special tokens the generator relies on.
pub struct StoryTokenizer {
    tokenizer: HfTokenizer,
    bos_token_id: Option<u32>,
    eos_token_id: Option<u32>,
}

impl StoryTokenizer {
    /// Load a `tokenizer.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let tokenizer = HfTokenizer::from_file(path)
            .map_err(|e| ModelError::LoadError(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self::new(tokenizer))
    }

    /// Wrap a tokenizer, padding with its end-of-sequence token.
    pub fn new(mut tokenizer: HfTokenizer) -> Self {
        let bos = find_token(&tokenizer, BOS_CANDIDATES);
        let eos = find_token(&tokenizer, EOS_CANDIDATES);

        if let Some((eos_id, eos_token)) = eos {
            tokenizer.with_padding(Some(PaddingParams {
                pad_id: eos_id,
                pad_token: eos_token.to_string(),
                ..Default::default()
            }));
        }

        Self {
            tokenizer,
            bos_token_id: bos.map(|(id, _)| id),
            eos_token_id: eos.map(|(id, _)| id),
        }
    }

    /// Encode text to token IDs, special tokens included
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Tokenization(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode token IDs back to text, skipping special tokens
    pub fn decode(&self, tokens: &[u32]) -> Result<String, ModelError> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| ModelError::Decoding(e.to_string()))
    }

    /// Beginning-of-sequence token, if the vocabulary has one
    pub fn bos_token_id(&self) -> Option<u32> {
        self.bos_token_id
    }

    /// End-of-sequence token, if the vocabulary has one
    pub fn eos_token_id(&self) -> Option<u32> {
        self.eos_token_id
    }

    pub fn pad_token_id(&self) -> Option<u32> {
        self.tokenizer.get_padding().map(|p| p.pad_id)
    }
}

fn find_token(
    tokenizer: &HfTokenizer,
    candidates: &[&'static str],
) -> Option<(u32, &'static str)> {
    candidates
        .iter()
        .find_map(|token| tokenizer.token_to_id(token).map(|id| (id, *token)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;

    /// Word-level tokenizer small enough to reason about in tests.
    pub(crate) const TEST_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": "<s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 1, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "<s>": 0, "</s>": 1, "[UNK]": 2, "once": 3, "upon": 4, "a": 5,
                "time": 6, "dragon": 7, "slept": 8, ".": 9, "the": 10, "moon": 11,
                "rose": 12, "story": 13, "about": 14, ":": 15
            },
            "unk_token": "[UNK]"
        }
    }"#;

    pub(crate) fn test_tokenizer() -> StoryTokenizer {
        StoryTokenizer::new(HfTokenizer::from_str(TEST_TOKENIZER).unwrap())
    }

    #[test]
    fn test_special_tokens() {
        let tokenizer = test_tokenizer();
        assert_eq!(tokenizer.bos_token_id(), Some(0));
        assert_eq!(tokenizer.eos_token_id(), Some(1));
    }

    #[test]
    fn test_padding_uses_eos() {
        let tokenizer = test_tokenizer();
        assert_eq!(tokenizer.pad_token_id(), tokenizer.eos_token_id());
    }

    #[test]
    fn test_basic_tokenization() {
        let tokenizer = test_tokenizer();
        let tokens = tokenizer.encode("once upon a time").unwrap();
        assert_eq!(tokens, vec![3, 4, 5, 6]);
        assert_eq!(tokenizer.encode("a griffin").unwrap(), vec![5, 2]);

        let decoded = tokenizer.decode(&[0, 7, 8, 9, 1]).unwrap();
        assert_eq!(decoded, "dragon slept .");
    }

    #[test]
    fn test_missing_file() {
        let result = StoryTokenizer::from_file("does/not/exist/tokenizer.json");
        assert!(matches!(result, Err(ModelError::LoadError(_))));
    }
}
