use candle_core::Device;
use rand::rngs::StdRng;
use tracing::{error, info};

use super::prompts::{story_prompt, IdeaTemplate};
use crate::config::{GenerationConfig, StorytellerConfig};
use crate::error::{Result, StorytellerError};
use crate::model::TextGenerator;
use crate::processing::{idea_from_output, story_fragment};

/// Generation facade: owns the loaded model and the two sampling profiles.
pub struct Storyteller<M> {
    model: M,
    device: Device,
    story_profile: GenerationConfig,
    idea_profile: GenerationConfig,
    rng: StdRng,
}

impl<M: TextGenerator> Storyteller<M> {
    pub(crate) fn new(model: M, device: Device, config: &StorytellerConfig, rng: StdRng) -> Self {
        Self {
            model,
            device,
            story_profile: config.story.clone(),
            idea_profile: config.idea.clone(),
            rng,
        }
    }

    /// Device the model was loaded on
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Number of openings produced per call
    pub fn story_count(&self) -> usize {
        self.story_profile.num_return_sequences
    }

    #[cfg(test)]
    pub(crate) fn model(&self) -> &M {
        &self.model
    }

    /// Generate a one- or two-sentence idea about `theme` from a randomly
    /// chosen template.
    ///
    /// Failures come back as a readable message instead of an error, so the
    /// caller can print whatever is returned.
    pub fn generate_story_idea(&mut self, theme: &str) -> String {
        let template = self.choose_idea_template();
        self.generate_story_idea_from(template, theme)
    }

    /// Draw the template for the next idea.
    pub fn choose_idea_template(&mut self) -> IdeaTemplate {
        IdeaTemplate::choose(&mut self.rng)
    }

    /// Like [`Storyteller::generate_story_idea`] with the template already chosen.
    pub fn generate_story_idea_from(&mut self, template: IdeaTemplate, theme: &str) -> String {
        match self.try_generate_idea(template, theme) {
            Ok(idea) => idea,
            Err(e) => {
                error!(error = %e, "Idea generation failed");
                format!("Could not generate an idea: {}", e)
            }
        }
    }

    /// Generate story openings about `theme`, optionally starting with
    /// `starting_phrase`. On failure the list holds one error message.
    pub fn generate_story_start(
        &mut self,
        theme: &str,
        starting_phrase: Option<&str>,
    ) -> Vec<String> {
        match self.try_generate_story_start(theme, starting_phrase) {
            Ok(fragments) => fragments,
            Err(e) => {
                error!(error = %e, "Story start generation failed");
                vec![format!("Could not generate the story opening: {}", e)]
            }
        }
    }

    /// Idea generation with the failure kept as an error.
    pub fn try_generate_idea(&mut self, template: IdeaTemplate, theme: &str) -> Result<String> {
        let prompt = template.render(theme);
        info!(%template, prompt = %prompt, "Generating idea");

        let profile = self.sized_profile(&self.idea_profile, &prompt)?;
        let decoded = self
            .model
            .generate(&prompt, &profile)?
            .into_iter()
            .next()
            .ok_or_else(|| StorytellerError::generation("the model returned no sequence"))?;

        let idea = idea_from_output(&decoded, &prompt);
        if idea.is_empty() {
            return Err(StorytellerError::generation("the model produced no text"));
        }
        Ok(idea)
    }

    /// Story start generation with the failure kept as an error.
    pub fn try_generate_story_start(
        &mut self,
        theme: &str,
        starting_phrase: Option<&str>,
    ) -> Result<Vec<String>> {
        let starting_phrase = starting_phrase.filter(|phrase| !phrase.is_empty());
        let prompt = story_prompt(theme, starting_phrase);
        info!(theme, starting_phrase = ?starting_phrase, "Generating story start");

        let profile = self.sized_profile(&self.story_profile, &prompt)?;
        let fragments: Vec<String> = self
            .model
            .generate(&prompt, &profile)?
            .iter()
            .map(|decoded| story_fragment(decoded, &prompt))
            .collect();

        if fragments.is_empty() {
            return Err(StorytellerError::generation("the model returned no sequence"));
        }
        Ok(fragments)
    }

    /// Per-call copy of `profile`: length bound from the prompt, special
    /// tokens from the tokenizer.
    fn sized_profile(&self, profile: &GenerationConfig, prompt: &str) -> Result<GenerationConfig> {
        let prompt_tokens = self.model.count_tokens(prompt)?;
        let (bos, eos) = self.model.special_tokens();
        Ok(profile
            .for_prompt(prompt_tokens)
            .with_special_tokens(bos, eos))
    }
}
