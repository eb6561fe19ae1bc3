//! Engine module providing the story generation facade

mod builder;
mod prompts;
mod storyteller;
#[cfg(test)]
pub(crate) mod testing;

pub use builder::StorytellerBuilder;
pub use prompts::{story_prompt, IdeaTemplate};
pub use storyteller::Storyteller;
