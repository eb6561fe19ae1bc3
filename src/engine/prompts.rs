use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

/// The three ways of asking the model for a story idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeaTemplate {
    Character,
    Scenario,
    Conflict,
}

impl IdeaTemplate {
    pub const ALL: [IdeaTemplate; 3] = [
        IdeaTemplate::Character,
        IdeaTemplate::Scenario,
        IdeaTemplate::Conflict,
    ];

    /// Pick one template uniformly at random.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&IdeaTemplate::Character)
    }

    /// The prompt for `theme`.
    pub fn render(&self, theme: &str) -> String {
        match self {
            IdeaTemplate::Character => {
                format!("Describe a mysterious character for a story about {}:", theme)
            }
            IdeaTemplate::Scenario => {
                format!("Propose an unusual scenario for a story about {}:", theme)
            }
            IdeaTemplate::Conflict => format!(
                "An original idea for the main conflict in a story about {}:",
                theme
            ),
        }
    }
}

impl fmt::Display for IdeaTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdeaTemplate::Character => write!(f, "character"),
            IdeaTemplate::Scenario => write!(f, "scenario"),
            IdeaTemplate::Conflict => write!(f, "conflict"),
        }
    }
}

/// Prompt asking for a story opening, optionally seeded with a phrase.
pub fn story_prompt(theme: &str, starting_phrase: Option<&str>) -> String {
    match starting_phrase {
        Some(phrase) => format!(
            "Write a detailed opening for a story about {}, starting with the phrase: '{}'\n",
            theme, phrase
        ),
        None => format!("Write a detailed opening for a story about {}:\n", theme),
    }
}
