//! Text post-processing for generated ideas and story openings

mod text;

pub use text::{
    idea_from_output, split_sentences, story_fragment, strip_idea_header, strip_prompt,
    strip_story_header,
};
