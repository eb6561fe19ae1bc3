//! Post-processing of decoded model output into readable fragments.
//!
//! Every function here is pure string manipulation and can be tested without
//! a model.

use lazy_static::lazy_static;
use regex::Regex;

const TERMINAL_PUNCTUATION: &[char] = &['.', '?', '!'];
const ELLIPSIS: &str = "...";

lazy_static! {
    static ref SENTENCE_END: Regex = Regex::new(r"[.?!]\s+").unwrap();
    static ref IDEA_HEADER: Regex = Regex::new(
        r"(?i)^(?:[0-9]+\.?\s*)?(?:The character is:|The scenario is:|The setting is:|The conflict is:|An idea is:)\s*"
    )
    .unwrap();
    static ref STORY_HEADER: Regex =
        Regex::new(r"(?im)^(?:Write a detailed opening for a story about .*?:)?\s*").unwrap();
}

/// Remove the first occurrence of `prompt` and trim.
pub fn strip_prompt(text: &str, prompt: &str) -> String {
    if prompt.is_empty() {
        return text.trim().to_string();
    }
    text.replacen(prompt, "", 1).trim().to_string()
}

/// Drop a boilerplate lead-in such as "2. The conflict is:".
pub fn strip_idea_header(text: &str) -> String {
    IDEA_HEADER.replace(text, "").trim().to_string()
}

/// Drop echoed instructions and blank lines at the start of every line.
pub fn strip_story_header(text: &str) -> String {
    STORY_HEADER.replace_all(text, "").trim().to_string()
}

/// Split on sentence-ending punctuation followed by whitespace.
///
/// The punctuation stays with its sentence and the whitespace is dropped.
/// Text without a boundary comes back as a single element.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_END.find_iter(text) {
        // The punctuation mark is a single ASCII byte.
        sentences.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    sentences.push(&text[start..]);
    sentences
}

/// Turn a decoded idea continuation into at most two sentences.
pub fn idea_from_output(decoded: &str, prompt: &str) -> String {
    let idea = strip_idea_header(&strip_prompt(decoded, prompt));
    let sentences = split_sentences(&idea);

    if sentences.len() >= 2 && !sentences[0].trim().is_empty() && !sentences[1].trim().is_empty()
    {
        sentences[..2].join(" ").trim().to_string()
    } else {
        idea.lines().next().unwrap_or_default().trim().to_string()
    }
}

/// Turn one decoded story continuation into a fragment of up to three
/// sentences, marking cut-off text with an ellipsis.
///
/// An unfinished third sentence also gets the ellipsis, so "A. B. C" becomes
/// "A. B. C...".
pub fn story_fragment(decoded: &str, prompt: &str) -> String {
    let story_start = strip_story_header(&strip_prompt(decoded, prompt));
    let sentences = split_sentences(&story_start);
    let present = |i: usize| sentences.get(i).map_or(false, |s| !s.trim().is_empty());

    if present(0) && present(1) && present(2) {
        let mut fragment = sentences[..3].join(" ").trim().to_string();
        // A fragment always ends in terminal punctuation or an ellipsis: a
        // fourth sentence was cut, or the third one is an unfinished tail.
        if present(3) || !fragment.ends_with(TERMINAL_PUNCTUATION) {
            fragment.push_str(ELLIPSIS);
        }
        fragment
    } else if present(0) {
        format!("{}{}", sentences[0].trim(), ELLIPSIS)
    } else if !story_start.trim().is_empty() {
        format!("{}{}", story_start.trim(), ELLIPSIS)
    } else {
        ELLIPSIS.to_string()
    }
}
