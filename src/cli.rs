//! Interactive console menu.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::engine::{Storyteller, StorytellerBuilder};
use crate::error::Result;
use crate::gpu::device_label;
use crate::model::{LoadModel, TextGenerator};

const SEPARATOR_WIDTH: usize = 40;

/// One entry of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Idea,
    StoryStart,
    Exit,
}

impl MenuChoice {
    /// Parse a raw input line; `None` for anything but 1, 2 or 3.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Idea),
            "2" => Some(MenuChoice::StoryStart),
            "3" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

/// A theme is usable when it has something besides whitespace.
pub fn validate_theme(theme: &str) -> Option<&str> {
    let theme = theme.trim();
    (!theme.is_empty()).then_some(theme)
}

/// Build the storyteller and run the menu until the user leaves.
///
/// Load failures are returned before anything is written to `output`.
pub fn launch<L, R, W>(
    builder: StorytellerBuilder,
    loader: &L,
    input: R,
    mut output: W,
) -> Result<()>
where
    L: LoadModel,
    R: BufRead,
    W: Write,
{
    let mut teller = builder.build(loader)?;
    writeln!(
        output,
        "✅ Model ready on {}.",
        device_label(teller.device())
    )?;
    run_interactive(&mut teller, input, output)?;
    Ok(())
}

/// Menu loop. Returns when the user picks exit or input runs out.
pub fn run_interactive<M, R, W>(
    teller: &mut Storyteller<M>,
    mut input: R,
    mut output: W,
) -> io::Result<()>
where
    M: TextGenerator,
    R: BufRead,
    W: Write,
{
    loop {
        writeln!(output, "\n--- CHOOSE YOUR STORY ADVENTURE ---")?;
        writeln!(output, "1. Generate a story **idea** (character, scenario, conflict)")?;
        writeln!(output, "2. Generate the **opening** of a story (a paragraph or more)")?;
        writeln!(output, "3. Leave the storyteller")?;

        let prompt = "👉 What would you like to do? (1/2/3): ";
        let Some(choice) = read_line(&mut input, &mut output, prompt)? else {
            return Ok(());
        };

        match MenuChoice::parse(&choice) {
            Some(MenuChoice::Idea) => {
                let Some(raw_theme) = read_line(
                    &mut input,
                    &mut output,
                    "🌟 Idea theme (e.g. 'a journey through time', 'a supernatural detective'): ",
                )?
                else {
                    return Ok(());
                };
                let Some(theme) = validate_theme(&raw_theme) else {
                    reject_theme(&mut output)?;
                    continue;
                };

                let template = teller.choose_idea_template();
                writeln!(output, "\n🧠 Generating idea: '{}'", template.render(theme))?;
                let idea = teller.generate_story_idea_from(template, theme);
                writeln!(output, "\n💡 GENERATED IDEA:\n{}", idea)?;
                writeln!(output, "{}", "═".repeat(SEPARATOR_WIDTH))?;
            }
            Some(MenuChoice::StoryStart) => {
                let Some(raw_theme) = read_line(
                    &mut input,
                    &mut output,
                    "📚 Story theme (e.g. 'the last colony on Mars', 'a kingdom of shadows'): ",
                )?
                else {
                    return Ok(());
                };
                let Some(theme) = validate_theme(&raw_theme) else {
                    reject_theme(&mut output)?;
                    continue;
                };
                let starting_phrase = read_line(
                    &mut input,
                    &mut output,
                    "✍️ Opening phrase (optional, leave empty to let the model choose): ",
                )?
                .unwrap_or_default();
                let starting_phrase = starting_phrase.trim();

                writeln!(output, "\n✍️ Generating story openings about '{}'...", theme)?;
                if !starting_phrase.is_empty() {
                    writeln!(output, "   (starting with: '{}')", starting_phrase)?;
                }
                let starts = teller.generate_story_start(theme, Some(starting_phrase));

                writeln!(output, "\n📖 GENERATED STORY OPENINGS:")?;
                for (i, start) in starts.iter().enumerate() {
                    writeln!(output, "--- OPTION {} ---", i + 1)?;
                    writeln!(output, "{}", start)?;
                    writeln!(output, "{}", "-".repeat(15))?;
                }
                writeln!(output, "{}", "═".repeat(SEPARATOR_WIDTH))?;
            }
            Some(MenuChoice::Exit) => {
                writeln!(output, "\n✨ The story universe awaits! Goodbye and happy writing!")?;
                return Ok(());
            }
            None => {
                warn!(choice = %choice.trim(), "Invalid menu choice");
                writeln!(output, "🚫 Invalid option. Please choose 1, 2 or 3.")?;
            }
        }
    }
}

fn reject_theme<W: Write>(output: &mut W) -> io::Result<()> {
    warn!("Empty theme rejected");
    writeln!(output, "⚠️ Please enter a valid theme.")
}

/// Print `prompt` and read one line without its line ending; `None` at end
/// of input.
fn read_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> io::Result<Option<String>> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\n', '\r'].as_slice()).len();
    line.truncate(trimmed);
    Ok(Some(line))
}
