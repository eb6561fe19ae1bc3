//! Storyteller - story ideas and story openings from a pretrained language model
//!
//! This crate wraps a Llama-family causal language model (loaded through
//! candle from the Hugging Face hub) behind a small facade that turns a theme
//! into a short story idea or a handful of story openings, plus the
//! interactive menu that drives it.

// Public modules
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod model;
pub mod processing;
pub mod utils;

// Version information
/// Crate version, shown in the startup banner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-exports for public API
pub use config::{GenerationConfig, ModelConfig, StorytellerConfig};
pub use engine::{Storyteller, StorytellerBuilder};
pub use error::{Result, StorytellerError};
pub use model::{HubLoader, LoadModel, ModelRuntime, TextGenerator};
