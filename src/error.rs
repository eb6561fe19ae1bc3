use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::model::ModelError;

pub type Result<T> = std::result::Result<T, StorytellerError>;

/// Errors surfaced by the storyteller.
#[derive(Debug)]
pub enum StorytellerError {
    /// Startup failed; the storyteller cannot run without its model.
    InitializationError {
        message: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    ConfigurationError {
        message: String,
        parameter: String,
    },
    /// A single generation call failed. Callers surface this inline.
    GenerationError {
        message: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    IoError(io::Error),
}

impl StorytellerError {
    pub(crate) fn generation(message: impl Into<String>) -> Self {
        StorytellerError::GenerationError {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the program has to stop because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StorytellerError::InitializationError { .. }
                | StorytellerError::ConfigurationError { .. }
        )
    }
}

impl fmt::Display for StorytellerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorytellerError::InitializationError { message, .. } => {
                write!(f, "Initialization error: {}", message)
            }
            StorytellerError::ConfigurationError { message, parameter } => {
                write!(f, "Configuration error for {}: {}", parameter, message)
            }
            StorytellerError::GenerationError { message, .. } => {
                write!(f, "{}", message)
            }
            StorytellerError::IoError(e) => write!(f, "Console I/O error: {}", e),
        }
    }
}

impl StdError for StorytellerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorytellerError::InitializationError { source, .. }
            | StorytellerError::GenerationError { source, .. } => source
                .as_ref()
                .map(|s| &**s as &(dyn StdError + 'static)),
            StorytellerError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for StorytellerError {
    fn from(e: ModelError) -> Self {
        StorytellerError::GenerationError {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

impl From<io::Error> for StorytellerError {
    fn from(e: io::Error) -> Self {
        StorytellerError::IoError(e)
    }
}
