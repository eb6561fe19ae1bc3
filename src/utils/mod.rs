//! Utility functions and helpers

pub mod logging;

pub use logging::setup_logging;
