//! Utility functions shared by the matching algorithms

pub mod progress;

pub use progress::{create_main_progress_bar, finish_progress_bar};
