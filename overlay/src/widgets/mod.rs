//! Reusable UI widgets for overlays
//!
//! - [`ProgressBar`] - Horizontal metric bar with an overlaid label

mod progress_bar;

pub use progress_bar::ProgressBar;
