//! # Titlemask Trainer
//!
//! Drives a [`titlemask_core::Engine`] in training mode over a dataset of
//! release titles and persists the learned frequencies and mask usage.

pub mod data;
pub mod trainer;

pub use data::{DatasetFormat, load_titles, read_csv_titles, read_line_titles};
pub use trainer::{Trainer, TrainingReport};
