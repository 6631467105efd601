//! Filtering and visualization for the Indonesian higher-education dataset.
//!
//! The base set is loaded and prepared once ([`load_dataset`]), then every
//! view is derived from it: [`filter`] narrows it, [`charts`] aggregates it,
//! [`render`] draws the charts and [`export`] writes the table.

pub mod charts;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod models;
pub mod prepare;
pub mod render;

use error::Result;
use models::{Dataset, GeometryPolicy};
use std::path::Path;

/// Read and prepare the dataset file.
pub fn load_dataset(path: &Path, policy: GeometryPolicy) -> Result<Dataset> {
    let raw = loader::DatasetLoader::new().load_file(path)?;
    prepare::prepare(raw, policy)
}
