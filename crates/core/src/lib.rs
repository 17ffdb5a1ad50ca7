//! Core library: addon discovery, source and markup extraction, merging,
//! and the full-text index over the merged models.

pub mod catalog;
pub mod config;
pub mod error;
pub mod extractor;
pub mod indexer;
pub mod markup;
pub mod merger;
pub mod models;
pub mod pipeline;
pub mod python;
pub mod registry;
pub mod scanner;
pub mod search;
pub mod store;

pub use catalog::{rank_hits, Catalog, ModuleFilter};
pub use error::{ExtractError, MetaError};
pub use indexer::SearchIndex;
pub use registry::{LoadReport, ModuleRegistry};
pub use search::SearchHit;
