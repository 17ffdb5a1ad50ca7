use crate::config::AppConfig;
use crate::error::MetaError;
use crate::indexer::SearchIndex;
use crate::registry::{LoadReport, ModuleRegistry};
use crate::scanner;
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineSummary {
    pub models: usize,
    pub indexed: Option<usize>,
    pub index_path: Option<PathBuf>,
    pub report: LoadReport,
}

/// Registry over the configured roots with the configured exclusion globs.
pub fn build_registry(config: &AppConfig) -> anyhow::Result<ModuleRegistry> {
    let roots = config.addon_roots();
    if roots.is_empty() {
        return Err(MetaError::Configuration("no addon paths configured".to_string()).into());
    }
    let excludes = scanner::build_globset(&config.paths.exclude).context("exclude globs")?;
    Ok(ModuleRegistry::with_excludes(roots, excludes)?)
}

/// Load every module, then rebuild the index when indexing is enabled.
pub fn run_index(config: &AppConfig) -> anyhow::Result<(ModuleRegistry, PipelineSummary)> {
    let mut registry = build_registry(config)?;

    info!("Starting load phase...");
    let report = registry.load_all();
    let mut summary = PipelineSummary {
        models: registry.store().len(),
        report,
        ..Default::default()
    };

    if config.indexing.enabled {
        info!("Starting index phase...");
        let index = SearchIndex::new(config.index_path());
        let count = index
            .build(registry.store().models())
            .with_context(|| format!("building index at {:?}", index.path()))?;
        summary.indexed = Some(count);
        summary.index_path = Some(index.path().to_path_buf());
    }
    Ok((registry, summary))
}
