//! Command bodies. Each returns the JSON document the binary prints.

use addon_meta_core::catalog::{rank_hits, Catalog, ModuleFilter};
use addon_meta_core::config::AppConfig;
use addon_meta_core::indexer::SearchIndex;
use addon_meta_core::pipeline;
use anyhow::Result;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelPart {
    Fields,
    Views,
    Actions,
    Menus,
}

/// Addon roots inside an Odoo source checkout.
pub fn odoo_roots(odoo_path: &Path) -> Vec<PathBuf> {
    vec![odoo_path.join("addons"), odoo_path.join("odoo").join("addons")]
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn with_overrides(mut cfg: AppConfig, odoo_path: Option<&Path>, output: Option<&Path>) -> AppConfig {
    if let Some(path) = odoo_path {
        cfg.paths.addon_paths = odoo_roots(path)
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }
    if let Some(dir) = output {
        cfg.indexing.path = dir.to_string_lossy().into_owned();
        cfg.indexing.enabled = true;
    }
    cfg
}

pub fn index(cfg: &AppConfig) -> Result<Value> {
    let (_, summary) = pipeline::run_index(cfg)?;
    Ok(json!({
        "status": "ok",
        "summary": serde_json::to_value(&summary)?,
    }))
}

pub fn search(cfg: &AppConfig, query: &str, fields: &[String]) -> Result<Value> {
    let index = SearchIndex::new(cfg.index_path());
    let restrict = (!fields.is_empty()).then_some(fields);
    let hits = rank_hits(index.query(query, restrict));
    Ok(serde_json::to_value(hits)?)
}

pub fn modules(cfg: &AppConfig, filter: ModuleFilter) -> Result<Value> {
    let mut catalog = open_catalog(cfg)?;
    Ok(json!(catalog.list_modules(filter)))
}

pub fn models(cfg: &AppConfig, module: Option<&str>) -> Result<Value> {
    let mut catalog = open_catalog(cfg)?;
    if module.is_none() {
        catalog.registry_mut().load_all();
    }
    Ok(json!(catalog.model_keys(module)))
}

pub fn model(cfg: &AppConfig, name: &str, part: Option<ModelPart>) -> Result<Value> {
    let mut catalog = open_catalog(cfg)?;
    let Some(found) = catalog.find_model(name, true) else {
        return Ok(json!({ "error": "Model not found", "model": name }));
    };
    let value = match part {
        None => serde_json::to_value(found)?,
        Some(ModelPart::Fields) => serde_json::to_value(&found.fields)?,
        Some(ModelPart::Views) => serde_json::to_value(&found.views)?,
        Some(ModelPart::Actions) => serde_json::to_value(&found.actions)?,
        Some(ModelPart::Menus) => serde_json::to_value(&found.menus)?,
    };
    Ok(value)
}

fn open_catalog(cfg: &AppConfig) -> Result<Catalog> {
    let registry = pipeline::build_registry(cfg)?;
    Ok(Catalog::new(registry, SearchIndex::new(cfg.index_path())))
}
