//! Module discovery and loading over a set of addon roots.

use crate::error::MetaError;
use crate::extractor::{Extracted, Extractor};
use crate::merger::{self, AssociationSummary};
use crate::models::Model;
use crate::scanner::{self, SourceFile};
use crate::store::MetadataStore;
use globset::GlobSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Read,
    Parse,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a load pass. Per-file failures are recorded here instead of
/// aborting the pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub modules_loaded: usize,
    pub files_read: usize,
    pub models_extracted: usize,
    pub extensions_extracted: usize,
    pub views_extracted: usize,
    pub actions_extracted: usize,
    pub menus_extracted: usize,
    pub skipped_files: usize,
    pub parse_failures: usize,
    pub missing_roots: Vec<PathBuf>,
    pub missing_modules: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub association: AssociationSummary,
}

impl LoadReport {
    fn record_failure(&mut self, err: MetaError) {
        let (path, kind) = match &err {
            MetaError::SourceRead { path, .. } => {
                self.skipped_files += 1;
                (path.clone(), FailureKind::Read)
            }
            MetaError::Parse { path, .. } => {
                self.parse_failures += 1;
                (path.clone(), FailureKind::Parse)
            }
            _ => {
                self.skipped_files += 1;
                (PathBuf::new(), FailureKind::Read)
            }
        };
        warn!("{}", err);
        self.failures.push(FileFailure {
            path,
            kind,
            message: err.to_string(),
        });
    }

    fn absorb(&mut self, other: LoadReport) {
        self.modules_loaded += other.modules_loaded;
        self.files_read += other.files_read;
        self.models_extracted += other.models_extracted;
        self.extensions_extracted += other.extensions_extracted;
        self.views_extracted += other.views_extracted;
        self.actions_extracted += other.actions_extracted;
        self.menus_extracted += other.menus_extracted;
        self.skipped_files += other.skipped_files;
        self.parse_failures += other.parse_failures;
        self.missing_modules.extend(other.missing_modules);
        self.failures.extend(other.failures);
    }
}

/// Owns the metadata store for one set of addon roots. Not meant to be shared
/// between concurrent loaders; use one registry per pipeline.
pub struct ModuleRegistry {
    roots: Vec<PathBuf>,
    excludes: GlobSet,
    module_paths: BTreeMap<String, PathBuf>,
    missing_roots: Vec<PathBuf>,
    loaded: BTreeSet<String>,
    extractor: Extractor,
    store: MetadataStore,
}

impl ModuleRegistry {
    pub fn new(roots: Vec<PathBuf>) -> Result<Self, MetaError> {
        Self::with_excludes(roots, GlobSet::empty())
    }

    pub fn with_excludes(roots: Vec<PathBuf>, excludes: GlobSet) -> Result<Self, MetaError> {
        Ok(Self {
            roots,
            excludes,
            module_paths: BTreeMap::new(),
            missing_roots: Vec::new(),
            loaded: BTreeSet::new(),
            extractor: Extractor::new()?,
            store: MetadataStore::new(),
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn is_loaded(&self, module: &str) -> bool {
        self.loaded.contains(module)
    }

    /// Module name to directory for every root. Memoized once populated; a
    /// module found in an earlier root shadows later ones.
    pub fn discover(&mut self) -> &BTreeMap<String, PathBuf> {
        if !self.module_paths.is_empty() {
            return &self.module_paths;
        }
        self.missing_roots.clear();
        for root in &self.roots {
            if !root.exists() {
                warn!("Addon path {:?} does not exist", root);
                self.missing_roots.push(root.clone());
                continue;
            }
            let modules = match scanner::module_dirs(root) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Cannot list addon path {:?}: {}", root, e);
                    self.missing_roots.push(root.clone());
                    continue;
                }
            };
            for (name, path) in modules {
                if let Some(existing) = self.module_paths.get(&name) {
                    debug!("module {} in {:?} shadowed by {:?}", name, path, existing);
                    continue;
                }
                self.module_paths.insert(name, path);
            }
        }
        info!("Discovered {} modules", self.module_paths.len());
        &self.module_paths
    }

    /// Load one module (no-op when already loaded), then re-run association.
    pub fn load(&mut self, module: &str) -> LoadReport {
        let mut report = self.load_module(module);
        report.association = merger::associate(&mut self.store);
        report.missing_roots = self.missing_roots.clone();
        report
    }

    /// Discover every module under the roots and load them all.
    pub fn load_all(&mut self) -> LoadReport {
        let modules: Vec<String> = self.discover().keys().cloned().collect();
        let mut report = LoadReport::default();
        for module in modules {
            let module_report = self.load_module(&module);
            report.absorb(module_report);
        }
        report.association = merger::associate(&mut self.store);
        report.missing_roots = self.missing_roots.clone();
        info!(
            "Loaded {} modules: {} models, {} skipped files, {} parse failures",
            report.modules_loaded,
            self.store.len(),
            report.skipped_files,
            report.parse_failures
        );
        report
    }

    /// Models owned by `module`, loading it first if needed.
    pub fn models_of(&mut self, module: &str) -> Vec<&Model> {
        self.load(module);
        self.store.models().filter(|m| m.module == module).collect()
    }

    fn load_module(&mut self, module: &str) -> LoadReport {
        let mut report = LoadReport::default();
        if self.loaded.contains(module) {
            return report;
        }
        let Some(dir) = self.module_dir(module) else {
            warn!("Module {} not found", module);
            report.missing_modules.push(module.to_string());
            return report;
        };

        debug!("loading module {} from {:?}", module, dir);
        for file in scanner::module_files(&dir, &self.excludes) {
            self.load_file(&file, module, &mut report);
        }
        self.loaded.insert(module.to_string());
        report.modules_loaded = 1;
        report
    }

    fn module_dir(&mut self, module: &str) -> Option<PathBuf> {
        if !self.module_paths.contains_key(module) {
            self.discover();
        }
        self.module_paths.get(module).cloned()
    }

    fn load_file(&mut self, file: &SourceFile, module: &str, report: &mut LoadReport) {
        let extracted = match self.extractor.extract_file(file, module) {
            Ok(e) => e,
            Err(e) => {
                report.record_failure(e);
                return;
            }
        };
        report.files_read += 1;
        match extracted {
            Extracted::Models(out) => {
                report.models_extracted += out.models.len();
                report.extensions_extracted += out.extensions.len();
                for model in out.models {
                    merger::merge_model(&mut self.store, model);
                }
                for extension in out.extensions {
                    merger::merge_extension(&mut self.store, extension);
                }
            }
            Extracted::Markup(records) => {
                report.views_extracted += records.views.len();
                report.actions_extracted += records.actions.len();
                report.menus_extracted += records.menus.len();
                merger::merge_markup(&mut self.store, records);
            }
        }
    }
}
