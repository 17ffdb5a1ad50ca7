//! Read-side surface over a registry and its search index.

use crate::indexer::SearchIndex;
use crate::models::Model;
use crate::registry::ModuleRegistry;
use crate::search::SearchHit;
use std::cmp::Ordering;
use std::collections::BTreeMap;

const TRANSLATION_PREFIXES: [&str; 2] = ["l10n_", "i18n_"];
const TEST_MARKER: &str = "test";

#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleFilter {
    pub include_translations: bool,
    pub include_tests: bool,
}

impl ModuleFilter {
    pub fn accepts(&self, module: &str) -> bool {
        if !self.include_translations && TRANSLATION_PREFIXES.iter().any(|p| module.starts_with(p)) {
            return false;
        }
        if !self.include_tests && module.to_lowercase().contains(TEST_MARKER) {
            return false;
        }
        true
    }
}

pub struct Catalog {
    registry: ModuleRegistry,
    index: SearchIndex,
}

impl Catalog {
    pub fn new(registry: ModuleRegistry, index: SearchIndex) -> Self {
        Self { registry, index }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn list_modules(&mut self, filter: ModuleFilter) -> Vec<String> {
        self.registry
            .discover()
            .keys()
            .filter(|m| filter.accepts(m))
            .cloned()
            .collect()
    }

    /// Keys of loaded models, optionally restricted to (and loading) one module.
    pub fn model_keys(&mut self, module: Option<&str>) -> Vec<String> {
        match module {
            Some(m) => self
                .registry
                .models_of(m)
                .into_iter()
                .map(|model| model.key.clone())
                .collect(),
            None => self.registry.store().model_keys().map(str::to_string).collect(),
        }
    }

    /// Look a model up by key. With `load_module`, discovered modules are
    /// loaded one at a time in name order until the key appears.
    pub fn find_model(&mut self, key: &str, load_module: bool) -> Option<&Model> {
        if load_module && !self.registry.store().contains(key) {
            let modules: Vec<String> = self.registry.discover().keys().cloned().collect();
            for module in modules {
                if self.registry.is_loaded(&module) {
                    continue;
                }
                self.registry.load(&module);
                if self.registry.store().contains(key) {
                    break;
                }
            }
        }
        self.registry.store().model(key)
    }

    pub fn search(&self, text: &str, fields: Option<&[String]>) -> Vec<SearchHit> {
        rank_hits(self.index.query(text, fields))
    }
}

/// One hit per model key, keeping the best score; best first, ties by key.
pub fn rank_hits(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut best: BTreeMap<String, SearchHit> = BTreeMap::new();
    for hit in hits {
        match best.get(&hit.model) {
            Some(current) if current.score >= hit.score => {}
            _ => {
                best.insert(hit.model.clone(), hit);
            }
        }
    }
    let mut ranked: Vec<SearchHit> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.model.cmp(&b.model))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn hit(model: &str, score: f32) -> SearchHit {
        SearchHit {
            model: model.to_string(),
            name: String::new(),
            module: "base".to_string(),
            score,
            matched_fields: Vec::new(),
        }
    }

    fn write_module(root: &Path, name: &str, source: &str) {
        let dir = root.join(name).join("models");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("main.py"), source).unwrap();
    }

    #[test]
    fn rank_keeps_best_score_per_model() {
        let ranked = rank_hits(vec![
            hit("res.partner", 1.5),
            hit("account.move", 2.0),
            hit("res.partner", 3.0),
            hit("account.tax", 2.0),
        ]);
        let order: Vec<(&str, f32)> = ranked.iter().map(|h| (h.model.as_str(), h.score)).collect();
        assert_eq!(
            order,
            vec![("res.partner", 3.0), ("account.move", 2.0), ("account.tax", 2.0)]
        );
    }

    #[test]
    fn filter_hides_translation_and_test_modules() {
        let default = ModuleFilter::default();
        assert!(default.accepts("account"));
        assert!(!default.accepts("l10n_fr"));
        assert!(!default.accepts("i18n_de"));
        assert!(!default.accepts("test_mail"));
        assert!(!default.accepts("base_Testing"));

        let everything = ModuleFilter {
            include_translations: true,
            include_tests: true,
        };
        assert!(everything.accepts("l10n_fr"));
        assert!(everything.accepts("test_mail"));
    }

    #[test]
    fn find_model_loads_modules_until_found() {
        let root = tempfile::tempdir().unwrap();
        write_module(
            root.path(),
            "alpha",
            "from odoo import models\nclass A(models.Model):\n    _name = 'alpha.thing'\n",
        );
        write_module(
            root.path(),
            "beta",
            "from odoo import models\nclass B(models.Model):\n    _name = 'beta.thing'\n",
        );
        write_module(
            root.path(),
            "gamma",
            "from odoo import models\nclass C(models.Model):\n    _name = 'gamma.thing'\n",
        );
        let registry = ModuleRegistry::new(vec![root.path().to_path_buf()]).unwrap();
        let mut catalog = Catalog::new(registry, SearchIndex::new(root.path().join(".index")));

        assert!(catalog.find_model("beta.thing", false).is_none());
        let found = catalog.find_model("beta.thing", true).map(|m| m.module.clone());
        assert_eq!(found.as_deref(), Some("beta"));
        assert!(catalog.registry().is_loaded("alpha"));
        assert!(!catalog.registry().is_loaded("gamma"));

        assert!(catalog.find_model("nowhere.model", true).is_none());
        assert!(catalog.registry().is_loaded("gamma"));
    }

    #[test]
    fn model_keys_for_one_module() {
        let root = tempfile::tempdir().unwrap();
        write_module(
            root.path(),
            "sale",
            "from odoo import models\nclass S(models.Model):\n    _name = 'sale.order'\n\nclass L(models.Model):\n    _name = 'sale.order.line'\n",
        );
        write_module(
            root.path(),
            "l10n_be",
            "from odoo import models\nclass T(models.Model):\n    _name = 'l10n.be.thing'\n",
        );
        let registry = ModuleRegistry::new(vec![root.path().to_path_buf()]).unwrap();
        let mut catalog = Catalog::new(registry, SearchIndex::new(root.path().join(".index")));

        assert_eq!(catalog.list_modules(ModuleFilter::default()), vec!["sale".to_string()]);
        assert!(catalog.model_keys(None).is_empty());
        assert_eq!(
            catalog.model_keys(Some("sale")),
            vec!["sale.order".to_string(), "sale.order.line".to_string()]
        );
    }
}
