//! Cross-file model merging and the association pass.

use crate::markup::MarkupRecords;
use crate::models::{local_id, Field, Model, ModelExtension};
use crate::store::MetadataStore;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Merged { added_fields: usize },
}

/// Insert `model`, or fold it into the existing entry for the same key.
/// For each field name the earliest-seen definition wins, including fields
/// from extensions read before their target. The owning module never changes.
pub fn merge_model(store: &mut MetadataStore, mut model: Model) -> MergeOutcome {
    let arrival = store.next_arrival();
    match store.models.get_mut(&model.key) {
        Some(existing) => {
            let added_fields = fold_fields(existing, model.fields, arrival, &mut store.field_arrivals);
            existing.inherits.extend(model.inherits);
            MergeOutcome::Merged { added_fields }
        }
        None => {
            let fields = std::mem::take(&mut model.fields);
            fold_fields(&mut model, fields, arrival, &mut store.field_arrivals);
            store.models.insert(model.key.clone(), model);
            MergeOutcome::Inserted
        }
    }
}

/// Queue an extension; it is folded in by [`associate`] once its target exists.
pub fn merge_extension(store: &mut MetadataStore, extension: ModelExtension) {
    let arrival = store.next_arrival();
    store.pending_extensions.push((arrival, extension));
}

/// Record views, actions and menus by id. The first record seen for an id is kept.
pub fn merge_markup(store: &mut MetadataStore, records: MarkupRecords) {
    for view in records.views {
        if store.views.contains_key(&view.id) {
            debug!("duplicate view id {}", view.id);
            continue;
        }
        store.views.insert(view.id.clone(), view);
    }
    for action in records.actions {
        if store.actions.contains_key(&action.id) {
            debug!("duplicate action id {}", action.id);
            continue;
        }
        store.actions.insert(action.id.clone(), action);
    }
    for menu in records.menus {
        if store.menus.contains_key(&menu.id) {
            debug!("duplicate menu id {}", menu.id);
            continue;
        }
        store.menus.insert(menu.id.clone(), menu);
    }
}

/// Returns how many new field names were added. A same-named field replaces
/// the current one only when it arrived earlier.
fn fold_fields(
    model: &mut Model,
    fields: Vec<Field>,
    arrival: usize,
    arrivals: &mut BTreeMap<(String, String), usize>,
) -> usize {
    let mut added = 0;
    for field in fields {
        let slot = (model.key.clone(), field.name.clone());
        match model.fields.iter().position(|f| f.name == field.name) {
            None => {
                model.fields.push(field);
                arrivals.insert(slot, arrival);
                added += 1;
            }
            Some(i) => {
                if arrivals.get(&slot).is_some_and(|&seen| arrival < seen) {
                    model.fields[i] = field;
                    arrivals.insert(slot, arrival);
                }
            }
        }
    }
    added
}

/// Resolves a menu's raw action reference to the model owning that action.
pub trait ActionLookup {
    fn model_for_action(&self, action_ref: &str) -> Option<&str>;
}

/// First model, in lexical key order, holding an action whose local id matches.
pub struct FirstMatchLookup {
    entries: Vec<(String, String)>,
}

impl FirstMatchLookup {
    pub fn from_models<'a>(models: impl IntoIterator<Item = &'a Model>) -> Self {
        let mut entries = Vec::new();
        for model in models {
            for action in &model.actions {
                entries.push((local_id(&action.id).to_string(), model.key.clone()));
            }
        }
        Self { entries }
    }
}

impl ActionLookup for FirstMatchLookup {
    fn model_for_action(&self, action_ref: &str) -> Option<&str> {
        let wanted = local_id(action_ref);
        self.entries
            .iter()
            .find(|(suffix, _)| suffix == wanted)
            .map(|(_, model)| model.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssociationSummary {
    pub extensions_applied: usize,
    pub extensions_pending: usize,
    pub views: usize,
    pub actions: usize,
    pub menus: usize,
}

/// Attach every view, action and menu to its model. Safe to re-run: the
/// attachment lists are rebuilt from the store each time.
pub fn associate(store: &mut MetadataStore) -> AssociationSummary {
    let mut summary = AssociationSummary::default();

    let pending = std::mem::take(&mut store.pending_extensions);
    for (arrival, extension) in pending {
        match store.models.get_mut(&extension.target) {
            Some(model) => {
                fold_fields(model, extension.fields, arrival, &mut store.field_arrivals);
                model.inherits.extend(extension.inherits);
                summary.extensions_applied += 1;
            }
            None => store.pending_extensions.push((arrival, extension)),
        }
    }
    summary.extensions_pending = store.pending_extensions.len();

    for model in store.models.values_mut() {
        model.views.clear();
        model.actions.clear();
        model.menus.clear();
    }

    for view in store.views.values() {
        if let Some(model) = store.models.get_mut(&view.model) {
            model.views.push(view.clone());
            summary.views += 1;
        }
    }
    for action in store.actions.values() {
        if let Some(model) = store.models.get_mut(&action.model) {
            model.actions.push(action.clone());
            summary.actions += 1;
        }
    }

    let lookup = FirstMatchLookup::from_models(store.models.values());
    let mut menus_by_model: BTreeMap<String, Vec<_>> = BTreeMap::new();
    for menu in store.menus.values() {
        let Some(action_ref) = menu.action.as_deref() else {
            continue;
        };
        if let Some(key) = lookup.model_for_action(action_ref) {
            menus_by_model.entry(key.to_string()).or_default().push(menu.clone());
        }
    }
    for (key, menus) in menus_by_model {
        if let Some(model) = store.models.get_mut(&key) {
            summary.menus += menus.len();
            model.menus = menus;
        }
    }

    for model in store.models.values_mut() {
        model.views.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        model.menus.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.id.cmp(&b.id)));
    }
    summary
}
