//! In-memory metadata store owned by one registry.

use crate::models::{Action, Menu, Model, ModelExtension, View};
use std::collections::BTreeMap;

/// Models keyed by qualified name plus the markup records waiting to be
/// associated with them. Iteration follows lexical key order.
#[derive(Debug, Default)]
pub struct MetadataStore {
    pub(crate) models: BTreeMap<String, Model>,
    pub(crate) views: BTreeMap<String, View>,
    pub(crate) actions: BTreeMap<String, Action>,
    pub(crate) menus: BTreeMap<String, Menu>,
    /// Extensions whose target is not loaded yet, tagged with their arrival.
    pub(crate) pending_extensions: Vec<(usize, ModelExtension)>,
    /// Arrival of the declaration that supplied each (model key, field name).
    pub(crate) field_arrivals: BTreeMap<(String, String), usize>,
    arrivals: usize,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(&self, key: &str) -> Option<&Model> {
        self.models.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn model_keys(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn view(&self, id: &str) -> Option<&View> {
        self.views.get(id)
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn menu(&self, id: &str) -> Option<&Menu> {
        self.menus.get(id)
    }

    /// Extensions whose target model has not been seen yet.
    pub fn pending_extensions(&self) -> impl Iterator<Item = &ModelExtension> {
        self.pending_extensions.iter().map(|(_, ext)| ext)
    }

    /// Position of the next merged declaration in load order.
    pub(crate) fn next_arrival(&mut self) -> usize {
        self.arrivals += 1;
        self.arrivals
    }
}
