//! Metadata records extracted from addon modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statically resolved literal taken from a field-constructor argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Bare identifier, e.g. a method reference passed as `compute=_compute_total`.
    Ident(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text for string-ish values: string literals and bare identifiers.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) | FieldValue::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Index hint of a field: either a plain flag or a named strategy such as `btree_not_null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexHint {
    Flag(bool),
    Strategy(String),
}

impl Default for IndexHint {
    fn default() -> Self {
        IndexHint::Flag(false)
    }
}

pub type StateOverrides = BTreeMap<String, BTreeMap<String, FieldValue>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub relation: Option<String>,
    pub required: bool,
    pub readonly: bool,
    pub store: bool,
    pub compute: Option<String>,
    pub inverse: Option<String>,
    pub label: Option<String>,
    pub help: Option<String>,
    pub index: IndexHint,
    pub copyable: bool,
    pub default: Option<FieldValue>,
    pub groups: Option<String>,
    pub states: Option<StateOverrides>,
}

impl Field {
    /// A field with every attribute at its declared default.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            relation: None,
            required: false,
            readonly: false,
            store: true,
            compute: None,
            inverse: None,
            label: None,
            help: None,
            index: IndexHint::default(),
            copyable: true,
            default: None,
            groups: None,
            states: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceKind {
    /// `_inherit`: adds to or overrides an existing model.
    Extension,
    /// `_inherits`: composes the parent through a delegate many2one field.
    Delegation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceEntry {
    pub kind: InheritanceKind,
    pub parent_model: String,
    /// Delegate field holding the parent record, for delegation entries only.
    pub delegate_field: Option<String>,
}

impl InheritanceEntry {
    pub fn extension(parent_model: impl Into<String>) -> Self {
        Self {
            kind: InheritanceKind::Extension,
            parent_model: parent_model.into(),
            delegate_field: None,
        }
    }

    pub fn delegation(parent_model: impl Into<String>, delegate_field: impl Into<String>) -> Self {
        Self {
            kind: InheritanceKind::Delegation,
            parent_model: parent_model.into(),
            delegate_field: Some(delegate_field.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub key: String,
    pub label: Option<String>,
    pub module: String,
    pub is_transient: bool,
    pub is_abstract: bool,
    pub fields: Vec<Field>,
    pub inherits: Vec<InheritanceEntry>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub menus: Vec<Menu>,
}

impl Model {
    pub fn new(key: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
            module: module.into(),
            is_transient: false,
            is_abstract: false,
            fields: Vec::new(),
            inherits: Vec::new(),
            views: Vec::new(),
            actions: Vec::new(),
            menus: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Fields and parents contributed to an existing model by a declaration
/// that extends it without naming itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExtension {
    pub target: String,
    pub module: String,
    pub fields: Vec<Field>,
    pub inherits: Vec<InheritanceEntry>,
}

pub const DEFAULT_VIEW_KIND: &str = "form";
pub const DEFAULT_VIEW_PRIORITY: i64 = 16;
pub const DEFAULT_VIEW_MODE: &str = "tree,form";
pub const DEFAULT_MENU_SEQUENCE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub kind: String,
    pub arch: String,
    pub model: String,
    pub inherit_id: Option<String>,
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub model: String,
    pub view_mode: String,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    /// Raw external id of the triggered action; never dereferenced at parse time.
    pub action: Option<String>,
    pub sequence: i64,
}

/// Last dot-separated segment of an external id (`sale.action_orders` -> `action_orders`).
pub fn local_id(external_id: &str) -> &str {
    external_id.rsplit('.').next().unwrap_or(external_id)
}
