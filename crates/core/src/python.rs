//! Declarative model extraction from Python sources.
//!
//! A class is a model candidate when one of its bases resolves to an ORM
//! marker name. Its body is classified statement by statement into model
//! slots, inheritance slots and field declarations; everything else is
//! ignored.

use crate::error::ExtractError;
use crate::models::{Field, FieldValue, IndexHint, InheritanceEntry, Model, ModelExtension, StateOverrides};
use std::collections::BTreeMap;
use tree_sitter::{Node, Parser, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Regular,
    Transient,
    Abstract,
}

const MODEL_MARKERS: &[(&str, MarkerKind)] = &[
    ("Model", MarkerKind::Regular),
    ("TransientModel", MarkerKind::Transient),
    ("AbstractModel", MarkerKind::Abstract),
];

const KEY_SLOT: &str = "_name";
const LABEL_SLOT: &str = "_description";
const EXTENSION_SLOT: &str = "_inherit";
const DELEGATION_SLOT: &str = "_inherits";

const FIELD_NAMESPACE: &str = "fields";
const TRANSLATE_CALL: &str = "_";

const RELATIONAL_KINDS: &[&str] = &["Many2one", "One2many", "Many2many"];
const SELECTION_KINDS: &[&str] = &["Selection", "Reference"];

/// What one class-body statement declares.
#[derive(Debug, Clone, PartialEq)]
enum Statement {
    ModelDeclaration(ModelSlot),
    InheritanceDeclaration(Vec<InheritanceEntry>),
    FieldDeclaration(Field),
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
enum ModelSlot {
    Key(String),
    Label(String),
}

/// Everything one source file contributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PythonExtraction {
    pub models: Vec<Model>,
    pub extensions: Vec<ModelExtension>,
}

/// Reusable extractor holding a configured tree-sitter parser.
pub struct PythonModelExtractor {
    parser: Parser,
}

impl PythonModelExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Extract every model declared in `code`, in file order.
    pub fn extract(&mut self, code: &str, module: &str) -> Result<PythonExtraction, ExtractError> {
        let tree = self.parser.parse(code, None).ok_or(ExtractError::NoTree)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ExtractError::Syntax {
                line: first_error_line(root),
            });
        }
        Ok(extract_from_tree(&tree, code, module))
    }
}

fn extract_from_tree(tree: &Tree, code: &str, module: &str) -> PythonExtraction {
    let mut out = PythonExtraction::default();
    let mut classes = Vec::new();
    collect_classes(tree.root_node(), &mut classes);
    let src = code.as_bytes();
    for class in classes {
        if let Some(marker) = model_marker(class, src) {
            declare_model(class, src, module, marker, &mut out);
        }
    }
    out
}

/// Class definitions reachable without entering another class body.
fn collect_classes<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "class_definition" {
            out.push(child);
        } else {
            collect_classes(child, out);
        }
    }
}

fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row + 1;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    node.start_position().row + 1
}

/// Bare names of the declared bases: `models.Model` resolves to `Model`.
fn base_names(class: Node, src: &[u8]) -> Vec<String> {
    let Some(superclasses) = class.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut names = Vec::new();
    let mut cursor = superclasses.walk();
    for base in superclasses.named_children(&mut cursor) {
        let name = match base.kind() {
            "identifier" => text(base, src),
            "attribute" => base.child_by_field_name("attribute").and_then(|a| text(a, src)),
            _ => None,
        };
        names.extend(name.map(str::to_string));
    }
    names
}

/// Specialised markers take precedence over the plain one.
fn model_marker(class: Node, src: &[u8]) -> Option<MarkerKind> {
    let bases = base_names(class, src);
    MODEL_MARKERS
        .iter()
        .rev()
        .find(|(name, _)| bases.iter().any(|b| b == name))
        .map(|(_, kind)| *kind)
}

fn declare_model(class: Node, src: &[u8], module: &str, marker: MarkerKind, out: &mut PythonExtraction) {
    let mut key = None;
    let mut label = None;
    let mut fields = Vec::new();
    let mut inherits = Vec::new();

    if let Some(body) = class.child_by_field_name("body") {
        let mut cursor = body.walk();
        for stmt in body.named_children(&mut cursor) {
            for outcome in classify_statement(stmt, src) {
                match outcome {
                    Statement::ModelDeclaration(ModelSlot::Key(k)) => key = Some(k),
                    Statement::ModelDeclaration(ModelSlot::Label(l)) => label = Some(l),
                    Statement::InheritanceDeclaration(entries) => inherits.extend(entries),
                    Statement::FieldDeclaration(field) => fields.push(field),
                    Statement::Unrecognized => {}
                }
            }
        }
    }

    match key {
        Some(key) => {
            let mut model = Model::new(key, module);
            model.label = label;
            model.is_transient = marker == MarkerKind::Transient;
            model.is_abstract = marker == MarkerKind::Abstract;
            model.fields = fields;
            model.inherits = inherits;
            out.models.push(model);
        }
        None => {
            let target = inherits
                .iter()
                .find(|e| e.delegate_field.is_none())
                .map(|e| e.parent_model.clone());
            if let Some(target) = target {
                out.extensions.push(ModelExtension {
                    target,
                    module: module.to_string(),
                    fields,
                    inherits,
                });
            }
        }
    }
}

/// Classify one statement of a class body. Chained assignments
/// (`a = b = fields.Char()`) yield one outcome per target.
fn classify_statement(stmt: Node, src: &[u8]) -> Vec<Statement> {
    if stmt.kind() != "expression_statement" {
        return vec![Statement::Unrecognized];
    }
    let Some(assignment) = stmt.named_child(0).filter(|n| n.kind() == "assignment") else {
        return vec![Statement::Unrecognized];
    };

    let mut targets = Vec::new();
    let mut current = assignment;
    let value = loop {
        if let Some(left) = current.child_by_field_name("left") {
            targets.push(left);
        }
        match current.child_by_field_name("right") {
            Some(right) if right.kind() == "assignment" => current = right,
            Some(right) => break Some(right),
            None => break None,
        }
    };
    let Some(value) = value else {
        return vec![Statement::Unrecognized];
    };

    targets
        .into_iter()
        .map(|target| match target.kind() {
            "identifier" => text(target, src)
                .map(|name| classify_assignment(name, value, src))
                .unwrap_or(Statement::Unrecognized),
            _ => Statement::Unrecognized,
        })
        .collect()
}

fn classify_assignment(name: &str, value: Node, src: &[u8]) -> Statement {
    match name {
        KEY_SLOT => string_literal(value, src)
            .map(|s| Statement::ModelDeclaration(ModelSlot::Key(s)))
            .unwrap_or(Statement::Unrecognized),
        LABEL_SLOT => string_literal(value, src)
            .map(|s| Statement::ModelDeclaration(ModelSlot::Label(s)))
            .unwrap_or(Statement::Unrecognized),
        EXTENSION_SLOT => extension_parents(value, src),
        DELEGATION_SLOT => delegation_parents(value, src),
        _ => field_declaration(name, value, src).unwrap_or(Statement::Unrecognized),
    }
}

fn extension_parents(value: Node, src: &[u8]) -> Statement {
    let parents: Vec<String> = match value.kind() {
        "list" | "tuple" => {
            let mut cursor = value.walk();
            value
                .named_children(&mut cursor)
                .filter_map(|elt| string_literal(elt, src))
                .collect()
        }
        _ => string_literal(value, src).into_iter().collect(),
    };
    if parents.is_empty() {
        return Statement::Unrecognized;
    }
    Statement::InheritanceDeclaration(parents.into_iter().map(InheritanceEntry::extension).collect())
}

fn delegation_parents(value: Node, src: &[u8]) -> Statement {
    if value.kind() != "dictionary" {
        return Statement::Unrecognized;
    }
    let mut entries = Vec::new();
    let mut cursor = value.walk();
    for pair in value.named_children(&mut cursor).filter(|n| n.kind() == "pair") {
        let parent = pair.child_by_field_name("key").and_then(|k| string_literal(k, src));
        let delegate = pair.child_by_field_name("value").and_then(|v| string_literal(v, src));
        if let (Some(parent), Some(delegate)) = (parent, delegate) {
            entries.push(InheritanceEntry::delegation(parent, delegate));
        }
    }
    Statement::InheritanceDeclaration(entries)
}

/// `name = fields.Kind(...)`
fn field_declaration(name: &str, value: Node, src: &[u8]) -> Option<Statement> {
    if value.kind() != "call" {
        return None;
    }
    let function = value.child_by_field_name("function")?;
    if function.kind() != "attribute" {
        return None;
    }
    let namespace = function.child_by_field_name("object")?;
    if namespace.kind() != "identifier" || text(namespace, src)? != FIELD_NAMESPACE {
        return None;
    }
    let kind = text(function.child_by_field_name("attribute")?, src)?;

    let mut field = Field::new(name, kind);
    if let Some(arguments) = value.child_by_field_name("arguments") {
        apply_arguments(&mut field, arguments, src);
    }
    Some(Statement::FieldDeclaration(field))
}

fn apply_arguments(field: &mut Field, arguments: Node, src: &[u8]) {
    let mut positional = Vec::new();
    let mut keywords = Vec::new();
    let mut cursor = arguments.walk();
    for arg in arguments.named_children(&mut cursor) {
        match arg.kind() {
            "keyword_argument" => {
                let key = arg.child_by_field_name("name").and_then(|n| text(n, src));
                if let (Some(key), Some(value)) = (key, arg.child_by_field_name("value")) {
                    keywords.push((key, literal(value, src)));
                }
            }
            "comment" | "list_splat" | "dictionary_splat" => {}
            _ => positional.push(literal(arg, src)),
        }
    }

    let kind = field.field_type.as_str();
    let positional_text = |idx: usize| {
        positional
            .get(idx)
            .and_then(|v| v.as_ref())
            .and_then(|v| match v {
                FieldValue::Str(s) => Some(s.clone()),
                _ => None,
            })
    };
    if RELATIONAL_KINDS.contains(&kind) {
        field.relation = positional_text(0);
    } else if SELECTION_KINDS.contains(&kind) {
        field.label = positional_text(1);
    } else {
        field.label = positional_text(0);
    }

    for (key, value) in keywords {
        apply_keyword(field, key, value);
    }
}

/// Unresolvable values leave optional attributes unset and flags at their defaults.
fn apply_keyword(field: &mut Field, key: &str, value: Option<FieldValue>) {
    let as_string = |v: &Option<FieldValue>| v.as_ref().and_then(|v| v.as_text()).map(str::to_string);
    match key {
        "comodel_name" => field.relation = as_string(&value),
        "required" => field.required = value.and_then(|v| v.as_bool()).unwrap_or(false),
        "readonly" => field.readonly = value.and_then(|v| v.as_bool()).unwrap_or(false),
        "store" => field.store = value.and_then(|v| v.as_bool()).unwrap_or(true),
        "copy" | "copyable" => field.copyable = value.and_then(|v| v.as_bool()).unwrap_or(true),
        "compute" => field.compute = as_string(&value),
        "inverse" => field.inverse = as_string(&value),
        "string" => field.label = as_string(&value),
        "help" => field.help = as_string(&value),
        "groups" => field.groups = as_string(&value),
        "default" => field.default = value,
        "index" => {
            field.index = match value {
                Some(FieldValue::Bool(b)) => IndexHint::Flag(b),
                Some(FieldValue::Str(s)) => IndexHint::Strategy(s),
                _ => IndexHint::default(),
            }
        }
        "states" => field.states = value.and_then(state_overrides),
        _ => {}
    }
}

/// Accepts `{'draft': {'readonly': False}}` and `{'draft': [('readonly', False)]}`.
fn state_overrides(value: FieldValue) -> Option<StateOverrides> {
    let FieldValue::Map(states) = value else {
        return None;
    };
    let mut out = StateOverrides::new();
    for (state, attrs) in states {
        let attrs = match attrs {
            FieldValue::Map(map) => map,
            FieldValue::List(pairs) => pairs
                .into_iter()
                .filter_map(|pair| match pair {
                    FieldValue::List(mut kv) if kv.len() == 2 => {
                        let v = kv.pop()?;
                        let k = kv.pop()?;
                        k.as_text().map(|k| (k.to_string(), v))
                    }
                    _ => None,
                })
                .collect(),
            _ => continue,
        };
        out.insert(state, attrs);
    }
    Some(out)
}

/// Statically resolve an expression to a literal, or `None`.
fn literal(node: Node, src: &[u8]) -> Option<FieldValue> {
    match node.kind() {
        "string" | "concatenated_string" => string_literal(node, src).map(FieldValue::Str),
        "true" => Some(FieldValue::Bool(true)),
        "false" => Some(FieldValue::Bool(false)),
        "integer" => parse_int(text(node, src)?).map(FieldValue::Int),
        "float" => text(node, src)?.replace('_', "").parse().ok().map(FieldValue::Float),
        "unary_operator" => {
            let operator = node.child_by_field_name("operator").and_then(|o| text(o, src))?;
            match (operator, literal(node.child_by_field_name("argument")?, src)?) {
                ("-", FieldValue::Int(i)) => Some(FieldValue::Int(-i)),
                ("-", FieldValue::Float(f)) => Some(FieldValue::Float(-f)),
                ("+", v @ (FieldValue::Int(_) | FieldValue::Float(_))) => Some(v),
                _ => None,
            }
        }
        "identifier" => text(node, src).map(|s| FieldValue::Ident(s.to_string())),
        "parenthesized_expression" => literal(node.named_child(0)?, src),
        "list" | "tuple" => {
            let mut cursor = node.walk();
            let items: Option<Vec<_>> = node
                .named_children(&mut cursor)
                .filter(|n| n.kind() != "comment")
                .map(|n| literal(n, src))
                .collect();
            items.map(FieldValue::List)
        }
        "dictionary" => {
            let mut map = BTreeMap::new();
            let mut cursor = node.walk();
            for pair in node.named_children(&mut cursor) {
                if pair.kind() != "pair" {
                    continue;
                }
                let key = pair.child_by_field_name("key").and_then(|k| string_literal(k, src));
                let value = pair.child_by_field_name("value").and_then(|v| literal(v, src));
                if let (Some(key), Some(value)) = (key, value) {
                    map.insert(key, value);
                }
            }
            Some(FieldValue::Map(map))
        }
        "call" => translated_string(node, src).map(FieldValue::Str),
        _ => None,
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.replace('_', "");
    let lower = raw.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        lower.parse().ok()
    }
}

/// `_("Label")`
fn translated_string(call: Node, src: &[u8]) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "identifier" || text(function, src)? != TRANSLATE_CALL {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let first = arguments.named_children(&mut cursor).find(|n| n.kind() != "comment")?;
    string_literal(first, src)
}

/// Literal text of a plain, concatenated or translated string; f-strings with
/// interpolations and byte strings do not resolve.
fn string_literal(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => {
            let mut prefix = String::new();
            let mut body = String::new();
            let mut cursor = node.walk();
            for part in node.children(&mut cursor) {
                match part.kind() {
                    "string_start" => {
                        prefix = text(part, src)?
                            .trim_end_matches(&['"', '\''][..])
                            .to_ascii_lowercase();
                    }
                    "string_content" => body.push_str(text(part, src)?),
                    "interpolation" => return None,
                    _ => {}
                }
            }
            if prefix.contains('b') {
                return None;
            }
            if prefix.contains('r') {
                Some(body)
            } else {
                unescape(&body)
            }
        }
        "concatenated_string" => {
            let mut out = String::new();
            let mut cursor = node.walk();
            for part in node.named_children(&mut cursor) {
                out.push_str(&string_literal(part, src)?);
            }
            Some(out)
        }
        "parenthesized_expression" => string_literal(node.named_child(0)?, src),
        "call" => translated_string(node, src),
        _ => None,
    }
}

/// Python escape decoding. `None` when an escape cannot be decoded, such as a
/// named `\N{...}` escape or an invalid code point.
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('f') => out.push('\u{0c}'),
            Some('v') => out.push('\u{0b}'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some('x') => out.push(hex_escape(&mut chars, 2)?),
            Some('u') => out.push(hex_escape(&mut chars, 4)?),
            Some('U') => out.push(hex_escape(&mut chars, 8)?),
            Some('N') => return None,
            Some(d @ '0'..='7') => {
                let mut code = d.to_digit(8)?;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            code = code * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code)?);
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Some(out)
}

fn hex_escape(chars: &mut impl Iterator<Item = char>, digits: usize) -> Option<char> {
    let hex: String = chars.take(digits).collect();
    if hex.len() != digits {
        return None;
    }
    char::from_u32(u32::from_str_radix(&hex, 16).ok()?)
}

fn text<'s>(node: Node, src: &'s [u8]) -> Option<&'s str> {
    node.utf8_text(src).ok()
}
