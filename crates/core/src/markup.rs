//! View, action and menu extraction from XML data files.

use crate::error::ExtractError;
use crate::models::{
    Action, Menu, View, DEFAULT_MENU_SEQUENCE, DEFAULT_VIEW_KIND, DEFAULT_VIEW_MODE,
    DEFAULT_VIEW_PRIORITY,
};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use tracing::warn;

pub const VIEW_RECORD: &str = "ir.ui.view";
pub const ACTION_RECORD: &str = "ir.actions.act_window";
pub const MENU_RECORD: &str = "ir.ui.menu";

const RECORD_TAG: &[u8] = b"record";
const FIELD_TAG: &[u8] = b"field";
const MENUITEM_TAG: &[u8] = b"menuitem";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupRecords {
    pub views: Vec<View>,
    pub actions: Vec<Action>,
    pub menus: Vec<Menu>,
}

impl MarkupRecords {
    pub fn is_empty(&self) -> bool {
        self.views.is_empty() && self.actions.is_empty() && self.menus.is_empty()
    }
}

/// An immediate `<field name="...">` child of a record.
#[derive(Debug, Clone, Default)]
struct FieldElement {
    raw: String,
    reference: Option<String>,
    eval: Option<String>,
}

impl FieldElement {
    /// Literal value: entities decoded, CDATA sections taken as-is.
    fn text(&self) -> Option<String> {
        if self.raw.is_empty() {
            return None;
        }
        let mut out = String::with_capacity(self.raw.len());
        let mut rest = self.raw.as_str();
        while let Some(start) = rest.find(CDATA_OPEN) {
            out.push_str(&decode_entities(&rest[..start]));
            let body = &rest[start + CDATA_OPEN.len()..];
            let end = body.find(CDATA_CLOSE).unwrap_or(body.len());
            out.push_str(&body[..end]);
            rest = body.get(end + CDATA_CLOSE.len()..).unwrap_or("");
        }
        out.push_str(&decode_entities(rest));
        let trimmed = out.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn text_or_eval(&self) -> Option<String> {
        self.text().or_else(|| self.eval.clone())
    }

    fn int(&self) -> Option<i64> {
        self.text_or_eval().and_then(|v| v.trim().parse().ok())
    }
}

type FieldMap = HashMap<String, FieldElement>;

fn decode_entities(raw: &str) -> String {
    unescape(raw)
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Extract records, logging and discarding everything from a file that is not well-formed.
pub fn extract_markup(xml: &str, module: &str) -> MarkupRecords {
    match parse_markup(xml, module) {
        Ok(records) => records,
        Err(e) => {
            warn!("Error parsing XML for module {}: {}", module, e);
            MarkupRecords::default()
        }
    }
}

pub fn parse_markup(xml: &str, module: &str) -> Result<MarkupRecords, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut records = MarkupRecords::default();
    let mut open_menus: Vec<Option<String>> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == RECORD_TAG => {
                let id = attr(&e, b"id")?.unwrap_or_default();
                let target = attr(&e, b"model")?;
                let fields = read_record_fields(&mut reader)?;
                push_record(&mut records, module, target.as_deref(), &id, &fields);
            }
            Event::Empty(e) if e.name().as_ref() == RECORD_TAG => {
                let id = attr(&e, b"id")?.unwrap_or_default();
                let target = attr(&e, b"model")?;
                push_record(&mut records, module, target.as_deref(), &id, &FieldMap::new());
            }
            Event::Start(e) if e.name().as_ref() == MENUITEM_TAG => {
                let parent = open_menus.last().cloned().flatten();
                let menu = menuitem(&e, module, parent)?;
                open_menus.push(attr(&e, b"id")?);
                records.menus.extend(menu);
            }
            Event::Empty(e) if e.name().as_ref() == MENUITEM_TAG => {
                let parent = open_menus.last().cloned().flatten();
                records.menus.extend(menuitem(&e, module, parent)?);
            }
            Event::End(e) if e.name().as_ref() == MENUITEM_TAG => {
                open_menus.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(records)
}

fn push_record(records: &mut MarkupRecords, module: &str, target: Option<&str>, id: &str, fields: &FieldMap) {
    let qualified = format!("{}.{}", module, id);
    match target {
        Some(VIEW_RECORD) => records.views.extend(view(qualified, fields)),
        Some(ACTION_RECORD) => records.actions.extend(action(qualified, fields)),
        Some(MENU_RECORD) => records.menus.push(menu(qualified, fields)),
        _ => {}
    }
}

/// Views need both an architecture and a model reference.
fn view(id: String, fields: &FieldMap) -> Option<View> {
    let arch = fields.get("arch")?;
    let model = fields.get("model")?;
    Some(View {
        id,
        kind: fields
            .get("type")
            .and_then(FieldElement::text)
            .unwrap_or_else(|| DEFAULT_VIEW_KIND.to_string()),
        arch: arch.raw.clone(),
        model: model.text().unwrap_or_default(),
        inherit_id: fields.get("inherit_id").and_then(|f| f.reference.clone()),
        priority: fields
            .get("priority")
            .and_then(FieldElement::int)
            .unwrap_or(DEFAULT_VIEW_PRIORITY),
    })
}

/// Actions need a target model.
fn action(id: String, fields: &FieldMap) -> Option<Action> {
    let model = fields.get("res_model")?;
    Some(Action {
        id,
        name: fields.get("name").and_then(FieldElement::text).unwrap_or_default(),
        action_type: ACTION_RECORD.to_string(),
        model: model.text().unwrap_or_default(),
        view_mode: fields
            .get("view_mode")
            .and_then(FieldElement::text)
            .unwrap_or_else(|| DEFAULT_VIEW_MODE.to_string()),
        domain: fields.get("domain").and_then(FieldElement::text_or_eval),
    })
}

fn menu(id: String, fields: &FieldMap) -> Menu {
    Menu {
        id,
        name: fields.get("name").and_then(FieldElement::text).unwrap_or_default(),
        parent_id: fields.get("parent_id").and_then(|f| f.reference.clone()),
        action: fields.get("action").and_then(|f| f.reference.clone()),
        sequence: fields
            .get("sequence")
            .and_then(FieldElement::int)
            .unwrap_or(DEFAULT_MENU_SEQUENCE),
    }
}

fn menuitem(e: &BytesStart, module: &str, enclosing: Option<String>) -> Result<Option<Menu>, ExtractError> {
    let Some(id) = attr(e, b"id")? else {
        return Ok(None);
    };
    Ok(Some(Menu {
        id: format!("{}.{}", module, id),
        name: attr(e, b"name")?.unwrap_or_default(),
        parent_id: attr(e, b"parent")?.or(enclosing),
        action: attr(e, b"action")?,
        sequence: attr(e, b"sequence")?
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_MENU_SEQUENCE),
    }))
}

/// Consume a record up to its end tag, keeping its immediate `<field>` children.
fn read_record_fields(reader: &mut Reader<&[u8]>) -> Result<FieldMap, ExtractError> {
    let mut fields = FieldMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == FIELD_TAG => {
                let name = attr(&e, b"name")?;
                let mut element = field_element(&e)?;
                element.raw = reader.read_text(e.name())?.trim().to_string();
                if let Some(name) = name {
                    fields.insert(name, element);
                }
            }
            Event::Empty(e) if e.name().as_ref() == FIELD_TAG => {
                if let Some(name) = attr(&e, b"name")? {
                    fields.insert(name, field_element(&e)?);
                }
            }
            Event::Start(e) => {
                reader.read_to_end(e.name())?;
            }
            Event::End(_) => return Ok(fields),
            Event::Eof => return Err(ExtractError::Unclosed("record".to_string())),
            _ => {}
        }
    }
}

fn field_element(e: &BytesStart) -> Result<FieldElement, ExtractError> {
    Ok(FieldElement {
        raw: String::new(),
        reference: attr(e, b"ref")?,
        eval: attr(e, b"eval")?,
    })
}

fn attr(e: &BytesStart, key: &[u8]) -> Result<Option<String>, ExtractError> {
    let Some(attribute) = e.try_get_attribute(key).map_err(quick_xml::Error::from)? else {
        return Ok(None);
    };
    Ok(Some(attribute.unescape_value()?.into_owned()))
}
