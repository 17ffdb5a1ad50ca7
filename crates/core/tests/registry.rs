use addon_meta_core::registry::{FailureKind, ModuleRegistry};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const INVOICE_PY: &str = r#"
from odoo import fields, models

class Invoice(models.Model):
    _name = 'res.invoice'
    _description = 'Customer Invoice'

    amount = fields.Monetary(string='Amount', required=True)
"#;

const INVOICE_NOTE_PY: &str = r#"
from odoo import fields, models

class InvoiceNote(models.Model):
    _inherit = 'res.invoice'

    note = fields.Text('Internal Note')
"#;

const INVOICE_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<odoo>
    <record id="view_invoice_form" model="ir.ui.view">
        <field name="model">res.invoice</field>
        <field name="arch" type="xml"><form><field name="amount"/></form></field>
    </record>
    <record id="action_invoice" model="ir.actions.act_window">
        <field name="name">Invoices</field>
        <field name="res_model">res.invoice</field>
    </record>
    <menuitem id="menu_invoice" name="Invoices" action="action_invoice"/>
</odoo>
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn field_names(registry: &ModuleRegistry, key: &str) -> Vec<String> {
    let mut names: Vec<String> = registry
        .store()
        .model(key)
        .unwrap()
        .fields
        .iter()
        .map(|f| f.name.clone())
        .collect();
    names.sort();
    names
}

#[test]
fn extension_from_other_module_adds_fields() {
    let temp = tempdir().unwrap();
    // The extending module sorts first, so it loads before its target.
    write(temp.path(), "account_notes/models/invoice.py", INVOICE_NOTE_PY);
    write(temp.path(), "invoicing/models/invoice.py", INVOICE_PY);

    let mut registry = ModuleRegistry::new(vec![temp.path().to_path_buf()]).unwrap();
    let report = registry.load_all();

    assert_eq!(report.modules_loaded, 2);
    assert_eq!(report.association.extensions_applied, 1);
    assert_eq!(report.association.extensions_pending, 0);
    assert_eq!(field_names(&registry, "res.invoice"), vec!["amount", "note"]);

    let invoice = registry.store().model("res.invoice").unwrap();
    assert_eq!(invoice.module, "invoicing");
    assert!(!invoice.is_transient);
    let amount = invoice.field("amount").unwrap();
    assert!(amount.required);
    assert_eq!(amount.field_type, "Monetary");
    assert_eq!(invoice.field("note").unwrap().field_type, "Text");
}

#[test]
fn markup_records_attach_to_their_model() {
    let temp = tempdir().unwrap();
    write(temp.path(), "invoicing/models/invoice.py", INVOICE_PY);
    write(temp.path(), "invoicing/views/invoice_views.xml", INVOICE_XML);

    let mut registry = ModuleRegistry::new(vec![temp.path().to_path_buf()]).unwrap();
    let report = registry.load("invoicing");
    assert_eq!(report.views_extracted, 1);
    assert_eq!(report.actions_extracted, 1);
    assert_eq!(report.menus_extracted, 1);

    let invoice = registry.store().model("res.invoice").unwrap();
    let views: Vec<&str> = invoice.views.iter().map(|v| v.id.as_str()).collect();
    let actions: Vec<&str> = invoice.actions.iter().map(|a| a.id.as_str()).collect();
    let menus: Vec<&str> = invoice.menus.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(views, vec!["invoicing.view_invoice_form"]);
    assert_eq!(actions, vec!["invoicing.action_invoice"]);
    assert_eq!(menus, vec!["invoicing.menu_invoice"]);
}

#[test]
fn loading_twice_changes_nothing() {
    let temp = tempdir().unwrap();
    write(temp.path(), "invoicing/models/invoice.py", INVOICE_PY);
    write(temp.path(), "invoicing/views/invoice_views.xml", INVOICE_XML);

    let mut registry = ModuleRegistry::new(vec![temp.path().to_path_buf()]).unwrap();
    registry.load("invoicing");
    let first = registry.store().model("res.invoice").unwrap().clone();

    let again = registry.load("invoicing");
    assert_eq!(again.modules_loaded, 0);
    assert_eq!(again.files_read, 0);
    let second = registry.store().model("res.invoice").unwrap();
    assert_eq!(&first, second);
    assert_eq!(second.views.len(), 1);
}

#[test]
fn missing_root_is_tolerated() {
    let temp = tempdir().unwrap();
    let missing = temp.path().join("does-not-exist");

    let mut registry = ModuleRegistry::new(vec![missing.clone()]).unwrap();
    let report = registry.load_all();

    assert_eq!(report.missing_roots, vec![missing]);
    assert_eq!(report.modules_loaded, 0);
    assert!(registry.store().is_empty());
}

#[test]
fn hidden_and_cache_directories_are_skipped() {
    let temp = tempdir().unwrap();
    write(temp.path(), "invoicing/models/invoice.py", INVOICE_PY);
    write(
        temp.path(),
        "invoicing/__pycache__/stale.py",
        "class Stale(models.Model):\n    _name = 'stale.model'\n",
    );
    write(
        temp.path(),
        "invoicing/.hidden/secret.py",
        "class Secret(models.Model):\n    _name = 'secret.model'\n",
    );
    write(
        temp.path(),
        ".git/models/ignored.py",
        "class Ignored(models.Model):\n    _name = 'ignored.model'\n",
    );

    let mut registry = ModuleRegistry::new(vec![temp.path().to_path_buf()]).unwrap();
    let report = registry.load_all();

    assert_eq!(report.modules_loaded, 1);
    let keys: Vec<&str> = registry.store().model_keys().collect();
    assert_eq!(keys, vec!["res.invoice"]);
}

#[test]
fn broken_files_are_counted_not_fatal() {
    let temp = tempdir().unwrap();
    write(temp.path(), "invoicing/models/invoice.py", INVOICE_PY);
    write(temp.path(), "invoicing/models/broken.py", "class Broken(models.Model:\n    _name = 'x'\n");
    write(temp.path(), "invoicing/views/broken.xml", "<odoo><record id=\"v\" model=\"ir.ui.view\">");

    let mut registry = ModuleRegistry::new(vec![temp.path().to_path_buf()]).unwrap();
    let report = registry.load_all();

    assert_eq!(report.parse_failures, 2);
    assert_eq!(report.skipped_files, 0);
    assert!(report.failures.iter().all(|f| f.kind == FailureKind::Parse));
    assert!(registry.store().contains("res.invoice"));
}

#[test]
fn first_root_wins_for_duplicate_modules() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(first.path(), "invoicing/models/invoice.py", INVOICE_PY);
    write(
        second.path(),
        "invoicing/models/other.py",
        "class Other(models.Model):\n    _name = 'other.model'\n",
    );

    let mut registry =
        ModuleRegistry::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]).unwrap();
    registry.load_all();

    assert!(registry.store().contains("res.invoice"));
    assert!(!registry.store().contains("other.model"));
}

#[test]
fn unknown_module_is_reported() {
    let temp = tempdir().unwrap();
    write(temp.path(), "invoicing/models/invoice.py", INVOICE_PY);

    let mut registry = ModuleRegistry::new(vec![temp.path().to_path_buf()]).unwrap();
    let report = registry.load("nonexistent");

    assert_eq!(report.missing_modules, vec!["nonexistent".to_string()]);
    assert!(registry.store().is_empty());
}

#[test]
fn earlier_extension_field_wins_over_later_declaration() {
    let temp = tempdir().unwrap();
    write(
        temp.path(),
        "a_ext/models/invoice.py",
        "from odoo import fields, models\nclass InvoiceExt(models.Model):\n    _inherit = 'res.invoice'\n    amount = fields.Float()\n",
    );
    write(temp.path(), "b_base/models/invoice.py", INVOICE_PY);

    let mut registry = ModuleRegistry::new(vec![temp.path().to_path_buf()]).unwrap();
    registry.load_all();

    let invoice = registry.store().model("res.invoice").unwrap();
    assert_eq!(invoice.module, "b_base");
    assert_eq!(invoice.fields.len(), 1);
    assert_eq!(invoice.field("amount").unwrap().field_type, "Float");
}
