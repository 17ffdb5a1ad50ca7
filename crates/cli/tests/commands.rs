use addon_meta_core::catalog::ModuleFilter;
use addon_meta_core::config::AppConfig;
use cli::commands::{self, ModelPart};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn odoo_checkout(root: &Path) {
    write(
        root,
        "odoo/addons/base/models/res_partner.py",
        r#"
from odoo import fields, models

class Partner(models.Model):
    _name = 'res.partner'
    _description = 'Contact'

    name = fields.Char(required=True)
    vat = fields.Char('Tax ID', help='Tax identifier of the contact')
"#,
    );
    write(
        root,
        "addons/sale/models/sale_order.py",
        r#"
from odoo import fields, models

class SaleOrder(models.Model):
    _name = 'sale.order'
    _description = 'Sales Order'

    partner_id = fields.Many2one('res.partner', string='Customer')
"#,
    );
    write(
        root,
        "addons/sale/views/sale_views.xml",
        r#"<odoo>
    <record id="action_orders" model="ir.actions.act_window">
        <field name="name">Quotations</field>
        <field name="res_model">sale.order</field>
    </record>
    <menuitem id="menu_sale_root" name="Sales">
        <menuitem id="menu_sale_orders" name="Orders" action="action_orders"/>
    </menuitem>
</odoo>"#,
    );
    write(
        root,
        "addons/l10n_fr/models/fr.py",
        "from odoo import models\nclass Fr(models.Model):\n    _name = 'l10n.fr.report'\n",
    );
}

#[test]
fn index_then_query_commands() {
    let temp = tempdir().unwrap();
    odoo_checkout(temp.path());
    let index_dir = temp.path().join("idx");

    let cfg = commands::with_overrides(AppConfig::default(), Some(temp.path()), Some(index_dir.as_path()));
    assert_eq!(cfg.addon_roots(), commands::odoo_roots(temp.path()));

    let out = commands::index(&cfg).unwrap();
    assert_eq!(out["status"], "ok");
    assert_eq!(out["summary"]["models"], 3);
    assert_eq!(out["summary"]["indexed"], 3);

    let hits = commands::search(&cfg, "Tax identifier", &[]).unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["model"], "res.partner");

    let modules = commands::modules(&cfg, ModuleFilter::default()).unwrap();
    let names: Vec<&str> = modules.as_array().unwrap().iter().filter_map(|v| v.as_str()).collect();
    assert_eq!(names, vec!["base", "sale"]);

    let models = commands::models(&cfg, Some("sale")).unwrap();
    assert_eq!(models, serde_json::json!(["sale.order"]));

    let menus = commands::model(&cfg, "sale.order", Some(ModelPart::Menus)).unwrap();
    let menus = menus.as_array().unwrap();
    assert_eq!(menus.len(), 1);
    assert_eq!(menus[0]["id"], "sale.menu_sale_orders");
    assert_eq!(menus[0]["parent_id"], "menu_sale_root");

    let missing = commands::model(&cfg, "no.such.model", None).unwrap();
    assert_eq!(missing["error"], "Model not found");
}

#[test]
fn index_without_roots_is_rejected() {
    let temp = tempdir().unwrap();
    let cfg = commands::with_overrides(AppConfig::default(), None, Some(temp.path().join("idx").as_path()));
    assert!(commands::index(&cfg).is_err());
}

#[test]
fn search_without_index_is_empty() {
    let temp = tempdir().unwrap();
    let cfg = commands::with_overrides(AppConfig::default(), None, Some(temp.path().join("missing").as_path()));
    let hits = commands::search(&cfg, "anything", &[]).unwrap();
    assert_eq!(hits, serde_json::json!([]));
}
