use addon_meta_core::models::{Field, Model};
use addon_meta_core::{rank_hits, SearchIndex};
use tempfile::tempdir;

fn invoice() -> Model {
    let mut model = Model::new("account.move", "account");
    model.label = Some("Customer Invoice".to_string());
    let mut vat = Field::new("partner_vat", "Char");
    vat.help = Some("Tax identifier".to_string());
    model.fields.push(vat);
    model.fields.push(Field::new("amount_total", "Monetary"));
    model
}

fn partner() -> Model {
    let mut model = Model::new("res.partner", "base");
    model.label = Some("Contact".to_string());
    let mut country = Field::new("country_id", "Many2one");
    country.relation = Some("res.country".to_string());
    model.fields.push(country);
    model
}

#[test]
fn built_index_answers_queries() {
    let temp = tempdir().unwrap();
    let index = SearchIndex::new(temp.path().join("index"));
    let models = vec![invoice(), partner()];
    assert_eq!(index.build(&models).unwrap(), 2);

    let hits = index.query("Customer", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].model, "account.move");
    assert_eq!(hits[0].name, "Customer Invoice");
    assert_eq!(hits[0].module, "account");
    assert!(hits[0].matched_fields.contains(&("name".to_string(), "customer".to_string())));

    let hits = index.query("Tax identifier", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].model, "account.move");

    assert!(index.query("warehouse", None).is_empty());
}

#[test]
fn stop_words_and_single_letters_do_not_block_matches() {
    let temp = tempdir().unwrap();
    let index = SearchIndex::new(temp.path().join("index"));
    index.build(&[invoice(), partner()]).unwrap();

    for text in ["the Customer", "Customer's invoice", "invoice of customer", "a customer"] {
        let hits = index.query(text, None);
        assert_eq!(hits.len(), 1, "query {:?}", text);
        assert_eq!(hits[0].model, "account.move");
    }
    let hits = index.query("tax identifiers", None);
    assert_eq!(hits.len(), 1);

    // A query made only of stop words matches nothing.
    assert!(index.query("the of", None).is_empty());
    // Model keys stay searchable as a whole.
    let hits = index.query("res.partner", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].model, "res.partner");
}

#[test]
fn explicit_fields_restrict_the_search() {
    let temp = tempdir().unwrap();
    let index = SearchIndex::new(temp.path().join("index"));
    index.build(&[invoice(), partner()]).unwrap();

    let by_names = vec!["field_names".to_string()];
    let hits = index.query("country_id", Some(by_names.as_slice()));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].model, "res.partner");

    let by_label = vec!["name".to_string()];
    assert!(index.query("country_id", Some(by_label.as_slice())).is_empty());

    let unknown = vec!["no_such_field".to_string()];
    assert!(index.query("Customer", Some(unknown.as_slice())).is_empty());
}

#[test]
fn rebuild_replaces_previous_content() {
    let temp = tempdir().unwrap();
    let index = SearchIndex::new(temp.path().join("index"));
    index.build(&[invoice(), partner()]).unwrap();
    index.build(&[partner()]).unwrap();

    assert!(index.query("Customer", None).is_empty());
    let hits = rank_hits(index.query("Contact", None));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].model, "res.partner");
}

#[test]
fn missing_index_yields_no_hits() {
    let temp = tempdir().unwrap();
    let index = SearchIndex::new(temp.path().join("never-built"));
    assert!(index.query("Customer", None).is_empty());
    assert!(index.try_query("Customer", None).is_err());
}
