//! Query side of the full-text index.

use crate::error::MetaError;
use crate::indexer::{self, register_tokenizers, SearchIndex};
use serde::Serialize;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, IndexRecordOption, Schema};
use tantivy::tokenizer::TokenStream;
use tantivy::{DocAddress, DocSet, Document, Index, ReloadPolicy, Searcher, Term};
use tracing::{debug, warn};

/// Fields searched when the caller does not restrict the query.
pub const DEFAULT_FIELDS: &[&str] = &[
    indexer::MODEL,
    indexer::NAME,
    indexer::FIELD_NAMES,
    indexer::FIELD_HELP,
    indexer::VIEW_ARCH,
    indexer::ACTION_NAMES,
    indexer::MENU_NAMES,
    indexer::CONTENT,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub model: String,
    pub name: String,
    pub module: String,
    pub score: f32,
    /// (field, analyzed query term) pairs present in this document.
    pub matched_fields: Vec<(String, String)>,
}

struct QueryTerm {
    field_name: String,
    text: String,
    term: Term,
}

impl SearchIndex {
    /// Ranked hits for `text`. Never fails: a missing or unreadable index, or
    /// a query that does not parse, yields an empty list.
    pub fn query(&self, text: &str, fields: Option<&[String]>) -> Vec<SearchHit> {
        match self.try_query(text, fields) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Search for {:?} returned nothing: {}", text, e);
                Vec::new()
            }
        }
    }

    pub fn try_query(&self, text: &str, fields: Option<&[String]>) -> Result<Vec<SearchHit>, MetaError> {
        let index = Index::open_in_dir(&self.path).map_err(|e| MetaError::IndexUnavailable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        register_tokenizers(&index);
        let schema = index.schema();

        let search_fields = resolve_fields(&schema, fields);
        if search_fields.is_empty() {
            return Ok(Vec::new());
        }

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let searcher = reader.searcher();

        let mut parser = QueryParser::for_index(&index, search_fields.iter().map(|(_, f)| *f).collect());
        parser.set_conjunction_by_default();
        let query = parser.parse_query(text)?;

        let limit = (searcher.num_docs() as usize).max(1);
        let top = searcher.search(&query, &TopDocs::with_limit(limit))?;
        debug!("query {:?} matched {} documents", text, top.len());

        let terms = query_terms(&index, &search_fields, text)?;
        let stored = indexer::IndexFields::resolve(&schema)?;
        let mut hits = Vec::with_capacity(top.len());
        for (score, addr) in top {
            let doc: Document = searcher.doc(addr)?;
            let mut matched_fields = Vec::new();
            for qt in &terms {
                if doc_has_term(&searcher, addr, &qt.term)? {
                    matched_fields.push((qt.field_name.clone(), qt.text.clone()));
                }
            }
            hits.push(SearchHit {
                model: stored_text(&doc, stored.model),
                name: stored_text(&doc, stored.name),
                module: stored_text(&doc, stored.module),
                score,
                matched_fields,
            });
        }
        Ok(hits)
    }
}

fn resolve_fields(schema: &Schema, requested: Option<&[String]>) -> Vec<(String, Field)> {
    let names: Vec<&str> = match requested {
        Some(list) => list.iter().map(String::as_str).collect(),
        None => DEFAULT_FIELDS.to_vec(),
    };
    let mut resolved = Vec::new();
    for name in names {
        match schema.get_field(name) {
            Ok(field) if schema.get_field_entry(field).is_indexed() => {
                if !resolved.iter().any(|(n, _)| n == name) {
                    resolved.push((name.to_string(), field));
                }
            }
            _ => warn!("Ignoring unknown search field {:?}", name),
        }
    }
    resolved
}

/// The query text run through each field's own analyzer.
fn query_terms(index: &Index, fields: &[(String, Field)], text: &str) -> Result<Vec<QueryTerm>, MetaError> {
    let mut terms: Vec<QueryTerm> = Vec::new();
    for (name, field) in fields {
        let mut analyzer = index.tokenizer_for_field(*field)?;
        let mut stream = analyzer.token_stream(text);
        while stream.advance() {
            let token = stream.token().text.clone();
            if terms.iter().any(|t| t.field_name == *name && t.text == token) {
                continue;
            }
            terms.push(QueryTerm {
                field_name: name.clone(),
                term: Term::from_field_text(*field, &token),
                text: token,
            });
        }
    }
    Ok(terms)
}

fn doc_has_term(searcher: &Searcher, addr: DocAddress, term: &Term) -> Result<bool, MetaError> {
    let segment = searcher.segment_reader(addr.segment_ord);
    let inverted = segment.inverted_index(term.field())?;
    let Some(mut postings) = inverted.read_postings(term, IndexRecordOption::Basic)? else {
        return Ok(false);
    };
    if postings.doc() > addr.doc_id {
        return Ok(false);
    }
    Ok(postings.doc() == addr.doc_id || postings.seek(addr.doc_id) == addr.doc_id)
}

fn stored_text(doc: &Document, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_text())
        .unwrap_or_default()
        .to_string()
}
