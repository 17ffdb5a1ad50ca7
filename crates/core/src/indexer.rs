//! Full-text index over merged model metadata.

use crate::error::MetaError;
use crate::models::Model;
use std::fs;
use std::path::{Path, PathBuf};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING,
};
use tantivy::tokenizer::{
    Language, LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter,
    TextAnalyzer, WhitespaceTokenizer,
};
use tantivy::{Document, Index, IndexWriter};
use tracing::{info, warn};

const WRITER_HEAP_BYTES: usize = 50_000_000;
const MAX_TOKEN_LEN: usize = 40;
const TEXT_TOKENIZER: &str = "meta_text";
const STEM_TOKENIZER: &str = "meta_stem";
const KEYWORD_TOKENIZER: &str = "keyword";
const MODEL_KEY_TOKENIZER: &str = "model_key";

const STOP_WORDS: &[&str] = &[
    "an", "and", "are", "as", "at", "be", "by", "can", "for", "from", "have", "if", "in", "is",
    "it", "may", "not", "of", "on", "or", "tbd", "that", "the", "this", "to", "us", "we", "when",
    "will", "with", "yet", "you", "your",
];

pub const MODEL: &str = "model";
pub const MODULE: &str = "module";
pub const NAME: &str = "name";
pub const FIELD_NAMES: &str = "field_names";
pub const FIELD_TYPES: &str = "field_types";
pub const FIELD_RELATIONS: &str = "field_relations";
pub const FIELD_HELP: &str = "field_help";
pub const VIEW_TYPES: &str = "view_types";
pub const VIEW_ARCH: &str = "view_arch";
pub const ACTION_NAMES: &str = "action_names";
pub const MENU_NAMES: &str = "menu_names";
pub const CONTENT: &str = "content";

/// Persisted index location. Builds replace the whole content in one commit;
/// queries open their own read-only handle.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    pub(crate) path: PathBuf,
}

pub(crate) struct IndexFields {
    pub model: Field,
    pub module: Field,
    pub name: Field,
    pub field_names: Field,
    pub field_types: Field,
    pub field_relations: Field,
    pub field_help: Field,
    pub view_types: Field,
    pub view_arch: Field,
    pub action_names: Field,
    pub menu_names: Field,
    pub content: Field,
}

impl IndexFields {
    pub(crate) fn resolve(schema: &Schema) -> Result<Self, MetaError> {
        Ok(Self {
            model: schema.get_field(MODEL)?,
            module: schema.get_field(MODULE)?,
            name: schema.get_field(NAME)?,
            field_names: schema.get_field(FIELD_NAMES)?,
            field_types: schema.get_field(FIELD_TYPES)?,
            field_relations: schema.get_field(FIELD_RELATIONS)?,
            field_help: schema.get_field(FIELD_HELP)?,
            view_types: schema.get_field(VIEW_TYPES)?,
            view_arch: schema.get_field(VIEW_ARCH)?,
            action_names: schema.get_field(ACTION_NAMES)?,
            menu_names: schema.get_field(MENU_NAMES)?,
            content: schema.get_field(CONTENT)?,
        })
    }
}

pub fn schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_text_field(MODEL, analyzed(MODEL_KEY_TOKENIZER).set_stored());
    builder.add_text_field(MODULE, STRING | STORED);
    builder.add_text_field(NAME, analyzed(TEXT_TOKENIZER).set_stored());
    builder.add_text_field(FIELD_NAMES, analyzed(KEYWORD_TOKENIZER).set_stored());
    builder.add_text_field(FIELD_TYPES, analyzed(KEYWORD_TOKENIZER).set_stored());
    builder.add_text_field(FIELD_RELATIONS, analyzed(KEYWORD_TOKENIZER).set_stored());
    builder.add_text_field(FIELD_HELP, analyzed(STEM_TOKENIZER));
    builder.add_text_field(VIEW_TYPES, analyzed(KEYWORD_TOKENIZER).set_stored());
    builder.add_text_field(VIEW_ARCH, analyzed(STEM_TOKENIZER));
    builder.add_text_field(ACTION_NAMES, analyzed(TEXT_TOKENIZER).set_stored());
    builder.add_text_field(MENU_NAMES, analyzed(TEXT_TOKENIZER).set_stored());
    builder.add_text_field(CONTENT, analyzed(STEM_TOKENIZER));
    builder.build()
}

fn analyzed(tokenizer: &str) -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(tokenizer)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

/// Common English words plus every single letter and digit. A query word
/// that reduces to nothing in every field drops out of the conjunction.
fn stop_words() -> StopWordFilter {
    let singles = ('a'..='z').chain('0'..='9').map(String::from);
    StopWordFilter::remove(STOP_WORDS.iter().map(|w| w.to_string()).chain(singles))
}

pub(crate) fn register_tokenizers(index: &Index) {
    let tokenizers = index.tokenizers();
    tokenizers.register(
        TEXT_TOKENIZER,
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .filter(stop_words())
            .build(),
    );
    tokenizers.register(
        STEM_TOKENIZER,
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .filter(stop_words())
            .filter(Stemmer::new(Language::English))
            .build(),
    );
    // Name lists: whitespace-separated, case-insensitive.
    tokenizers.register(
        KEYWORD_TOKENIZER,
        TextAnalyzer::builder(WhitespaceTokenizer::default())
            .filter(LowerCaser)
            .filter(stop_words())
            .build(),
    );
    tokenizers.register(
        MODEL_KEY_TOKENIZER,
        TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .filter(stop_words())
            .build(),
    );
}

impl SearchIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the index content with one document per model.
    pub fn build<'a>(&self, models: impl IntoIterator<Item = &'a Model>) -> Result<usize, MetaError> {
        let index = self.open_for_write()?;
        register_tokenizers(&index);
        let fields = IndexFields::resolve(&index.schema())?;

        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        // Full replace: readers keep seeing the previous commit until this one lands.
        writer.delete_all_documents()?;
        let mut count = 0;
        for model in models {
            writer.add_document(model_document(&fields, model))?;
            count += 1;
        }
        writer.commit()?;
        info!("Indexed {} models into {:?}", count, self.path);
        Ok(count)
    }

    fn open_for_write(&self) -> Result<Index, MetaError> {
        fs::create_dir_all(&self.path)?;
        let expected = schema();
        match Index::open_in_dir(&self.path) {
            Ok(existing) if same_fields(&existing.schema(), &expected) => Ok(existing),
            Ok(_) => {
                warn!("Index at {:?} has an outdated schema, recreating", self.path);
                fs::remove_dir_all(&self.path)?;
                fs::create_dir_all(&self.path)?;
                Ok(Index::create_in_dir(&self.path, expected)?)
            }
            Err(_) => Ok(Index::create_in_dir(&self.path, expected)?),
        }
    }
}

fn same_fields(actual: &Schema, expected: &Schema) -> bool {
    actual.fields().count() == expected.fields().count()
        && expected.fields().all(|(_, entry)| {
            actual
                .get_field(entry.name())
                .map(|f| actual.get_field_entry(f) == entry)
                .unwrap_or(false)
        })
}

fn model_document(fields: &IndexFields, model: &Model) -> Document {
    let join = |parts: Vec<&str>| parts.join(" ");
    let label = model.label.as_deref().unwrap_or("");
    let field_names = join(model.fields.iter().map(|f| f.name.as_str()).collect());
    let field_types = join(model.fields.iter().map(|f| f.field_type.as_str()).collect());
    let field_relations = join(model.fields.iter().filter_map(|f| f.relation.as_deref()).collect());
    let field_help = join(model.fields.iter().filter_map(|f| f.help.as_deref()).collect());
    let view_types = join(model.views.iter().map(|v| v.kind.as_str()).collect());
    let view_arch = join(model.views.iter().map(|v| v.arch.as_str()).collect());
    let action_names = join(model.actions.iter().map(|a| a.name.as_str()).collect());
    let menu_names = join(model.menus.iter().map(|m| m.name.as_str()).collect());
    let content = format!(
        "{} {} {} {} {} {} {}",
        model.key, label, field_names, field_help, view_arch, action_names, menu_names
    );

    let mut doc = Document::default();
    doc.add_text(fields.model, &model.key);
    doc.add_text(fields.module, &model.module);
    doc.add_text(fields.name, label);
    doc.add_text(fields.field_names, field_names);
    doc.add_text(fields.field_types, field_types);
    doc.add_text(fields.field_relations, field_relations);
    doc.add_text(fields.field_help, field_help);
    doc.add_text(fields.view_types, view_types);
    doc.add_text(fields.view_arch, view_arch);
    doc.add_text(fields.action_names, action_names);
    doc.add_text(fields.menu_names, menu_names);
    doc.add_text(fields.content, content);
    doc
}
