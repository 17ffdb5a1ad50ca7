//! Error taxonomy shared by the load pipeline and the search index.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("python grammar unavailable: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    #[error("source could not be parsed")]
    NoTree,
    #[error("syntax error near line {line}")]
    Syntax { line: usize },
    #[error("markup error: {0}")]
    Markup(#[from] quick_xml::Error),
    #[error("unclosed <{0}> element")]
    Unclosed(String),
}

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to read {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },
    #[error("search index unavailable at {path}: {reason}")]
    IndexUnavailable { path: PathBuf, reason: String },
    #[error("invalid query: {0}")]
    Query(#[from] tantivy::query::QueryParserError),
    #[error("index write failed: {0}")]
    Index(#[from] tantivy::TantivyError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
