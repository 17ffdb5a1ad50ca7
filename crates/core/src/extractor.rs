//! Routes source files to the matching extractor.

use crate::error::{ExtractError, MetaError};
use crate::markup::{self, MarkupRecords};
use crate::python::{PythonExtraction, PythonModelExtractor};
use crate::scanner::{SourceFile, SourceKind};
use std::fs;

#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Models(PythonExtraction),
    Markup(MarkupRecords),
}

pub struct Extractor {
    python: PythonModelExtractor,
}

impl Extractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            python: PythonModelExtractor::new()?,
        })
    }

    /// Read and extract one file. Read and parse failures carry the file path.
    pub fn extract_file(&mut self, file: &SourceFile, module: &str) -> Result<Extracted, MetaError> {
        let text = fs::read_to_string(&file.path).map_err(|source| MetaError::SourceRead {
            path: file.path.clone(),
            source,
        })?;
        self.extract_text(file.kind, &text, module)
            .map_err(|source| MetaError::Parse {
                path: file.path.clone(),
                source,
            })
    }

    pub fn extract_text(
        &mut self,
        kind: SourceKind,
        text: &str,
        module: &str,
    ) -> Result<Extracted, ExtractError> {
        match kind {
            SourceKind::Python => self.python.extract(text, module).map(Extracted::Models),
            SourceKind::Markup => markup::parse_markup(text, module).map(Extracted::Markup),
        }
    }
}
