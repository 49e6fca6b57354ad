//! The per-page prompt sent alongside each page image.
//!
//! The prompt lives in an operator-edited text file (default
//! `prompt_images2rags.txt`) rather than in the binary, so it can be tuned
//! per corpus without a rebuild. It is read and parsed once per run; a
//! missing file or a malformed template aborts before any request is made.
//!
//! Two placeholders are recognised:
//!
//! | Placeholder     | Replaced with                    |
//! |-----------------|----------------------------------|
//! | `{doc_name}`    | document directory name          |
//! | `{page_number}` | 1-based page number              |
//!
//! `{{` and `}}` produce literal braces.

use crate::error::Pdf2RagError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

static RE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    DocName,
    PageNumber,
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Read and parse a template file.
    pub fn load(path: &Path) -> Result<Self, Pdf2RagError> {
        if !path.is_file() {
            return Err(Pdf2RagError::PromptNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| Pdf2RagError::PromptTemplate {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let template = Self::parse(&text).map_err(|detail| Pdf2RagError::PromptTemplate {
            path: path.to_path_buf(),
            detail,
        })?;
        debug!(
            "Loaded prompt template {} ({} bytes)",
            path.display(),
            text.len()
        );
        Ok(template)
    }

    /// Parse template text. Errors name the offending placeholder or brace.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in RE_TOKEN.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            literal.push_str(&text[last..whole.start()]);
            last = whole.end();

            match whole.as_str() {
                "{{" => literal.push('{'),
                "}}" => literal.push('}'),
                "{" | "}" => {
                    return Err(format!(
                        "unbalanced '{}' at byte {}",
                        whole.as_str(),
                        whole.start()
                    ));
                }
                _ => {
                    let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                    let placeholder = match name {
                        "doc_name" => Segment::DocName,
                        "page_number" => Segment::PageNumber,
                        other => return Err(format!("unknown placeholder '{{{other}}}'")),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(placeholder);
                }
            }
        }

        literal.push_str(&text[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Substitute document name and page number.
    pub fn render(&self, doc_name: &str, page_number: usize) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::DocName => out.push_str(doc_name),
                Segment::PageNumber => out.push_str(&page_number.to_string()),
            }
        }
        out
    }
}
