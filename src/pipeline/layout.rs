//! Directory layout shared by both stages.
//!
//! ```text
//! pdfs/<doc>.pdf ──▶ images/<doc>/<n>.png ──▶ rags/<doc>.txt
//! ```
//!
//! Everything here is plain `std::fs` listing plus the page-ordering rule;
//! no file is modified.

use crate::config::PageOrder;
use crate::error::Pdf2RagError;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Extensions (lower-case) accepted as page images.
pub const PAGE_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// List `*.pdf` files directly inside `dir`, sorted by file name.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, Pdf2RagError> {
    let mut pdfs: Vec<PathBuf> = read_dir_paths(dir)?
        .into_iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "pdf"))
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

/// List the immediate subdirectories of `root`, sorted by name.
pub fn document_dirs(root: &Path) -> Result<Vec<PathBuf>, Pdf2RagError> {
    let mut dirs: Vec<PathBuf> = read_dir_paths(root)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// The document name carried by a PDF path or image subdirectory.
pub fn document_name(path: &Path) -> String {
    let stem = if path.is_dir() {
        path.file_name()
    } else {
        path.file_stem()
    };
    stem.map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// True when the file extension is a supported page image (case-insensitive).
pub fn is_page_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            PAGE_IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Sort key for a page file: integer stems first, then everything else.
///
/// A stem is numeric only when it is made of ASCII digits and fits in a
/// `u64`; leading zeros are allowed (`007` is page 7). Signs, underscores,
/// whitespace and oversized numbers make it [`PageKey::Named`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PageKey {
    Numeric(u64),
    Named(String),
}

impl PageKey {
    pub fn for_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return PageKey::Named(stem);
        }
        match stem.parse::<u64>() {
            Ok(n) => PageKey::Numeric(n),
            Err(_) => PageKey::Named(stem),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PageKey::Numeric(_))
    }
}

/// Order page files: by [`PageKey`], ties broken by full file name.
pub fn compare_pages(a: &Path, b: &Path) -> Ordering {
    PageKey::for_path(a)
        .cmp(&PageKey::for_path(b))
        .then_with(|| a.file_name().cmp(&b.file_name()))
}

/// List the page images of one document in processing order.
///
/// With [`PageOrder::Strict`] a directory mixing numeric and non-numeric
/// stems is an error instead of being interleaved.
pub fn page_images(doc_dir: &Path, order: PageOrder) -> Result<Vec<PathBuf>, Pdf2RagError> {
    let mut pages: Vec<PathBuf> = read_dir_paths(doc_dir)?
        .into_iter()
        .filter(|p| p.is_file() && is_page_image(p))
        .collect();
    pages.sort_by(|a, b| compare_pages(a, b));

    if order == PageOrder::Strict {
        let numeric = pages.iter().filter(|p| PageKey::for_path(p).is_numeric()).count();
        if numeric != 0 && numeric != pages.len() {
            let example = pages
                .iter()
                .find(|p| !PageKey::for_path(p).is_numeric())
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Err(Pdf2RagError::MixedPageNames {
                doc: document_name(doc_dir),
                example,
            });
        }
    }

    Ok(pages)
}

fn read_dir_paths(dir: &Path) -> Result<Vec<PathBuf>, Pdf2RagError> {
    let entries = std::fs::read_dir(dir).map_err(|e| Pdf2RagError::io(dir, e))?;
    entries
        .map(|entry| {
            entry
                .map(|e| e.path())
                .map_err(|e| Pdf2RagError::io(dir, e))
        })
        .collect()
}
