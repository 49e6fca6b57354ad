//! Output files: `<output_dir>/<doc>.txt`.
//!
//! Each section is written with its own open-append-close, so a run that
//! stops mid-document leaves every earlier section on disk.

use crate::error::Pdf2RagError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// `<output_dir>/<doc_name>.txt`
pub fn output_path(output_dir: &Path, doc_name: &str) -> PathBuf {
    output_dir.join(format!("{doc_name}.txt"))
}

/// Delete every `*.txt` directly inside `dir`. Returns the number removed.
pub async fn clear_outputs(dir: &Path) -> Result<usize, Pdf2RagError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Pdf2RagError::io(dir, e))?;
    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Pdf2RagError::io(dir, e))?
    {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| write_failed(&path, e))?;
            debug!("Removed {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

/// Create the file if missing; existing content is kept.
pub async fn touch(path: &Path) -> Result<(), Pdf2RagError> {
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map(drop)
        .map_err(|e| write_failed(path, e))
}

/// Create the file, or empty it if it exists.
pub async fn truncate(path: &Path) -> Result<(), Pdf2RagError> {
    tokio::fs::File::create(path)
        .await
        .map(drop)
        .map_err(|e| write_failed(path, e))
}

/// Number of sections on disk, counted as the run of headers
/// `## <doc> page 1`, `## <doc> page 2`, ... in file order.
///
/// A missing or unreadable file counts as zero. A stray header out of
/// sequence ends the count.
pub async fn completed_sections(path: &Path, doc_name: &str) -> usize {
    let Ok(text) = tokio::fs::read_to_string(path).await else {
        return 0;
    };
    let prefix = format!("## {doc_name} page ");
    let mut done = 0;
    for line in text.lines() {
        let Some(number) = line.strip_prefix(&prefix) else {
            continue;
        };
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if number.parse::<usize>().ok() != Some(done + 1) {
            break;
        }
        done += 1;
    }
    done
}

/// `## <doc> page <n>\n<trimmed text>\n\n`
pub fn format_section(doc_name: &str, page_number: usize, text: &str) -> String {
    format!("## {doc_name} page {page_number}\n{}\n\n", text.trim())
}

/// Append one section and close the file.
pub async fn append_section(
    path: &Path,
    doc_name: &str,
    page_number: usize,
    text: &str,
) -> Result<usize, Pdf2RagError> {
    let section = format_section(doc_name, page_number, text);
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| write_failed(path, e))?;
    file.write_all(section.as_bytes())
        .await
        .map_err(|e| write_failed(path, e))?;
    file.flush().await.map_err(|e| write_failed(path, e))?;
    Ok(section.len())
}

fn write_failed(path: &Path, source: std::io::Error) -> Pdf2RagError {
    Pdf2RagError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_is_trimmed_and_blank_line_terminated() {
        assert_eq!(
            format_section("manual", 3, "\n  Body text.\n\n"),
            "## manual page 3\nBody text.\n\n"
        );
    }

    #[test]
    fn empty_reply_still_gets_a_header() {
        assert_eq!(format_section("a", 1, "   "), "## a page 1\n\n\n");
    }

    #[tokio::test]
    async fn append_keeps_earlier_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "doc");
        append_section(&path, "doc", 1, "one").await.unwrap();
        append_section(&path, "doc", 2, "two").await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "## doc page 1\none\n\n## doc page 2\ntwo\n\n");
    }

    #[tokio::test]
    async fn clear_removes_only_txt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("keep.md"), "x").unwrap();
        let removed = clear_outputs(dir.path()).await.unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join("keep.md").exists());
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn touch_creates_empty_and_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("new.txt");
        touch(&fresh).await.unwrap();
        assert_eq!(std::fs::read_to_string(&fresh).unwrap(), "");

        let existing = dir.path().join("old.txt");
        std::fs::write(&existing, "kept").unwrap();
        touch(&existing).await.unwrap();
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "kept");

        truncate(&existing).await.unwrap();
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "");
    }

    #[tokio::test]
    async fn completed_sections_counts_headers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "B");
        assert_eq!(completed_sections(&path, "B").await, 0);

        append_section(&path, "B", 1, "first").await.unwrap();
        append_section(&path, "B", 2, "## B page 9 quoted in the body").await.unwrap();
        assert_eq!(completed_sections(&path, "B").await, 2);
        assert_eq!(completed_sections(&path, "A").await, 0);

        append_section(&path, "B", 4, "gap").await.unwrap();
        assert_eq!(completed_sections(&path, "B").await, 2);
    }

    #[tokio::test]
    async fn plain_text_is_not_a_finished_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("B.txt");
        std::fs::write(&path, "notes without headers\n").unwrap();
        assert_eq!(completed_sections(&path, "B").await, 0);
    }
}
