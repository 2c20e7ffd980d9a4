//! Text extraction for PDF and plain-text documents

use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Document, FileType};

/// Upper bound on a single PDF extraction; some fonts make pdf-extract spin
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Typographic characters that PDF fonts commonly emit, with ASCII replacements
const PDF_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Extracts plain text from raw documents
pub struct TextExtractor;

impl TextExtractor {
    /// Extract the text of a document.
    ///
    /// PDF extraction runs on the blocking pool with a timeout.
    pub async fn extract(document: &Document) -> Result<String> {
        match document.file_type {
            FileType::Pdf => {
                let data = document.data.clone();
                let name = document.name.clone();
                let task = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data));

                let extracted = tokio::time::timeout(PDF_EXTRACT_TIMEOUT, task)
                    .await
                    .map_err(|_| {
                        Error::invalid_argument(format!(
                            "PDF extraction for '{}' timed out after {}s",
                            name,
                            PDF_EXTRACT_TIMEOUT.as_secs()
                        ))
                    })?
                    .map_err(|e| Error::invalid_argument(format!("PDF extraction for '{}' aborted: {}", name, e)))?
                    .map_err(|e| Error::invalid_argument(format!("Failed to parse PDF '{}': {}", name, e)))?;

                Ok(cleanup_pdf_text(&extracted))
            }
            FileType::Txt | FileType::Markdown => std::str::from_utf8(&document.data)
                .map(str::to_string)
                .map_err(|e| Error::invalid_argument(format!("'{}' is not valid UTF-8: {}", document.name, e))),
            FileType::Unknown => Err(Error::invalid_argument(format!(
                "Unsupported file type for '{}' (expected .pdf, .txt or .md)",
                document.name
            ))),
        }
    }
}

/// Normalize typographic characters, drop null bytes and blank lines
fn cleanup_pdf_text(text: &str) -> String {
    let mut result = text.replace('\0', "");
    for (from, to) in PDF_REPLACEMENTS {
        if result.contains(*from) {
            result = result.replace(*from, to);
        }
    }

    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
