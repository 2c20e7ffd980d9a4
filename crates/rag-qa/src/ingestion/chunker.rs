//! Fixed-size character chunking with overlap

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Splits document text into overlapping windows of `chunk_size` characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    /// Window size in characters
    chunk_size: usize,
    /// Characters shared by consecutive windows
    overlap: usize,
}

impl Chunker {
    /// Create a new chunker.
    ///
    /// Requires `chunk_size > 0` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid_argument("chunk_size must be greater than 0"));
        }
        if overlap >= chunk_size {
            return Err(Error::invalid_argument(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    /// Window size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Number of chunks produced for a text of `char_len` characters
    pub fn chunk_count(&self, char_len: usize) -> usize {
        if char_len == 0 {
            0
        } else if char_len <= self.chunk_size {
            1
        } else {
            1 + (char_len - self.chunk_size).div_ceil(self.stride())
        }
    }

    /// Split `text` into chunks tagged with `source_document_id`.
    ///
    /// The returned iterator is lazy and can be cloned to restart the walk.
    pub fn split<'a>(&self, text: &'a str, source_document_id: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            source_document_id,
            chunk_size: self.chunk_size,
            stride: self.stride(),
            next_start: if text.is_empty() { None } else { Some(0) },
            next_index: 0,
            remaining: self.chunk_count(text.chars().count()),
        }
    }
}

/// Lazy iterator over the chunks of one document, in document order
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    source_document_id: &'a str,
    chunk_size: usize,
    stride: usize,
    /// Byte offset of the next window, `None` once the end was reached
    next_start: Option<usize>,
    next_index: u32,
    remaining: usize,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let rest = &self.text[start..];
        let end = start + byte_offset(rest, self.chunk_size);

        self.next_start = if end >= self.text.len() {
            None
        } else {
            Some(start + byte_offset(rest, self.stride))
        };

        let chunk = Chunk::new(&self.text[start..end], self.next_index, self.source_document_id);
        self.next_index += 1;
        self.remaining = self.remaining.saturating_sub(1);
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

impl std::iter::FusedIterator for Chunks<'_> {}

/// Byte offset just past the first `chars` characters of `s` (or `s.len()`)
fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}
