//! Prompt templates for RAG generation

use crate::error::{Error, Result};
use crate::types::PromptContext;

/// Default question-answering template
pub const DEFAULT_TEMPLATE: &str = "Use the following pieces of context to provide a concise answer to the question at the end.
If you don't know the answer, just say that you don't know, don't try to make up an answer.

Question: {question}

{context}

Answer:";

const QUESTION: &str = "{question}";
const CONTEXT: &str = "{context}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Question,
    Context,
}

/// A parsed prompt template with `{question}` and `{context}` placeholders.
///
/// The template is split into segments once; rendering writes the question
/// and context into those slots in a single pass, so placeholder-like text
/// inside a question or chunk is never expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

/// A rendered prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// Prompt text sent to the model
    pub text: String,
    /// Number of chunks placed into the context
    pub chunks_used: usize,
}

impl PromptTemplate {
    /// Parse a template; both placeholders must be present
    pub fn new(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = template;

        while !rest.is_empty() {
            let next = [(QUESTION, Segment::Question), (CONTEXT, Segment::Context)]
                .into_iter()
                .filter_map(|(marker, segment)| rest.find(marker).map(|pos| (pos, marker, segment)))
                .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, marker, segment)) => {
                    if pos > 0 {
                        segments.push(Segment::Literal(rest[..pos].to_string()));
                    }
                    segments.push(segment);
                    rest = &rest[pos + marker.len()..];
                }
                None => {
                    segments.push(Segment::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        for (marker, segment) in [(QUESTION, Segment::Question), (CONTEXT, Segment::Context)] {
            if !segments.contains(&segment) {
                return Err(Error::invalid_configuration(format!(
                    "Prompt template must contain the {} placeholder",
                    marker
                )));
            }
        }

        Ok(Self { segments })
    }

    /// Render the template for a question and its retrieved chunks.
    ///
    /// Chunk texts are joined with newlines in retrieval order. Nothing is
    /// truncated.
    pub fn assemble(&self, context: &PromptContext) -> AssembledPrompt {
        let joined = context
            .chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut text = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => text.push_str(s),
                Segment::Question => text.push_str(&context.question),
                Segment::Context => text.push_str(&joined),
            }
        }

        AssembledPrompt {
            text,
            chunks_used: context.len(),
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            segments: vec![
                Segment::Literal(
                    "Use the following pieces of context to provide a concise answer to the question at the end.\n\
                     If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
                     Question: "
                        .to_string(),
                ),
                Segment::Question,
                Segment::Literal("\n\n".to_string()),
                Segment::Context,
                Segment::Literal("\n\nAnswer:".to_string()),
            ],
        }
    }
}
