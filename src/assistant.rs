//! Conversation policy: one user turn in, exactly one reply out.
//!
//! Order of decisions for a turn:
//! 1. an attachment with readable text is learned, then either summarized
//!    (scan) or matched together with the question
//! 2. greetings short-circuit to a static reply
//! 3. with an API key and a backend, the AI service answers
//! 4. the concept matcher answers from the catalog
//! 5. learned notes are searched for the question
//! 6. a static fallback suggests topics to ask about

use crate::catalog::Catalog;
use crate::extract::{extract_text, DocumentExtractor, TextExtractor};
use crate::format;
use crate::llm::{system_prompt, ChatBackend, MAX_CONTEXT_CHARS};
use crate::matcher::best_match;
use crate::memory::Session;
use crate::scanner::scan;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

/// Substrings of the lowercased query that trigger the greeting
const GREETING_MARKERS: [&str; 2] = ["hello", "hi"];

lazy_static! {
    static ref RE_SUMMARY: Regex =
        Regex::new(r"(?i)\b(summari[sz]e|summary|overview|what topics)\b").unwrap();
}

// ============================================================================
// Turn & Reply Types
// ============================================================================

/// A document attached to a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// One user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub query: String,
    pub attachment: Option<Attachment>,
}

impl Turn {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(query: impl Into<String>, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            query: query.into(),
            attachment: Some(Attachment {
                name: name.into(),
                bytes,
            }),
        }
    }
}

/// Which branch of the policy produced a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    Greeting,
    /// Catalog concept, by topic
    Concept(String),
    /// Topic checklist of a scanned document
    Checklist,
    /// Document learned, question matched nothing
    DocumentNoted,
    /// Excerpt from learned notes
    FragmentHit,
    /// Answer from the AI service
    Backend,
    /// AI service failed
    BackendError,
    Fallback,
}

/// The single message produced for a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

impl Reply {
    fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Plain containment on the lowercased query, so "which" and "this" count too.
pub fn is_greeting(query: &str) -> bool {
    let query_lower = query.to_lowercase();
    GREETING_MARKERS.iter().any(|m| query_lower.contains(m))
}

pub fn is_summary_request(query: &str) -> bool {
    RE_SUMMARY.is_match(query)
}

// ============================================================================
// Assistant
// ============================================================================

/// Answers turns against one immutable catalog.
pub struct Assistant<'c> {
    catalog: &'c Catalog,
    extractor: Box<dyn TextExtractor>,
    backend: Option<Box<dyn ChatBackend>>,
}

impl<'c> Assistant<'c> {
    /// Offline assistant reading PDF and plain-text attachments.
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            extractor: Box::new(DocumentExtractor::default()),
            backend: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_backend(mut self, backend: Box<dyn ChatBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Produce the reply for one turn. Never fails.
    pub fn respond(&self, session: &mut Session, turn: &Turn) -> Reply {
        let query = turn.query.trim();

        if let Some(attachment) = &turn.attachment {
            match extract_text(self.extractor.as_ref(), &attachment.name, &attachment.bytes) {
                Some(text) => return self.respond_with_document(session, query, &attachment.name, &text),
                None => info!(
                    "No usable text in {:?}; answering the question alone",
                    attachment.name
                ),
            }
        }

        self.respond_plain(session, query)
    }

    fn respond_with_document(&self, session: &mut Session, query: &str, name: &str, text: &str) -> Reply {
        session.remember(name, text);

        if is_summary_request(query) {
            let topics = scan(text, self.catalog);
            debug!("Summary of {:?}: {:?}", name, topics);
            return Reply::new(ReplyKind::Checklist, format::render_checklist(name, &topics));
        }

        let combined = format!("{}\n{}", query, text);
        match best_match(&combined, self.catalog) {
            Some(m) => Reply::new(
                ReplyKind::Concept(m.record.topic.clone()),
                format::render_concept(m.record),
            ),
            None => Reply::new(ReplyKind::DocumentNoted, format::render_document_noted(name)),
        }
    }

    fn respond_plain(&self, session: &Session, query: &str) -> Reply {
        if is_greeting(query) {
            return Reply::new(ReplyKind::Greeting, format::GREETING);
        }

        if let (Some(api_key), Some(backend)) = (session.api_key.as_deref(), self.backend.as_deref()) {
            let system = system_prompt(&session.context(MAX_CONTEXT_CHARS));
            return match backend.complete(api_key, &system, query) {
                Ok(answer) => Reply::new(ReplyKind::Backend, answer),
                Err(e) => {
                    warn!("Chat backend failed: {}", e);
                    Reply::new(ReplyKind::BackendError, format::render_backend_error(&e.to_string()))
                }
            };
        }

        if let Some(m) = best_match(query, self.catalog) {
            return Reply::new(
                ReplyKind::Concept(m.record.topic.clone()),
                format::render_concept(m.record),
            );
        }

        if let Some(hit) = session.recall(query) {
            debug!("Answered from learned fragment {:?}", hit.source_name);
            return Reply::new(
                ReplyKind::FragmentHit,
                format::render_fragment_hit(hit.source_name, &hit.excerpt),
            );
        }

        Reply::new(ReplyKind::Fallback, format::render_fallback(self.catalog))
    }
}

// ============================================================================
// Tests
// ============================================================================
