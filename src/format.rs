//! Reply rendering.
//!
//! Everything here is a pure function of its inputs: no clock, no colour
//! codes, no randomness, so the same record always renders to the same bytes.

use crate::catalog::{Catalog, ConceptRecord};

/// How many catalog topics the fallback message suggests
const FALLBACK_SUGGESTIONS: usize = 3;

pub const GREETING: &str = "Hello! I'm your study buddy. Ask me about a topic like \
\"binary search\" or \"paging\", or attach your notes and ask me to summarize them.";

pub const NOT_SURE: &str = "I'm not sure about that one yet.";

/// Render a matched concept as a fixed-order text block.
///
/// Order: title, definition, explanation, analogy, example, complexity,
/// practice questions, related topics. Absent optional fields are skipped.
pub fn render_concept(record: &ConceptRecord) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(title_line(record));

    if let Some(definition) = &record.definition {
        lines.push(format!("Definition: {}", definition));
    }

    lines.push(record.explanation.clone());

    if let Some(simple) = &record.simple {
        lines.push(format!("> In simple terms: {}", simple));
    }

    if let Some(example) = &record.example {
        lines.push(format!("Example: `{}`", example));
    }

    if let Some(complexity) = &record.complexity {
        lines.push(format!("Complexity: {}", complexity));
    }

    if let Some(questions) = record.questions.as_ref().filter(|q| !q.is_empty()) {
        lines.push("Practice questions:".to_string());
        lines.extend(questions.iter().map(|q| format!("- {}", q)));
    }

    if let Some(related) = record.related.as_ref().filter(|r| !r.is_empty()) {
        lines.push(format!("Related: {}", related.join(", ")));
    }

    lines.join("\n")
}

fn title_line(record: &ConceptRecord) -> String {
    let label = match (&record.semester, &record.subject) {
        (Some(semester), Some(subject)) => format!(" ({}, {})", semester, subject),
        (Some(semester), None) => format!(" ({})", semester),
        (None, Some(subject)) => format!(" ({})", subject),
        (None, None) => String::new(),
    };
    format!("## {}{}", record.topic, label)
}

/// Topic checklist for a scanned document.
///
/// An empty topic list is a normal outcome and renders the neutral
/// "noted" message.
pub fn render_checklist(source_name: &str, topics: &[String]) -> String {
    if topics.is_empty() {
        return format!(
            "Noted \"{}\". I didn't spot any topics I know in it, but I'll remember the text for follow-up questions.",
            source_name
        );
    }

    let mut lines = vec![format!("Topics covered in \"{}\":", source_name)];
    lines.extend(topics.iter().map(|t| format!("- [x] {}", t)));
    lines.join("\n")
}

/// Acknowledge a learned document when the question matched nothing.
pub fn render_document_noted(source_name: &str) -> String {
    format!(
        "I've read \"{}\" and will keep it in mind. {} Try asking me to summarize it.",
        source_name, NOT_SURE
    )
}

/// Excerpt from a learned fragment answering a follow-up question.
pub fn render_fragment_hit(source_name: &str, excerpt: &str) -> String {
    format!("From your notes \"{}\":\n> {}", source_name, excerpt)
}

/// Static last-resort reply suggesting a few known topics.
pub fn render_fallback(catalog: &Catalog) -> String {
    let suggestions: Vec<&str> = catalog.topics().into_iter().take(FALLBACK_SUGGESTIONS).collect();
    match suggestions.as_slice() {
        [] => NOT_SURE.to_string(),
        [only] => format!("{} Try asking about {}.", NOT_SURE, only),
        [init @ .., last] => format!(
            "{} Try asking about {} or {}.",
            NOT_SURE,
            init.join(", "),
            last
        ),
    }
}

/// One-line message for a failed external call.
pub fn render_backend_error(reason: &str) -> String {
    format!("⚠️ The AI service could not answer: {}", reason)
}

// ============================================================================
// Tests
// ============================================================================
