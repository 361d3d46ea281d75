//! Session memory: documents the user has shared, kept per user.
//!
//! A [`Session`] is the explicit context object for one user. It owns the
//! learned fragments, the optional API key and, when persistence is enabled,
//! a [`SessionStore`] handle. Fragments are only ever appended; the store is
//! rewritten after every append.

use crate::error::BuddyError;
use crate::extract::truncate_chars;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Application directory name under the platform data dir
const APP_DIR: &str = "study-buddy";

/// Subdirectory holding one JSON file per user
const MEMORY_DIR: &str = "memory";

/// Characters shown on each side of a hit in a fragment excerpt
const EXCERPT_RADIUS: usize = 160;

/// Query words must be longer than this to be looked up on their own
const MIN_LOOKUP_WORD_CHARS: usize = 4;

lazy_static! {
    static ref RE_WORD: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

// ============================================================================
// Fragments
// ============================================================================

/// Text extracted from a user-supplied document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedFragment {
    pub source_name: String,
    pub extracted_text: String,
    pub captured_at: DateTime<Utc>,
}

/// A learned fragment that answers a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentHit<'a> {
    pub source_name: &'a str,
    pub excerpt: String,
}

// ============================================================================
// Persistence
// ============================================================================

/// Directory of per-user memory files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data_dir>/study-buddy/memory`
    pub fn default_dir() -> Result<PathBuf, BuddyError> {
        let data = dirs::data_dir().ok_or(BuddyError::NoHomeDir)?;
        Ok(data.join(APP_DIR).join(MEMORY_DIR))
    }

    /// Memory file for `user_id`; the id is reduced to a safe file stem.
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        let stem: String = user_id
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let stem = if stem.is_empty() { "anonymous".to_string() } else { stem };
        self.dir.join(format!("{}.json", stem))
    }

    /// Stored fragments for `user_id`; a user with no file has none.
    pub fn load(&self, user_id: &str) -> Result<Vec<LearnedFragment>, BuddyError> {
        let path = self.path_for(user_id);
        if !path.exists() {
            debug!("No memory file at {:?}", path);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).map_err(|e| BuddyError::MemoryRead {
            path: path.clone(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| BuddyError::MemoryParse {
            path,
            reason: e.to_string(),
        })
    }

    /// Replace the stored fragments for `user_id`.
    pub fn save(&self, user_id: &str, fragments: &[LearnedFragment]) -> Result<(), BuddyError> {
        let path = self.path_for(user_id);
        let write_err = |source| BuddyError::MemoryWrite {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;

        let json = serde_json::to_string_pretty(fragments)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &path).map_err(write_err)?;

        debug!("Saved {} fragments to {:?}", fragments.len(), path);
        Ok(())
    }

    /// Delete the memory file; returns whether one existed.
    pub fn forget(&self, user_id: &str) -> Result<bool, BuddyError> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| BuddyError::MemoryWrite { path, source: e })?;
        Ok(true)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Per-user conversation context.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    /// Key for the optional AI backend; `None` keeps the assistant offline
    pub api_key: Option<String>,
    fragments: Vec<LearnedFragment>,
    store: Option<SessionStore>,
}

impl Session {
    /// A session that keeps its memory in RAM only.
    pub fn ephemeral(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            api_key: None,
            fragments: Vec::new(),
            store: None,
        }
    }

    /// Load `user_id`'s memory from `store` and persist future appends there.
    pub fn open(store: SessionStore, user_id: impl Into<String>) -> Result<Self, BuddyError> {
        let user_id = user_id.into();
        let fragments = store.load(&user_id)?;
        info!("Session for {:?} starts with {} learned fragments", user_id, fragments.len());
        Ok(Self {
            user_id,
            api_key: None,
            fragments,
            store: Some(store),
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn fragments(&self) -> &[LearnedFragment] {
        &self.fragments
    }

    /// Append a document's text and write the memory back.
    ///
    /// A failed write is logged; the fragment stays available for this
    /// session either way.
    pub fn remember(&mut self, source_name: &str, text: &str) {
        self.fragments.push(LearnedFragment {
            source_name: source_name.to_string(),
            extracted_text: text.to_string(),
            captured_at: Utc::now(),
        });
        info!("Learned {:?} ({} chars)", source_name, text.chars().count());

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.user_id, &self.fragments) {
                warn!("Could not persist session memory: {}", e);
            }
        }
    }

    /// First fragment containing the whole query, or any query word longer
    /// than four characters, in the order the fragments were learned.
    pub fn recall(&self, query: &str) -> Option<FragmentHit<'_>> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return None;
        }

        let long_words: Vec<&str> = RE_WORD
            .find_iter(&query_lower)
            .map(|m| m.as_str())
            .filter(|w| w.chars().count() > MIN_LOOKUP_WORD_CHARS)
            .collect();

        for fragment in &self.fragments {
            let (text_lower, origin) = lowercase_with_origin(&fragment.extracted_text);
            let hit = text_lower
                .find(&query_lower)
                .or_else(|| long_words.iter().find_map(|w| text_lower.find(*w)));
            if let Some(byte_pos) = hit {
                let lower_char_pos = text_lower[..byte_pos].chars().count();
                let char_pos = origin.get(lower_char_pos).copied().unwrap_or(0);
                return Some(FragmentHit {
                    source_name: &fragment.source_name,
                    excerpt: excerpt_around(&fragment.extracted_text, char_pos),
                });
            }
        }
        None
    }

    /// Learned text for an AI system prompt, newest last, capped.
    pub fn context(&self, max_chars: usize) -> String {
        let joined = self
            .fragments
            .iter()
            .map(|f| format!("[{}]\n{}", f.source_name, f.extracted_text))
            .collect::<Vec<_>>()
            .join("\n\n");
        truncate_chars(&joined, max_chars)
    }
}

/// Lowercased `text` plus, for each of its chars, the index of the char in
/// `text` it came from. Lowercasing may expand one char into several ('İ').
fn lowercase_with_origin(text: &str) -> (String, Vec<usize>) {
    let mut lower = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());
    for (idx, c) in text.chars().enumerate() {
        for lc in c.to_lowercase() {
            lower.push(lc);
            origin.push(idx);
        }
    }
    (lower, origin)
}

/// Up to `EXCERPT_RADIUS` characters either side of `char_pos`.
fn excerpt_around(text: &str, char_pos: usize) -> String {
    let total = text.chars().count();
    let start = char_pos.saturating_sub(EXCERPT_RADIUS);
    let end = (char_pos + EXCERPT_RADIUS).min(total);
    let body: String = text
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut excerpt = String::new();
    if start > 0 {
        excerpt.push_str("...");
    }
    excerpt.push_str(&body);
    if end < total {
        excerpt.push_str("...");
    }
    excerpt
}
