//! Study Buddy - offline study assistant for a university student portal
//!
//! Answers questions from a static catalog of computer science concepts:
//! - concept matching: keyword overlap plus a topic-name bonus picks one record
//! - document scanning: which known concepts a block of notes covers
//! - session memory: notes the student shared, searched for follow-ups
//! - optional AI backend when the student supplies an API key
//!
//! # Performance
//! - O(n*k) matching where n=concepts, k=keywords per concept

pub mod assistant;
pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod llm;
pub mod matcher;
pub mod memory;
pub mod scanner;

pub use assistant::{Assistant, Attachment, Reply, ReplyKind, Turn};
pub use catalog::{BuiltinCatalog, Catalog, CatalogSource, ConceptRecord};
pub use config::Config;
pub use error::BuddyError;
pub use matcher::{best_match, match_batch, score_batch, BatchMatch, BatchScores, ConceptMatch, MatchWeights};
pub use memory::{LearnedFragment, Session, SessionStore};
pub use scanner::scan;
