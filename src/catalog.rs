//! Concept catalog: the static, versioned set of topics the assistant knows.
//!
//! Two catalogs are compiled into the binary (`lite` and `cs`); a catalog with
//! the same JSON schema can also be loaded from disk. Either way the catalog is
//! deserialized once and never mutated afterwards.

use crate::error::BuddyError;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

// ============================================================================
// Catalog Types
// ============================================================================

/// One domain topic in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConceptRecord {
    /// Unique opaque identifier
    pub id: String,

    /// Display title
    pub topic: String,

    /// Phrases matched by case-insensitive substring containment
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Long-form explanation, always rendered
    pub explanation: String,

    #[serde(default)]
    pub definition: Option<String>,

    /// Plain-language analogy
    #[serde(default)]
    pub simple: Option<String>,

    #[serde(default)]
    pub example: Option<String>,

    #[serde(default)]
    pub complexity: Option<String>,

    /// Practice questions
    #[serde(default)]
    pub questions: Option<Vec<String>>,

    /// Topic names of related concepts (soft references, never resolved by id)
    #[serde(default)]
    pub related: Option<Vec<String>>,

    #[serde(default)]
    pub semester: Option<String>,

    #[serde(default)]
    pub subject: Option<String>,
}

impl ConceptRecord {
    /// Minimal record with only the required fields set.
    pub fn new(id: impl Into<String>, topic: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            keywords: Vec::new(),
            explanation: explanation.into(),
            definition: None,
            simple: None,
            example: None,
            complexity: None,
            questions: None,
            related: None,
            semester: None,
            subject: None,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// The complete catalog as shipped or loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Catalog {
    /// Catalog data version
    pub version: String,

    /// Records in catalog order; order decides ties in matching
    pub concepts: Vec<ConceptRecord>,
}

/// Topics of one semester, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlossarySection<'a> {
    pub semester: &'a str,
    pub topics: Vec<&'a str>,
}

const UNSORTED_SECTION: &str = "Unsorted";

impl Catalog {
    pub fn new(version: impl Into<String>, concepts: Vec<ConceptRecord>) -> Self {
        Self {
            version: version.into(),
            concepts,
        }
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(content: &str) -> Result<Self, BuddyError> {
        let catalog: Catalog =
            serde_json::from_str(content).map_err(|e| BuddyError::CatalogParse(e.to_string()))?;
        catalog.warn_on_suspicious_records();
        Ok(catalog)
    }

    /// Load and parse a catalog file.
    pub fn load(path: &Path) -> Result<Self, BuddyError> {
        if !path.exists() {
            return Err(BuddyError::CatalogNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| BuddyError::CatalogRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let catalog = Self::from_json(&content)?;
        debug!(
            "Loaded catalog {} ({} concepts) from {:?}",
            catalog.version,
            catalog.len(),
            path
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConceptRecord> {
        self.concepts.iter()
    }

    /// Topic names in catalog order.
    pub fn topics(&self) -> Vec<&str> {
        self.concepts.iter().map(|c| c.topic.as_str()).collect()
    }

    /// Case-insensitive lookup by display title.
    pub fn find_topic(&self, topic: &str) -> Option<&ConceptRecord> {
        let wanted = topic.trim().to_lowercase();
        self.concepts.iter().find(|c| c.topic.to_lowercase() == wanted)
    }

    /// Topics grouped by semester, sections in order of first appearance.
    pub fn glossary(&self) -> Vec<GlossarySection<'_>> {
        let mut sections: Vec<GlossarySection<'_>> = Vec::new();
        for concept in &self.concepts {
            let semester = concept.semester.as_deref().unwrap_or(UNSORTED_SECTION);
            match sections.iter_mut().find(|s| s.semester == semester) {
                Some(section) => section.topics.push(concept.topic.as_str()),
                None => sections.push(GlossarySection {
                    semester,
                    topics: vec![concept.topic.as_str()],
                }),
            }
        }
        sections
    }

    /// Data problems that do not stop loading but make matching weaker.
    fn warn_on_suspicious_records(&self) {
        let mut seen_ids = HashSet::new();
        for concept in &self.concepts {
            if !seen_ids.insert(concept.id.as_str()) {
                warn!("Duplicate concept id {:?} in catalog {}", concept.id, self.version);
            }
            if concept.keywords.iter().all(|k| k.trim().is_empty()) {
                warn!("Concept {:?} has no keywords; only its topic name can match", concept.topic);
            }
        }
    }
}

// ============================================================================
// Built-in Catalogs
// ============================================================================

lazy_static! {
    static ref LITE_CATALOG: Catalog =
        Catalog::from_json(include_str!("../data/study_buddy_lite.json")).unwrap();
    static ref CS_CATALOG: Catalog =
        Catalog::from_json(include_str!("../data/cs_knowledge_base.json")).unwrap();
}

/// The catalogs compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCatalog {
    /// Four-topic starter set
    Lite,
    /// Semester-organized CS knowledge base
    Cs,
}

impl BuiltinCatalog {
    pub fn catalog(self) -> &'static Catalog {
        match self {
            BuiltinCatalog::Lite => &LITE_CATALOG,
            BuiltinCatalog::Cs => &CS_CATALOG,
        }
    }
}

/// Where to take the catalog from: a built-in name or a JSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Builtin(BuiltinCatalog),
    File(PathBuf),
}

impl Default for CatalogSource {
    fn default() -> Self {
        CatalogSource::Builtin(BuiltinCatalog::Cs)
    }
}

impl FromStr for CatalogSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "lite" => CatalogSource::Builtin(BuiltinCatalog::Lite),
            "cs" => CatalogSource::Builtin(BuiltinCatalog::Cs),
            other => CatalogSource::File(PathBuf::from(other)),
        })
    }
}

impl CatalogSource {
    /// Borrow a built-in catalog or load a file-backed one.
    pub fn load(&self) -> Result<Cow<'static, Catalog>, BuddyError> {
        match self {
            CatalogSource::Builtin(builtin) => Ok(Cow::Borrowed(builtin.catalog())),
            CatalogSource::File(path) => Catalog::load(path).map(Cow::Owned),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_catalogs_parse() {
        let lite = BuiltinCatalog::Lite.catalog();
        assert_eq!(lite.len(), 4);
        assert_eq!(
            lite.topics(),
            vec!["Binary Search", "Stack vs Queue", "Memory Management", "Time Complexity"]
        );

        let cs = BuiltinCatalog::Cs.catalog();
        assert!(cs.len() > lite.len());
        assert!(cs.iter().all(|c| !c.keywords.is_empty()));
    }

    #[test]
    fn test_missing_optional_fields_are_none() {
        let json = r#"{
            "version": "t1",
            "concepts": [
                { "id": "a", "topic": "Alpha", "keywords": ["alpha"], "explanation": "first" }
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        let record = &catalog.concepts[0];
        assert_eq!(record.definition, None);
        assert_eq!(record.simple, None);
        assert_eq!(record.questions, None);
        assert_eq!(record.related, None);
        assert_eq!(record.semester, None);
    }

    #[test]
    fn test_explanation_is_required() {
        let json = r#"{ "version": "t1", "concepts": [ { "id": "a", "topic": "Alpha" } ] }"#;
        assert!(matches!(Catalog::from_json(json), Err(BuddyError::CatalogParse(_))));
    }

    #[test]
    fn test_find_topic_ignores_case() {
        let lite = BuiltinCatalog::Lite.catalog();
        let record = lite.find_topic("  binary SEARCH ").unwrap();
        assert_eq!(record.id, "lite-binary-search");
        assert!(lite.find_topic("Quantum Computing").is_none());
    }

    #[test]
    fn test_glossary_groups_by_semester_in_first_seen_order() {
        let lite = BuiltinCatalog::Lite.catalog();
        let glossary = lite.glossary();
        let semesters: Vec<&str> = glossary.iter().map(|s| s.semester).collect();
        assert_eq!(semesters, vec!["Semester 3", "Semester 4", "Semester 2"]);
        assert_eq!(glossary[0].topics, vec!["Binary Search", "Stack vs Queue"]);
    }

    #[test]
    fn test_glossary_unsorted_section() {
        let catalog = Catalog::new("t", vec![ConceptRecord::new("x", "Loose", "no semester")]);
        assert_eq!(catalog.glossary()[0].semester, "Unsorted");
    }

    #[test]
    fn test_catalog_source_parsing() {
        assert_eq!(
            "lite".parse::<CatalogSource>().unwrap(),
            CatalogSource::Builtin(BuiltinCatalog::Lite)
        );
        assert_eq!(
            "/tmp/catalog.json".parse::<CatalogSource>().unwrap(),
            CatalogSource::File(PathBuf::from("/tmp/catalog.json"))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version":"disk","concepts":[{{"id":"d","topic":"Disk","keywords":["disk"],"explanation":"spins"}}]}}"#
        )
        .unwrap();

        let source = CatalogSource::File(file.path().to_path_buf());
        let catalog = source.load().unwrap();
        assert_eq!(catalog.version, "disk");
        assert_eq!(catalog.topics(), vec!["Disk"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, BuddyError::CatalogNotFound(_)));
    }
}
