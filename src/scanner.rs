//! Document concept scanning: which catalog topics appear in a block of text.
//!
//! Unlike the matcher this is presence detection only. Every concept with at
//! least one keyword in the text is reported once, in catalog order.

use crate::catalog::Catalog;
use tracing::debug;

/// Topics whose keywords occur in `text`, unique, in catalog order.
pub fn scan(text: &str, catalog: &Catalog) -> Vec<String> {
    let text_lower = text.to_lowercase();
    let mut found: Vec<String> = Vec::new();

    for record in catalog.iter() {
        let present = record.keywords.iter().any(|kw| {
            let kw_lower = kw.to_lowercase();
            !kw_lower.is_empty() && text_lower.contains(&kw_lower)
        });
        if present && !found.iter().any(|t| t == &record.topic) {
            found.push(record.topic.clone());
        }
    }

    debug!("Scan found {} of {} concepts", found.len(), catalog.len());
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BuiltinCatalog, ConceptRecord};

    #[test]
    fn test_memory_management_scenario() {
        let lite = BuiltinCatalog::Lite.catalog();
        let topics = scan("Processes use paging and virtual memory for management", lite);
        assert_eq!(topics, vec!["Memory Management".to_string()]);
    }

    #[test]
    fn test_no_keywords_gives_empty() {
        let lite = BuiltinCatalog::Lite.catalog();
        assert!(scan("The canteen opens at nine on weekdays.", lite).is_empty());
        assert!(scan("", lite).is_empty());
    }

    #[test]
    fn test_no_duplicates_and_catalog_order() {
        // Two records share a display title; it is reported once.
        let catalog = Catalog::new(
            "t",
            vec![
                ConceptRecord::new("a", "Trees", "x").with_keywords(["tree", "leaf"]),
                ConceptRecord::new("b", "Hashing", "y").with_keywords(["hash"]),
                ConceptRecord::new("c", "Trees", "z").with_keywords(["forest"]),
            ],
        );
        let topics = scan("A HASH of every tree leaf in the forest", &catalog);
        assert_eq!(topics, vec!["Trees".to_string(), "Hashing".to_string()]);
    }

    #[test]
    fn test_scan_over_cs_notes() {
        let cs = BuiltinCatalog::Cs.catalog();
        let notes = "Unit 3: Round Robin scheduling, the Banker's algorithm for deadlock avoidance.";
        assert_eq!(
            scan(notes, cs),
            vec!["Process Scheduling".to_string(), "Deadlock".to_string()]
        );
    }
}
