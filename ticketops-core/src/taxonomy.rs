//! Classifier hierarchy resolution
//!
//! Expands one classifier selection into the inclusive id set it should
//! match against ticket leaf classifiers: the node itself plus every
//! classifier listing it as an ancestor, at any depth. The ancestors lists
//! form a DAG rooted at the top-level nodes by construction; no cycle
//! detection is performed here; malformed reference data is the dataset's
//! problem, not this resolver's.

use crate::analytics::{ClassifierScope, ClassifierSelection};
use crate::db::Database;
use crate::error::Result;
use crate::types::Classifier;

/// Resolve a UI selection into a match scope.
///
/// `All` resolves to the unconstrained marker (distinct from an empty id
/// set, which would match nothing). A node resolves to itself plus all its
/// descendants.
pub fn resolve_scope(db: &Database, selection: &ClassifierSelection) -> Result<ClassifierScope> {
    match selection {
        ClassifierSelection::All => Ok(ClassifierScope::All),
        ClassifierSelection::Node(id) => {
            let mut ids = vec![id.clone()];
            ids.extend(db.descendant_classifier_ids(id)?);
            Ok(ClassifierScope::Ids(ids))
        }
    }
}

/// The selectable classifier list for UI population: nodes with level >= 2,
/// sorted by name ascending, prefixed with the All sentinel.
pub fn selectable_classifiers(db: &Database) -> Result<Vec<ClassifierSelection>> {
    let mut options = vec![ClassifierSelection::All];
    options.extend(
        db.selectable_classifiers()?
            .into_iter()
            .map(|c| ClassifierSelection::Node(c.id)),
    );
    Ok(options)
}

/// Build a classifier node, deriving `ancestors` from its parent chain.
///
/// Convenience for seeding: `parent` must already carry its own ancestors.
pub fn child_of(parent: &Classifier, id: &str, name: &str) -> Classifier {
    let mut ancestors = parent.ancestors.clone();
    ancestors.push(parent.id.clone());
    Classifier {
        id: id.to_string(),
        name: name.to_string(),
        level: parent.level + 1,
        parent_id: Some(parent.id.clone()),
        ancestors,
    }
}

/// Build a root classifier (level 0, no ancestors).
pub fn root(id: &str, name: &str) -> Classifier {
    Classifier {
        id: id.to_string(),
        name: name.to_string(),
        level: 0,
        parent_id: None,
        ancestors: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_db() -> Database {
        // A -> {B, C}, B -> {D}
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let a = root("A", "Alpha");
        let b = child_of(&a, "B", "Bravo");
        let c = child_of(&a, "C", "Charlie");
        let d = child_of(&b, "D", "Delta");
        for node in [&a, &b, &c, &d] {
            db.insert_classifier(node).unwrap();
        }
        db
    }

    fn ids_of(scope: ClassifierScope) -> Vec<String> {
        match scope {
            ClassifierScope::Ids(mut ids) => {
                ids.sort();
                ids
            }
            ClassifierScope::All => panic!("expected a constrained scope"),
        }
    }

    #[test]
    fn test_resolution_is_reflexive_and_transitive() {
        let db = tree_db();

        let a = resolve_scope(&db, &ClassifierSelection::Node("A".into())).unwrap();
        assert_eq!(ids_of(a), vec!["A", "B", "C", "D"]);

        let b = resolve_scope(&db, &ClassifierSelection::Node("B".into())).unwrap();
        assert_eq!(ids_of(b), vec!["B", "D"]);

        // A leaf resolves to itself alone.
        let c = resolve_scope(&db, &ClassifierSelection::Node("C".into())).unwrap();
        assert_eq!(ids_of(c), vec!["C"]);
    }

    #[test]
    fn test_all_sentinel_resolves_unconstrained() {
        let db = tree_db();
        let scope = resolve_scope(&db, &ClassifierSelection::All).unwrap();
        assert_eq!(scope, ClassifierScope::All);
    }

    #[test]
    fn test_selectable_list_is_level_two_and_up_by_name() {
        let db = tree_db();
        // Levels: A=0, B=C=1, D=2. Only D is selectable, after the sentinel.
        let options = selectable_classifiers(&db).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0], ClassifierSelection::All);
        assert_eq!(options[1], ClassifierSelection::Node("D".into()));
    }

    #[test]
    fn test_child_of_builds_ancestor_chain() {
        let a = root("A", "Alpha");
        let b = child_of(&a, "B", "Bravo");
        let d = child_of(&b, "D", "Delta");
        assert_eq!(d.level, 2);
        assert_eq!(d.ancestors, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(d.parent_id.as_deref(), Some("B"));
    }
}
