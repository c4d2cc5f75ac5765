//! Relocatable schema elimination.
//!
//! Pure predicate machinery used by the path table. A relocatable schema is a
//! candidate for a path iff it declares every key observed changing there:
//!
//! `consistent(schema, keys) = declared_keys(schema) ⊇ keys`
//!
//! No scoring and no partial credit. Nothing here touches path state, so every
//! function can be tested without any notification timing.

use std::collections::BTreeSet;

use crate::catalog::{SchemaCatalog, SchemaDef, SchemaId};

/// Superset test.
pub fn consistent(schema: &SchemaDef, keys: &BTreeSet<String>) -> bool {
    keys.iter().all(|k| schema.declares(k))
}

/// Initial candidate set for a path seen for the first time.
///
/// An empty key set is satisfied by every schema.
pub fn seed(catalog: &SchemaCatalog, keys: &BTreeSet<String>) -> BTreeSet<SchemaId> {
    catalog
        .relocatable()
        .filter(|schema| consistent(schema, keys))
        .map(|schema| schema.id.clone())
        .collect()
}

/// Drop candidates that do not declare every key in `keys`.
///
/// Returns the removed ids in id order. Ids unknown to the catalog are
/// removed as well. The set only ever shrinks.
pub fn audit(
    catalog: &SchemaCatalog,
    candidates: &mut BTreeSet<SchemaId>,
    keys: &BTreeSet<String>,
) -> Vec<SchemaId> {
    if keys.is_empty() {
        return Vec::new();
    }

    let mut removed = Vec::new();
    candidates.retain(|id| {
        let keep = catalog
            .relocatable_by_id(id)
            .is_some_and(|schema| consistent(schema, keys));
        if !keep {
            removed.push(id.clone());
        }
        keep
    });
    removed
}

/// Outcome of inspecting a candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Exactly one candidate left.
    Elected(SchemaId),
    /// More than one candidate left.
    Ambiguous(usize),
    /// No schema explains the observed keys.
    Exhausted,
}

pub fn verdict(candidates: &BTreeSet<SchemaId>) -> Verdict {
    match candidates.len() {
        0 => Verdict::Exhausted,
        1 => match candidates.first() {
            Some(id) => Verdict::Elected(id.clone()),
            None => Verdict::Exhausted,
        },
        n => Verdict::Ambiguous(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ks: &[&str]) -> BTreeSet<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_defs([
            SchemaDef::relocatable("A", ["host", "port"]),
            SchemaDef::relocatable("B", ["host", "user"]),
            SchemaDef::relocatable("C", ["color"]),
            SchemaDef::fixed("F", "/fixed/", ["host", "port", "user"]),
        ])
        .catalog
    }

    #[test]
    fn consistency_is_a_superset_test() {
        let a = SchemaDef::relocatable("A", ["host", "port"]);
        assert!(consistent(&a, &keys(&[])));
        assert!(consistent(&a, &keys(&["host"])));
        assert!(consistent(&a, &keys(&["host", "port"])));
        assert!(!consistent(&a, &keys(&["host", "user"])));
    }

    #[test]
    fn seed_ignores_fixed_schemas() {
        let cat = catalog();
        let ids: Vec<String> = seed(&cat, &keys(&["host"])).into_iter().map(|s| s.0).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn seed_with_no_keys_returns_everything() {
        assert_eq!(seed(&catalog(), &keys(&[])).len(), 3);
    }

    #[test]
    fn audit_only_removes() {
        let cat = catalog();
        let mut cands = seed(&cat, &keys(&["host"]));

        let removed = audit(&cat, &mut cands, &keys(&["port"]));
        assert_eq!(removed, vec![SchemaId::new("B")]);
        assert_eq!(verdict(&cands), Verdict::Elected(SchemaId::new("A")));

        // A key only "C" declares cannot bring C back.
        let removed = audit(&cat, &mut cands, &keys(&["color"]));
        assert_eq!(removed, vec![SchemaId::new("A")]);
        assert_eq!(verdict(&cands), Verdict::Exhausted);
    }

    #[test]
    fn audit_with_no_keys_is_a_noop() {
        let cat = catalog();
        let mut cands = seed(&cat, &keys(&[]));
        let before = cands.clone();
        assert!(audit(&cat, &mut cands, &keys(&[])).is_empty());
        assert_eq!(cands, before);
        assert_eq!(verdict(&cands), Verdict::Ambiguous(3));
    }
}
