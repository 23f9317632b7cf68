//! Drill-down tree assembly. A row's key is the `::`-joined sequence of
//! ancestor dimension values down to and including its own value; depth is
//! the separator count. Key and depth are stored redundantly, and the
//! consistency check between them fails loudly rather than trusting either.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::error;
use tracklens_core::error::{ReportError, ReportResult};

/// Reserved key separator; dimension values must never contain it.
pub const KEY_SEPARATOR: &str = "::";

/// One drill-down tree node. Children stay empty until the caller expands
/// the row and attaches the next level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub key: String,
    pub attribute: String,
    pub depth: usize,
    pub has_children: bool,
    pub metrics: HashMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    pub depth: usize,
    pub values: Vec<String>,
}

/// Append a value to a parent key. A value containing the reserved
/// separator would produce an ambiguous key and is rejected as a
/// data-integrity failure.
pub fn encode_child_key(parent: Option<&str>, value: &str) -> ReportResult<String> {
    if value.contains(KEY_SEPARATOR) {
        let message = format!("dimension value {value:?} contains reserved separator");
        error!(value, "refusing ambiguous drill-down key");
        return Err(ReportError::ReconciliationMismatch(message));
    }
    Ok(match parent {
        Some(parent) => format!("{parent}{KEY_SEPARATOR}{value}"),
        None => value.to_string(),
    })
}

/// Split a key back into its value sequence. Depth equals the separator
/// count, so it is always derivable from the key alone.
pub fn decode_key(key: &str) -> DecodedKey {
    let values: Vec<String> = key.split(KEY_SEPARATOR).map(str::to_string).collect();
    DecodedKey {
        depth: values.len() - 1,
        values,
    }
}

/// The equality filters every row one level below this key shares: the
/// keyed row's full value sequence, zipped against the dimension ids by
/// position. Exactly what the query builder needs to fetch its children.
pub fn build_parent_filters(
    key: &str,
    dimensions: &[String],
) -> ReportResult<BTreeMap<String, String>> {
    let decoded = decode_key(key);
    if decoded.values.len() > dimensions.len() {
        return Err(ReportError::ReconciliationMismatch(format!(
            "key {key:?} is deeper than the {} configured dimensions",
            dimensions.len()
        )));
    }
    Ok(dimensions
        .iter()
        .zip(decoded.values)
        .map(|(id, value)| (id.clone(), value))
        .collect())
}

/// Verify the redundant depth a row carries against its key.
pub fn check_consistency(row: &ReportRow) -> ReportResult<()> {
    let decoded = decode_key(&row.key);
    if decoded.depth != row.depth {
        let message = format!(
            "row {:?} carries depth {} but its key decodes to depth {}",
            row.key, row.depth, decoded.depth
        );
        error!(key = %row.key, "drill-down key/depth mismatch");
        return Err(ReportError::ReconciliationMismatch(message));
    }
    Ok(())
}

/// Depth-first search over already-loaded nodes only; never fetches.
pub fn find_by_key<'a>(rows: &'a [ReportRow], key: &str) -> Option<&'a ReportRow> {
    for row in rows {
        if row.key == key {
            return Some(row);
        }
        if let Some(found) = find_by_key(&row.children, key) {
            return Some(found);
        }
    }
    None
}

fn find_by_key_mut<'a>(rows: &'a mut [ReportRow], key: &str) -> Option<&'a mut ReportRow> {
    for row in rows {
        if row.key == key {
            return Some(row);
        }
        if let Some(found) = find_by_key_mut(&mut row.children, key) {
            return Some(found);
        }
    }
    None
}

/// Attach a freshly fetched level under the row the user expanded. Every
/// child is consistency-checked before the tree is touched.
pub fn attach_children(
    roots: &mut [ReportRow],
    parent_key: &str,
    children: Vec<ReportRow>,
) -> ReportResult<()> {
    let prefix = format!("{parent_key}{KEY_SEPARATOR}");
    for child in &children {
        check_consistency(child)?;
        if !child.key.starts_with(&prefix) {
            return Err(ReportError::ReconciliationMismatch(format!(
                "child key {:?} does not extend parent key {parent_key:?}",
                child.key
            )));
        }
    }

    let parent = find_by_key_mut(roots, parent_key).ok_or_else(|| {
        ReportError::ReconciliationMismatch(format!("parent key {parent_key:?} is not loaded"))
    })?;
    parent.children = children;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, depth: usize) -> ReportRow {
        ReportRow {
            key: key.to_string(),
            attribute: key
                .rsplit(KEY_SEPARATOR)
                .next()
                .unwrap_or_default()
                .to_string(),
            depth,
            has_children: true,
            metrics: HashMap::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_key_encoding_round_trip() {
        let root = encode_child_key(None, "facebook").unwrap();
        let child = encode_child_key(Some(&root), "summer-sale").unwrap();
        let grandchild = encode_child_key(Some(&child), "audience-a").unwrap();
        assert_eq!(grandchild, "facebook::summer-sale::audience-a");

        let decoded = decode_key(&grandchild);
        assert_eq!(decoded.depth, 2);
        assert_eq!(decoded.values, vec!["facebook", "summer-sale", "audience-a"]);
    }

    #[test]
    fn test_depth_is_derivable_from_key_alone() {
        for (key, depth) in [("facebook", 0), ("facebook::summer", 1), ("a::b::c::d", 3)] {
            assert_eq!(decode_key(key).depth, depth);
            assert!(check_consistency(&row(key, depth)).is_ok());
        }
    }

    #[test]
    fn test_depth_mismatch_is_loud() {
        let err = check_consistency(&row("facebook::summer", 2)).unwrap_err();
        assert!(matches!(err, ReportError::ReconciliationMismatch(_)));
    }

    #[test]
    fn test_separator_inside_value_is_rejected() {
        let err = encode_child_key(None, "odd::value").unwrap_err();
        assert!(matches!(err, ReportError::ReconciliationMismatch(_)));
    }

    #[test]
    fn test_build_parent_filters_zips_values_by_position() {
        let dimensions = vec![
            "network".to_string(),
            "campaign".to_string(),
            "adset".to_string(),
        ];
        let filters = build_parent_filters("facebook::summer", &dimensions).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters["network"], "facebook");
        assert_eq!(filters["campaign"], "summer");
    }

    #[test]
    fn test_build_parent_filters_rejects_over_deep_key() {
        let dimensions = vec!["network".to_string()];
        let err = build_parent_filters("facebook::summer", &dimensions).unwrap_err();
        assert!(matches!(err, ReportError::ReconciliationMismatch(_)));
    }

    #[test]
    fn test_attach_children_under_expanded_row() {
        let mut roots = vec![row("facebook", 0), row("google", 0)];
        attach_children(
            &mut roots,
            "facebook",
            vec![row("facebook::summer", 1), row("facebook::winter", 1)],
        )
        .unwrap();

        let parent = find_by_key(&roots, "facebook").unwrap();
        assert_eq!(parent.children.len(), 2);

        // Deeper levels attach through the already-loaded tree.
        attach_children(
            &mut roots,
            "facebook::summer",
            vec![row("facebook::summer::audience-a", 2)],
        )
        .unwrap();
        assert!(find_by_key(&roots, "facebook::summer::audience-a").is_some());
        assert!(find_by_key(&roots, "google").unwrap().children.is_empty());
    }

    #[test]
    fn test_attach_rejects_inconsistent_children() {
        let mut roots = vec![row("facebook", 0)];
        let err = attach_children(&mut roots, "facebook", vec![row("facebook::summer", 2)])
            .unwrap_err();
        assert!(matches!(err, ReportError::ReconciliationMismatch(_)));
        // Nothing was attached.
        assert!(find_by_key(&roots, "facebook").unwrap().children.is_empty());

        let err = attach_children(&mut roots, "facebook", vec![row("google::summer", 1)])
            .unwrap_err();
        assert!(matches!(err, ReportError::ReconciliationMismatch(_)));
    }

    #[test]
    fn test_attach_to_unloaded_parent_fails() {
        let mut roots = vec![row("facebook", 0)];
        let err =
            attach_children(&mut roots, "tiktok", vec![row("tiktok::summer", 1)]).unwrap_err();
        assert!(matches!(err, ReportError::ReconciliationMismatch(_)));
    }

    #[test]
    fn test_find_by_key_searches_loaded_nodes_only() {
        let roots = vec![row("facebook", 0)];
        assert!(find_by_key(&roots, "facebook::summer").is_none());
    }
}
