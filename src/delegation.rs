use crate::graph::Document;

/// Names of principals trusted for unconstrained delegation, in node order.
/// Duplicates are kept and privilege is not considered.
pub fn extract_unconstrained_delegation(doc: &Document) -> Vec<String> {
    doc.nodes
        .iter()
        .filter(|n| n.properties.is_unconstrained_delegation())
        .map(|n| n.display_name())
        .collect()
}
