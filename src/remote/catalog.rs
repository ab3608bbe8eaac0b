//! Catalog tree flattening and snapshot persistence.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::CatalogSnapshot;

/// One node of the catalog tree as returned by the API. Nodes without children are leaves.
#[derive(Clone, Debug, Deserialize)]
pub struct CatalogNode {
    pub label: String,
    #[serde(default)]
    pub children: Option<Vec<CatalogNode>>,
}

/// Depth-first, document-order list of `/`-joined labels for every leaf.
pub fn flatten_catalog(nodes: &[CatalogNode]) -> Vec<String> {
    let mut paths = Vec::new();
    flatten_into(nodes, "", &mut paths);
    paths
}

fn flatten_into(nodes: &[CatalogNode], parent: &str, out: &mut Vec<String>) {
    for node in nodes {
        let current = if parent.is_empty() {
            node.label.clone()
        } else {
            format!("{parent}/{}", node.label)
        };
        match node.children.as_deref() {
            Some(children) if !children.is_empty() => flatten_into(children, &current, out),
            _ => out.push(current),
        }
    }
}

/// Write the snapshot as pretty JSON.
pub fn save_snapshot(path: &Path, snapshot: &CatalogSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("serialize catalog snapshot")?;
    std::fs::write(path, json)
        .with_context(|| format!("write catalog snapshot {}", path.display()))
}

/// Read a snapshot written by [`save_snapshot`]. Missing or malformed files are errors.
pub fn load_snapshot(path: &Path) -> Result<CatalogSnapshot> {
    let s = std::fs::read_to_string(path).with_context(|| {
        format!(
            "read catalog snapshot {} (fetch the catalog first)",
            path.display()
        )
    })?;
    serde_json::from_str(&s).with_context(|| format!("parse catalog snapshot {}", path.display()))
}
