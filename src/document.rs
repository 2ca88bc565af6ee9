//! Versioned JSON document schema.
//!
//! On disk the forest is nested: each `FileNode` carries its children inline
//! and `parent_id` is implied by the nesting. Loading goes through three
//! steps, each of which can reject the file before any store is touched:
//! version check and migration on the raw JSON, typed deserialization, and
//! structural validation.

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Camera;
use crate::store::{Asset, Node, NodeId, NodeImage, Store};

/// Newest schema version this engine reads and the one it writes.
pub const CURRENT_VERSION: u64 = 2;

/// Deepest JSON nesting accepted on load. Each tree level costs two
/// (`{` of the node, `[` of its children), so this admits about 250 levels.
pub const MAX_NESTING: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u64 },
    #[error("invalid document: {0}")]
    Validation(String),
}

impl DocumentError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedVersion { .. } => "E_UNSUPPORTED_VERSION",
            Self::Validation(_) => "E_VALIDATION",
        }
    }
}

fn invalid(msg: impl Into<String>) -> DocumentError {
    DocumentError::Validation(msg.into())
}

/// Parse without serde_json's fixed recursion limit, which rejects trees
/// deeper than about 60 levels. Depth is bounded by [`MAX_NESTING`] instead,
/// checked before the recursive parser runs.
fn parse_value(json: &str) -> Result<serde_json::Value, DocumentError> {
    let depth = nesting_depth(json);
    if depth > MAX_NESTING {
        tracing::warn!(depth, max = MAX_NESTING, "document nested too deeply");
        return Err(invalid(format!("document nests {depth} levels deep, limit is {MAX_NESTING}")));
    }
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let value = serde_json::Value::deserialize(&mut de).map_err(|e| invalid(e.to_string()))?;
    de.end().map_err(|e| invalid(e.to_string()))?;
    Ok(value)
}

/// Deepest `{`/`[` nesting outside string literals.
fn nesting_depth(json: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for b in json.bytes() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max = max.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub id: Uuid,
    pub theme: String,
}

impl Default for Meta {
    fn default() -> Self {
        Self { id: Uuid::new_v4(), theme: "default".into() }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// A node as written to disk, children nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: NodeId,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub width_constrained: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    /// Kept as a raw value so a non-object style is reported, not silently dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<NodeImage>,
    #[serde(default)]
    pub children: Vec<FileNode>,
}

/// The whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: u64,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub camera: Camera,
    #[serde(default)]
    pub roots: Vec<FileNode>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Document {
    /// Parse, migrate and validate a document.
    ///
    /// # Errors
    ///
    /// `UnsupportedVersion` for files newer than [`CURRENT_VERSION`];
    /// `Validation` for malformed JSON or structural problems.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let raw = parse_value(json)?;
        let migrated = migrate(raw)?;
        let doc: Document = serde_json::from_value(migrated).map_err(|e| invalid(e.to_string()))?;
        doc.validate()?;
        tracing::info!(version = doc.version, roots = doc.roots.len(), assets = doc.assets.len(), "document parsed");
        Ok(doc)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// `Validation` if a value cannot be represented (non-finite numbers).
    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }

    /// Snapshot a store and camera as a current-version document.
    #[must_use]
    pub fn from_store(store: &Store, camera: Camera, meta: Meta) -> Self {
        let roots = store.root_ids().iter().filter_map(|id| file_node(store, *id)).collect();
        Self { version: CURRENT_VERSION, meta, camera, roots, assets: store.assets().to_vec() }
    }

    /// Build the in-memory store.
    ///
    /// # Errors
    ///
    /// `Validation` for any structural problem; the document is checked
    /// first, so nothing is built from an invalid file.
    pub fn to_store(&self) -> Result<Store, DocumentError> {
        self.validate()?;
        let mut nodes = HashMap::new();
        let mut stack: Vec<(&FileNode, Option<NodeId>)> = self.roots.iter().rev().map(|n| (n, None)).collect();
        while let Some((file, parent_id)) = stack.pop() {
            let style = match &file.style {
                Some(serde_json::Value::Object(map)) => Some(map.clone()),
                _ => None,
            };
            let node = Node {
                id: file.id,
                parent_id,
                text: file.text.clone(),
                children: file.children.iter().map(|c| c.id).collect(),
                collapsed: file.collapsed,
                x: file.x,
                y: file.y,
                width: file.width,
                height: file.height,
                width_constrained: file.width_constrained,
                style,
                image: file.image.clone(),
            };
            nodes.insert(file.id, node);
            stack.extend(file.children.iter().rev().map(|c| (c, Some(file.id))));
        }
        let roots = self.roots.iter().map(|n| n.id).collect();
        let store = Store::from_parts(nodes, roots, self.assets.clone());
        store.check_invariants().map_err(|e| invalid(e.to_string()))?;
        Ok(store)
    }

    /// Structural checks that do not depend on building a store.
    ///
    /// # Errors
    ///
    /// `UnsupportedVersion` or `Validation` describing the first problem found.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.version > CURRENT_VERSION {
            return Err(DocumentError::UnsupportedVersion { found: self.version, supported: CURRENT_VERSION });
        }
        let cam = &self.camera;
        if !(cam.x.is_finite() && cam.y.is_finite() && cam.zoom.is_finite()) {
            return Err(invalid("camera has non-finite values"));
        }
        if cam.zoom <= 0.0 {
            return Err(invalid(format!("camera zoom must be positive, got {}", cam.zoom)));
        }

        let mut asset_ids = HashSet::new();
        for asset in &self.assets {
            if !asset_ids.insert(asset.id) {
                return Err(invalid(format!("duplicate asset id {}", asset.id)));
            }
        }

        let mut seen = HashSet::new();
        let mut stack: Vec<&FileNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            if !seen.insert(node.id) {
                return Err(invalid(format!("duplicate node id {}", node.id)));
            }
            let geometry = [node.x, node.y, node.width, node.height];
            if geometry.iter().any(|v| !v.is_finite()) {
                return Err(invalid(format!("node {} has non-finite geometry", node.id)));
            }
            if let Some(style) = &node.style {
                if !style.is_object() {
                    return Err(invalid(format!("node {} style must be an object", node.id)));
                }
            }
            if let Some(image) = &node.image {
                if !asset_ids.contains(&image.asset_id) {
                    return Err(invalid(format!("node {} references unknown asset {}", node.id, image.asset_id)));
                }
                if !(image.width.is_finite() && image.height.is_finite()) {
                    return Err(invalid(format!("node {} image has non-finite size", node.id)));
                }
            }
            stack.extend(node.children.iter());
        }
        Ok(())
    }
}

fn file_node(store: &Store, id: NodeId) -> Option<FileNode> {
    let Ok(node) = store.node(id) else {
        return None;
    };
    Some(FileNode {
        id: node.id,
        text: node.text.clone(),
        x: node.x,
        y: node.y,
        width: node.width,
        height: node.height,
        width_constrained: node.width_constrained,
        collapsed: node.collapsed,
        style: node.style.clone().map(serde_json::Value::Object),
        image: node.image.clone(),
        children: node.children.iter().filter_map(|c| file_node(store, *c)).collect(),
    })
}

/// Bring a raw document up to [`CURRENT_VERSION`].
///
/// Version 1 files predate assets and metadata; both are filled with empty
/// defaults. A missing version is read as 1.
fn migrate(mut raw: serde_json::Value) -> Result<serde_json::Value, DocumentError> {
    let Some(obj) = raw.as_object_mut() else {
        return Err(invalid("document root must be an object"));
    };
    let version = match obj.get("version") {
        None => 1,
        Some(v) => v.as_u64().ok_or_else(|| invalid(format!("version must be a non-negative integer, got {v}")))?,
    };
    if version > CURRENT_VERSION {
        tracing::warn!(version, supported = CURRENT_VERSION, "document is newer than this engine");
        return Err(DocumentError::UnsupportedVersion { found: version, supported: CURRENT_VERSION });
    }
    if version < 2 {
        obj.entry("assets").or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if !obj.contains_key("meta") {
            let meta = serde_json::to_value(Meta::default()).map_err(|e| invalid(e.to_string()))?;
            obj.insert("meta".into(), meta);
        }
        tracing::info!(from = version, to = CURRENT_VERSION, "document migrated");
    }
    obj.insert("version".into(), serde_json::Value::from(CURRENT_VERSION));
    Ok(raw)
}
